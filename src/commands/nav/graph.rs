use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::error::NavError;
use super::models::{Landmark, Point, Trader, TraderType, Translocator, TranslocatorId};

/// What to do when a translocator arrives whose origin is already registered.
///
/// Translocators are identified by origin alone, so two hops leaving the same
/// spot can never coexist; the caller picks which one survives.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum MergePolicy {
    #[default]
    KeepExisting,
    Replace,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Insertion {
    Added(TranslocatorId),
    /// Origin already known; the stored destination was left untouched.
    Kept(TranslocatorId),
    /// Origin already known; the stored destination was overwritten.
    Replaced(TranslocatorId),
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MergeStats {
    pub translocators_added: usize,
    pub translocators_replaced: usize,
    pub translocators_kept: usize,
    pub landmarks_added: usize,
    pub traders_added: usize,
}

/// Translocator registry plus the landmark table and trader multimap.
///
/// Neighbor lists are derived by `linker::build_links`. Every mutation of the
/// translocator set clears them and marks the graph stale until relinked.
#[derive(Clone, Debug, Default)]
pub struct NavigationGraph {
    translocators: Vec<Translocator>,
    by_origin: HashMap<Point, TranslocatorId>,
    landmarks: Vec<Landmark>,
    traders: BTreeMap<TraderType, Vec<Trader>>,
    links_stale: bool,
}

impl NavigationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_translocator(&mut self, origin: Point, destination: Point, policy: MergePolicy) -> Insertion {
        if let Some(&id) = self.by_origin.get(&origin) {
            let existing = &mut self.translocators[id.0];
            if existing.destination == destination || policy == MergePolicy::KeepExisting {
                debug!("translocator {} -> {} already known (kept {})", origin, destination, existing.destination);
                return Insertion::Kept(id);
            }
            debug!("translocator {} now leads to {} (was {})", origin, destination, existing.destination);
            existing.destination = destination;
            self.invalidate_links();
            return Insertion::Replaced(id);
        }
        let id = TranslocatorId(self.translocators.len());
        self.translocators.push(Translocator::new(origin, destination));
        self.by_origin.insert(origin, id);
        self.invalidate_links();
        Insertion::Added(id)
    }

    /// Adds a landmark unless the exact name/position pair is already present.
    pub fn add_landmark(&mut self, name: &str, position: Point) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        if self.landmarks.iter().any(|l| l.position == position && l.name.eq_ignore_ascii_case(name)) {
            return false;
        }
        self.landmarks.push(Landmark { name: name.to_string(), position });
        true
    }

    pub fn add_trader(&mut self, trader: Trader) -> bool {
        let bucket = self.traders.entry(trader.trader_type).or_default();
        if bucket.iter().any(|t| t.position == trader.position && t.name == trader.name) {
            return false;
        }
        bucket.push(trader);
        true
    }

    /// Folds `other` into this graph, applying `policy` to clashing translocators.
    pub fn merge(&mut self, other: NavigationGraph, policy: MergePolicy) -> MergeStats {
        let mut stats = MergeStats::default();
        for t in other.translocators {
            match self.add_translocator(t.origin, t.destination, policy) {
                Insertion::Added(_) => stats.translocators_added += 1,
                Insertion::Replaced(_) => stats.translocators_replaced += 1,
                Insertion::Kept(_) => stats.translocators_kept += 1,
            }
        }
        for l in other.landmarks {
            if self.add_landmark(&l.name, l.position) {
                stats.landmarks_added += 1;
            }
        }
        for (_, bucket) in other.traders {
            for t in bucket {
                if self.add_trader(t) {
                    stats.traders_added += 1;
                }
            }
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.translocators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translocators.is_empty()
    }

    pub fn translocators(&self) -> &[Translocator] {
        &self.translocators
    }

    pub fn translocator(&self, id: TranslocatorId) -> &Translocator {
        &self.translocators[id.0]
    }

    pub fn find_by_origin(&self, origin: Point) -> Option<TranslocatorId> {
        self.by_origin.get(&origin).copied()
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }

    /// Distinct landmark names in sorted order.
    pub fn landmark_names(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self.landmarks.iter().map(|l| l.name.as_str()).collect();
        names.into_iter().map(str::to_string).collect()
    }

    /// Case-insensitive lookup. Several matches resolve to the earliest inserted one.
    pub fn lookup_landmark(&self, name: &str) -> Option<Point> {
        let name = name.trim();
        let mut matches = self.landmarks.iter().filter(|l| l.name.eq_ignore_ascii_case(name));
        let first = matches.next()?;
        let others: Vec<Point> = matches.map(|l| l.position).filter(|p| *p != first.position).collect();
        if !others.is_empty() {
            warn!(
                "landmark `{}` is ambiguous ({} locations); using {}",
                name,
                others.len() + 1,
                first.position
            );
        }
        Some(first.position)
    }

    /// Resolves an `x,y` literal or a landmark name.
    pub fn resolve_location(&self, text: &str) -> Result<Point, NavError> {
        if let Some(p) = parse_coordinate(text) {
            return Ok(p);
        }
        self.lookup_landmark(text)
            .ok_or_else(|| NavError::UnresolvableCoordinate(text.trim().to_string()))
    }

    pub fn traders(&self) -> impl Iterator<Item = &Trader> {
        self.traders.values().flatten()
    }

    pub fn traders_of(&self, trader_type: TraderType) -> &[Trader] {
        self.traders.get(&trader_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn trader_count(&self) -> usize {
        self.traders.values().map(Vec::len).sum()
    }

    pub fn links_stale(&self) -> bool {
        self.links_stale
    }

    pub(super) fn translocators_mut(&mut self) -> &mut [Translocator] {
        &mut self.translocators
    }

    pub(super) fn mark_linked(&mut self) {
        self.links_stale = false;
    }

    fn invalidate_links(&mut self) {
        if !self.links_stale {
            for t in self.translocators.iter_mut() {
                t.neighbors.clear();
            }
        }
        self.links_stale = true;
    }
}

/// Parses `x,y` (whitespace tolerated, negatives allowed).
pub fn parse_coordinate(text: &str) -> Option<Point> {
    let (x, y) = text.split_once(',')?;
    let x = x.trim().parse::<i32>().ok()?;
    let y = y.trim().parse::<i32>().ok()?;
    Some(Point::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_origin_respects_policy() {
        let mut g = NavigationGraph::new();
        let a = Point::new(0, 0);
        let first = g.add_translocator(a, Point::new(100, 0), MergePolicy::KeepExisting);
        assert_eq!(first, Insertion::Added(TranslocatorId(0)));

        let kept = g.add_translocator(a, Point::new(200, 0), MergePolicy::KeepExisting);
        assert_eq!(kept, Insertion::Kept(TranslocatorId(0)));
        assert_eq!(g.translocator(TranslocatorId(0)).destination, Point::new(100, 0));

        let replaced = g.add_translocator(a, Point::new(200, 0), MergePolicy::Replace);
        assert_eq!(replaced, Insertion::Replaced(TranslocatorId(0)));
        assert_eq!(g.translocator(TranslocatorId(0)).destination, Point::new(200, 0));
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn same_pair_is_kept_even_when_replacing() {
        let mut g = NavigationGraph::new();
        g.add_translocator(Point::new(1, 1), Point::new(9, 9), MergePolicy::Replace);
        let again = g.add_translocator(Point::new(1, 1), Point::new(9, 9), MergePolicy::Replace);
        assert_eq!(again, Insertion::Kept(TranslocatorId(0)));
    }

    #[test]
    fn mutation_marks_links_stale() {
        let mut g = NavigationGraph::new();
        assert!(!g.links_stale());
        g.add_translocator(Point::new(0, 0), Point::new(5, 5), MergePolicy::KeepExisting);
        assert!(g.links_stale());
        g.mark_linked();
        assert!(!g.links_stale());
        g.add_translocator(Point::new(0, 0), Point::new(5, 5), MergePolicy::KeepExisting);
        assert!(!g.links_stale(), "no-op insert keeps links valid");
    }

    #[test]
    fn resolve_literal_and_landmarks() {
        let mut g = NavigationGraph::new();
        g.add_landmark("Spawn", Point::new(10, -20));
        assert_eq!(g.resolve_location("-5, 7"), Ok(Point::new(-5, 7)));
        assert_eq!(g.resolve_location("spawn"), Ok(Point::new(10, -20)));
        assert_eq!(g.resolve_location("  SPAWN "), Ok(Point::new(10, -20)));
        assert_eq!(
            g.resolve_location("nowhere"),
            Err(NavError::UnresolvableCoordinate("nowhere".to_string()))
        );
        assert_eq!(
            g.resolve_location("1,two"),
            Err(NavError::UnresolvableCoordinate("1,two".to_string()))
        );
    }

    #[test]
    fn ambiguous_landmark_takes_first_inserted() {
        let mut g = NavigationGraph::new();
        assert!(g.add_landmark("market", Point::new(1, 1)));
        assert!(g.add_landmark("Market", Point::new(2, 2)));
        assert!(!g.add_landmark("market", Point::new(1, 1)));
        assert_eq!(g.lookup_landmark("MARKET"), Some(Point::new(1, 1)));
        assert_eq!(g.landmark_names(), vec!["Market".to_string(), "market".to_string()]);
    }

    #[test]
    fn traders_are_grouped_by_type() {
        let mut g = NavigationGraph::new();
        let t = Trader { trader_type: TraderType::Foods, name: "Ann".into(), position: Point::new(3, 3) };
        assert!(g.add_trader(t.clone()));
        assert!(!g.add_trader(t));
        g.add_trader(Trader { trader_type: TraderType::Glass, name: "Bo".into(), position: Point::new(4, 4) });
        assert_eq!(g.traders_of(TraderType::Foods).len(), 1);
        assert_eq!(g.traders_of(TraderType::Pottery).len(), 0);
        assert_eq!(g.trader_count(), 2);
    }

    #[test]
    fn merge_counts_outcomes() {
        let mut base = NavigationGraph::new();
        base.add_translocator(Point::new(0, 0), Point::new(10, 0), MergePolicy::KeepExisting);

        let mut incoming = NavigationGraph::new();
        incoming.add_translocator(Point::new(0, 0), Point::new(20, 0), MergePolicy::KeepExisting);
        incoming.add_translocator(Point::new(5, 5), Point::new(50, 50), MergePolicy::KeepExisting);
        incoming.add_landmark("camp", Point::new(7, 7));

        let stats = base.merge(incoming, MergePolicy::Replace);
        assert_eq!(stats.translocators_added, 1);
        assert_eq!(stats.translocators_replaced, 1);
        assert_eq!(stats.landmarks_added, 1);
        assert_eq!(base.translocator(TranslocatorId(0)).destination, Point::new(20, 0));
    }
}
