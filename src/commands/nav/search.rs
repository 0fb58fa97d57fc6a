use log::{debug, info, warn};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use super::distance::grid_distance;
use super::graph::NavigationGraph;
use super::models::{Link, Movement, Point, Route, TranslocatorId, Waypoint};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SearchStats {
    pub seeds: usize,
    pub expansions: usize,
    pub improvements: usize,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SearchOptions {
    pub time_budget: Duration,
    /// Charged for every translocator taken, on top of walking.
    pub teleport_cost: i64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { time_budget: Duration::MAX, teleport_cost: 0 }
    }
}

#[derive(Clone, Debug)]
pub struct PathResult {
    pub route: Route,
    /// False when the time budget ran out before the frontier was exhausted.
    pub is_optimal: bool,
    /// Walked distance plus `teleport_cost` per hop.
    pub cost: i64,
    pub stats: SearchStats,
}

/// Frontier entry. Ordered so `BinaryHeap` pops the lowest estimate first,
/// and among equal estimates the one discovered first.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Candidate {
    estimated: i64,
    seq: u64,
    accumulated: i64,
    step: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimated
            .cmp(&self.estimated)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Arena node: one translocator taken, plus the step that led to it.
#[derive(Copy, Clone, Debug)]
struct Step {
    tl: TranslocatorId,
    parent: Option<usize>,
}

/// Per-query state. Nothing here outlives a single `find_path` call, so
/// concurrent searches over one graph never observe each other.
struct Workspace<'g> {
    graph: &'g NavigationGraph,
    /// Walk from each translocator's destination to the goal.
    remaining: Vec<i64>,
    /// Neighbor lists ranked by `remaining` of their target for this goal.
    ranked: Vec<Vec<Link>>,
    /// Cheapest cost found so far to reach each translocator's origin.
    best_known: Vec<i64>,
    hop: i64,
    arena: Vec<Step>,
    frontier: BinaryHeap<Candidate>,
    next_seq: u64,
    bound: i64,
    best_step: Option<usize>,
    stats: SearchStats,
}

impl<'g> Workspace<'g> {
    fn new(graph: &'g NavigationGraph, destination: Point, bound: i64, hop: i64) -> Self {
        let tls = graph.translocators();
        let remaining: Vec<i64> = tls.iter().map(|t| grid_distance(t.destination, destination)).collect();
        let ranked = tls
            .iter()
            .map(|t| {
                let mut links = t.neighbors.clone();
                links.sort_by_key(|l| remaining[l.target.0]);
                links
            })
            .collect();
        Self {
            graph,
            remaining,
            ranked,
            best_known: vec![i64::MAX; tls.len()],
            hop,
            arena: Vec::new(),
            frontier: BinaryHeap::new(),
            next_seq: 0,
            bound,
            best_step: None,
            stats: SearchStats::default(),
        }
    }

    /// Queues `tl` reached at `accumulated` unless it is already dominated.
    fn offer(&mut self, tl: TranslocatorId, accumulated: i64, parent: Option<usize>) -> bool {
        if accumulated >= self.bound || accumulated >= self.best_known[tl.0] {
            return false;
        }
        self.best_known[tl.0] = accumulated;
        let step = self.arena.len();
        self.arena.push(Step { tl, parent });
        self.frontier.push(Candidate {
            estimated: accumulated + self.hop + self.remaining[tl.0],
            seq: self.next_seq,
            accumulated,
            step,
        });
        self.next_seq += 1;
        true
    }

    fn expand(&mut self, cand: Candidate) {
        let tl = self.arena[cand.step].tl;
        if cand.accumulated >= self.bound || cand.accumulated > self.best_known[tl.0] {
            return;
        }
        self.stats.expansions += 1;

        let arrived = cand.accumulated + self.hop;
        let total = arrived + self.remaining[tl.0];
        if total < self.bound {
            debug!("new best route: {} (was {})", total, self.bound);
            self.bound = total;
            self.best_step = Some(cand.step);
            self.stats.improvements += 1;
        }

        let links = std::mem::take(&mut self.ranked[tl.0]);
        for link in links.iter() {
            self.offer(link.target, arrived + link.cost, Some(cand.step));
        }
        self.ranked[tl.0] = links;
    }

    fn route(&self, origin: Point, destination: Point) -> Route {
        let Some(last) = self.best_step else {
            return Route::direct(origin, destination);
        };
        let mut chain = Vec::new();
        let mut cursor = Some(last);
        while let Some(i) = cursor {
            chain.push(self.arena[i].tl);
            cursor = self.arena[i].parent;
        }
        chain.reverse();

        let mut waypoints = Vec::with_capacity(chain.len() * 2 + 2);
        waypoints.push(Waypoint { point: origin, movement: Movement::Start });
        for id in chain {
            let t = self.graph.translocator(id);
            walk_to(&mut waypoints, t.origin);
            waypoints.push(Waypoint { point: t.destination, movement: Movement::Teleport });
        }
        walk_to(&mut waypoints, destination);
        Route { waypoints }
    }
}

/// Appends a walk unless the traveler already stands on `point`.
fn walk_to(waypoints: &mut Vec<Waypoint>, point: Point) {
    if waypoints.last().map(|w| w.point) != Some(point) {
        waypoints.push(Waypoint { point, movement: Movement::Walk });
    }
}

/// Finds the cheapest walk/translocate route from `origin` to `destination`.
///
/// Best-first branch-and-bound over the linked graph. The trivial walk sets
/// the initial bound, so the result is never worse than walking. When
/// `time_budget` runs out the best route so far is returned with
/// `is_optimal == false`; `Duration::MAX` searches to exhaustion.
pub fn find_path(graph: &NavigationGraph, origin: Point, destination: Point, time_budget: Duration) -> PathResult {
    find_path_with(graph, origin, destination, &SearchOptions { time_budget, ..SearchOptions::default() })
}

pub fn find_path_with(graph: &NavigationGraph, origin: Point, destination: Point, opts: &SearchOptions) -> PathResult {
    let started = Instant::now();
    let time_budget = opts.time_budget;
    if graph.links_stale() && !graph.is_empty() {
        warn!("translocator links are stale; searching without walking links between translocators");
    }

    let mut ws = Workspace::new(graph, destination, grid_distance(origin, destination), opts.teleport_cost.max(0));

    for (i, t) in graph.translocators().iter().enumerate() {
        let to_entry = grid_distance(origin, t.origin);
        if to_entry >= grid_distance(origin, t.destination) {
            continue;
        }
        if ws.offer(TranslocatorId(i), to_entry, None) {
            ws.stats.seeds += 1;
        }
    }

    let mut is_optimal = true;
    while let Some(cand) = ws.frontier.pop() {
        if started.elapsed() >= time_budget {
            is_optimal = false;
            info!(
                "search budget of {:?} exhausted after {} expansions; returning best route so far",
                time_budget, ws.stats.expansions
            );
            break;
        }
        ws.expand(cand);
    }

    debug!(
        "search {} -> {}: cost {} seeds={} expansions={} improvements={} in {:?}",
        origin,
        destination,
        ws.bound,
        ws.stats.seeds,
        ws.stats.expansions,
        ws.stats.improvements,
        started.elapsed()
    );

    PathResult {
        route: ws.route(origin, destination),
        is_optimal,
        cost: ws.bound,
        stats: ws.stats,
    }
}

/// Cheapest cost of standing on each translocator's destination when starting
/// at `origin`, `None` where that exceeds `limit`.
///
/// Goal-free variant of `find_path` for one-to-many queries: every target
/// then costs `min(walk, reach[i] + walk from destination i)`.
pub fn reach_costs(graph: &NavigationGraph, origin: Point, teleport_cost: i64, limit: i64) -> Vec<Option<i64>> {
    let hop = teleport_cost.max(0);
    let tls = graph.translocators();
    if graph.links_stale() && !graph.is_empty() {
        warn!("translocator links are stale; reach costs only cover single hops");
    }

    let mut best_known = vec![i64::MAX; tls.len()];
    let mut settled = vec![false; tls.len()];
    let mut frontier = BinaryHeap::new();
    let mut seq = 0u64;

    for (i, t) in tls.iter().enumerate() {
        let to_entry = grid_distance(origin, t.origin);
        if to_entry + hop > limit || to_entry >= grid_distance(origin, t.destination) {
            continue;
        }
        best_known[i] = to_entry;
        frontier.push(Candidate { estimated: to_entry, seq, accumulated: to_entry, step: i });
        seq += 1;
    }

    while let Some(cand) = frontier.pop() {
        let i = cand.step;
        if settled[i] || cand.accumulated > best_known[i] {
            continue;
        }
        settled[i] = true;
        let arrived = cand.accumulated + hop;
        for link in tls[i].neighbors.iter() {
            let j = link.target.0;
            let child = arrived + link.cost;
            if child + hop <= limit && child < best_known[j] {
                best_known[j] = child;
                frontier.push(Candidate { estimated: child, seq, accumulated: child, step: j });
                seq += 1;
            }
        }
    }
    debug!("reach from {}: {} of {} translocators within {}", origin, settled.iter().filter(|s| **s).count(), tls.len(), limit);

    best_known
        .into_iter()
        .map(|b| (b != i64::MAX).then(|| b + hop))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::nav::graph::MergePolicy;
    use crate::commands::nav::linker::{build_links, LinkOptions};

    fn linked(pairs: &[((i32, i32), (i32, i32))]) -> NavigationGraph {
        let mut g = NavigationGraph::new();
        for &((ox, oy), (dx, dy)) in pairs {
            g.add_translocator(Point::new(ox, oy), Point::new(dx, dy), MergePolicy::KeepExisting);
        }
        build_links(&mut g, &LinkOptions::default());
        g
    }

    #[test]
    fn empty_graph_walks_directly() {
        let g = NavigationGraph::new();
        let r = find_path(&g, Point::new(0, 0), Point::new(30, 40), Duration::MAX);
        assert!(r.is_optimal);
        assert_eq!(r.route.points(), vec![Point::new(0, 0), Point::new(30, 40)]);
        assert_eq!(r.cost, 70);
    }

    #[test]
    fn single_translocator_shortcut() {
        let g = linked(&[((1000, 0), (19000, 0))]);
        let r = find_path(&g, Point::new(0, 0), Point::new(20000, 0), Duration::MAX);
        assert!(r.is_optimal);
        assert_eq!(r.cost, 2000);
        assert_eq!(r.route.walked_distance(), 2000);
        assert_eq!(
            r.route.points(),
            vec![Point::new(0, 0), Point::new(1000, 0), Point::new(19000, 0), Point::new(20000, 0)]
        );
        assert_eq!(r.route.teleports(), 1);
    }

    #[test]
    fn two_hop_chain_beats_direct_walk() {
        let g = linked(&[((100, 0), (5000, 0)), ((5100, 0), (10000, 0))]);
        let r = find_path(&g, Point::new(0, 0), Point::new(10050, 0), Duration::MAX);
        assert!(r.is_optimal);
        assert_eq!(r.cost, 100 + 100 + 50);
        assert_eq!(r.route.teleports(), 2);
    }

    #[test]
    fn unreachable_translocators_are_ignored() {
        // Entering the translocator costs more than walking straight to the goal.
        let g = linked(&[((0, 500), (0, 400))]);
        let r = find_path(&g, Point::new(0, 0), Point::new(10, 0), Duration::MAX);
        assert!(r.is_optimal);
        assert_eq!(r.route, Route::direct(Point::new(0, 0), Point::new(10, 0)));
    }

    #[test]
    fn zero_budget_still_returns_a_route() {
        let g = linked(&[((1000, 0), (19000, 0))]);
        let r = find_path(&g, Point::new(0, 0), Point::new(20000, 0), Duration::ZERO);
        assert!(!r.is_optimal);
        assert!(r.route.waypoints.len() >= 2);
        assert!(r.cost <= 20000);
        assert_eq!(r.route.waypoints.first().map(|w| w.point), Some(Point::new(0, 0)));
        assert_eq!(r.route.waypoints.last().map(|w| w.point), Some(Point::new(20000, 0)));
    }

    #[test]
    fn ties_resolve_by_discovery_order() {
        // Two mirror-image shortcuts with identical cost; the first registered wins.
        let g = linked(&[((0, 100), (1000, 100)), ((0, -100), (1000, -100))]);
        let a = find_path(&g, Point::new(0, 0), Point::new(1000, 0), Duration::MAX);
        let b = find_path(&g, Point::new(0, 0), Point::new(1000, 0), Duration::MAX);
        assert_eq!(a.cost, 200);
        assert_eq!(a.route, b.route);
        assert_eq!(a.route.waypoints[1].point, Point::new(0, 100));
    }

    #[test]
    fn candidate_heap_pops_lowest_estimate_then_oldest() {
        let mut heap = BinaryHeap::new();
        heap.push(Candidate { estimated: 5, seq: 2, accumulated: 0, step: 0 });
        heap.push(Candidate { estimated: 3, seq: 1, accumulated: 0, step: 1 });
        heap.push(Candidate { estimated: 3, seq: 0, accumulated: 0, step: 2 });
        assert_eq!(heap.pop().map(|c| c.step), Some(2));
        assert_eq!(heap.pop().map(|c| c.step), Some(1));
        assert_eq!(heap.pop().map(|c| c.step), Some(0));
    }

    #[test]
    fn starting_on_a_translocator_has_no_empty_walk() {
        let g = linked(&[((1000, 0), (19000, 0))]);
        let r = find_path(&g, Point::new(1000, 0), Point::new(19000, 0), Duration::MAX);
        assert_eq!(r.cost, 0);
        assert_eq!(
            r.route.waypoints,
            vec![
                Waypoint { point: Point::new(1000, 0), movement: Movement::Start },
                Waypoint { point: Point::new(19000, 0), movement: Movement::Teleport },
            ]
        );

        let text = crate::commands::nav::narrator::narrate(&r.route, r.is_optimal);
        assert!(!text.contains("Move 0m"), "{}", text);
        assert!(text.contains("using 1 translocator."));
    }

    #[test]
    fn teleport_cost_is_charged_per_hop() {
        let g = linked(&[((100, 0), (5000, 0)), ((5100, 0), (6100, 0))]);
        let opts = |teleport_cost| SearchOptions { teleport_cost, ..SearchOptions::default() };
        let (o, d) = (Point::new(0, 0), Point::new(10050, 0));

        let cheap = find_path_with(&g, o, d, &opts(100));
        assert_eq!(cheap.route.teleports(), 2);
        assert_eq!(cheap.route.walked_distance(), 100 + 100 + 3950);
        assert_eq!(cheap.cost, 4150 + 2 * 100);

        // The short second hop no longer pays for itself.
        let dear = find_path_with(&g, o, d, &opts(2000));
        assert_eq!(dear.route.teleports(), 1);
        assert_eq!(dear.cost, 100 + 2000 + 5050);

        let prohibitive = find_path_with(&g, o, d, &opts(20_000));
        assert_eq!(prohibitive.route, Route::direct(o, d));
        assert_eq!(prohibitive.cost, 10050);
    }

    #[test]
    fn reach_costs_follow_links() {
        let g = linked(&[((100, 0), (5000, 0)), ((5100, 0), (10000, 0)), ((0, 900), (0, 800))]);
        let reach = reach_costs(&g, Point::new(0, 0), 10, i64::MAX);
        assert_eq!(reach, vec![Some(110), Some(220), None]);

        let limited = reach_costs(&g, Point::new(0, 0), 10, 150);
        assert_eq!(limited, vec![Some(110), None, None]);
    }
}
