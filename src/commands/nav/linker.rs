use log::{debug, info};
use rayon::prelude::*;

use super::distance::grid_distance;
use super::graph::NavigationGraph;
use super::models::{Link, Translocator, TranslocatorId};

#[derive(Copy, Clone, Debug, Default)]
pub struct LinkOptions {
    /// Upper bound (exclusive) on a walking link; `None` links any distance.
    pub max_link_distance: Option<i64>,
}

#[derive(Clone, Debug, Default)]
pub struct LinkStats {
    pub translocators: usize,
    pub links_created: usize,
}

/// Derives every translocator's walking links to the others. Idempotent.
///
/// `t1 -> t2` is kept when walking from `t1`'s destination to `t2`'s origin
/// is non-zero and strictly shorter than walking from `t2`'s destination back
/// to `t1`'s origin. Zero distance means the two collapse into one node.
pub fn build_links(graph: &mut NavigationGraph, opts: &LinkOptions) -> LinkStats {
    let lists: Vec<Vec<Link>> = {
        let tls = graph.translocators();
        (0..tls.len())
            .into_par_iter()
            .map(|i| links_from(tls, i, opts))
            .collect()
    };

    let mut stats = LinkStats { translocators: lists.len(), links_created: 0 };
    for (t, links) in graph.translocators_mut().iter_mut().zip(lists) {
        stats.links_created += links.len();
        t.neighbors = links;
    }
    graph.mark_linked();
    info!("linked {} translocators with {} walking links", stats.translocators, stats.links_created);
    stats
}

fn links_from(tls: &[Translocator], i: usize, opts: &LinkOptions) -> Vec<Link> {
    let t1 = &tls[i];
    let mut out = Vec::new();
    for (j, t2) in tls.iter().enumerate() {
        if i == j {
            continue;
        }
        let onward = grid_distance(t1.destination, t2.origin);
        if onward == 0 {
            continue;
        }
        if onward >= grid_distance(t2.destination, t1.origin) {
            continue;
        }
        if let Some(max) = opts.max_link_distance {
            if onward >= max {
                continue;
            }
        }
        out.push(Link { cost: onward, target: TranslocatorId(j) });
    }
    debug!("translocator {} has {} links", t1.origin, out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::nav::graph::MergePolicy;
    use crate::commands::nav::models::Point;

    fn graph(pairs: &[((i32, i32), (i32, i32))]) -> NavigationGraph {
        let mut g = NavigationGraph::new();
        for &((ox, oy), (dx, dy)) in pairs {
            g.add_translocator(Point::new(ox, oy), Point::new(dx, dy), MergePolicy::KeepExisting);
        }
        g
    }

    #[test]
    fn forward_chain_links_one_way() {
        // t0 lands near t1's origin; t1 lands far from t0's origin.
        let mut g = graph(&[((0, 0), (1000, 0)), ((1010, 0), (5000, 0))]);
        let stats = build_links(&mut g, &LinkOptions::default());
        assert_eq!(stats.links_created, 1);
        assert_eq!(g.translocator(TranslocatorId(0)).neighbors, vec![Link { cost: 10, target: TranslocatorId(1) }]);
        assert!(g.translocator(TranslocatorId(1)).neighbors.is_empty());
        assert!(!g.links_stale());
    }

    #[test]
    fn zero_distance_pairs_are_not_linked() {
        // t1 starts exactly where t0 lands: same node, no edge.
        let mut g = graph(&[((0, 0), (100, 0)), ((100, 0), (900, 0))]);
        build_links(&mut g, &LinkOptions::default());
        assert!(g.translocator(TranslocatorId(0)).neighbors.is_empty());
    }

    #[test]
    fn equal_onward_and_backward_walks_are_dropped() {
        // onward = |100-150| = 50, backward = |200-250| = 50: strict inequality fails.
        let mut g = graph(&[((250, 0), (100, 0)), ((150, 0), (200, 0))]);
        build_links(&mut g, &LinkOptions::default());
        assert!(g.translocator(TranslocatorId(0)).neighbors.is_empty());
    }

    #[test]
    fn max_link_distance_is_exclusive() {
        let mut g = graph(&[((0, 0), (1000, 0)), ((1100, 0), (9000, 0))]);
        build_links(&mut g, &LinkOptions { max_link_distance: Some(100) });
        assert!(g.translocator(TranslocatorId(0)).neighbors.is_empty());
        build_links(&mut g, &LinkOptions { max_link_distance: Some(101) });
        assert_eq!(g.translocator(TranslocatorId(0)).neighbors.len(), 1);
    }

    #[test]
    fn relinking_is_idempotent() {
        let mut g = graph(&[((0, 0), (1000, 0)), ((1010, 0), (5000, 0)), ((5050, 0), (9000, 0))]);
        let first = build_links(&mut g, &LinkOptions::default());
        let snapshot: Vec<Vec<Link>> = g.translocators().iter().map(|t| t.neighbors.clone()).collect();
        let second = build_links(&mut g, &LinkOptions::default());
        let again: Vec<Vec<Link>> = g.translocators().iter().map(|t| t.neighbors.clone()).collect();
        assert_eq!(first.links_created, second.links_created);
        assert_eq!(snapshot, again);
    }
}
