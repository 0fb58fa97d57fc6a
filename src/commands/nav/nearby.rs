use log::debug;

use super::distance::grid_distance;
use super::graph::NavigationGraph;
use super::models::{Point, Trader, TraderType};
use super::search::reach_costs;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NearbyTrader {
    pub trader_type: TraderType,
    pub name: String,
    pub position: Point,
    /// Straight walk, or cheapest walk plus teleport cost in network mode.
    pub distance: i64,
}

impl NearbyTrader {
    fn new(t: &Trader, distance: i64) -> Self {
        Self { trader_type: t.trader_type, name: t.name.clone(), position: t.position, distance }
    }
}

fn wanted(trader_type: Option<TraderType>) -> impl Fn(&&Trader) -> bool {
    move |t: &&Trader| trader_type.map(|want| t.trader_type == want).unwrap_or(true)
}

/// Traders within `max_distance` of `origin`, nearest first.
///
/// Ties keep catalog order of the trader type, then insertion order.
pub fn find_nearby(
    graph: &NavigationGraph,
    origin: Point,
    trader_type: Option<TraderType>,
    max_distance: i64,
) -> Vec<NearbyTrader> {
    let mut found: Vec<NearbyTrader> = graph
        .traders()
        .filter(wanted(trader_type))
        .filter_map(|t| {
            let distance = grid_distance(origin, t.position);
            (distance <= max_distance).then(|| NearbyTrader::new(t, distance))
        })
        .collect();
    found.sort_by_key(|n| n.distance);
    found
}

/// Like `find_nearby`, but a trader's distance is the cheapest route to it
/// through the linked translocator network, `teleport_cost` charged per hop.
///
/// Expects `linker::build_links` to have run on `graph`.
pub fn find_nearby_by_network(
    graph: &NavigationGraph,
    origin: Point,
    trader_type: Option<TraderType>,
    max_distance: i64,
    teleport_cost: i64,
) -> Vec<NearbyTrader> {
    let reach = reach_costs(graph, origin, teleport_cost, max_distance);
    let exits: Vec<(Point, i64)> = graph
        .translocators()
        .iter()
        .zip(reach)
        .filter_map(|(t, cost)| cost.map(|c| (t.destination, c)))
        .collect();
    debug!("{} translocator exits within {} of {}", exits.len(), max_distance, origin);

    let mut found: Vec<NearbyTrader> = graph
        .traders()
        .filter(wanted(trader_type))
        .filter_map(|t| {
            let distance = exits
                .iter()
                .map(|&(exit, cost)| cost + grid_distance(exit, t.position))
                .fold(grid_distance(origin, t.position), i64::min);
            (distance <= max_distance).then(|| NearbyTrader::new(t, distance))
        })
        .collect();
    found.sort_by_key(|n| n.distance);
    found
}
