use std::fmt::Write;

use super::distance::{bearing, grid_distance, Compass};
use super::models::{Movement, Point, Route};

/// One rendered leg of a route.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Direction {
    Walk { distance: i64, bearing: Compass, to: Point },
    Translocate { to: Point },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Narration {
    pub start: Option<Point>,
    pub steps: Vec<Direction>,
    pub walked: i64,
    pub teleports: usize,
    pub is_optimal: bool,
}

pub fn directions(route: &Route, is_optimal: bool) -> Narration {
    let mut out = Narration {
        start: route.waypoints.first().map(|w| w.point),
        steps: Vec::new(),
        walked: 0,
        teleports: 0,
        is_optimal,
    };
    for pair in route.waypoints.windows(2) {
        let (from, to) = (pair[0].point, pair[1].point);
        match pair[1].movement {
            Movement::Teleport => {
                out.teleports += 1;
                out.steps.push(Direction::Translocate { to });
            }
            Movement::Walk | Movement::Start => {
                let distance = grid_distance(from, to);
                out.walked += distance;
                out.steps.push(Direction::Walk { distance, bearing: bearing(from, to), to });
            }
        }
    }
    out
}

/// Turn-by-turn text for a route, with a caveat when the search was cut short.
pub fn narrate(route: &Route, is_optimal: bool) -> String {
    let n = directions(route, is_optimal);
    let mut text = String::new();
    if let Some(start) = n.start {
        let _ = writeln!(text, "You start at {}", start);
    }
    for step in n.steps.iter() {
        match step {
            Direction::Walk { distance, bearing, to } => {
                let _ = writeln!(text, "Move {}m {} to {}", distance, bearing, to);
            }
            Direction::Translocate { to } => {
                let _ = writeln!(text, "Translocate to {}", to);
            }
        }
    }
    let _ = writeln!(
        text,
        "You arrive at your destination after {:.2}km of travel using {} translocator{}.",
        n.walked as f64 / 1000.0,
        n.teleports,
        if n.teleports == 1 { "" } else { "s" }
    );
    if !n.is_optimal {
        let _ = writeln!(text, "Note: search time budget exhausted; this route may not be the shortest.");
    }
    text
}
