use std::f64::consts::PI;
use std::fmt;

use super::models::Point;

/// Manhattan (L1) distance; the cost and heuristic metric of the route search.
#[inline]
pub fn grid_distance(a: Point, b: Point) -> i64 {
    (a.x as i64 - b.x as i64).abs() + (a.y as i64 - b.y as i64).abs()
}

#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Compass {
    N,
    NNE,
    NE,
    ENE,
    E,
    ESE,
    SE,
    SSE,
    S,
    SSW,
    SW,
    WSW,
    W,
    WNW,
    NW,
    NNW,
}

const SECTORS: [Compass; 16] = [
    Compass::N, Compass::NNE, Compass::NE, Compass::ENE,
    Compass::E, Compass::ESE, Compass::SE, Compass::SSE,
    Compass::S, Compass::SSW, Compass::SW, Compass::WSW,
    Compass::W, Compass::WNW, Compass::NW, Compass::NNW,
];

impl Compass {
    pub fn label(self) -> &'static str {
        match self {
            Compass::N => "N",
            Compass::NNE => "NNE",
            Compass::NE => "NE",
            Compass::ENE => "ENE",
            Compass::E => "E",
            Compass::ESE => "ESE",
            Compass::SE => "SE",
            Compass::SSE => "SSE",
            Compass::S => "S",
            Compass::SSW => "SSW",
            Compass::SW => "SW",
            Compass::WSW => "WSW",
            Compass::W => "W",
            Compass::WNW => "WNW",
            Compass::NW => "NW",
            Compass::NNW => "NNW",
        }
    }
}

impl fmt::Display for Compass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 16-point bearing from `a` towards `b`. North is decreasing `y`.
pub fn bearing(a: Point, b: Point) -> Compass {
    let dx = (b.x as i64 - a.x as i64) as f64;
    // northward component; computed directly so identical points give +0.0
    let north = (a.y as i64 - b.y as i64) as f64;
    let sector = (dx.atan2(north) / (2.0 * PI) * SECTORS.len() as f64).round() as i64;
    SECTORS[sector.rem_euclid(SECTORS.len() as i64) as usize]
}
