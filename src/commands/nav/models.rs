use serde::{Deserialize, Serialize};
use std::fmt;

/// A position on the horizontal plane: `x` is the game's X, `y` the game's Z.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Index of a translocator inside its `NavigationGraph`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TranslocatorId(pub usize);

/// Walking edge from one translocator's destination to another's origin.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Link {
    pub cost: i64,
    pub target: TranslocatorId,
}

/// One directed teleport hop. Identity is the origin.
#[derive(Clone, Debug)]
pub struct Translocator {
    pub origin: Point,
    pub destination: Point,
    /// Derived by the linker; empty until `build_links` runs.
    pub neighbors: Vec<Link>,
}

impl Translocator {
    pub fn new(origin: Point, destination: Point) -> Self {
        Self { origin, destination, neighbors: Vec::new() }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Landmark {
    pub name: String,
    pub position: Point,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, clap::ValueEnum)]
pub enum TraderType {
    Artisan,
    Agricultural,
    BuildingMaterials,
    Clothing,
    Commodities,
    Foods,
    Furniture,
    Luxuries,
    SurvivalGoods,
    TreasureHunter,
    Glass,
    Pottery,
    Unknown,
}

impl TraderType {
    pub fn all() -> &'static [TraderType] {
        &[
            TraderType::Artisan,
            TraderType::Agricultural,
            TraderType::BuildingMaterials,
            TraderType::Clothing,
            TraderType::Commodities,
            TraderType::Foods,
            TraderType::Furniture,
            TraderType::Luxuries,
            TraderType::SurvivalGoods,
            TraderType::TreasureHunter,
            TraderType::Glass,
            TraderType::Pottery,
            TraderType::Unknown,
        ]
    }

    /// Stable key used by the graph store.
    pub fn key(self) -> &'static str {
        match self {
            TraderType::Artisan => "artisan",
            TraderType::Agricultural => "agricultural",
            TraderType::BuildingMaterials => "building_materials",
            TraderType::Clothing => "clothing",
            TraderType::Commodities => "commodities",
            TraderType::Foods => "foods",
            TraderType::Furniture => "furniture",
            TraderType::Luxuries => "luxuries",
            TraderType::SurvivalGoods => "survival_goods",
            TraderType::TreasureHunter => "treasure_hunter",
            TraderType::Glass => "glass",
            TraderType::Pottery => "pottery",
            TraderType::Unknown => "unknown",
        }
    }

    pub fn from_key(key: &str) -> Option<TraderType> {
        TraderType::all().iter().copied().find(|t| t.key() == key)
    }

    /// Classify a profession ("Food Trader", "Clothier") or wares label ("Survival goods").
    pub fn from_description(description: &str) -> TraderType {
        let d = description.trim().to_ascii_lowercase();
        // Order matters: "building materials" must win over the generic checks below.
        if d.contains("building") {
            TraderType::BuildingMaterials
        } else if d.contains("treasure") {
            TraderType::TreasureHunter
        } else if d.contains("survival") {
            TraderType::SurvivalGoods
        } else if d.contains("artisan") {
            TraderType::Artisan
        } else if d.contains("agricultur") {
            TraderType::Agricultural
        } else if d.contains("cloth") {
            TraderType::Clothing
        } else if d.contains("commodit") {
            TraderType::Commodities
        } else if d.contains("food") {
            TraderType::Foods
        } else if d.contains("furniture") {
            TraderType::Furniture
        } else if d.contains("luxur") {
            TraderType::Luxuries
        } else if d.contains("glass") {
            TraderType::Glass
        } else if d.contains("pottery") || d.contains("potter") {
            TraderType::Pottery
        } else {
            TraderType::Unknown
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TraderType::Artisan => "Artisan",
            TraderType::Agricultural => "Agricultural Trader",
            TraderType::BuildingMaterials => "Building Materials Trader",
            TraderType::Clothing => "Clothier",
            TraderType::Commodities => "Commodities Trader",
            TraderType::Foods => "Food Trader",
            TraderType::Furniture => "Furniture Trader",
            TraderType::Luxuries => "Luxuries Trader",
            TraderType::SurvivalGoods => "Survival Goods Trader",
            TraderType::TreasureHunter => "Treasure Hunter",
            TraderType::Glass => "Glass Trader",
            TraderType::Pottery => "Pottery Trader",
            TraderType::Unknown => "Unknown Trader",
        }
    }
}

impl fmt::Display for TraderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Trader {
    pub trader_type: TraderType,
    pub name: String,
    pub position: Point,
}

/// How the traveler arrived at a waypoint.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Movement {
    Start,
    Walk,
    Teleport,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Waypoint {
    pub point: Point,
    pub movement: Movement,
}

/// Ordered walk/teleport waypoints from origin to destination.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Route {
    pub waypoints: Vec<Waypoint>,
}

impl Route {
    pub fn direct(origin: Point, destination: Point) -> Self {
        Self {
            waypoints: vec![
                Waypoint { point: origin, movement: Movement::Start },
                Waypoint { point: destination, movement: Movement::Walk },
            ],
        }
    }

    pub fn points(&self) -> Vec<Point> {
        self.waypoints.iter().map(|w| w.point).collect()
    }

    /// Total walking cost; teleport segments are free.
    pub fn walked_distance(&self) -> i64 {
        self.waypoints
            .windows(2)
            .filter(|w| w[1].movement == Movement::Walk)
            .map(|w| super::distance::grid_distance(w[0].point, w[1].point))
            .sum()
    }

    pub fn teleports(&self) -> usize {
        self.waypoints.iter().filter(|w| w.movement == Movement::Teleport).count()
    }
}
