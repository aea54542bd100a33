//! Network types and their OSM way filters.
//!
//! Each [`NetworkType`] maps to an Overpass tag filter. The same filter is
//! evaluated locally by [`NetworkType::matches`], so data coming from a saved
//! response file is filtered exactly as the Overpass server would filter it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, RoadnetError};

/// A single Overpass tag condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagCondition {
    /// `["key"]`: the tag must be present.
    Present(&'static str),
    /// `["key"!~"a|b|c"]`: the value must not contain any alternative.
    ///
    /// Overpass regexes are unanchored, so each alternative is a substring
    /// match. A missing key satisfies the condition.
    NotMatching(&'static str, &'static [&'static str]),
}

impl TagCondition {
    /// Evaluate the condition against a way's tags.
    pub fn matches(&self, tags: &BTreeMap<String, String>) -> bool {
        match self {
            TagCondition::Present(key) => tags.contains_key(*key),
            TagCondition::NotMatching(key, alternatives) => match tags.get(*key) {
                Some(value) => !alternatives.iter().any(|alt| value.contains(alt)),
                None => true,
            },
        }
    }

    /// Render in Overpass QL.
    pub fn to_overpass(&self) -> String {
        match self {
            TagCondition::Present(key) => format!("[\"{}\"]", key),
            TagCondition::NotMatching(key, alternatives) => {
                format!("[\"{}\"!~\"{}\"]", key, alternatives.join("|"))
            }
        }
    }
}

const NO_AREA: TagCondition = TagCondition::NotMatching("area", &["yes"]);
const NO_PRIVATE_ACCESS: TagCondition = TagCondition::NotMatching("access", &["private"]);
const NO_PRIVATE_SERVICE: TagCondition = TagCondition::NotMatching("service", &["private"]);

const DRIVE: &[TagCondition] = &[
    TagCondition::Present("highway"),
    NO_AREA,
    NO_PRIVATE_ACCESS,
    TagCondition::NotMatching(
        "highway",
        &[
            "abandoned",
            "bridleway",
            "bus_guideway",
            "construction",
            "corridor",
            "cycleway",
            "elevator",
            "escalator",
            "footway",
            "path",
            "pedestrian",
            "planned",
            "platform",
            "proposed",
            "raceway",
            "service",
            "steps",
            "track",
        ],
    ),
    TagCondition::NotMatching("motor_vehicle", &["no"]),
    TagCondition::NotMatching("motorcar", &["no"]),
    TagCondition::NotMatching(
        "service",
        &[
            "alley",
            "driveway",
            "emergency_access",
            "parking",
            "parking_aisle",
            "private",
        ],
    ),
];

const DRIVE_SERVICE: &[TagCondition] = &[
    TagCondition::Present("highway"),
    NO_AREA,
    NO_PRIVATE_ACCESS,
    TagCondition::NotMatching(
        "highway",
        &[
            "abandoned",
            "bridleway",
            "bus_guideway",
            "construction",
            "corridor",
            "cycleway",
            "elevator",
            "escalator",
            "footway",
            "path",
            "pedestrian",
            "planned",
            "platform",
            "proposed",
            "raceway",
            "steps",
            "track",
        ],
    ),
    TagCondition::NotMatching("motor_vehicle", &["no"]),
    TagCondition::NotMatching("motorcar", &["no"]),
    TagCondition::NotMatching(
        "service",
        &["emergency_access", "parking", "parking_aisle", "private"],
    ),
];

const WALK: &[TagCondition] = &[
    TagCondition::Present("highway"),
    NO_AREA,
    NO_PRIVATE_ACCESS,
    TagCondition::NotMatching(
        "highway",
        &[
            "abandoned",
            "bus_guideway",
            "construction",
            "cycleway",
            "elevator",
            "motor",
            "planned",
            "platform",
            "proposed",
            "raceway",
        ],
    ),
    TagCondition::NotMatching("foot", &["no"]),
    NO_PRIVATE_SERVICE,
];

const BIKE: &[TagCondition] = &[
    TagCondition::Present("highway"),
    NO_AREA,
    NO_PRIVATE_ACCESS,
    TagCondition::NotMatching(
        "highway",
        &[
            "abandoned",
            "bus_guideway",
            "construction",
            "corridor",
            "elevator",
            "escalator",
            "footway",
            "motor",
            "planned",
            "platform",
            "proposed",
            "raceway",
            "steps",
        ],
    ),
    TagCondition::NotMatching("bicycle", &["no"]),
    NO_PRIVATE_SERVICE,
];

const ALL: &[TagCondition] = &[
    TagCondition::Present("highway"),
    NO_AREA,
    NO_PRIVATE_ACCESS,
    TagCondition::NotMatching(
        "highway",
        &[
            "abandoned",
            "construction",
            "planned",
            "platform",
            "proposed",
            "raceway",
        ],
    ),
    NO_PRIVATE_SERVICE,
];

const ALL_PRIVATE: &[TagCondition] = &[
    TagCondition::Present("highway"),
    NO_AREA,
    TagCondition::NotMatching(
        "highway",
        &[
            "abandoned",
            "construction",
            "planned",
            "platform",
            "proposed",
            "raceway",
        ],
    ),
];

/// Which kind of street network to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkType {
    /// Drivable public streets, excluding service roads.
    #[default]
    Drive,
    /// Drivable public streets including most service roads.
    DriveService,
    /// Everything pedestrians can use, ignoring one-way restrictions.
    Walk,
    /// Everything cyclists can use.
    Bike,
    /// All non-private ways in use.
    All,
    /// All ways in use, including private ones.
    AllPrivate,
}

impl NetworkType {
    /// All network types, in declaration order.
    pub const ALL: [NetworkType; 6] = [
        NetworkType::Drive,
        NetworkType::DriveService,
        NetworkType::Walk,
        NetworkType::Bike,
        NetworkType::All,
        NetworkType::AllPrivate,
    ];

    /// The tag conditions a way must satisfy.
    pub fn conditions(&self) -> &'static [TagCondition] {
        match self {
            NetworkType::Drive => DRIVE,
            NetworkType::DriveService => DRIVE_SERVICE,
            NetworkType::Walk => WALK,
            NetworkType::Bike => BIKE,
            NetworkType::All => ALL,
            NetworkType::AllPrivate => ALL_PRIVATE,
        }
    }

    /// Check whether a way with these tags belongs to the network.
    pub fn matches(&self, tags: &BTreeMap<String, String>) -> bool {
        self.conditions().iter().all(|c| c.matches(tags))
    }

    /// Render the filter in Overpass QL.
    pub fn to_overpass(&self) -> String {
        self.conditions()
            .iter()
            .map(TagCondition::to_overpass)
            .collect()
    }

    /// Whether every way is traversable in both directions.
    pub fn is_bidirectional(&self) -> bool {
        matches!(self, NetworkType::Walk)
    }

    /// The canonical name of the network type.
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Drive => "drive",
            NetworkType::DriveService => "drive_service",
            NetworkType::Walk => "walk",
            NetworkType::Bike => "bike",
            NetworkType::All => "all",
            NetworkType::AllPrivate => "all_private",
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkType {
    type Err = RoadnetError;

    fn from_str(s: &str) -> Result<Self> {
        NetworkType::ALL
            .into_iter()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| RoadnetError::UnknownNetworkType {
                name: s.to_string(),
            })
    }
}
