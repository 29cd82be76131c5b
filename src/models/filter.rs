//! Active filter selections (region and VIP tier).
//!
//! Both dimensions use the literal `"all"` on the wire for "no filter".

use serde::{Deserialize, Serialize};

use super::{PlayerRecord, Region, VipTier};

/// Region dimension of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RegionFilter {
    #[default]
    All,
    Only(Region),
}

impl RegionFilter {
    pub fn matches(&self, player: &PlayerRecord) -> bool {
        match self {
            RegionFilter::All => true,
            RegionFilter::Only(region) => player.regiao == Some(*region),
        }
    }

    pub fn region(&self) -> Option<Region> {
        match self {
            RegionFilter::All => None,
            RegionFilter::Only(region) => Some(*region),
        }
    }
}

/// VIP dimension of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VipFilter {
    #[default]
    All,
    Only(VipTier),
}

impl VipFilter {
    pub fn matches(&self, player: &PlayerRecord) -> bool {
        match self {
            VipFilter::All => true,
            VipFilter::Only(tier) => player.nivel_vip == Some(*tier),
        }
    }

    pub fn tier(&self) -> Option<VipTier> {
        match self {
            VipFilter::All => None,
            VipFilter::Only(tier) => Some(*tier),
        }
    }
}

impl std::fmt::Display for RegionFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionFilter::All => write!(f, "all"),
            RegionFilter::Only(region) => write!(f, "{}", region),
        }
    }
}

impl std::fmt::Display for VipFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VipFilter::All => write!(f, "all"),
            VipFilter::Only(tier) => write!(f, "{}", tier),
        }
    }
}

impl std::str::FromStr for RegionFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(RegionFilter::All)
        } else {
            s.parse().map(RegionFilter::Only)
        }
    }
}

impl std::str::FromStr for VipFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(VipFilter::All)
        } else {
            s.parse().map(VipFilter::Only)
        }
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                // Accept numbers too: `"vip": 3` is as common as `"vip": "3"`
                let value = serde_json::Value::deserialize(deserializer)?;
                let text = match value {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Number(n) => n.to_string(),
                    serde_json::Value::Null => "all".to_string(),
                    other => {
                        return Err(serde::de::Error::custom(format!(
                            "invalid filter value: {}",
                            other
                        )))
                    }
                };
                text.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(RegionFilter);
string_serde!(VipFilter);

/// Combined region AND VIP selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FilterSelection {
    #[serde(default)]
    pub regiao: RegionFilter,
    #[serde(default)]
    pub vip: VipFilter,
}

impl FilterSelection {
    pub fn new(regiao: RegionFilter, vip: VipFilter) -> Self {
        Self { regiao, vip }
    }

    /// No filter on either dimension.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_unfiltered(&self) -> bool {
        self.regiao == RegionFilter::All && self.vip == VipFilter::All
    }

    pub fn matches(&self, player: &PlayerRecord) -> bool {
        self.regiao.matches(player) && self.vip.matches(player)
    }
}
