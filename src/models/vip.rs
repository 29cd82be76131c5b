//! VIP tier model and static tier display metadata.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Display metadata for a VIP tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VipTierInfo {
    pub level: u8,
    pub name: &'static str,
    pub color: &'static str,
    pub icon: &'static str,
}

/// Static lookup table for tiers 1 through 5.
pub const VIP_TIERS: [VipTierInfo; 5] = [
    VipTierInfo {
        level: 1,
        name: "Ametista",
        color: "#9B59B6",
        icon: "💎",
    },
    VipTierInfo {
        level: 2,
        name: "Topázio",
        color: "#F39C12",
        icon: "💠",
    },
    VipTierInfo {
        level: 3,
        name: "Esmeralda",
        color: "#27AE60",
        icon: "🔷",
    },
    VipTierInfo {
        level: 4,
        name: "Opala",
        color: "#E74C3C",
        icon: "🔶",
    },
    VipTierInfo {
        level: 5,
        name: "Berilo",
        color: "#3498DB",
        icon: "👑",
    },
];

/// A VIP loyalty tier (1 to 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct VipTier(u8);

impl VipTier {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Create a tier, returning `None` outside 1..=5.
    pub fn new(level: u8) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Some(Self(level))
        } else {
            None
        }
    }

    /// All tiers in ascending order.
    pub fn all() -> impl Iterator<Item = VipTier> {
        (Self::MIN..=Self::MAX).map(VipTier)
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    /// Key used in `analise_vip` maps (e.g. "vip_3").
    pub fn key(&self) -> String {
        format!("vip_{}", self.0)
    }

    pub fn info(&self) -> &'static VipTierInfo {
        &VIP_TIERS[(self.0 - Self::MIN) as usize]
    }

    /// Coerce a loosely-typed upstream value into a tier.
    ///
    /// Accepts integers, integral floats (`3.0`) and numeric strings (`"3"`).
    /// Anything else, including out-of-range levels, means "no tier".
    pub fn from_json(value: &Value) -> Option<Self> {
        let level = match value {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };

        if level.fract() != 0.0 || level < Self::MIN as f64 || level > Self::MAX as f64 {
            return None;
        }

        Self::new(level as u8)
    }
}

impl TryFrom<u8> for VipTier {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        VipTier::new(level).ok_or_else(|| format!("VIP level out of range: {}", level))
    }
}

impl From<VipTier> for u8 {
    fn from(tier: VipTier) -> Self {
        tier.0
    }
}

impl std::fmt::Display for VipTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for VipTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VipTier::from_json(&Value::String(s.to_string()))
            .ok_or_else(|| format!("Invalid VIP level: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vip_tier_bounds() {
        assert!(VipTier::new(0).is_none());
        assert!(VipTier::new(1).is_some());
        assert!(VipTier::new(5).is_some());
        assert!(VipTier::new(6).is_none());
    }

    #[test]
    fn test_vip_tier_from_json() {
        assert_eq!(VipTier::from_json(&json!(3)), VipTier::new(3));
        assert_eq!(VipTier::from_json(&json!(3.0)), VipTier::new(3));
        assert_eq!(VipTier::from_json(&json!("4")), VipTier::new(4));
        assert_eq!(VipTier::from_json(&json!(" 2 ")), VipTier::new(2));
        assert_eq!(VipTier::from_json(&json!(2.5)), None);
        assert_eq!(VipTier::from_json(&json!(9)), None);
        assert_eq!(VipTier::from_json(&json!(null)), None);
        assert_eq!(VipTier::from_json(&json!("gold")), None);
    }

    #[test]
    fn test_vip_tier_info() {
        let tier = VipTier::new(3).unwrap();
        assert_eq!(tier.info().name, "Esmeralda");
        assert_eq!(tier.key(), "vip_3");
        assert_eq!(VipTier::new(5).unwrap().info().icon, "👑");
    }

    #[test]
    fn test_vip_tier_all() {
        let levels: Vec<u8> = VipTier::all().map(|t| t.level()).collect();
        assert_eq!(levels, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_vip_tier_serialization() {
        let tier = VipTier::new(2).unwrap();
        assert_eq!(serde_json::to_string(&tier).unwrap(), "2");
        assert!(serde_json::from_str::<VipTier>("7").is_err());
    }
}
