use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// License sold at checkout, priced as a multiple of the base price
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseTier {
    #[default]
    Basic,
    Pro,
    Unlimited,
}

impl LicenseTier {
    /// Tier price for a base price
    ///
    /// Prices are whole currency units. Pro is 2.5x the base and an odd base
    /// loses the half unit (3 -> 7); even bases are exact.
    pub fn price_for(&self, base_price: u64) -> u64 {
        match self {
            LicenseTier::Basic => base_price,
            LicenseTier::Pro => base_price.saturating_mul(5) / 2,
            LicenseTier::Unlimited => base_price.saturating_mul(5),
        }
    }
}

impl Display for LicenseTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LicenseTier::Basic => write!(f, "Basic"),
            LicenseTier::Pro => write!(f, "Pro"),
            LicenseTier::Unlimited => write!(f, "Unlimited"),
        }
    }
}
