//! Identifiers, amounts and per-transaction context shared by every pool component

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::PoolError;
use crate::precision::BPS_DENOMINATOR;

/// Raw token or share quantity in the smallest indivisible unit
pub type Amount = u128;

/// Error returned when a hex identifier cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid 20-byte hex identifier: {0}")]
pub struct ParseIdError(pub String);

macro_rules! address_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; 20]);

        impl $name {
            pub const fn new(bytes: [u8; 20]) -> Self {
                Self(bytes)
            }

            /// Deterministic identifier with `tag` in the last byte, handy for fixtures
            pub const fn from_low_byte(tag: u8) -> Self {
                let mut bytes = [0u8; 20];
                bytes[19] = tag;
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 20] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s.strip_prefix("0x").unwrap_or(s);
                let raw = hex::decode(digits).map_err(|_| ParseIdError(s.to_string()))?;
                let bytes: [u8; 20] = raw.try_into().map_err(|_| ParseIdError(s.to_string()))?;
                Ok(Self(bytes))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

address_type!(
    /// Identifier of a tradable asset (token contract address)
    AssetId
);

address_type!(
    /// Identity of a trader, liquidity provider or the pool itself
    AccountId
);

/// Host-supplied context for a single logical transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxContext {
    pub caller: AccountId,
    /// Logical timestamp or sequence supplied by the execution environment
    pub timestamp: u64,
}

impl TxContext {
    pub fn new(caller: AccountId, timestamp: u64) -> Self {
        Self { caller, timestamp }
    }
}

/// Immutable construction parameters of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    pub asset1: AssetId,
    pub asset2: AssetId,
    /// Swap fee in basis points (30 = 0.3%)
    #[serde(default)]
    pub fee_rate_bps: u32,
}

impl PoolParams {
    pub fn new(asset1: AssetId, asset2: AssetId, fee_rate_bps: u32) -> Self {
        Self {
            asset1,
            asset2,
            fee_rate_bps,
        }
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        if self.asset1 == self.asset2 {
            return Err(PoolError::InvalidParams(format!(
                "asset identifiers must differ, both are {}",
                self.asset1
            )));
        }
        if self.fee_rate_bps as u128 >= BPS_DENOMINATOR {
            return Err(PoolError::InvalidParams(format!(
                "fee rate {} bps must be below {}",
                self.fee_rate_bps, BPS_DENOMINATOR
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_hex_roundtrip() {
        let id = AssetId::from_low_byte(0xab);
        let text = id.to_string();
        assert_eq!(text, "0x00000000000000000000000000000000000000ab");
        assert_eq!(text.parse::<AssetId>().unwrap(), id);
        assert!("0x1234".parse::<AccountId>().is_err());
        assert!("not-hex".parse::<AccountId>().is_err());
    }

    #[test]
    fn test_params_validation() {
        let a = AssetId::from_low_byte(1);
        let b = AssetId::from_low_byte(2);
        assert!(PoolParams::new(a, b, 30).validate().is_ok());
        assert!(PoolParams::new(a, a, 0).validate().is_err());
        assert!(PoolParams::new(a, b, 10_000).validate().is_err());
    }
}
