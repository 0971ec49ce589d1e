//! Action Domains
//!
//! Every proof is generated for exactly one action family. The family tag
//! is the first public input, so a proof produced for one family cannot
//! be replayed under another.
//!
//! | domain       | tag | class      |
//! |--------------|-----|------------|
//! | deposit      | 1   | Deposit    |
//! | withdraw     | 2   | Redemption |
//! | stake        | 3   | Spend      |
//! | governance   | 4   | Spend      |
//! | swap         | 5   | Spend      |
//! | limit_order  | 6   | Spend      |
//! | payment      | 7   | Spend      |
//! | dark_pool    | 8   | Spend      |
//! | btc_swap     | 9   | Spend      |
//!
//! Tags are part of the proving statement. Never renumber them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::field::FieldElement;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action domain {0:?}")]
pub struct UnknownDomain(pub String);

/// Action family a proof is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionDomain {
    Deposit,
    Withdraw,
    Stake,
    Governance,
    Swap,
    LimitOrder,
    Payment,
    DarkPool,
    BtcSwap,
}

/// How an action affects the note set of the pool version it targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionClass {
    /// Brings new value into the pool
    Deposit,
    /// Spends notes and re-creates them inside the pool
    Spend,
    /// Takes value out of the pool
    Redemption,
}

impl ActionDomain {
    pub const ALL: [ActionDomain; 9] = [
        ActionDomain::Deposit,
        ActionDomain::Withdraw,
        ActionDomain::Stake,
        ActionDomain::Governance,
        ActionDomain::Swap,
        ActionDomain::LimitOrder,
        ActionDomain::Payment,
        ActionDomain::DarkPool,
        ActionDomain::BtcSwap,
    ];

    pub fn tag(self) -> u64 {
        match self {
            Self::Deposit => 1,
            Self::Withdraw => 2,
            Self::Stake => 3,
            Self::Governance => 4,
            Self::Swap => 5,
            Self::LimitOrder => 6,
            Self::Payment => 7,
            Self::DarkPool => 8,
            Self::BtcSwap => 9,
        }
    }

    /// The tag as it appears in a public-input vector
    pub fn tag_field(self) -> FieldElement {
        FieldElement::from_u64(self.tag())
    }

    pub fn from_tag(tag: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.tag() == tag)
    }

    pub fn from_field(value: &FieldElement) -> Option<Self> {
        value.to_u64().and_then(Self::from_tag)
    }

    pub fn class(self) -> ActionClass {
        match self {
            Self::Deposit => ActionClass::Deposit,
            Self::Withdraw => ActionClass::Redemption,
            _ => ActionClass::Spend,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
            Self::Stake => "stake",
            Self::Governance => "governance",
            Self::Swap => "swap",
            Self::LimitOrder => "limit_order",
            Self::Payment => "payment",
            Self::DarkPool => "dark_pool",
            Self::BtcSwap => "btc_swap",
        }
    }
}

impl fmt::Display for ActionDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionDomain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "deposit" => Ok(Self::Deposit),
            "withdraw" | "redeem" => Ok(Self::Withdraw),
            "stake" => Ok(Self::Stake),
            "governance" | "vote" => Ok(Self::Governance),
            "swap" => Ok(Self::Swap),
            "limit_order" | "limit" => Ok(Self::LimitOrder),
            "payment" => Ok(Self::Payment),
            "dark_pool" => Ok(Self::DarkPool),
            "btc_swap" => Ok(Self::BtcSwap),
            _ => Err(UnknownDomain(s.to_string())),
        }
    }
}
