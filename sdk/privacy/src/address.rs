//! Participant addresses (account felts)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field::{FieldElement, FieldError};

/// Account address of a user, relayer or administrator
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(pub FieldElement);

impl Address {
    pub fn from_hex(raw: &str) -> Result<Self, FieldError> {
        FieldElement::from_hex(raw).map(Self)
    }

    pub fn as_field(&self) -> &FieldElement {
        &self.0
    }

    /// Zero and `0x0000…`-style placeholders are never valid callers
    pub fn is_placeholder(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<FieldElement> for Address {
    fn from(value: FieldElement) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
