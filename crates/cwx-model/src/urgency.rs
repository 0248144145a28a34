//! Three-level notification urgency.
//!
//! External flat records carry urgency either as its 1-based ordinal
//! ("1".."3") or as its symbolic name ("HIGH"/"MEDIUM"/"LOW"); parsing
//! accepts both forms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Notification urgency, ordered highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    /// Returns the canonical symbolic name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::High => "HIGH",
            Urgency::Medium => "MEDIUM",
            Urgency::Low => "LOW",
        }
    }

    /// 1-based ordinal as encoded in delivered-notification records.
    pub fn ordinal(&self) -> u8 {
        match self {
            Urgency::High => 1,
            Urgency::Medium => 2,
            Urgency::Low => 3,
        }
    }
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Medium
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "1" | "HIGH" => Ok(Urgency::High),
            "2" | "MEDIUM" => Ok(Urgency::Medium),
            "3" | "LOW" => Ok(Urgency::Low),
            _ => Err(ModelError::InvalidUrgency(value.to_string())),
        }
    }
}
