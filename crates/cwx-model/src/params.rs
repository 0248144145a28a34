//! Extra-info parameters carried by notification records.
//!
//! Each slot is a `name=value` string; a slot without `=value` is a
//! boolean-style flag. Order is significant and preserved.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One extra-info slot from a notification record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraParam {
    pub name: String,
    /// `None` for a bare flag slot.
    pub value: Option<String>,
}

impl ExtraParam {
    /// Parses one slot. Only the first `=` splits; the value may itself
    /// contain `=`.
    pub fn parse(slot: &str) -> Self {
        match slot.split_once('=') {
            Some((name, value)) => Self {
                name: name.to_string(),
                value: Some(value.to_string()),
            },
            None => Self {
                name: slot.to_string(),
                value: None,
            },
        }
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn pair(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    pub fn is_flag(&self) -> bool {
        self.value.is_none()
    }
}

impl fmt::Display for ExtraParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={value}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Parses remainder fields into parameters, dropping empty slots.
pub fn parse_params<'a, I>(slots: I) -> Vec<ExtraParam>
where
    I: IntoIterator<Item = &'a str>,
{
    slots
        .into_iter()
        .filter(|slot| !slot.trim().is_empty())
        .map(ExtraParam::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_first_equals_only() {
        let param = ExtraParam::parse("query=a=b");
        assert_eq!(param.name, "query");
        assert_eq!(param.value.as_deref(), Some("a=b"));
    }

    #[test]
    fn bare_slot_is_flag() {
        let param = ExtraParam::parse("STAT");
        assert!(param.is_flag());
        assert_eq!(param.to_string(), "STAT");
    }

    #[test]
    fn empty_slots_are_dropped() {
        let params = parse_params(["a=1", "", "  ", "b"]);
        assert_eq!(params.len(), 2);
        assert_eq!(params[1], ExtraParam::flag("b"));
    }

    #[test]
    fn empty_value_is_not_a_flag() {
        let param = ExtraParam::parse("note=");
        assert!(!param.is_flag());
        assert_eq!(param.value.as_deref(), Some(""));
    }
}
