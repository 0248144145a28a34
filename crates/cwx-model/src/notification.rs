//! Notification items and their external flat-record encodings.
//!
//! Two lifecycles share one item surface:
//!
//! - **Delivered** notifications are server-pushed alerts with a globally
//!   unique alert id; equality is by that id.
//! - **Scheduled** notifications are user-authored reminders with a locally
//!   unique sequence number, mutable until dispatched.
//!
//! Flat records are `|`- or `^`-delimited (auto-detected per record). A
//! delivered record carries 11 fixed fields then extra-info slots as the
//! remainder; a scheduled record carries 4 fixed fields then the remainder.

use std::hash::{Hash, Hasher};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::params::{ExtraParam, parse_params};
use crate::urgency::Urgency;

const DELIVERED_FIXED_FIELDS: usize = 11;
const SCHEDULED_FIXED_FIELDS: usize = 4;

/// Timestamp formats accepted for the delivery-date field.
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

fn split_record(record: &str) -> Vec<&str> {
    // Upstream feeds use either pipe or caret delimiting; a record never
    // mixes the two.
    let delimiter = if record.contains('|') { '|' } else { '^' };
    record.split(delimiter).collect()
}

fn parse_flag(field: &str, kind: &'static str, name: &str) -> Result<bool> {
    match field.trim() {
        "1" => Ok(true),
        "0" | "" => Ok(false),
        other => Err(ModelError::MalformedRecord {
            kind,
            detail: format!("field {name} must be 0 or 1, got {other:?}"),
        }),
    }
}

fn parse_timestamp(field: &str) -> Result<NaiveDateTime> {
    let trimmed = field.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(parsed);
        }
    }
    Err(ModelError::InvalidTimestamp(field.to_string()))
}

fn optional(field: &str) -> Option<String> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Server-pushed alert delivered to the user's inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveredNotification {
    /// Globally unique alert id; the identity of this notification.
    pub alert_id: String,
    pub urgency: Urgency,
    /// Informational items display only; non-informational ones carry a
    /// dispatchable follow-up action.
    pub info_only: bool,
    pub patient_name: Option<String>,
    pub patient_location: Option<String>,
    /// Subject display line (e.g., "Lab Result").
    pub subject_line: String,
    pub delivered_at: NaiveDateTime,
    pub sender: Option<String>,
    /// Logical id of the associated patient, if any.
    pub patient_id: Option<String>,
    /// Alert type code used to look up a dispatch handler.
    pub alert_type: String,
    pub can_delete: bool,
    pub params: Vec<ExtraParam>,
    /// Optional display body, not part of the flat record.
    #[serde(default)]
    pub message_lines: Vec<String>,
}

impl DeliveredNotification {
    /// Parses one delivered-notification flat record.
    ///
    /// Field order: priority, info-only flag, patient name, patient
    /// location, subject, delivery date, sender name, patient id, alert
    /// type, alert id, can-delete flag, then extra-info slots.
    pub fn parse(record: &str) -> Result<Self> {
        const KIND: &str = "delivered-notification";
        let fields = split_record(record);
        if fields.len() < DELIVERED_FIXED_FIELDS {
            return Err(ModelError::MalformedRecord {
                kind: KIND,
                detail: format!(
                    "expected at least {DELIVERED_FIXED_FIELDS} fields, got {}",
                    fields.len()
                ),
            });
        }
        let alert_id = fields[9].trim();
        if alert_id.is_empty() {
            return Err(ModelError::MalformedRecord {
                kind: KIND,
                detail: "empty alert id".to_string(),
            });
        }
        Ok(Self {
            urgency: fields[0].parse()?,
            info_only: parse_flag(fields[1], KIND, "info-only")?,
            patient_name: optional(fields[2]),
            patient_location: optional(fields[3]),
            subject_line: fields[4].trim().to_string(),
            delivered_at: parse_timestamp(fields[5])?,
            sender: optional(fields[6]),
            patient_id: optional(fields[7]),
            alert_type: fields[8].trim().to_string(),
            alert_id: alert_id.to_string(),
            can_delete: parse_flag(fields[10], KIND, "can-delete")?,
            params: parse_params(fields[DELIVERED_FIXED_FIELDS..].iter().copied()),
            message_lines: Vec::new(),
        })
    }

    /// An item is actionable when it is not marked information-only.
    pub fn actionable(&self) -> bool {
        !self.info_only
    }
}

impl PartialEq for DeliveredNotification {
    fn eq(&self, other: &Self) -> bool {
        self.alert_id == other.alert_id
    }
}

impl Eq for DeliveredNotification {}

impl Hash for DeliveredNotification {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.alert_id.hash(state);
    }
}

/// User-authored reminder, mutable until dispatched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledNotification {
    /// Locally unique sequence number; the identity of this notification.
    pub sequence: u64,
    pub deliver_at: NaiveDateTime,
    pub patient_name: Option<String>,
    pub subject_line: String,
    pub params: Vec<ExtraParam>,
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub message_lines: Vec<String>,
    #[serde(default)]
    dispatched: bool,
}

impl ScheduledNotification {
    /// Parses one scheduled-notification flat record.
    ///
    /// Field order: sequence id, delivery date, patient name, subject, then
    /// extra-info slots.
    pub fn parse(record: &str) -> Result<Self> {
        const KIND: &str = "scheduled-notification";
        let fields = split_record(record);
        if fields.len() < SCHEDULED_FIXED_FIELDS {
            return Err(ModelError::MalformedRecord {
                kind: KIND,
                detail: format!(
                    "expected at least {SCHEDULED_FIXED_FIELDS} fields, got {}",
                    fields.len()
                ),
            });
        }
        let sequence = fields[0]
            .trim()
            .parse::<u64>()
            .map_err(|_| ModelError::InvalidSequence(fields[0].to_string()))?;
        Ok(Self {
            sequence,
            deliver_at: parse_timestamp(fields[1])?,
            patient_name: optional(fields[2]),
            subject_line: fields[3].trim().to_string(),
            params: parse_params(fields[SCHEDULED_FIXED_FIELDS..].iter().copied()),
            patient_id: None,
            message_lines: Vec::new(),
            dispatched: false,
        })
    }

    pub fn dispatched(&self) -> bool {
        self.dispatched
    }

    /// Freezes the item; edits after dispatch are a caller error.
    pub fn mark_dispatched(&mut self) {
        self.dispatched = true;
    }
}

impl PartialEq for ScheduledNotification {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for ScheduledNotification {}

impl Hash for ScheduledNotification {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sequence.hash(state);
    }
}

/// One inbox item of either lifecycle, with a uniform accessor surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationItem {
    Delivered(DeliveredNotification),
    Scheduled(ScheduledNotification),
}

impl NotificationItem {
    pub fn urgency(&self) -> Urgency {
        match self {
            NotificationItem::Delivered(n) => n.urgency,
            // Scheduled records carry no priority field.
            NotificationItem::Scheduled(_) => Urgency::default(),
        }
    }

    pub fn actionable(&self) -> bool {
        match self {
            NotificationItem::Delivered(n) => n.actionable(),
            NotificationItem::Scheduled(_) => false,
        }
    }

    pub fn deletable(&self) -> bool {
        match self {
            NotificationItem::Delivered(n) => n.can_delete,
            // User-authored reminders are always the author's to delete.
            NotificationItem::Scheduled(_) => true,
        }
    }

    /// Logical id of the associated patient, if any.
    pub fn patient_id(&self) -> Option<&str> {
        match self {
            NotificationItem::Delivered(n) => n.patient_id.as_deref(),
            NotificationItem::Scheduled(n) => n.patient_id.as_deref(),
        }
    }

    /// Alert type code for handler lookup; scheduled items have none.
    pub fn alert_type(&self) -> Option<&str> {
        match self {
            NotificationItem::Delivered(n) => Some(&n.alert_type),
            NotificationItem::Scheduled(_) => None,
        }
    }

    pub fn subject_line(&self) -> &str {
        match self {
            NotificationItem::Delivered(n) => &n.subject_line,
            NotificationItem::Scheduled(n) => &n.subject_line,
        }
    }

    pub fn patient_name(&self) -> Option<&str> {
        match self {
            NotificationItem::Delivered(n) => n.patient_name.as_deref(),
            NotificationItem::Scheduled(n) => n.patient_name.as_deref(),
        }
    }

    pub fn sender(&self) -> Option<&str> {
        match self {
            NotificationItem::Delivered(n) => n.sender.as_deref(),
            NotificationItem::Scheduled(_) => None,
        }
    }

    pub fn delivered_at(&self) -> NaiveDateTime {
        match self {
            NotificationItem::Delivered(n) => n.delivered_at,
            NotificationItem::Scheduled(n) => n.deliver_at,
        }
    }

    pub fn params(&self) -> &[ExtraParam] {
        match self {
            NotificationItem::Delivered(n) => &n.params,
            NotificationItem::Scheduled(n) => &n.params,
        }
    }

    pub fn message_lines(&self) -> &[String] {
        match self {
            NotificationItem::Delivered(n) => &n.message_lines,
            NotificationItem::Scheduled(n) => &n.message_lines,
        }
    }

    /// Short identity string for logs.
    pub fn ident(&self) -> String {
        match self {
            NotificationItem::Delivered(n) => format!("alert {}", n.alert_id),
            NotificationItem::Scheduled(n) => format!("reminder #{}", n.sequence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivered_equality_is_by_alert_id() {
        let a = DeliveredNotification::parse(
            "1|0|Jane Doe|ICU-4|Lab Result|2024-01-01T00:00|Dr. Smith|123|LAB|A1|1|",
        )
        .unwrap();
        let mut b = a.clone();
        b.subject_line = "Different".to_string();
        assert_eq!(a, b);
        b.alert_id = "A2".to_string();
        assert_ne!(a, b);
    }

    #[test]
    fn caret_delimited_records_parse() {
        let parsed = DeliveredNotification::parse(
            "2^1^^^Med order^2024-06-05T08:30:00^^^ORD^B7^0",
        )
        .unwrap();
        assert_eq!(parsed.urgency, Urgency::Medium);
        assert!(parsed.info_only);
        assert!(parsed.patient_name.is_none());
        assert!(!parsed.can_delete);
    }

    #[test]
    fn scheduled_record_parses() {
        let parsed =
            ScheduledNotification::parse("42|2024-03-01T09:15|John Roe|Follow-up|note=call first")
                .unwrap();
        assert_eq!(parsed.sequence, 42);
        assert_eq!(parsed.subject_line, "Follow-up");
        assert_eq!(parsed.params.len(), 1);
        assert!(!parsed.dispatched());
    }

    #[test]
    fn dispatch_freezes_a_scheduled_item() {
        let mut parsed =
            ScheduledNotification::parse("42|2024-03-01T09:15|John Roe|Follow-up").unwrap();
        parsed.mark_dispatched();
        assert!(parsed.dispatched());
    }

    #[test]
    fn scheduled_bad_sequence_is_rejected() {
        let err = ScheduledNotification::parse("abc|2024-03-01T09:15|x|y").unwrap_err();
        assert!(matches!(err, ModelError::InvalidSequence(_)));
    }

    #[test]
    fn item_accessors_cover_both_lifecycles() {
        let delivered = NotificationItem::Delivered(
            DeliveredNotification::parse(
                "3|1|Jane Doe|ICU-4|Consult|2024-01-01T00:00|Dr. Smith|123|CON|C9|1",
            )
            .unwrap(),
        );
        assert_eq!(delivered.urgency(), Urgency::Low);
        assert!(!delivered.actionable());
        assert_eq!(delivered.patient_id(), Some("123"));
        assert_eq!(delivered.alert_type(), Some("CON"));

        let scheduled = NotificationItem::Scheduled(
            ScheduledNotification::parse("7|2024-03-01T09:15|John Roe|Follow-up").unwrap(),
        );
        assert_eq!(scheduled.urgency(), Urgency::Medium);
        assert!(!scheduled.actionable());
        assert!(scheduled.deletable());
        assert!(scheduled.alert_type().is_none());
    }
}
