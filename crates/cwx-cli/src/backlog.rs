//! Record-file ingestion and the in-memory patient lookup used by the
//! `drain` command.

use std::collections::BTreeMap;

use cwx_context::{FetchError, ResourceFetcher};
use cwx_model::{
    DeliveredNotification, NotificationItem, PatientRef, ScheduledNotification, Subject,
    SubjectKind,
};

/// Record lifecycle selected for parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Delivered,
    Scheduled,
}

/// Result of parsing a record file: the items that parsed plus the
/// 1-based line numbers and messages of the lines that did not.
#[derive(Debug)]
pub struct ParseReport {
    pub items: Vec<NotificationItem>,
    pub failures: Vec<(usize, String)>,
}

impl ParseReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Parses one flat record per non-empty line.
pub fn parse_lines(content: &str, kind: RecordKind) -> ParseReport {
    let mut items = Vec::new();
    let mut failures = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed = match kind {
            RecordKind::Delivered => {
                DeliveredNotification::parse(line).map(NotificationItem::Delivered)
            }
            RecordKind::Scheduled => {
                ScheduledNotification::parse(line).map(NotificationItem::Scheduled)
            }
        };
        match parsed {
            Ok(item) => items.push(item),
            Err(error) => failures.push((index + 1, error.to_string())),
        }
    }
    ParseReport { items, failures }
}

/// Resolves patient ids against the identifying fields carried by the
/// backlog itself, standing in for a resource repository lookup.
pub struct BacklogFetcher {
    patients: BTreeMap<String, PatientRef>,
}

impl BacklogFetcher {
    pub fn from_items(items: &[NotificationItem]) -> Self {
        let mut patients = BTreeMap::new();
        for item in items {
            if let Some(id) = item.patient_id() {
                patients.entry(id.to_string()).or_insert_with(|| PatientRef {
                    id: id.to_string(),
                    name: item.patient_name().map(str::to_string),
                    ..PatientRef::default()
                });
            }
        }
        Self { patients }
    }
}

impl ResourceFetcher for BacklogFetcher {
    fn fetch_by_id(
        &self,
        kind: SubjectKind,
        id: &str,
    ) -> std::result::Result<Subject, FetchError> {
        if kind != SubjectKind::Patient {
            return Err(FetchError::Backend(format!(
                "backlog fetcher only resolves patients, not {kind}"
            )));
        }
        self.patients
            .get(id)
            .cloned()
            .map(Subject::Patient)
            .ok_or_else(|| FetchError::NotFound {
                kind,
                id: id.to_string(),
            })
    }
}
