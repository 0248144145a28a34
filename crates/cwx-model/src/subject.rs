//! Context subjects: the "current patient / encounter / participant / user"
//! values negotiated through the shared-context engine.
//!
//! Identity is by logical id within a kind. Attribute content (names,
//! locations) never participates in identity comparison; two `PatientRef`s
//! with the same id are the same subject even if one carries a stale
//! display name.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Discriminant for subject values, used for registration-time type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectKind {
    Patient,
    Encounter,
    Participant,
    User,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Patient => "Patient",
            SubjectKind::Encounter => "Encounter",
            SubjectKind::Participant => "Participant",
            SubjectKind::User => "User",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a patient resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientRef {
    /// Logical id in the resource repository (e.g., the `123` of `Patient/123`).
    pub id: String,
    /// Display name, if known.
    pub name: Option<String>,
    /// Current location (ward/bed), if known.
    pub location: Option<String>,
}

impl PatientRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Reference to an encounter resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterRef {
    pub id: String,
    /// Display label (e.g., "2024-01-03 Cardiology"), if known.
    pub label: Option<String>,
}

impl EncounterRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Reference to an encounter participant (practitioner).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRef {
    pub id: String,
    pub name: Option<String>,
}

impl ParticipantRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// The signed-in user; a primitive id record rather than a fetched resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
}

impl UserRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Value held by a shared context: empty, or one domain entity reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subject {
    #[default]
    None,
    Patient(PatientRef),
    Encounter(EncounterRef),
    Participant(ParticipantRef),
    User(UserRef),
}

impl Subject {
    pub fn is_none(&self) -> bool {
        matches!(self, Subject::None)
    }

    /// Kind of the held entity; `None` for an empty subject.
    pub fn kind(&self) -> Option<SubjectKind> {
        match self {
            Subject::None => None,
            Subject::Patient(_) => Some(SubjectKind::Patient),
            Subject::Encounter(_) => Some(SubjectKind::Encounter),
            Subject::Participant(_) => Some(SubjectKind::Participant),
            Subject::User(_) => Some(SubjectKind::User),
        }
    }

    /// Logical id of the held entity, if any.
    pub fn logical_id(&self) -> Option<&str> {
        match self {
            Subject::None => None,
            Subject::Patient(p) => Some(&p.id),
            Subject::Encounter(e) => Some(&e.id),
            Subject::Participant(p) => Some(&p.id),
            Subject::User(u) => Some(&u.id),
        }
    }

    /// Identity comparison: same kind and same logical id.
    ///
    /// Two empty subjects are identical. Attribute content is ignored.
    pub fn same_identity(&self, other: &Subject) -> bool {
        self.kind() == other.kind() && self.logical_id() == other.logical_id()
    }

    /// Human-readable label for logs and prompts.
    pub fn display_name(&self) -> String {
        match self {
            Subject::None => "(none)".to_string(),
            Subject::Patient(p) => p.name.clone().unwrap_or_else(|| format!("Patient/{}", p.id)),
            Subject::Encounter(e) => e
                .label
                .clone()
                .unwrap_or_else(|| format!("Encounter/{}", e.id)),
            Subject::Participant(p) => p
                .name
                .clone()
                .unwrap_or_else(|| format!("Participant/{}", p.id)),
            Subject::User(u) => format!("User/{}", u.id),
        }
    }
}
