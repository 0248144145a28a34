//! Cross-process context handoff.
//!
//! A subject is flattened to an ordered key/value [`ContextMap`] for
//! interop with an external desktop shell and for building external
//! application launch URLs. Patient and user subjects round-trip well
//! enough to re-resolve the same logical id in-process; the encounter and
//! participant serializers were never finished upstream and are surfaced
//! as an explicitly unsupported capability rather than an invented schema.

use cwx_model::{ContextMap, PatientRef, Subject, SubjectKind, UserRef};
use url::form_urlencoded;

use crate::error::{ContextError, Result};

/// Well-known handoff map keys.
pub mod keys {
    pub const PATIENT_ID: &str = "patient.id";
    pub const PATIENT_NAME: &str = "patient.name";
    pub const PATIENT_LOCATION: &str = "patient.location";
    pub const USER_ID: &str = "user.id";
    /// Final key of every launch URL: the resource-repository base URL.
    pub const REPOSITORY_URL: &str = "repository.url";
}

/// Flattens a subject for handoff.
pub fn to_context_map(subject: &Subject) -> Result<ContextMap> {
    let mut map = ContextMap::new();
    match subject {
        Subject::None => {}
        Subject::Patient(patient) => {
            map.put(keys::PATIENT_ID, &patient.id);
            if let Some(name) = &patient.name {
                map.put(keys::PATIENT_NAME, name);
            }
            if let Some(location) = &patient.location {
                map.put(keys::PATIENT_LOCATION, location);
            }
        }
        Subject::User(user) => {
            map.put(keys::USER_ID, &user.id);
        }
        Subject::Encounter(_) => {
            return Err(ContextError::UnsupportedHandoff(SubjectKind::Encounter));
        }
        Subject::Participant(_) => {
            return Err(ContextError::UnsupportedHandoff(SubjectKind::Participant));
        }
    }
    Ok(map)
}

/// Reconstructs a subject of the given kind from a handoff map.
///
/// An empty map yields an empty subject for any supported kind.
pub fn from_context_map(kind: SubjectKind, map: &ContextMap) -> Result<Subject> {
    match kind {
        SubjectKind::Patient => {
            if map.is_empty() {
                return Ok(Subject::None);
            }
            let id = map
                .get(keys::PATIENT_ID)
                .ok_or(ContextError::MalformedHandoff(keys::PATIENT_ID))?;
            Ok(Subject::Patient(PatientRef {
                id: id.to_string(),
                name: map.get(keys::PATIENT_NAME).map(str::to_string),
                location: map.get(keys::PATIENT_LOCATION).map(str::to_string),
            }))
        }
        SubjectKind::User => {
            if map.is_empty() {
                return Ok(Subject::None);
            }
            let id = map
                .get(keys::USER_ID)
                .ok_or(ContextError::MalformedHandoff(keys::USER_ID))?;
            Ok(Subject::User(UserRef::new(id)))
        }
        SubjectKind::Encounter | SubjectKind::Participant => {
            Err(ContextError::UnsupportedHandoff(kind))
        }
    }
}

/// Builds an external application launch URL.
///
/// Map entries become percent-encoded `key=value` pairs joined by `&`, in
/// map order, with [`keys::REPOSITORY_URL`] appended last carrying the
/// resource-repository base URL.
pub fn launch_url(base: &str, map: &ContextMap, repository_url: &str) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, value) in map.iter() {
        query.append_pair(key, value);
    }
    query.append_pair(keys::REPOSITORY_URL, repository_url);
    format!("{base}?{}", query.finish())
}
