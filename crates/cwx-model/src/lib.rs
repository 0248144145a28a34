pub mod context_map;
pub mod error;
pub mod notification;
pub mod params;
pub mod subject;
pub mod urgency;

pub use context_map::ContextMap;
pub use error::{ModelError, Result};
pub use notification::{DeliveredNotification, NotificationItem, ScheduledNotification};
pub use params::ExtraParam;
pub use subject::{
    EncounterRef, ParticipantRef, PatientRef, Subject, SubjectKind, UserRef,
};
pub use urgency::Urgency;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_serializes() {
        let item = NotificationItem::Delivered(
            DeliveredNotification::parse(
                "1|0|Jane Doe|ICU-4|Lab Result|2024-01-01T00:00|Dr. Smith|123|LAB|A1|1|",
            )
            .expect("parse record"),
        );
        let json = serde_json::to_string(&item).expect("serialize item");
        let round: NotificationItem = serde_json::from_str(&json).expect("deserialize item");
        assert_eq!(round, item);
        assert_eq!(round.subject_line(), "Lab Result");
    }

    #[test]
    fn subject_serializes() {
        let subject = Subject::Patient(PatientRef {
            id: "123".to_string(),
            name: Some("Jane Doe".to_string()),
            location: Some("ICU-4".to_string()),
        });
        let json = serde_json::to_string(&subject).expect("serialize subject");
        let round: Subject = serde_json::from_str(&json).expect("deserialize subject");
        assert!(round.same_identity(&subject));
    }
}
