//! Scheduling priority assignment for inventory items.
//!
//! Priority is a function of the payload `type` discriminant and, for
//! `need_help`, its `urgency`. Higher sorts first in both inventory
//! truncation and want-selection.

use dmesh_proto::{PayloadContent, Urgency};

/// Assign a 0-5 scheduling priority to a payload:
///
/// ```text
/// 5: medical, or need_help with urgency critical
/// 4: need_help with urgency high
/// 3: shelter_info, supplies
/// 2: im_safe
/// 1: text
/// 0: bulk / unknown
/// ```
#[must_use]
pub fn priority_of(content: &PayloadContent) -> u8 {
    match content {
        PayloadContent::Medical { .. } => 5,
        PayloadContent::NeedHelp { urgency: Urgency::Critical, .. } => 5,
        PayloadContent::NeedHelp { urgency: Urgency::High, .. } => 4,
        PayloadContent::NeedHelp { .. } => 3,
        PayloadContent::ShelterInfo { .. } | PayloadContent::Supplies { .. } => 3,
        PayloadContent::ImSafe { .. } => 2,
        PayloadContent::Text { .. } => 1,
        PayloadContent::Ack { .. } => 0,
    }
}

/// Assign a priority directly from the wire `type` discriminant and an
/// optional urgency string, for callers that only have the denormalized
/// `payload_type` column (e.g. [`dmesh_store::InboxEntry`]/
/// [`dmesh_store::OutboxEntry`]) rather than the full decoded payload.
#[must_use]
pub fn priority_of_type(payload_type: &str, urgency: Option<&str>) -> u8 {
    match payload_type {
        "medical" => 5,
        "need_help" => match urgency {
            Some("critical") => 5,
            Some("high") => 4,
            _ => 3,
        },
        "shelter_info" | "supplies" => 3,
        "im_safe" => 2,
        "text" => 1,
        _ => 0,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn medical_is_highest_priority() {
        let content = PayloadContent::Medical {
            urgency: Urgency::Low,
            conditions: vec![],
            people: 1,
        };
        assert_eq!(priority_of(&content), 5);
    }

    #[test]
    fn need_help_scales_with_urgency() {
        let critical =
            PayloadContent::NeedHelp { urgency: Urgency::Critical, people: None, needs: None };
        let high = PayloadContent::NeedHelp { urgency: Urgency::High, people: None, needs: None };
        let medium =
            PayloadContent::NeedHelp { urgency: Urgency::Medium, people: None, needs: None };
        assert_eq!(priority_of(&critical), 5);
        assert_eq!(priority_of(&high), 4);
        assert_eq!(priority_of(&medium), 3);
    }

    #[test]
    fn shelter_and_supplies_share_priority() {
        let shelter = PayloadContent::ShelterInfo { location: "x".to_string(), capacity: None, resources: None };
        let supplies = PayloadContent::Supplies { resources: vec![], location: None };
        assert_eq!(priority_of(&shelter), 3);
        assert_eq!(priority_of(&supplies), 3);
    }

    #[test]
    fn text_is_the_default_low_priority() {
        assert_eq!(priority_of(&PayloadContent::Text { content: String::new() }), 1);
    }

    #[test]
    fn ack_is_bulk_priority() {
        assert_eq!(priority_of(&PayloadContent::Ack { ref_msg_id: "x".to_string() }), 0);
    }

    #[test]
    fn type_name_mapping_matches_full_payload_mapping() {
        assert_eq!(priority_of_type("medical", None), 5);
        assert_eq!(priority_of_type("need_help", Some("critical")), 5);
        assert_eq!(priority_of_type("need_help", Some("high")), 4);
        assert_eq!(priority_of_type("need_help", None), 3);
        assert_eq!(priority_of_type("im_safe", None), 2);
        assert_eq!(priority_of_type("text", None), 1);
        assert_eq!(priority_of_type("bulk", None), 0);
    }
}
