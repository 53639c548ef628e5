//! Contact collection reconciliation.
//!
//! Turns the raw `emails` / `phones` arrays of a request into the exact rows
//! to persist: blank values are dropped, and the first surviving entry of
//! each channel carries the primary flag. Pure, no I/O.

use serde::{Deserialize, Serialize};

use crate::db::ContactChannel;

/// One contact entry as supplied by a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactEntry {
    #[serde(default)]
    pub value: String,
    /// Subtype such as "home" / "work" / "mobile"; wire key `type`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
}

/// A reconciled contact row ready for insertion, minus ids.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactMethodSeed {
    pub contact_type: ContactChannel,
    pub kind: Option<String>,
    pub value: String,
    pub permission: Option<String>,
    pub is_primary: bool,
    pub sort_order: i32,
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Reconcile one channel: drop blank values, keep input order, flag the
/// first survivor as primary. A channel with zero survivors contributes
/// zero rows rather than a primary-less placeholder.
pub fn reconcile_channel(
    channel: ContactChannel,
    entries: &[ContactEntry],
) -> Vec<ContactMethodSeed> {
    let mut rows = Vec::new();
    for entry in entries {
        if is_blank(&entry.value) {
            continue;
        }
        let sort_order = rows.len() as i32;
        rows.push(ContactMethodSeed {
            contact_type: channel,
            kind: entry.kind.clone(),
            value: entry.value.clone(),
            permission: entry.permission.clone(),
            is_primary: sort_order == 0,
            sort_order,
        });
    }
    rows
}

/// Reconcile both channels into the flat list a create inserts.
pub fn reconcile_contact_methods(
    emails: &[ContactEntry],
    phones: &[ContactEntry],
) -> Vec<ContactMethodSeed> {
    let mut rows = reconcile_channel(ContactChannel::Email, emails);
    rows.extend(reconcile_channel(ContactChannel::Phone, phones));
    rows
}

#[cfg(test)]
mod tests {
    use crate::db::ContactChannel;

    use super::{ContactEntry, reconcile_channel, reconcile_contact_methods};

    fn entry(value: &str) -> ContactEntry {
        ContactEntry {
            value: value.to_string(),
            kind: None,
            permission: None,
        }
    }

    #[test]
    fn first_entry_of_a_channel_is_primary() {
        let rows = reconcile_channel(
            ContactChannel::Email,
            &[entry("a@x.com"), entry("b@x.com"), entry("c@x.com")],
        );

        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_primary);
        assert!(!rows[1].is_primary);
        assert!(!rows[2].is_primary);
        assert_eq!(rows.iter().filter(|r| r.is_primary).count(), 1);
    }

    #[test]
    fn blank_entries_are_dropped_before_primary_assignment() {
        let rows = reconcile_channel(
            ContactChannel::Phone,
            &[entry("   "), entry(""), entry("555-0101"), entry("555-0102")],
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].value, "555-0101");
        assert!(rows[0].is_primary);
        assert_eq!(rows[0].sort_order, 0);
        assert_eq!(rows[1].sort_order, 1);
    }

    #[test]
    fn all_blank_channel_produces_no_rows() {
        let rows = reconcile_channel(ContactChannel::Email, &[entry(""), entry("  ")]);
        assert!(rows.is_empty());
    }

    #[test]
    fn channels_are_reconciled_independently() {
        let rows = reconcile_contact_methods(
            &[entry(""), entry("")],
            &[entry("555-0101")],
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].contact_type, ContactChannel::Phone);
        assert!(rows[0].is_primary);
    }

    #[test]
    fn combined_list_keeps_one_primary_per_channel() {
        let rows = reconcile_contact_methods(
            &[entry("a@x.com"), entry("b@x.com")],
            &[entry("555-0101"), entry("555-0102")],
        );

        let email_primaries = rows
            .iter()
            .filter(|r| r.contact_type == ContactChannel::Email && r.is_primary)
            .count();
        let phone_primaries = rows
            .iter()
            .filter(|r| r.contact_type == ContactChannel::Phone && r.is_primary)
            .count();
        assert_eq!(email_primaries, 1);
        assert_eq!(phone_primaries, 1);
    }

    #[test]
    fn entry_metadata_is_carried_through() {
        let rows = reconcile_channel(
            ContactChannel::Email,
            &[ContactEntry {
                value: "home@x.com".to_string(),
                kind: Some("home".to_string()),
                permission: Some("NO_CONTACT".to_string()),
            }],
        );

        assert_eq!(rows[0].kind.as_deref(), Some("home"));
        assert_eq!(rows[0].permission.as_deref(), Some("NO_CONTACT"));
    }

    #[test]
    fn contact_entry_reads_wire_type_key() {
        let parsed: ContactEntry =
            serde_json::from_str(r#"{"value":"a@x.com","type":"work","permission":"ALLOWED"}"#)
                .expect("entry should parse");
        assert_eq!(parsed.kind.as_deref(), Some("work"));
    }
}
