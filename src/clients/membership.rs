//! Group membership binding.
//!
//! A client holds exactly one membership row. Creation always binds the
//! batch's shared group; an update rebinds only when the payload supplies a
//! group id, otherwise the stored membership stays untouched.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Membership-scoped attributes carried alongside the group reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MembershipAttrs {
    pub role: Option<String>,
    pub is_contact_only: bool,
    pub is_responsible_for_billing: bool,
}

/// A fully specified binding: which group, with which attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct MembershipBinding {
    pub client_group_id: Uuid,
    pub attrs: MembershipAttrs,
}

impl MembershipBinding {
    /// Build the rebinding an update payload asks for. `None` when no group
    /// id was supplied, which is the "leave membership alone" case. The
    /// update surface carries no contact-only flag, so a rebound row takes
    /// the schema default.
    pub fn from_update_fields(
        client_group_id: Option<Uuid>,
        role: Option<String>,
        is_responsible_for_billing: Option<bool>,
    ) -> Option<Self> {
        client_group_id.map(|group_id| Self {
            client_group_id: group_id,
            attrs: MembershipAttrs {
                role,
                is_contact_only: false,
                is_responsible_for_billing: is_responsible_for_billing.unwrap_or(false),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::MembershipBinding;

    #[test]
    fn no_group_id_means_no_rebinding() {
        let binding =
            MembershipBinding::from_update_fields(None, Some("partner".to_string()), Some(true));
        assert!(binding.is_none());
    }

    #[test]
    fn supplied_group_id_builds_a_binding_with_defaults() {
        let group_id = Uuid::new_v4();
        let binding = MembershipBinding::from_update_fields(Some(group_id), None, None)
            .expect("binding should exist");

        assert_eq!(binding.client_group_id, group_id);
        assert_eq!(binding.attrs.role, None);
        assert!(!binding.attrs.is_contact_only);
        assert!(!binding.attrs.is_responsible_for_billing);
    }

    #[test]
    fn supplied_attrs_are_carried() {
        let group_id = Uuid::new_v4();
        let binding = MembershipBinding::from_update_fields(
            Some(group_id),
            Some("guardian".to_string()),
            Some(true),
        )
        .expect("binding should exist");

        assert_eq!(binding.attrs.role.as_deref(), Some("guardian"));
        assert!(binding.attrs.is_responsible_for_billing);
    }
}
