//! Inbound payload validation and normalization.
//!
//! Create requests arrive as a bag of `client1`, `client2`, ... entries plus
//! a shared `clientGroupId` (multi-person intake, e.g. a couple, in one
//! call). Update requests are a single flat object. This module turns both
//! into the typed params the stores consume, before anything touches
//! storage.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::clients::contacts::ContactEntry;
use crate::clients::membership::{MembershipAttrs, MembershipBinding};
use crate::clients::reminders::ReminderToggles;
use crate::db::{ClientStatus, CreateClientBatch, CreateClientParams, Patch, UpdateClientParams};

/// Rejections raised before any persistence. All map to 400 at the boundary.
#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("request must include at least one valid client entry")]
    NoClientEntries,

    #[error("'clientGroupId' is required")]
    MissingGroupId,

    #[error("'{field}' is required")]
    MissingField { field: &'static str },

    #[error("'{field}' is not a valid id")]
    InvalidId { field: &'static str },

    #[error("unknown status '{0}'")]
    UnknownStatus(String),

    #[error("'{key}' could not be read: {message}")]
    MalformedEntry { key: String, message: String },
}

/// Wire shape of one `clientN` entry in a create request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientEntryPayload {
    pub legal_first_name: Option<String>,
    pub legal_last_name: Option<String>,
    pub preferred_name: Option<String>,
    pub dob: Option<String>,
    pub status: Option<String>,
    pub primary_clinician_id: Option<String>,
    pub location_id: Option<String>,
    pub role: Option<String>,
    pub is_contact_only: Option<bool>,
    pub is_responsible_for_billing: Option<bool>,
    pub emails: Option<Vec<ContactEntry>>,
    pub phones: Option<Vec<ContactEntry>>,
    pub notification_options: Option<ReminderToggles>,
}

/// Field-present deserializer for `Option<Option<T>>` scalars: an explicit
/// `null` becomes `Some(None)` ("set to null") instead of collapsing into
/// the absent case the way a bare nested `Option` would.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Wire shape of an update request body.
///
/// Scalar tri-state fields are `Option<Option<T>>`: an absent key is the
/// outer `None` (leave alone), an explicit `null` is `Some(None)` (set to
/// null). Collection fields become [`Patch`] values, so absent and empty
/// stay distinguishable all the way down.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateClientPayload {
    pub id: Option<String>,
    pub legal_first_name: Option<String>,
    pub legal_last_name: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub preferred_name: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub dob: Option<Option<String>>,
    pub status: Option<String>,
    #[serde(deserialize_with = "double_option")]
    pub primary_clinician_id: Option<Option<String>>,
    #[serde(deserialize_with = "double_option")]
    pub location_id: Option<Option<String>>,
    pub client_group_id: Option<String>,
    pub role: Option<String>,
    pub is_responsible_for_billing: Option<bool>,
    pub emails: Option<Vec<ContactEntry>>,
    pub phones: Option<Vec<ContactEntry>>,
    pub notification_options: Option<ReminderToggles>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_id(field: &'static str, raw: &str) -> Result<Uuid, PayloadError> {
    Uuid::parse_str(raw.trim()).map_err(|_| PayloadError::InvalidId { field })
}

/// Lenient date-of-birth parsing: anything that is not `YYYY-MM-DD`
/// normalizes to null rather than failing the request.
fn parse_dob(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

fn parse_status(raw: Option<&str>) -> Result<Option<ClientStatus>, PayloadError> {
    match non_blank(raw) {
        None => Ok(None),
        Some(value) => ClientStatus::from_payload(value)
            .map(Some)
            .ok_or_else(|| PayloadError::UnknownStatus(value.to_string())),
    }
}

/// `clientN` keys of the request bag, in ascending numeric order of the
/// suffix. Callers write the entries in that order, so it is the input
/// order the response array mirrors.
fn client_entry_keys(entries: &serde_json::Map<String, Value>) -> Vec<&String> {
    let mut keyed: Vec<(u32, &String)> = entries
        .keys()
        .filter_map(|key| {
            let suffix = key.strip_prefix("client")?;
            let n: u32 = suffix.parse().ok()?;
            Some((n, key))
        })
        .collect();
    keyed.sort_by_key(|(n, _)| *n);
    keyed.into_iter().map(|(_, key)| key).collect()
}

/// Normalize one entry. `Ok(None)` skips an entry that lacks the minimum
/// identifying fields; hard errors reject the whole request.
fn normalize_entry(key: &str, raw: &Value) -> Result<Option<CreateClientParams>, PayloadError> {
    let entry: ClientEntryPayload =
        serde_json::from_value(raw.clone()).map_err(|e| PayloadError::MalformedEntry {
            key: key.to_string(),
            message: e.to_string(),
        })?;

    let Some(first) = non_blank(entry.legal_first_name.as_deref()) else {
        warn!(entry = key, "skipping client entry without legalFirstName");
        return Ok(None);
    };
    let Some(last) = non_blank(entry.legal_last_name.as_deref()) else {
        warn!(entry = key, "skipping client entry without legalLastName");
        return Ok(None);
    };

    let status = parse_status(entry.status.as_deref())?.unwrap_or(ClientStatus::Active);
    let primary_clinician_id = non_blank(entry.primary_clinician_id.as_deref())
        .map(|raw| parse_id("primaryClinicianId", raw))
        .transpose()?;
    let primary_location_id = non_blank(entry.location_id.as_deref())
        .map(|raw| parse_id("locationId", raw))
        .transpose()?;

    Ok(Some(CreateClientParams {
        legal_first_name: first.to_string(),
        legal_last_name: last.to_string(),
        preferred_name: entry.preferred_name.clone(),
        date_of_birth: entry.dob.as_deref().and_then(parse_dob),
        status,
        primary_clinician_id,
        primary_location_id,
        membership: MembershipAttrs {
            role: entry.role.clone(),
            is_contact_only: entry.is_contact_only.unwrap_or(false),
            is_responsible_for_billing: entry.is_responsible_for_billing.unwrap_or(false),
        },
        emails: entry.emails.unwrap_or_default(),
        phones: entry.phones.unwrap_or_default(),
        notification_options: entry.notification_options.unwrap_or_default(),
    }))
}

/// Validate a create request bag into a batch ready for the store.
pub fn normalize_create(
    client_group_id: Option<&str>,
    entries: &serde_json::Map<String, Value>,
) -> Result<CreateClientBatch, PayloadError> {
    let mut clients = Vec::new();
    for key in client_entry_keys(entries) {
        if let Some(params) = normalize_entry(key, &entries[key])? {
            clients.push(params);
        }
    }
    if clients.is_empty() {
        return Err(PayloadError::NoClientEntries);
    }

    let group_raw = non_blank(client_group_id).ok_or(PayloadError::MissingGroupId)?;
    let client_group_id = parse_id("clientGroupId", group_raw)?;

    Ok(CreateClientBatch {
        client_group_id,
        clients,
    })
}

/// Validate an update request into the target id plus typed params.
pub fn normalize_update(
    payload: UpdateClientPayload,
) -> Result<(Uuid, UpdateClientParams), PayloadError> {
    let id_raw = non_blank(payload.id.as_deref()).ok_or(PayloadError::MissingField { field: "id" })?;
    let client_id = parse_id("id", id_raw)?;

    let legal_first_name = non_blank(payload.legal_first_name.as_deref())
        .ok_or(PayloadError::MissingField {
            field: "legalFirstName",
        })?
        .to_string();
    let legal_last_name = non_blank(payload.legal_last_name.as_deref())
        .ok_or(PayloadError::MissingField {
            field: "legalLastName",
        })?
        .to_string();
    let status = parse_status(payload.status.as_deref())?
        .ok_or(PayloadError::MissingField { field: "status" })?;

    let date_of_birth = payload
        .dob
        .map(|inner| inner.as_deref().and_then(parse_dob));
    let primary_clinician_id = match payload.primary_clinician_id {
        None => None,
        Some(None) => Some(None),
        Some(Some(raw)) => Some(Some(parse_id("primaryClinicianId", &raw)?)),
    };
    let primary_location_id = match payload.location_id {
        None => None,
        Some(None) => Some(None),
        Some(Some(raw)) => Some(Some(parse_id("locationId", &raw)?)),
    };

    let group_id = non_blank(payload.client_group_id.as_deref())
        .map(|raw| parse_id("clientGroupId", raw))
        .transpose()?;
    let membership = Patch::from_option(MembershipBinding::from_update_fields(
        group_id,
        payload.role.clone(),
        payload.is_responsible_for_billing,
    ));

    Ok((
        client_id,
        UpdateClientParams {
            legal_first_name,
            legal_last_name,
            status,
            preferred_name: payload.preferred_name,
            date_of_birth,
            primary_clinician_id,
            primary_location_id,
            membership,
            emails: Patch::from_option(payload.emails),
            phones: Patch::from_option(payload.phones),
            notification_options: Patch::from_option(payload.notification_options),
        },
    ))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;
    use uuid::Uuid;

    use crate::db::{ClientStatus, Patch};

    use super::{PayloadError, UpdateClientPayload, normalize_create, normalize_update};

    fn bag(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().expect("object").clone()
    }

    #[test]
    fn create_with_no_client_keys_is_rejected() {
        let err = normalize_create(Some(&Uuid::new_v4().to_string()), &bag(json!({})))
            .expect_err("must reject");
        assert_eq!(err, PayloadError::NoClientEntries);
    }

    #[test]
    fn create_requires_a_group_id() {
        let entries = bag(json!({
            "client1": {"legalFirstName": "John", "legalLastName": "Doe"}
        }));
        let err = normalize_create(None, &entries).expect_err("must reject");
        assert_eq!(err, PayloadError::MissingGroupId);

        let err = normalize_create(Some("   "), &entries).expect_err("must reject");
        assert_eq!(err, PayloadError::MissingGroupId);
    }

    #[test]
    fn create_skips_entries_missing_legal_names_but_keeps_the_rest() {
        let group = Uuid::new_v4();
        let entries = bag(json!({
            "client1": {"legalFirstName": "   ", "legalLastName": "Doe"},
            "client2": {"legalFirstName": "Jane", "legalLastName": "Doe"}
        }));

        let batch = normalize_create(Some(&group.to_string()), &entries).expect("batch");
        assert_eq!(batch.clients.len(), 1);
        assert_eq!(batch.clients[0].legal_first_name, "Jane");
        assert_eq!(batch.client_group_id, group);
    }

    #[test]
    fn create_rejects_when_every_entry_is_unusable() {
        let entries = bag(json!({
            "client1": {"legalFirstName": "John"},
            "client2": {"legalLastName": "Doe"}
        }));
        let err = normalize_create(Some(&Uuid::new_v4().to_string()), &entries)
            .expect_err("must reject");
        assert_eq!(err, PayloadError::NoClientEntries);
    }

    #[test]
    fn create_orders_entries_by_numeric_suffix() {
        let entries = bag(json!({
            "client10": {"legalFirstName": "Cara", "legalLastName": "Ten"},
            "client2": {"legalFirstName": "Ben", "legalLastName": "Two"},
            "client1": {"legalFirstName": "Abe", "legalLastName": "One"}
        }));

        let batch =
            normalize_create(Some(&Uuid::new_v4().to_string()), &entries).expect("batch");
        let names: Vec<&str> = batch
            .clients
            .iter()
            .map(|c| c.legal_first_name.as_str())
            .collect();
        assert_eq!(names, vec!["Abe", "Ben", "Cara"]);
    }

    #[test]
    fn create_ignores_keys_without_numeric_suffix() {
        let entries = bag(json!({
            "client1": {"legalFirstName": "John", "legalLastName": "Doe"},
            "clientMeta": {"legalFirstName": "Ghost", "legalLastName": "Entry"}
        }));

        let batch =
            normalize_create(Some(&Uuid::new_v4().to_string()), &entries).expect("batch");
        assert_eq!(batch.clients.len(), 1);
        assert_eq!(batch.clients[0].legal_first_name, "John");
    }

    #[test]
    fn create_defaults_status_to_active() {
        let entries = bag(json!({
            "client1": {"legalFirstName": "John", "legalLastName": "Doe"}
        }));
        let batch =
            normalize_create(Some(&Uuid::new_v4().to_string()), &entries).expect("batch");
        assert_eq!(batch.clients[0].status, ClientStatus::Active);
    }

    #[test]
    fn create_rejects_unknown_status() {
        let entries = bag(json!({
            "client1": {"legalFirstName": "John", "legalLastName": "Doe", "status": "archived"}
        }));
        let err = normalize_create(Some(&Uuid::new_v4().to_string()), &entries)
            .expect_err("must reject");
        assert_eq!(err, PayloadError::UnknownStatus("archived".to_string()));
    }

    #[test]
    fn create_parses_dob_leniently() {
        let entries = bag(json!({
            "client1": {"legalFirstName": "John", "legalLastName": "Doe", "dob": "1990-04-12"},
            "client2": {"legalFirstName": "Jane", "legalLastName": "Doe", "dob": "12/04/1990"}
        }));

        let batch =
            normalize_create(Some(&Uuid::new_v4().to_string()), &entries).expect("batch");
        assert_eq!(
            batch.clients[0].date_of_birth,
            Some(NaiveDate::from_ymd_opt(1990, 4, 12).expect("date"))
        );
        assert_eq!(batch.clients[1].date_of_birth, None);
    }

    #[test]
    fn create_rejects_malformed_reference_ids() {
        let entries = bag(json!({
            "client1": {
                "legalFirstName": "John",
                "legalLastName": "Doe",
                "primaryClinicianId": "not-a-uuid"
            }
        }));
        let err = normalize_create(Some(&Uuid::new_v4().to_string()), &entries)
            .expect_err("must reject");
        assert_eq!(
            err,
            PayloadError::InvalidId {
                field: "primaryClinicianId"
            }
        );
    }

    #[test]
    fn create_rejects_non_object_entries() {
        let entries = bag(json!({"client1": "not an object"}));
        let err = normalize_create(Some(&Uuid::new_v4().to_string()), &entries)
            .expect_err("must reject");
        assert!(matches!(err, PayloadError::MalformedEntry { key, .. } if key == "client1"));
    }

    #[test]
    fn create_carries_membership_and_children() {
        let entries = bag(json!({
            "client1": {
                "legalFirstName": "John",
                "legalLastName": "Doe",
                "role": "partner",
                "isContactOnly": true,
                "isResponsibleForBilling": true,
                "emails": [{"value": "john@x.com", "type": "PRIMARY", "permission": "ALLOWED"}],
                "notificationOptions": {"cancellations": false}
            }
        }));

        let batch =
            normalize_create(Some(&Uuid::new_v4().to_string()), &entries).expect("batch");
        let client = &batch.clients[0];
        assert_eq!(client.membership.role.as_deref(), Some("partner"));
        assert!(client.membership.is_contact_only);
        assert!(client.membership.is_responsible_for_billing);
        assert_eq!(client.emails.len(), 1);
        assert!(client.phones.is_empty());
        assert_eq!(client.notification_options.cancellations, Some(false));
    }

    #[test]
    fn update_requires_id_and_legal_names() {
        let payload: UpdateClientPayload = serde_json::from_value(json!({
            "legalFirstName": "John",
            "legalLastName": "Doe",
            "status": "active"
        }))
        .expect("payload");
        let err = normalize_update(payload).expect_err("must reject");
        assert_eq!(err, PayloadError::MissingField { field: "id" });

        let payload: UpdateClientPayload = serde_json::from_value(json!({
            "id": Uuid::new_v4().to_string(),
            "legalLastName": "Doe",
            "status": "active"
        }))
        .expect("payload");
        let err = normalize_update(payload).expect_err("must reject");
        assert_eq!(
            err,
            PayloadError::MissingField {
                field: "legalFirstName"
            }
        );
    }

    #[test]
    fn update_requires_a_known_status() {
        let payload: UpdateClientPayload = serde_json::from_value(json!({
            "id": Uuid::new_v4().to_string(),
            "legalFirstName": "John",
            "legalLastName": "Doe"
        }))
        .expect("payload");
        let err = normalize_update(payload).expect_err("must reject");
        assert_eq!(err, PayloadError::MissingField { field: "status" });

        let payload: UpdateClientPayload = serde_json::from_value(json!({
            "id": Uuid::new_v4().to_string(),
            "legalFirstName": "John",
            "legalLastName": "Doe",
            "status": "dormant"
        }))
        .expect("payload");
        let err = normalize_update(payload).expect_err("must reject");
        assert_eq!(err, PayloadError::UnknownStatus("dormant".to_string()));
    }

    #[test]
    fn update_distinguishes_absent_null_and_value_scalars() {
        let absent: UpdateClientPayload = serde_json::from_str(
            r#"{"id":"00000000-0000-0000-0000-000000000001","legalFirstName":"J","legalLastName":"D","status":"active"}"#,
        )
        .expect("payload");
        let (_, params) = normalize_update(absent).expect("params");
        assert_eq!(params.preferred_name, None);
        assert_eq!(params.date_of_birth, None);

        let nulled: UpdateClientPayload = serde_json::from_str(
            r#"{"id":"00000000-0000-0000-0000-000000000001","legalFirstName":"J","legalLastName":"D","status":"active","preferredName":null,"dob":null}"#,
        )
        .expect("payload");
        let (_, params) = normalize_update(nulled).expect("params");
        assert_eq!(params.preferred_name, Some(None));
        assert_eq!(params.date_of_birth, Some(None));

        let set: UpdateClientPayload = serde_json::from_str(
            r#"{"id":"00000000-0000-0000-0000-000000000001","legalFirstName":"J","legalLastName":"D","status":"active","preferredName":"Johnny","dob":"1990-04-12"}"#,
        )
        .expect("payload");
        let (_, params) = normalize_update(set).expect("params");
        assert_eq!(params.preferred_name, Some(Some("Johnny".to_string())));
        assert_eq!(
            params.date_of_birth,
            Some(Some(NaiveDate::from_ymd_opt(1990, 4, 12).expect("date")))
        );
    }

    #[test]
    fn update_builds_membership_patch_only_with_group_id() {
        let group = Uuid::new_v4();
        let with_group: UpdateClientPayload = serde_json::from_value(json!({
            "id": Uuid::new_v4().to_string(),
            "legalFirstName": "J",
            "legalLastName": "D",
            "status": "active",
            "clientGroupId": group.to_string(),
            "role": "guardian",
            "isResponsibleForBilling": true
        }))
        .expect("payload");
        let (_, params) = normalize_update(with_group).expect("params");
        let binding = params.membership.replacement().expect("binding");
        assert_eq!(binding.client_group_id, group);
        assert_eq!(binding.attrs.role.as_deref(), Some("guardian"));
        assert!(binding.attrs.is_responsible_for_billing);

        let without_group: UpdateClientPayload = serde_json::from_value(json!({
            "id": Uuid::new_v4().to_string(),
            "legalFirstName": "J",
            "legalLastName": "D",
            "status": "active",
            "role": "guardian"
        }))
        .expect("payload");
        let (_, params) = normalize_update(without_group).expect("params");
        assert!(params.membership.is_unchanged());
    }

    #[test]
    fn update_collection_patches_reflect_field_presence() {
        let omitted: UpdateClientPayload = serde_json::from_value(json!({
            "id": Uuid::new_v4().to_string(),
            "legalFirstName": "J",
            "legalLastName": "D",
            "status": "active"
        }))
        .expect("payload");
        let (_, params) = normalize_update(omitted).expect("params");
        assert!(params.emails.is_unchanged());
        assert!(params.notification_options.is_unchanged());

        let cleared: UpdateClientPayload = serde_json::from_value(json!({
            "id": Uuid::new_v4().to_string(),
            "legalFirstName": "J",
            "legalLastName": "D",
            "status": "active",
            "emails": []
        }))
        .expect("payload");
        let (_, params) = normalize_update(cleared).expect("params");
        assert_eq!(params.emails, Patch::Replace(Vec::new()));
        assert!(params.phones.is_unchanged());
    }

    #[test]
    fn update_rejects_malformed_id() {
        let payload: UpdateClientPayload = serde_json::from_value(json!({
            "id": "abc",
            "legalFirstName": "J",
            "legalLastName": "D",
            "status": "active"
        }))
        .expect("payload");
        let err = normalize_update(payload).expect_err("must reject");
        assert_eq!(err, PayloadError::InvalidId { field: "id" });
    }
}
