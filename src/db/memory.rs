//! In-memory backend.
//!
//! Backs local development and the HTTP test suite. Mirrors the PostgreSQL
//! backend's semantics: writes are all-or-nothing per call, referential
//! checks surface as [`DatabaseError::Conflict`], and aggregates come back
//! with the same child ordering.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::clients::contacts::{
    ContactEntry, ContactMethodSeed, reconcile_channel, reconcile_contact_methods,
};
use crate::clients::reminders::{ReminderSeed, reminder_rows};
use crate::db::{
    ClientAggregate, ClientGroupRecord, ClientRecord, ClientStore, ClinicianRecord, ContactChannel,
    ContactMethodRecord, CreateClientBatch, CreateClientGroupParams, CreateClinicianParams,
    CreateLocationParams, Database, DirectoryStore, GroupMembershipRecord, GroupMembershipView,
    LocationRecord, ReminderPreferenceRecord,
};
use crate::error::DatabaseError;

#[derive(Debug, Clone, Default)]
struct MemoryState {
    clients: HashMap<Uuid, ClientRecord>,
    contact_methods: HashMap<Uuid, Vec<ContactMethodRecord>>,
    reminder_preferences: HashMap<Uuid, Vec<ReminderPreferenceRecord>>,
    memberships: HashMap<Uuid, GroupMembershipRecord>,
    groups: HashMap<Uuid, ClientGroupRecord>,
    clinicians: HashMap<Uuid, ClinicianRecord>,
    locations: HashMap<Uuid, LocationRecord>,
}

impl MemoryState {
    fn assemble(&self, client: &ClientRecord) -> ClientAggregate {
        let mut aggregate = ClientAggregate {
            client: client.clone(),
            contact_methods: self
                .contact_methods
                .get(&client.id)
                .cloned()
                .unwrap_or_default(),
            reminder_preferences: self
                .reminder_preferences
                .get(&client.id)
                .cloned()
                .unwrap_or_default(),
            clinician: client
                .primary_clinician_id
                .and_then(|id| self.clinicians.get(&id).cloned()),
            location: client
                .primary_location_id
                .and_then(|id| self.locations.get(&id).cloned()),
            group_membership: self.memberships.get(&client.id).and_then(|membership| {
                self.groups
                    .get(&membership.client_group_id)
                    .map(|group| GroupMembershipView {
                        membership: membership.clone(),
                        group: group.clone(),
                    })
            }),
        };
        aggregate.normalize_ordering();
        aggregate
    }

    fn assemble_by_id(&self, client_id: Uuid) -> Option<ClientAggregate> {
        self.clients
            .get(&client_id)
            .map(|client| self.assemble(client))
    }
}

fn check_group(state: &MemoryState, group_id: Uuid) -> Result<(), DatabaseError> {
    if state.groups.contains_key(&group_id) {
        Ok(())
    } else {
        Err(DatabaseError::Conflict(format!(
            "unknown client group {}",
            group_id
        )))
    }
}

fn check_references(
    state: &MemoryState,
    clinician_id: Option<Uuid>,
    location_id: Option<Uuid>,
) -> Result<(), DatabaseError> {
    if let Some(id) = clinician_id {
        if !state.clinicians.contains_key(&id) {
            return Err(DatabaseError::Conflict(format!("unknown clinician {}", id)));
        }
    }
    if let Some(id) = location_id {
        if !state.locations.contains_key(&id) {
            return Err(DatabaseError::Conflict(format!("unknown location {}", id)));
        }
    }
    Ok(())
}

fn contact_records(client_id: Uuid, seeds: Vec<ContactMethodSeed>) -> Vec<ContactMethodRecord> {
    seeds
        .into_iter()
        .map(|seed| ContactMethodRecord {
            id: Uuid::new_v4(),
            client_id,
            contact_type: seed.contact_type,
            kind: seed.kind,
            value: seed.value,
            permission: seed.permission,
            is_primary: seed.is_primary,
            sort_order: seed.sort_order,
        })
        .collect()
}

fn preference_records(client_id: Uuid, seeds: Vec<ReminderSeed>) -> Vec<ReminderPreferenceRecord> {
    seeds
        .into_iter()
        .map(|seed| ReminderPreferenceRecord {
            id: Uuid::new_v4(),
            client_id,
            reminder_type: seed.reminder_type,
            is_enabled: seed.is_enabled,
        })
        .collect()
}

fn replace_channel(
    state: &mut MemoryState,
    client_id: Uuid,
    channel: ContactChannel,
    entries: &[ContactEntry],
) {
    let rows = state.contact_methods.entry(client_id).or_default();
    rows.retain(|m| m.contact_type != channel);
    rows.extend(contact_records(client_id, reconcile_channel(channel, entries)));
}

fn insert_client(
    state: &mut MemoryState,
    client_group_id: Uuid,
    params: &crate::db::CreateClientParams,
) -> Result<Uuid, DatabaseError> {
    check_group(state, client_group_id)?;
    check_references(state, params.primary_clinician_id, params.primary_location_id)?;

    let now = Utc::now();
    let client_id = Uuid::new_v4();
    state.clients.insert(
        client_id,
        ClientRecord {
            id: client_id,
            legal_first_name: params.legal_first_name.clone(),
            legal_last_name: params.legal_last_name.clone(),
            preferred_name: params.preferred_name.clone(),
            date_of_birth: params.date_of_birth,
            is_active: params.status.is_active(),
            is_waitlist: params.status.is_waitlist(),
            primary_clinician_id: params.primary_clinician_id,
            primary_location_id: params.primary_location_id,
            created_at: now,
            updated_at: now,
        },
    );

    state.memberships.insert(
        client_id,
        GroupMembershipRecord {
            id: Uuid::new_v4(),
            client_id,
            client_group_id,
            role: params.membership.role.clone(),
            is_contact_only: params.membership.is_contact_only,
            is_responsible_for_billing: params.membership.is_responsible_for_billing,
        },
    );

    state.contact_methods.insert(
        client_id,
        contact_records(
            client_id,
            reconcile_contact_methods(&params.emails, &params.phones),
        ),
    );
    state.reminder_preferences.insert(
        client_id,
        preference_records(client_id, reminder_rows(&params.notification_options)),
    );

    Ok(client_id)
}

/// In-process database backend.
///
/// One mutex around the whole state; writes stage into a copy and swap it in
/// on success, which gives each call the same all-or-nothing behavior a
/// transaction does.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

// ==================== Database (supertrait) ====================

#[async_trait]
impl Database for MemoryBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

// ==================== ClientStore ====================

#[async_trait]
impl ClientStore for MemoryBackend {
    async fn create_clients(
        &self,
        batch: &CreateClientBatch,
    ) -> Result<Vec<ClientAggregate>, DatabaseError> {
        let mut state = self.state.lock().await;
        let mut staged = state.clone();

        let mut created_ids = Vec::with_capacity(batch.clients.len());
        for params in &batch.clients {
            created_ids.push(insert_client(&mut staged, batch.client_group_id, params)?);
        }

        let mut aggregates = Vec::with_capacity(created_ids.len());
        for client_id in created_ids {
            let aggregate = staged.assemble_by_id(client_id).ok_or_else(|| {
                DatabaseError::Query(format!("client {} missing after insert", client_id))
            })?;
            aggregates.push(aggregate);
        }

        *state = staged;
        Ok(aggregates)
    }

    async fn get_client(&self, client_id: Uuid) -> Result<Option<ClientAggregate>, DatabaseError> {
        let state = self.state.lock().await;
        Ok(state.assemble_by_id(client_id))
    }

    async fn list_clients(&self) -> Result<Vec<ClientAggregate>, DatabaseError> {
        let state = self.state.lock().await;
        let mut clients: Vec<&ClientRecord> = state.clients.values().collect();
        clients.sort_by_key(|c| (c.created_at, c.id));
        Ok(clients.into_iter().map(|c| state.assemble(c)).collect())
    }

    async fn update_client(
        &self,
        client_id: Uuid,
        input: &crate::db::UpdateClientParams,
    ) -> Result<Option<ClientAggregate>, DatabaseError> {
        let mut state = self.state.lock().await;
        let mut staged = state.clone();

        let Some(current) = staged.clients.get(&client_id).cloned() else {
            return Ok(None);
        };

        // Absent means keep, explicit null means clear.
        let updated = ClientRecord {
            id: current.id,
            legal_first_name: input.legal_first_name.clone(),
            legal_last_name: input.legal_last_name.clone(),
            preferred_name: input.preferred_name.clone().unwrap_or(current.preferred_name),
            date_of_birth: input.date_of_birth.unwrap_or(current.date_of_birth),
            is_active: input.status.is_active(),
            is_waitlist: input.status.is_waitlist(),
            primary_clinician_id: input
                .primary_clinician_id
                .unwrap_or(current.primary_clinician_id),
            primary_location_id: input
                .primary_location_id
                .unwrap_or(current.primary_location_id),
            created_at: current.created_at,
            updated_at: Utc::now(),
        };
        check_references(&staged, updated.primary_clinician_id, updated.primary_location_id)?;
        staged.clients.insert(client_id, updated);

        if let Some(binding) = input.membership.replacement() {
            check_group(&staged, binding.client_group_id)?;
            staged.memberships.insert(
                client_id,
                GroupMembershipRecord {
                    id: Uuid::new_v4(),
                    client_id,
                    client_group_id: binding.client_group_id,
                    role: binding.attrs.role.clone(),
                    is_contact_only: binding.attrs.is_contact_only,
                    is_responsible_for_billing: binding.attrs.is_responsible_for_billing,
                },
            );
        }
        if let Some(entries) = input.emails.replacement() {
            replace_channel(&mut staged, client_id, ContactChannel::Email, entries);
        }
        if let Some(entries) = input.phones.replacement() {
            replace_channel(&mut staged, client_id, ContactChannel::Phone, entries);
        }
        if let Some(toggles) = input.notification_options.replacement() {
            staged.reminder_preferences.insert(
                client_id,
                preference_records(client_id, reminder_rows(toggles)),
            );
        }

        let aggregate = staged.assemble_by_id(client_id).ok_or_else(|| {
            DatabaseError::Query(format!("client {} missing after update", client_id))
        })?;
        *state = staged;
        Ok(Some(aggregate))
    }

    async fn deactivate_client(
        &self,
        client_id: Uuid,
    ) -> Result<Option<ClientRecord>, DatabaseError> {
        let mut state = self.state.lock().await;
        let Some(client) = state.clients.get_mut(&client_id) else {
            return Ok(None);
        };
        client.is_active = false;
        client.updated_at = Utc::now();
        Ok(Some(client.clone()))
    }
}

// ==================== DirectoryStore ====================

#[async_trait]
impl DirectoryStore for MemoryBackend {
    async fn create_client_group(
        &self,
        input: &CreateClientGroupParams,
    ) -> Result<ClientGroupRecord, DatabaseError> {
        let mut state = self.state.lock().await;
        let record = ClientGroupRecord {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            group_type: input.group_type.clone(),
            created_at: Utc::now(),
        };
        state.groups.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_client_group(
        &self,
        group_id: Uuid,
    ) -> Result<Option<ClientGroupRecord>, DatabaseError> {
        let state = self.state.lock().await;
        Ok(state.groups.get(&group_id).cloned())
    }

    async fn create_clinician(
        &self,
        input: &CreateClinicianParams,
    ) -> Result<ClinicianRecord, DatabaseError> {
        let mut state = self.state.lock().await;
        let record = ClinicianRecord {
            id: Uuid::new_v4(),
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            email: input.email.clone(),
            created_at: Utc::now(),
        };
        state.clinicians.insert(record.id, record.clone());
        Ok(record)
    }

    async fn create_location(
        &self,
        input: &CreateLocationParams,
    ) -> Result<LocationRecord, DatabaseError> {
        let mut state = self.state.lock().await;
        let record = LocationRecord {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            address: input.address.clone(),
            created_at: Utc::now(),
        };
        state.locations.insert(record.id, record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::clients::membership::{MembershipAttrs, MembershipBinding};
    use crate::clients::reminders::ReminderToggles;
    use crate::db::{ClientStatus, CreateClientParams, Patch, UpdateClientParams};

    fn email(value: &str) -> ContactEntry {
        ContactEntry {
            value: value.to_string(),
            kind: None,
            permission: None,
        }
    }

    fn phone(value: &str, kind: &str) -> ContactEntry {
        ContactEntry {
            value: value.to_string(),
            kind: Some(kind.to_string()),
            permission: None,
        }
    }

    fn create_params(first: &str, last: &str) -> CreateClientParams {
        CreateClientParams {
            legal_first_name: first.to_string(),
            legal_last_name: last.to_string(),
            preferred_name: None,
            date_of_birth: None,
            status: ClientStatus::Active,
            primary_clinician_id: None,
            primary_location_id: None,
            membership: MembershipAttrs::default(),
            emails: Vec::new(),
            phones: Vec::new(),
            notification_options: ReminderToggles::default(),
        }
    }

    fn update_params(first: &str, last: &str) -> UpdateClientParams {
        UpdateClientParams {
            legal_first_name: first.to_string(),
            legal_last_name: last.to_string(),
            status: ClientStatus::Active,
            preferred_name: None,
            date_of_birth: None,
            primary_clinician_id: None,
            primary_location_id: None,
            membership: Patch::Unchanged,
            emails: Patch::Unchanged,
            phones: Patch::Unchanged,
            notification_options: Patch::Unchanged,
        }
    }

    async fn backend_with_group() -> (MemoryBackend, Uuid) {
        let backend = MemoryBackend::new();
        let group = backend
            .create_client_group(&CreateClientGroupParams {
                name: "Nguyen Household".to_string(),
                group_type: Some("family".to_string()),
            })
            .await
            .unwrap();
        (backend, group.id)
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let (backend, group_id) = backend_with_group().await;
        let mut params = create_params("May", "Nguyen");
        params.emails = vec![email("may@example.com"), email("backup@example.com")];
        params.phones = vec![phone("555-0100", "mobile")];
        params.notification_options.upcoming_appointments = Some(true);

        let created = backend
            .create_clients(&CreateClientBatch {
                client_group_id: group_id,
                clients: vec![params],
            })
            .await
            .unwrap();
        assert_eq!(created.len(), 1);
        let aggregate = &created[0];
        assert_eq!(aggregate.contact_methods.len(), 3);
        assert!(aggregate.contact_methods[0].is_primary);
        assert_eq!(aggregate.reminder_preferences.len(), 1);
        let membership = aggregate.group_membership.as_ref().unwrap();
        assert_eq!(membership.group.name, "Nguyen Household");

        let fetched = backend.get_client(aggregate.client.id).await.unwrap().unwrap();
        assert_eq!(&fetched, aggregate);
    }

    #[tokio::test]
    async fn create_batch_rolls_back_when_any_entry_conflicts() {
        let (backend, group_id) = backend_with_group().await;
        let mut bad = create_params("Ben", "Nguyen");
        bad.primary_clinician_id = Some(Uuid::new_v4());

        let result = backend
            .create_clients(&CreateClientBatch {
                client_group_id: group_id,
                clients: vec![create_params("May", "Nguyen"), bad],
            })
            .await;
        assert!(matches!(result, Err(DatabaseError::Conflict(_))));
        assert!(backend.list_clients().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_only_the_named_channel() {
        let (backend, group_id) = backend_with_group().await;
        let mut params = create_params("May", "Nguyen");
        params.emails = vec![email("old@example.com"), email("older@example.com")];
        params.phones = vec![phone("555-0100", "mobile")];
        let created = backend
            .create_clients(&CreateClientBatch {
                client_group_id: group_id,
                clients: vec![params],
            })
            .await
            .unwrap();
        let client_id = created[0].client.id;

        let mut update = update_params("May", "Nguyen");
        update.emails = Patch::Replace(vec![email("new@example.com")]);
        let updated = backend.update_client(client_id, &update).await.unwrap().unwrap();

        let emails: Vec<_> = updated
            .contact_methods
            .iter()
            .filter(|m| m.contact_type == ContactChannel::Email)
            .collect();
        let phones: Vec<_> = updated
            .contact_methods
            .iter()
            .filter(|m| m.contact_type == ContactChannel::Phone)
            .collect();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].value, "new@example.com");
        assert!(emails[0].is_primary);
        assert_eq!(phones.len(), 1);
        assert_eq!(phones[0].value, "555-0100");
    }

    #[tokio::test]
    async fn update_without_group_id_leaves_membership_untouched() {
        let (backend, group_id) = backend_with_group().await;
        let created = backend
            .create_clients(&CreateClientBatch {
                client_group_id: group_id,
                clients: vec![create_params("May", "Nguyen")],
            })
            .await
            .unwrap();
        let client_id = created[0].client.id;
        let original_membership_id = created[0].group_membership.as_ref().unwrap().membership.id;

        let updated = backend
            .update_client(client_id, &update_params("May", "Tran"))
            .await
            .unwrap()
            .unwrap();
        let membership = updated.group_membership.unwrap();
        assert_eq!(membership.membership.id, original_membership_id);
        assert_eq!(membership.membership.client_group_id, group_id);
        assert_eq!(updated.client.legal_last_name, "Tran");
    }

    #[tokio::test]
    async fn update_rebinds_membership_when_group_supplied() {
        let (backend, group_id) = backend_with_group().await;
        let created = backend
            .create_clients(&CreateClientBatch {
                client_group_id: group_id,
                clients: vec![create_params("May", "Nguyen")],
            })
            .await
            .unwrap();
        let client_id = created[0].client.id;

        let other_group = backend
            .create_client_group(&CreateClientGroupParams {
                name: "Tran Household".to_string(),
                group_type: None,
            })
            .await
            .unwrap();

        let mut update = update_params("May", "Nguyen");
        update.membership = Patch::Replace(MembershipBinding {
            client_group_id: other_group.id,
            attrs: MembershipAttrs {
                role: Some("guardian".to_string()),
                is_contact_only: false,
                is_responsible_for_billing: true,
            },
        });
        let updated = backend.update_client(client_id, &update).await.unwrap().unwrap();
        let membership = updated.group_membership.unwrap();
        assert_eq!(membership.membership.client_group_id, other_group.id);
        assert_eq!(membership.group.name, "Tran Household");
        assert!(membership.membership.is_responsible_for_billing);
    }

    #[tokio::test]
    async fn update_with_unknown_group_is_a_conflict() {
        let (backend, group_id) = backend_with_group().await;
        let created = backend
            .create_clients(&CreateClientBatch {
                client_group_id: group_id,
                clients: vec![create_params("May", "Nguyen")],
            })
            .await
            .unwrap();
        let client_id = created[0].client.id;

        let mut update = update_params("May", "Nguyen");
        update.membership = Patch::Replace(MembershipBinding {
            client_group_id: Uuid::new_v4(),
            attrs: MembershipAttrs::default(),
        });
        let result = backend.update_client(client_id, &update).await;
        assert!(matches!(result, Err(DatabaseError::Conflict(_))));

        // The failed update left the old membership in place.
        let fetched = backend.get_client(client_id).await.unwrap().unwrap();
        assert_eq!(
            fetched.group_membership.unwrap().membership.client_group_id,
            group_id
        );
    }

    #[tokio::test]
    async fn explicit_null_clears_scalars_and_absent_keeps_them() {
        let (backend, group_id) = backend_with_group().await;
        let mut params = create_params("May", "Nguyen");
        params.preferred_name = Some("Mimi".to_string());
        let created = backend
            .create_clients(&CreateClientBatch {
                client_group_id: group_id,
                clients: vec![params],
            })
            .await
            .unwrap();
        let client_id = created[0].client.id;

        // Absent: preferred name survives.
        let kept = backend
            .update_client(client_id, &update_params("May", "Nguyen"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.client.preferred_name.as_deref(), Some("Mimi"));

        // Explicit null: preferred name cleared.
        let mut update = update_params("May", "Nguyen");
        update.preferred_name = Some(None);
        let cleared = backend.update_client(client_id, &update).await.unwrap().unwrap();
        assert_eq!(cleared.client.preferred_name, None);
    }

    #[tokio::test]
    async fn reminder_toggles_replace_wholesale() {
        let (backend, group_id) = backend_with_group().await;
        let mut params = create_params("May", "Nguyen");
        params.notification_options = ReminderToggles {
            upcoming_appointments: Some(true),
            incomplete_documents: Some(true),
            cancellations: None,
        };
        let created = backend
            .create_clients(&CreateClientBatch {
                client_group_id: group_id,
                clients: vec![params],
            })
            .await
            .unwrap();
        let client_id = created[0].client.id;
        assert_eq!(created[0].reminder_preferences.len(), 2);

        let mut update = update_params("May", "Nguyen");
        update.notification_options = Patch::Replace(ReminderToggles {
            upcoming_appointments: None,
            incomplete_documents: None,
            cancellations: Some(false),
        });
        let updated = backend.update_client(client_id, &update).await.unwrap().unwrap();
        assert_eq!(updated.reminder_preferences.len(), 1);
        assert_eq!(
            updated.reminder_preferences[0].reminder_type,
            crate::db::ReminderType::Cancellations
        );
        assert!(!updated.reminder_preferences[0].is_enabled);
    }

    #[tokio::test]
    async fn deactivate_is_a_repeatable_soft_delete() {
        let (backend, group_id) = backend_with_group().await;
        let created = backend
            .create_clients(&CreateClientBatch {
                client_group_id: group_id,
                clients: vec![create_params("May", "Nguyen")],
            })
            .await
            .unwrap();
        let client_id = created[0].client.id;

        let first = backend.deactivate_client(client_id).await.unwrap().unwrap();
        assert!(!first.is_active);

        // Still readable, and a second deactivate is a no-op.
        let fetched = backend.get_client(client_id).await.unwrap().unwrap();
        assert!(!fetched.client.is_active);
        let second = backend.deactivate_client(client_id).await.unwrap().unwrap();
        assert!(!second.is_active);
    }

    #[tokio::test]
    async fn missing_clients_are_none_not_errors() {
        let backend = MemoryBackend::new();
        let missing = Uuid::new_v4();
        assert!(backend.get_client(missing).await.unwrap().is_none());
        assert!(
            backend
                .update_client(missing, &update_params("A", "B"))
                .await
                .unwrap()
                .is_none()
        );
        assert!(backend.deactivate_client(missing).await.unwrap().is_none());
    }
}
