//! Database abstraction layer.
//!
//! Provides a backend-agnostic [`Database`] trait covering every persistence
//! operation the client aggregate engine needs. Two implementations exist:
//!
//! - `postgres` (default feature): `deadpool-postgres` + `tokio-postgres`
//! - `memory`: in-process store for local development and the HTTP test suite
//!
//! Handlers hold an `Arc<dyn Database>` and never see a concrete backend.

#[cfg(feature = "postgres")]
pub mod postgres;

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clients::contacts::ContactEntry;
use crate::clients::membership::{MembershipAttrs, MembershipBinding};
use crate::clients::reminders::ReminderToggles;
use crate::error::DatabaseError;

/// Create a database backend from configuration, run migrations, and return it.
///
/// Shared by `serve`, `migrate`, and `seed`; anything that needs a plain
/// `Arc<dyn Database>` goes through here.
pub async fn connect_from_config(
    config: &crate::config::DatabaseConfig,
) -> Result<Arc<dyn Database>, DatabaseError> {
    match config.backend {
        crate::config::StorageBackend::Memory => Ok(Arc::new(memory::MemoryBackend::new())),
        #[cfg(feature = "postgres")]
        crate::config::StorageBackend::Postgres => {
            let pg = postgres::PgBackend::new(config).await?;
            pg.run_migrations().await?;
            Ok(Arc::new(pg))
        }
        #[cfg(not(feature = "postgres"))]
        crate::config::StorageBackend::Postgres => Err(DatabaseError::Pool(
            "built without the 'postgres' feature; use the memory backend".to_string(),
        )),
    }
}

/// Client lifecycle status as supplied by intake payloads.
///
/// Only the derived flags are stored: `is_active` for `active`, `is_waitlist`
/// for `waitlisted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Active,
    Prospective,
    Waitlisted,
    Inactive,
}

impl ClientStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Prospective => "prospective",
            Self::Waitlisted => "waitlisted",
            Self::Inactive => "inactive",
        }
    }

    pub fn from_payload(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "prospective" => Some(Self::Prospective),
            "waitlisted" => Some(Self::Waitlisted),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    pub fn is_active(self) -> bool {
        self == Self::Active
    }

    pub fn is_waitlist(self) -> bool {
        self == Self::Waitlisted
    }
}

/// Communication channel of a contact method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactChannel {
    Email,
    Phone,
}

impl ContactChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "EMAIL",
            Self::Phone => "PHONE",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "EMAIL" => Some(Self::Email),
            "PHONE" => Some(Self::Phone),
            _ => None,
        }
    }
}

/// Notification toggle a reminder preference row represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderType {
    UpcomingAppointments,
    IncompleteDocuments,
    Cancellations,
}

impl ReminderType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UpcomingAppointments => "UPCOMING_APPOINTMENTS",
            Self::IncompleteDocuments => "INCOMPLETE_DOCUMENTS",
            Self::Cancellations => "CANCELLATIONS",
        }
    }

    pub fn from_db_value(value: &str) -> Option<Self> {
        match value {
            "UPCOMING_APPOINTMENTS" => Some(Self::UpcomingAppointments),
            "INCOMPLETE_DOCUMENTS" => Some(Self::IncompleteDocuments),
            "CANCELLATIONS" => Some(Self::Cancellations),
            _ => None,
        }
    }
}

/// Replace-or-keep patch for a field with wholesale replace semantics.
///
/// `Unchanged` means the field was absent from the payload and the stored
/// rows stay as they are. `Replace` means delete everything and insert the
/// supplied value, which for collections may be empty ("clear").
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Patch<T> {
    #[default]
    Unchanged,
    Replace(T),
}

impl<T> Patch<T> {
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Replace(v),
            None => Self::Unchanged,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }

    pub fn replacement(&self) -> Option<&T> {
        match self {
            Self::Replace(v) => Some(v),
            Self::Unchanged => None,
        }
    }
}

/// Stored client row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: Uuid,
    pub legal_first_name: String,
    pub legal_last_name: String,
    pub preferred_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub is_active: bool,
    pub is_waitlist: bool,
    pub primary_clinician_id: Option<Uuid>,
    pub primary_location_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored contact method row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMethodRecord {
    pub id: Uuid,
    pub client_id: Uuid,
    pub contact_type: ContactChannel,
    /// Subtype such as "home" / "work" / "mobile"; wire key `type`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: String,
    pub permission: Option<String>,
    pub is_primary: bool,
    pub sort_order: i32,
}

/// Stored reminder preference row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderPreferenceRecord {
    pub id: Uuid,
    pub client_id: Uuid,
    pub reminder_type: ReminderType,
    pub is_enabled: bool,
}

/// Stored group membership row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMembershipRecord {
    pub id: Uuid,
    pub client_id: Uuid,
    pub client_group_id: Uuid,
    pub role: Option<String>,
    pub is_contact_only: bool,
    pub is_responsible_for_billing: bool,
}

/// Client group directory row (referenced by memberships, never created by
/// the client engine itself).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientGroupRecord {
    pub id: Uuid,
    pub name: String,
    pub group_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Clinician directory row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicianRecord {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Location directory row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Membership joined with its group, as it appears in responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMembershipView {
    #[serde(flatten)]
    pub membership: GroupMembershipRecord,
    pub group: ClientGroupRecord,
}

/// A client with every owned and referenced row joined in.
///
/// This is the one externally visible client shape: create, update, and both
/// GET variants all return it, so a write response is structurally identical
/// to a later read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientAggregate {
    #[serde(flatten)]
    pub client: ClientRecord,
    pub contact_methods: Vec<ContactMethodRecord>,
    pub reminder_preferences: Vec<ReminderPreferenceRecord>,
    pub clinician: Option<ClinicianRecord>,
    pub location: Option<LocationRecord>,
    pub group_membership: Option<GroupMembershipView>,
}

impl ClientAggregate {
    /// Order child rows the way reads do, so every backend returns the same
    /// byte sequence for the same aggregate.
    pub fn normalize_ordering(&mut self) {
        self.contact_methods
            .sort_by_key(|m| (m.contact_type.as_str(), m.sort_order, m.id));
        self.reminder_preferences
            .sort_by_key(|p| p.reminder_type.as_str());
    }
}

/// Normalized fields for one client in a create batch.
#[derive(Debug, Clone)]
pub struct CreateClientParams {
    pub legal_first_name: String,
    pub legal_last_name: String,
    pub preferred_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub status: ClientStatus,
    pub primary_clinician_id: Option<Uuid>,
    pub primary_location_id: Option<Uuid>,
    pub membership: MembershipAttrs,
    pub emails: Vec<ContactEntry>,
    pub phones: Vec<ContactEntry>,
    pub notification_options: ReminderToggles,
}

/// A validated multi-client create request: every entry joins the same group,
/// and the whole batch commits or rolls back as one transaction.
#[derive(Debug, Clone)]
pub struct CreateClientBatch {
    pub client_group_id: Uuid,
    pub clients: Vec<CreateClientParams>,
}

/// Normalized fields for a client update.
///
/// Scalar `Option<Option<T>>` fields distinguish "leave alone" (outer `None`)
/// from "set to null" (`Some(None)`); collection fields use [`Patch`] for the
/// same three-way distinction with replace semantics.
#[derive(Debug, Clone)]
pub struct UpdateClientParams {
    pub legal_first_name: String,
    pub legal_last_name: String,
    pub status: ClientStatus,
    pub preferred_name: Option<Option<String>>,
    pub date_of_birth: Option<Option<NaiveDate>>,
    pub primary_clinician_id: Option<Option<Uuid>>,
    pub primary_location_id: Option<Option<Uuid>>,
    pub membership: Patch<MembershipBinding>,
    pub emails: Patch<Vec<ContactEntry>>,
    pub phones: Patch<Vec<ContactEntry>>,
    pub notification_options: Patch<ReminderToggles>,
}

#[derive(Debug, Clone)]
pub struct CreateClientGroupParams {
    pub name: String,
    pub group_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateClinicianParams {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateLocationParams {
    pub name: String,
    pub address: Option<String>,
}

/// Client aggregate persistence.
///
/// Writes are transactional across the client row and all child collections;
/// reads return the joined [`ClientAggregate`]. Lookup misses are `Ok(None)`,
/// never an error, so handlers own the 404 mapping.
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Create every client in the batch inside one transaction and return
    /// their joined aggregates in input order.
    async fn create_clients(
        &self,
        batch: &CreateClientBatch,
    ) -> Result<Vec<ClientAggregate>, DatabaseError>;

    /// Joined lookup by id. Inactive clients are still found.
    async fn get_client(&self, client_id: Uuid) -> Result<Option<ClientAggregate>, DatabaseError>;

    /// All clients with the same joins as [`ClientStore::get_client`],
    /// unfiltered and unpaginated, ordered by creation time.
    async fn list_clients(&self) -> Result<Vec<ClientAggregate>, DatabaseError>;

    /// Update the client row and replace whichever child collections the
    /// params mark as [`Patch::Replace`], all inside one transaction, then
    /// re-read the aggregate. `Ok(None)` when the id is unknown; in that case
    /// no transaction is opened.
    async fn update_client(
        &self,
        client_id: Uuid,
        input: &UpdateClientParams,
    ) -> Result<Option<ClientAggregate>, DatabaseError>;

    /// Soft delete: set is_active=false and return the updated row. A no-op
    /// on an already-inactive client. `Ok(None)` when the id is unknown.
    async fn deactivate_client(
        &self,
        client_id: Uuid,
    ) -> Result<Option<ClientRecord>, DatabaseError>;
}

/// Practice directory rows the aggregate references: groups, clinicians,
/// locations. Created by seeding and by tests, not exposed over HTTP.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn create_client_group(
        &self,
        input: &CreateClientGroupParams,
    ) -> Result<ClientGroupRecord, DatabaseError>;
    async fn get_client_group(
        &self,
        group_id: Uuid,
    ) -> Result<Option<ClientGroupRecord>, DatabaseError>;
    async fn create_clinician(
        &self,
        input: &CreateClinicianParams,
    ) -> Result<ClinicianRecord, DatabaseError>;
    async fn create_location(
        &self,
        input: &CreateLocationParams,
    ) -> Result<LocationRecord, DatabaseError>;
}

/// Backend-agnostic database supertrait combining all sub-stores.
#[async_trait]
pub trait Database: ClientStore + DirectoryStore + Send + Sync {
    /// Run schema migrations for this backend.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Short backend name for health reporting.
    fn backend_name(&self) -> &'static str;
}
