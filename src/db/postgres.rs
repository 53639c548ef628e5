//! PostgreSQL backend for the Database trait.
//!
//! Every aggregate write runs inside one transaction, and the aggregate the
//! caller gets back is re-read through the same transaction before commit.
//! The read helpers are generic over `GenericClient` so the identical join
//! path serves both pooled connections and open transactions.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use deadpool_postgres::{
    Config, GenericClient, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime,
};
use secrecy::ExposeSecret;
use tokio_postgres::NoTls;
use uuid::Uuid;

use crate::clients::contacts::{
    ContactEntry, ContactMethodSeed, reconcile_channel, reconcile_contact_methods,
};
use crate::clients::membership::{MembershipAttrs, MembershipBinding};
use crate::clients::reminders::{ReminderToggles, reminder_rows};
use crate::config::DatabaseConfig;
use crate::db::{
    ClientAggregate, ClientGroupRecord, ClientRecord, ClientStore, ClinicianRecord, ContactChannel,
    ContactMethodRecord, CreateClientBatch, CreateClientGroupParams, CreateClientParams,
    CreateClinicianParams, CreateLocationParams, Database, DirectoryStore, GroupMembershipRecord,
    GroupMembershipView, LocationRecord, ReminderPreferenceRecord, ReminderType,
    UpdateClientParams,
};
use crate::error::DatabaseError;

mod embedded {
    refinery::embed_migrations!("migrations");
}

/// PostgreSQL database backend.
pub struct PgBackend {
    pool: Pool,
}

impl PgBackend {
    /// Create a new PostgreSQL backend from configuration.
    ///
    /// Builds the pool only; the database is first touched when a connection
    /// is checked out.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config
            .url
            .as_ref()
            .ok_or_else(|| DatabaseError::Pool("database url is not configured".to_string()))?;

        let mut cfg = Config::new();
        cfg.url = Some(url.expose_secret().to_string());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig::new(config.pool_size));

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseError::Pool(format!("failed to create pool: {}", e)))?;

        Ok(Self { pool })
    }

    /// Get a clone of the connection pool.
    pub fn pool(&self) -> Pool {
        self.pool.clone()
    }

    async fn conn(&self) -> Result<deadpool_postgres::Client, DatabaseError> {
        self.pool
            .get()
            .await
            .map_err(|e| DatabaseError::Pool(e.to_string()))
    }
}

fn row_to_client_record(row: &tokio_postgres::Row) -> ClientRecord {
    ClientRecord {
        id: row.get("id"),
        legal_first_name: row.get("legal_first_name"),
        legal_last_name: row.get("legal_last_name"),
        preferred_name: row.get("preferred_name"),
        date_of_birth: row.get("date_of_birth"),
        is_active: row.get("is_active"),
        is_waitlist: row.get("is_waitlist"),
        primary_clinician_id: row.get("primary_clinician_id"),
        primary_location_id: row.get("primary_location_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_contact_method(row: &tokio_postgres::Row) -> Result<ContactMethodRecord, DatabaseError> {
    let contact_type_raw: String = row.get("contact_type");
    let contact_type = ContactChannel::from_db_value(&contact_type_raw).ok_or_else(|| {
        DatabaseError::Serialization(format!("invalid contact_type '{}'", contact_type_raw))
    })?;
    Ok(ContactMethodRecord {
        id: row.get("id"),
        client_id: row.get("client_id"),
        contact_type,
        kind: row.get("kind"),
        value: row.get("value"),
        permission: row.get("permission"),
        is_primary: row.get("is_primary"),
        sort_order: row.get("sort_order"),
    })
}

fn row_to_reminder_preference(
    row: &tokio_postgres::Row,
) -> Result<ReminderPreferenceRecord, DatabaseError> {
    let reminder_type_raw: String = row.get("reminder_type");
    let reminder_type = ReminderType::from_db_value(&reminder_type_raw).ok_or_else(|| {
        DatabaseError::Serialization(format!("invalid reminder_type '{}'", reminder_type_raw))
    })?;
    Ok(ReminderPreferenceRecord {
        id: row.get("id"),
        client_id: row.get("client_id"),
        reminder_type,
        is_enabled: row.get("is_enabled"),
    })
}

fn row_to_membership_view(row: &tokio_postgres::Row) -> GroupMembershipView {
    GroupMembershipView {
        membership: GroupMembershipRecord {
            id: row.get("id"),
            client_id: row.get("client_id"),
            client_group_id: row.get("client_group_id"),
            role: row.get("role"),
            is_contact_only: row.get("is_contact_only"),
            is_responsible_for_billing: row.get("is_responsible_for_billing"),
        },
        group: ClientGroupRecord {
            id: row.get("client_group_id"),
            name: row.get("group_name"),
            group_type: row.get("group_type"),
            created_at: row.get("group_created_at"),
        },
    }
}

fn row_to_clinician_record(row: &tokio_postgres::Row) -> ClinicianRecord {
    ClinicianRecord {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        created_at: row.get("created_at"),
    }
}

fn row_to_location_record(row: &tokio_postgres::Row) -> LocationRecord {
    LocationRecord {
        id: row.get("id"),
        name: row.get("name"),
        address: row.get("address"),
        created_at: row.get("created_at"),
    }
}

fn row_to_client_group_record(row: &tokio_postgres::Row) -> ClientGroupRecord {
    ClientGroupRecord {
        id: row.get("id"),
        name: row.get("name"),
        group_type: row.get("group_type"),
        created_at: row.get("created_at"),
    }
}

async fn fetch_clinician<C>(
    conn: &C,
    clinician_id: Uuid,
) -> Result<Option<ClinicianRecord>, DatabaseError>
where
    C: GenericClient + Sync,
{
    let row = conn
        .query_opt(
            "SELECT id, first_name, last_name, email, created_at \
             FROM clinicians WHERE id = $1",
            &[&clinician_id],
        )
        .await?;
    Ok(row.map(|row| row_to_clinician_record(&row)))
}

async fn fetch_location<C>(
    conn: &C,
    location_id: Uuid,
) -> Result<Option<LocationRecord>, DatabaseError>
where
    C: GenericClient + Sync,
{
    let row = conn
        .query_opt(
            "SELECT id, name, address, created_at FROM locations WHERE id = $1",
            &[&location_id],
        )
        .await?;
    Ok(row.map(|row| row_to_location_record(&row)))
}

/// Read one client with all owned and referenced rows joined in.
///
/// Callable on a pooled connection or inside an open transaction; the write
/// paths use the latter so the response reflects exactly what was committed.
async fn fetch_client_aggregate<C>(
    conn: &C,
    client_id: Uuid,
) -> Result<Option<ClientAggregate>, DatabaseError>
where
    C: GenericClient + Sync,
{
    let Some(client_row) = conn
        .query_opt(
            "SELECT id, legal_first_name, legal_last_name, preferred_name, date_of_birth, \
                    is_active, is_waitlist, primary_clinician_id, primary_location_id, \
                    created_at, updated_at \
             FROM clients WHERE id = $1",
            &[&client_id],
        )
        .await?
    else {
        return Ok(None);
    };
    let client = row_to_client_record(&client_row);

    let contact_rows = conn
        .query(
            "SELECT id, client_id, contact_type, kind, value, permission, is_primary, sort_order \
             FROM contact_methods WHERE client_id = $1 \
             ORDER BY contact_type, sort_order, id",
            &[&client_id],
        )
        .await?;
    let mut contact_methods = Vec::with_capacity(contact_rows.len());
    for row in &contact_rows {
        contact_methods.push(row_to_contact_method(row)?);
    }

    let pref_rows = conn
        .query(
            "SELECT id, client_id, reminder_type, is_enabled \
             FROM reminder_preferences WHERE client_id = $1 \
             ORDER BY reminder_type",
            &[&client_id],
        )
        .await?;
    let mut reminder_preferences = Vec::with_capacity(pref_rows.len());
    for row in &pref_rows {
        reminder_preferences.push(row_to_reminder_preference(row)?);
    }

    let clinician = match client.primary_clinician_id {
        Some(id) => fetch_clinician(conn, id).await?,
        None => None,
    };
    let location = match client.primary_location_id {
        Some(id) => fetch_location(conn, id).await?,
        None => None,
    };

    let group_membership = conn
        .query_opt(
            "SELECT m.id, m.client_id, m.client_group_id, m.role, m.is_contact_only, \
                    m.is_responsible_for_billing, \
                    g.name AS group_name, g.group_type, g.created_at AS group_created_at \
             FROM client_group_memberships m \
             JOIN client_groups g ON g.id = m.client_group_id \
             WHERE m.client_id = $1",
            &[&client_id],
        )
        .await?
        .map(|row| row_to_membership_view(&row));

    Ok(Some(ClientAggregate {
        client,
        contact_methods,
        reminder_preferences,
        clinician,
        location,
        group_membership,
    }))
}

async fn insert_contact_method<C>(
    conn: &C,
    client_id: Uuid,
    seed: &ContactMethodSeed,
) -> Result<(), DatabaseError>
where
    C: GenericClient + Sync,
{
    conn.execute(
        "INSERT INTO contact_methods \
         (id, client_id, contact_type, kind, value, permission, is_primary, sort_order) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        &[
            &Uuid::new_v4(),
            &client_id,
            &seed.contact_type.as_str(),
            &seed.kind,
            &seed.value,
            &seed.permission,
            &seed.is_primary,
            &seed.sort_order,
        ],
    )
    .await?;
    Ok(())
}

async fn insert_group_membership<C>(
    conn: &C,
    client_id: Uuid,
    client_group_id: Uuid,
    attrs: &MembershipAttrs,
) -> Result<(), DatabaseError>
where
    C: GenericClient + Sync,
{
    conn.execute(
        "INSERT INTO client_group_memberships \
         (id, client_id, client_group_id, role, is_contact_only, is_responsible_for_billing) \
         VALUES ($1, $2, $3, $4, $5, $6)",
        &[
            &Uuid::new_v4(),
            &client_id,
            &client_group_id,
            &attrs.role,
            &attrs.is_contact_only,
            &attrs.is_responsible_for_billing,
        ],
    )
    .await?;
    Ok(())
}

/// Replace one channel's contact methods: delete that channel's rows, then
/// insert the reconciled replacement. The other channel is untouched.
async fn replace_contact_methods<C>(
    conn: &C,
    client_id: Uuid,
    channel: ContactChannel,
    entries: &[ContactEntry],
) -> Result<(), DatabaseError>
where
    C: GenericClient + Sync,
{
    conn.execute(
        "DELETE FROM contact_methods WHERE client_id = $1 AND contact_type = $2",
        &[&client_id, &channel.as_str()],
    )
    .await?;
    for seed in reconcile_channel(channel, entries) {
        insert_contact_method(conn, client_id, &seed).await?;
    }
    Ok(())
}

async fn replace_reminder_preferences<C>(
    conn: &C,
    client_id: Uuid,
    toggles: &ReminderToggles,
) -> Result<(), DatabaseError>
where
    C: GenericClient + Sync,
{
    conn.execute(
        "DELETE FROM reminder_preferences WHERE client_id = $1",
        &[&client_id],
    )
    .await?;
    for seed in reminder_rows(toggles) {
        conn.execute(
            "INSERT INTO reminder_preferences (id, client_id, reminder_type, is_enabled) \
             VALUES ($1, $2, $3, $4)",
            &[
                &Uuid::new_v4(),
                &client_id,
                &seed.reminder_type.as_str(),
                &seed.is_enabled,
            ],
        )
        .await?;
    }
    Ok(())
}

async fn replace_group_membership<C>(
    conn: &C,
    client_id: Uuid,
    binding: &MembershipBinding,
) -> Result<(), DatabaseError>
where
    C: GenericClient + Sync,
{
    conn.execute(
        "DELETE FROM client_group_memberships WHERE client_id = $1",
        &[&client_id],
    )
    .await?;
    insert_group_membership(conn, client_id, binding.client_group_id, &binding.attrs).await
}

/// Insert one client with all child rows and re-read the aggregate through
/// the same connection, so callers inside a transaction see their own writes.
async fn insert_client_aggregate<C>(
    conn: &C,
    client_group_id: Uuid,
    params: &CreateClientParams,
) -> Result<ClientAggregate, DatabaseError>
where
    C: GenericClient + Sync,
{
    let row = conn
        .query_one(
            "INSERT INTO clients \
             (id, legal_first_name, legal_last_name, preferred_name, date_of_birth, \
              is_active, is_waitlist, primary_clinician_id, primary_location_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id",
            &[
                &Uuid::new_v4(),
                &params.legal_first_name,
                &params.legal_last_name,
                &params.preferred_name,
                &params.date_of_birth,
                &params.status.is_active(),
                &params.status.is_waitlist(),
                &params.primary_clinician_id,
                &params.primary_location_id,
            ],
        )
        .await?;
    let client_id: Uuid = row.get(0);

    insert_group_membership(conn, client_id, client_group_id, &params.membership).await?;

    for seed in reconcile_contact_methods(&params.emails, &params.phones) {
        insert_contact_method(conn, client_id, &seed).await?;
    }
    for seed in reminder_rows(&params.notification_options) {
        conn.execute(
            "INSERT INTO reminder_preferences (id, client_id, reminder_type, is_enabled) \
             VALUES ($1, $2, $3, $4)",
            &[
                &Uuid::new_v4(),
                &client_id,
                &seed.reminder_type.as_str(),
                &seed.is_enabled,
            ],
        )
        .await?;
    }

    fetch_client_aggregate(conn, client_id)
        .await?
        .ok_or_else(|| {
            DatabaseError::Query(format!(
                "client {} not readable inside its own transaction",
                client_id
            ))
        })
}

// ==================== Database (supertrait) ====================

#[async_trait]
impl Database for PgBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let mut conn = self.conn().await?;
        embedded::migrations::runner().run_async(&mut **conn).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

// ==================== ClientStore ====================

#[async_trait]
impl ClientStore for PgBackend {
    async fn create_clients(
        &self,
        batch: &CreateClientBatch,
    ) -> Result<Vec<ClientAggregate>, DatabaseError> {
        let mut conn = self.conn().await?;
        let tx = conn.transaction().await?;

        let mut aggregates = Vec::with_capacity(batch.clients.len());
        for params in &batch.clients {
            let aggregate = insert_client_aggregate(&tx, batch.client_group_id, params).await?;
            aggregates.push(aggregate);
        }

        tx.commit().await?;
        Ok(aggregates)
    }

    async fn get_client(&self, client_id: Uuid) -> Result<Option<ClientAggregate>, DatabaseError> {
        let conn = self.conn().await?;
        fetch_client_aggregate(&conn, client_id).await
    }

    async fn list_clients(&self) -> Result<Vec<ClientAggregate>, DatabaseError> {
        let conn = self.conn().await?;
        let client_rows = conn
            .query(
                "SELECT id, legal_first_name, legal_last_name, preferred_name, date_of_birth, \
                        is_active, is_waitlist, primary_clinician_id, primary_location_id, \
                        created_at, updated_at \
                 FROM clients ORDER BY created_at, id",
                &[],
            )
            .await?;
        if client_rows.is_empty() {
            return Ok(Vec::new());
        }
        let clients: Vec<ClientRecord> = client_rows.iter().map(row_to_client_record).collect();
        let ids: Vec<Uuid> = clients.iter().map(|c| c.id).collect();

        let mut contacts_by_client: HashMap<Uuid, Vec<ContactMethodRecord>> = HashMap::new();
        let contact_rows = conn
            .query(
                "SELECT id, client_id, contact_type, kind, value, permission, is_primary, sort_order \
                 FROM contact_methods WHERE client_id = ANY($1) \
                 ORDER BY contact_type, sort_order, id",
                &[&ids],
            )
            .await?;
        for row in &contact_rows {
            let record = row_to_contact_method(row)?;
            contacts_by_client
                .entry(record.client_id)
                .or_default()
                .push(record);
        }

        let mut prefs_by_client: HashMap<Uuid, Vec<ReminderPreferenceRecord>> = HashMap::new();
        let pref_rows = conn
            .query(
                "SELECT id, client_id, reminder_type, is_enabled \
                 FROM reminder_preferences WHERE client_id = ANY($1) \
                 ORDER BY reminder_type",
                &[&ids],
            )
            .await?;
        for row in &pref_rows {
            let record = row_to_reminder_preference(row)?;
            prefs_by_client
                .entry(record.client_id)
                .or_default()
                .push(record);
        }

        let mut membership_by_client: HashMap<Uuid, GroupMembershipView> = HashMap::new();
        let membership_rows = conn
            .query(
                "SELECT m.id, m.client_id, m.client_group_id, m.role, m.is_contact_only, \
                        m.is_responsible_for_billing, \
                        g.name AS group_name, g.group_type, g.created_at AS group_created_at \
                 FROM client_group_memberships m \
                 JOIN client_groups g ON g.id = m.client_group_id \
                 WHERE m.client_id = ANY($1)",
                &[&ids],
            )
            .await?;
        for row in &membership_rows {
            let view = row_to_membership_view(row);
            membership_by_client.insert(view.membership.client_id, view);
        }

        let mut clinician_ids: Vec<Uuid> = clients
            .iter()
            .filter_map(|c| c.primary_clinician_id)
            .collect();
        clinician_ids.sort_unstable();
        clinician_ids.dedup();
        let mut clinicians: HashMap<Uuid, ClinicianRecord> = HashMap::new();
        if !clinician_ids.is_empty() {
            let rows = conn
                .query(
                    "SELECT id, first_name, last_name, email, created_at \
                     FROM clinicians WHERE id = ANY($1)",
                    &[&clinician_ids],
                )
                .await?;
            for row in &rows {
                let record = row_to_clinician_record(row);
                clinicians.insert(record.id, record);
            }
        }

        let mut location_ids: Vec<Uuid> = clients
            .iter()
            .filter_map(|c| c.primary_location_id)
            .collect();
        location_ids.sort_unstable();
        location_ids.dedup();
        let mut locations: HashMap<Uuid, LocationRecord> = HashMap::new();
        if !location_ids.is_empty() {
            let rows = conn
                .query(
                    "SELECT id, name, address, created_at FROM locations WHERE id = ANY($1)",
                    &[&location_ids],
                )
                .await?;
            for row in &rows {
                let record = row_to_location_record(row);
                locations.insert(record.id, record);
            }
        }

        let mut aggregates = Vec::with_capacity(clients.len());
        for client in clients {
            let clinician = client
                .primary_clinician_id
                .and_then(|id| clinicians.get(&id).cloned());
            let location = client
                .primary_location_id
                .and_then(|id| locations.get(&id).cloned());
            let contact_methods = contacts_by_client.remove(&client.id).unwrap_or_default();
            let reminder_preferences = prefs_by_client.remove(&client.id).unwrap_or_default();
            let group_membership = membership_by_client.remove(&client.id);
            aggregates.push(ClientAggregate {
                client,
                contact_methods,
                reminder_preferences,
                clinician,
                location,
                group_membership,
            });
        }
        Ok(aggregates)
    }

    async fn update_client(
        &self,
        client_id: Uuid,
        input: &UpdateClientParams,
    ) -> Result<Option<ClientAggregate>, DatabaseError> {
        let mut conn = self.conn().await?;

        // Unknown ids are decided before any transaction is opened.
        let Some(existing) = conn
            .query_opt(
                "SELECT preferred_name, date_of_birth, primary_clinician_id, primary_location_id \
                 FROM clients WHERE id = $1",
                &[&client_id],
            )
            .await?
        else {
            return Ok(None);
        };

        let current_preferred: Option<String> = existing.get("preferred_name");
        let current_dob: Option<NaiveDate> = existing.get("date_of_birth");
        let current_clinician: Option<Uuid> = existing.get("primary_clinician_id");
        let current_location: Option<Uuid> = existing.get("primary_location_id");

        // Absent means keep, explicit null means clear.
        let preferred_name = input.preferred_name.clone().unwrap_or(current_preferred);
        let date_of_birth = input.date_of_birth.unwrap_or(current_dob);
        let clinician_id = input.primary_clinician_id.unwrap_or(current_clinician);
        let location_id = input.primary_location_id.unwrap_or(current_location);

        let tx = conn.transaction().await?;

        tx.execute(
            "UPDATE clients SET \
                legal_first_name = $2, \
                legal_last_name = $3, \
                preferred_name = $4, \
                date_of_birth = $5, \
                is_active = $6, \
                is_waitlist = $7, \
                primary_clinician_id = $8, \
                primary_location_id = $9, \
                updated_at = NOW() \
             WHERE id = $1",
            &[
                &client_id,
                &input.legal_first_name,
                &input.legal_last_name,
                &preferred_name,
                &date_of_birth,
                &input.status.is_active(),
                &input.status.is_waitlist(),
                &clinician_id,
                &location_id,
            ],
        )
        .await?;

        if let Some(binding) = input.membership.replacement() {
            replace_group_membership(&tx, client_id, binding).await?;
        }
        if let Some(entries) = input.emails.replacement() {
            replace_contact_methods(&tx, client_id, ContactChannel::Email, entries).await?;
        }
        if let Some(entries) = input.phones.replacement() {
            replace_contact_methods(&tx, client_id, ContactChannel::Phone, entries).await?;
        }
        if let Some(toggles) = input.notification_options.replacement() {
            replace_reminder_preferences(&tx, client_id, toggles).await?;
        }

        let aggregate = fetch_client_aggregate(&tx, client_id).await?;
        tx.commit().await?;
        Ok(aggregate)
    }

    async fn deactivate_client(
        &self,
        client_id: Uuid,
    ) -> Result<Option<ClientRecord>, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "UPDATE clients SET is_active = FALSE, updated_at = NOW() \
                 WHERE id = $1 \
                 RETURNING id, legal_first_name, legal_last_name, preferred_name, date_of_birth, \
                           is_active, is_waitlist, primary_clinician_id, primary_location_id, \
                           created_at, updated_at",
                &[&client_id],
            )
            .await?;
        Ok(row.map(|row| row_to_client_record(&row)))
    }
}

// ==================== DirectoryStore ====================

#[async_trait]
impl DirectoryStore for PgBackend {
    async fn create_client_group(
        &self,
        input: &CreateClientGroupParams,
    ) -> Result<ClientGroupRecord, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                "INSERT INTO client_groups (id, name, group_type) VALUES ($1, $2, $3) \
                 RETURNING id, name, group_type, created_at",
                &[&Uuid::new_v4(), &input.name, &input.group_type],
            )
            .await?;
        Ok(row_to_client_group_record(&row))
    }

    async fn get_client_group(
        &self,
        group_id: Uuid,
    ) -> Result<Option<ClientGroupRecord>, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT id, name, group_type, created_at FROM client_groups WHERE id = $1",
                &[&group_id],
            )
            .await?;
        Ok(row.map(|row| row_to_client_group_record(&row)))
    }

    async fn create_clinician(
        &self,
        input: &CreateClinicianParams,
    ) -> Result<ClinicianRecord, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                "INSERT INTO clinicians (id, first_name, last_name, email) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING id, first_name, last_name, email, created_at",
                &[
                    &Uuid::new_v4(),
                    &input.first_name,
                    &input.last_name,
                    &input.email,
                ],
            )
            .await?;
        Ok(row_to_clinician_record(&row))
    }

    async fn create_location(
        &self,
        input: &CreateLocationParams,
    ) -> Result<LocationRecord, DatabaseError> {
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                "INSERT INTO locations (id, name, address) VALUES ($1, $2, $3) \
                 RETURNING id, name, address, created_at",
                &[&Uuid::new_v4(), &input.name, &input.address],
            )
            .await?;
        Ok(row_to_location_record(&row))
    }
}
