//! Redis-hosted platform.
//!
//! Rows are JSON strings; lookups go through per-column index sets and a
//! creation-ordered id set (see [`KeyContext`]). Writes run as Lua scripts so
//! unique keys, indexes and the row itself change together.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::auth::{CredentialHasher, SESSION_TTL_SECONDS, issue_session, normalize_email, validate_sign_up};
use super::rows::{
    MAX_CASCADE_DEPTH, ServerClock, descriptor_for, format_timestamp, prepare_insert, prepare_update,
    profile_row_for, validate_query,
};
use super::{AuthUser, Credentials, Platform, Session, SignUp, StoredObject, expect_single, object_url};
use crate::{
    errors::PlatformError,
    id::generate_user_id,
    keys::KeyContext,
    models::register_schema,
    policy::{self, Caller, Operation, PolicyRule},
    query::{Filter, Query},
    registry,
    runtime::{
        commands::{DeletedRow, RowDelete, RowWrite, key_value},
        executor::{execute_delete, execute_write},
    },
    types::{OnDelete, Row, TableDescriptor},
};

#[derive(Serialize, Deserialize)]
struct StoredAccount {
    user: AuthUser,
    password_hash: String,
}

pub struct RedisPlatform {
    connection: ConnectionManager,
    keys: KeyContext,
    session: Mutex<Option<Session>>,
    clock: ServerClock,
    hasher: CredentialHasher,
    public_base_url: String,
}

impl RedisPlatform {
    /// Connect to `url` and keep every key under `prefix`.
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, PlatformError> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self::from_connection(connection, prefix))
    }

    pub fn from_connection(connection: ConnectionManager, prefix: impl Into<String>) -> Self {
        register_schema();
        Self {
            connection,
            keys: KeyContext::new(prefix),
            session: Mutex::new(None),
            clock: ServerClock::default(),
            hasher: CredentialHasher::default(),
            public_base_url: "http://localhost:54321".to_string(),
        }
    }

    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = url.into();
        self
    }

    /// Use a cheaper password hash, for tests and local demos.
    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn keys(&self) -> &KeyContext {
        &self.keys
    }

    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }

    fn session_slot(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn caller(&self) -> Caller {
        let session = self.session_slot();
        Caller::from_user(
            session
                .as_ref()
                .filter(|session| !session.is_expired())
                .map(|session| session.user.id.as_str()),
        )
    }

    /// Resume a session persisted by an earlier process. Returns `None` when
    /// the token is unknown or expired.
    pub async fn restore_session(&self, access_token: &str) -> Result<Option<Session>, PlatformError> {
        let mut conn = self.connection.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.keys.session(access_token))
            .query_async(&mut conn)
            .await?;
        let session = match raw {
            Some(raw) => Some(serde_json::from_str::<Session>(&raw).map_err(PlatformError::serialization)?),
            None => None,
        }
        .filter(|session| !session.is_expired());
        *self.session_slot() = session.clone();
        Ok(session)
    }

    async fn store_session(&self, session: &Session) -> Result<(), PlatformError> {
        let mut conn = self.connection.clone();
        let payload = serde_json::to_string(session).map_err(PlatformError::serialization)?;
        let _: () = redis::cmd("SET")
            .arg(self.keys.session(&session.access_token))
            .arg(payload)
            .arg("EX")
            .arg(SESSION_TTL_SECONDS)
            .query_async(&mut conn)
            .await?;
        *self.session_slot() = Some(session.clone());
        Ok(())
    }

    async fn fetch_rows(
        &self,
        conn: &mut ConnectionManager,
        table: &str,
        ids: &[String],
    ) -> Result<Vec<(Row, String)>, PlatformError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = ids.iter().map(|id| self.keys.row(table, id)).collect();
        let raw: Vec<Option<String>> = redis::cmd("MGET").arg(&keys).query_async(conn).await?;
        raw.into_iter()
            .flatten()
            .map(|json| {
                let row: Row = serde_json::from_str(&json).map_err(PlatformError::serialization)?;
                Ok((row, json))
            })
            .collect()
    }

    /// Narrow the candidate ids with the most selective index the filters allow.
    async fn candidate_ids(
        &self,
        conn: &mut ConnectionManager,
        descriptor: &TableDescriptor,
        query: &Query,
    ) -> Result<Vec<String>, PlatformError> {
        for filter in &query.filters {
            match filter {
                Filter::Eq { column, value } if *column == descriptor.id_column => {
                    return Ok(key_value(value).into_iter().collect());
                }
                Filter::In { column, values } if *column == descriptor.id_column => {
                    return Ok(values.iter().filter_map(key_value).collect());
                }
                Filter::Eq { column, value } if descriptor.is_indexed(column) => {
                    let Some(value) = key_value(value) else {
                        return Ok(Vec::new());
                    };
                    let ids: Vec<String> = redis::cmd("SMEMBERS")
                        .arg(self.keys.index(&descriptor.table, column, &value))
                        .query_async(conn)
                        .await?;
                    return Ok(ids);
                }
                Filter::In { column, values } if descriptor.is_indexed(column) => {
                    let index_keys: Vec<String> = values
                        .iter()
                        .filter_map(key_value)
                        .map(|value| self.keys.index(&descriptor.table, column, &value))
                        .collect();
                    if index_keys.is_empty() {
                        return Ok(Vec::new());
                    }
                    let ids: Vec<String> = redis::cmd("SUNION").arg(&index_keys).query_async(conn).await?;
                    return Ok(ids);
                }
                _ => {}
            }
        }
        let ids: Vec<String> = redis::cmd("ZRANGE")
            .arg(self.keys.ids(&descriptor.table))
            .arg(0)
            .arg(-1)
            .query_async(conn)
            .await?;
        Ok(ids)
    }

    /// Every row matching the query's filters that `caller` may see, unordered
    /// and unpaged, with the stored JSON of each row.
    async fn load_matching(
        &self,
        conn: &mut ConnectionManager,
        descriptor: &TableDescriptor,
        query: &Query,
        caller: &Caller,
    ) -> Result<Vec<(Row, String)>, PlatformError> {
        let ids = self.candidate_ids(conn, descriptor, query).await?;
        let rows = self.fetch_rows(conn, &descriptor.table, &ids).await?;
        Ok(rows
            .into_iter()
            .filter(|(row, _)| query.matches(row) && policy::permits(descriptor, Operation::Select, caller, row))
            .collect())
    }

    /// Unfiltered page ordered by creation time, straight from the id set.
    fn creation_order_page(descriptor: &TableDescriptor, query: &Query) -> Option<(bool, isize, isize)> {
        let created_at = descriptor.created_at_column.as_deref()?;
        if !query.filters.is_empty() || descriptor.policies.select != PolicyRule::Anyone {
            return None;
        }
        let [order] = query.order.as_slice() else {
            return None;
        };
        if order.column != created_at {
            return None;
        }
        let start = query.offset as isize;
        let stop = match query.limit {
            Some(0) => return Some((false, 1, 0)),
            Some(limit) => start + limit as isize - 1,
            None => -1,
        };
        Some((order.order == crate::query::SortOrder::Desc, start, stop))
    }

    async fn embed(
        &self,
        conn: &mut ConnectionManager,
        query: &Query,
        caller: &Caller,
        rows: &mut [Row],
    ) -> Result<(), PlatformError> {
        for expand in &query.expand {
            let target = descriptor_for(&expand.table)?;
            let ids: Vec<String> = rows
                .iter()
                .filter_map(|row| row.get(&expand.column).and_then(key_value))
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            let found: HashMap<String, Row> = self
                .fetch_rows(conn, &target.table, &ids)
                .await?
                .into_iter()
                .filter(|(row, _)| policy::permits(&target, Operation::Select, caller, row))
                .filter_map(|(row, _)| target.id_of(&row).map(str::to_string).map(|id| (id, row)))
                .collect();
            for row in rows.iter_mut() {
                let embedded = row
                    .get(&expand.column)
                    .and_then(key_value)
                    .and_then(|id| found.get(&id).cloned())
                    .map(Value::Object)
                    .unwrap_or(Value::Null);
                row.insert(expand.alias.clone(), embedded);
            }
        }
        Ok(())
    }

    async fn insert_as(&self, caller: &Caller, table: &str, row: Row) -> Result<Row, PlatformError> {
        let descriptor = descriptor_for(table)?;
        let now = self.clock.now();
        let row = prepare_insert(&descriptor, row, &format_timestamp(now))?;
        policy::check(&descriptor, Operation::Insert, caller, &row)?;
        let command = RowWrite::insert(&self.keys, &descriptor, &row, now.timestamp_micros())?;
        let mut conn = self.connection.clone();
        execute_write(&mut conn, &command).await?;
        Ok(row)
    }

    /// Rows of `descriptor` whose `column` holds `id`.
    async fn rows_referencing(
        &self,
        conn: &mut ConnectionManager,
        descriptor: &TableDescriptor,
        column: &str,
        id: &str,
    ) -> Result<Vec<Row>, PlatformError> {
        let ids: Vec<String> = redis::cmd("SMEMBERS")
            .arg(self.keys.index(&descriptor.table, column, id))
            .query_async(&mut *conn)
            .await?;
        Ok(self
            .fetch_rows(conn, &descriptor.table, &ids)
            .await?
            .into_iter()
            .map(|(row, _)| row)
            .filter(|row| row.get(column).and_then(Value::as_str) == Some(id))
            .collect())
    }
}

impl Platform for RedisPlatform {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, PlatformError> {
        log::debug!("redis platform: select {query}");
        let descriptor = descriptor_for(&query.table)?;
        validate_query(&descriptor, query)?;
        let caller = self.caller();
        let mut conn = self.connection.clone();

        let mut rows: Vec<Row> = match Self::creation_order_page(&descriptor, query) {
            Some((descending, start, stop)) => {
                let command = if descending { "ZREVRANGE" } else { "ZRANGE" };
                let ids: Vec<String> = redis::cmd(command)
                    .arg(self.keys.ids(&descriptor.table))
                    .arg(start)
                    .arg(stop)
                    .query_async(&mut conn)
                    .await?;
                let rows = self.fetch_rows(&mut conn, &descriptor.table, &ids).await?;
                rows.into_iter().map(|(row, _)| row).collect()
            }
            None => {
                let rows = self.load_matching(&mut conn, &descriptor, query, &caller).await?;
                query.sort_and_page(rows.into_iter().map(|(row, _)| row).collect())
            }
        };

        self.embed(&mut conn, query, &caller, &mut rows).await?;
        let rows = rows.into_iter().map(|row| query.project(row)).collect();
        expect_single(query, rows)
    }

    async fn count(&self, query: &Query) -> Result<u64, PlatformError> {
        log::debug!("redis platform: count {query}");
        let descriptor = descriptor_for(&query.table)?;
        validate_query(&descriptor, query)?;
        let mut conn = self.connection.clone();

        if descriptor.policies.select == PolicyRule::Anyone
            && let [Filter::Eq { column, value }] = query.filters.as_slice()
            && *column != descriptor.id_column
            && descriptor.is_indexed(column)
            && let Some(value) = key_value(value)
        {
            let count: u64 = redis::cmd("SCARD")
                .arg(self.keys.index(&descriptor.table, column, &value))
                .query_async(&mut conn)
                .await?;
            return Ok(count);
        }

        let caller = self.caller();
        let rows = self.load_matching(&mut conn, &descriptor, query, &caller).await?;
        Ok(rows.len() as u64)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, PlatformError> {
        log::debug!("redis platform: insert {table}");
        self.insert_as(&self.caller(), table, row).await
    }

    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, PlatformError> {
        log::debug!("redis platform: update {query}");
        let descriptor = descriptor_for(&query.table)?;
        validate_query(&descriptor, query)?;
        let caller = self.caller();
        let mut conn = self.connection.clone();

        let targets = self.load_matching(&mut conn, &descriptor, query, &caller).await?;
        let mut updated = Vec::with_capacity(targets.len());
        for (existing, existing_json) in targets {
            if !policy::permits(&descriptor, Operation::Update, &caller, &existing) {
                continue;
            }
            let merged = prepare_update(&descriptor, &existing, &patch, &self.clock.timestamp())?;
            policy::check(&descriptor, Operation::Update, &caller, &merged)?;
            let command = RowWrite::update(&self.keys, &descriptor, &existing, existing_json, &merged)?;
            execute_write(&mut conn, &command).await?;
            updated.push(merged);
        }
        Ok(updated)
    }

    async fn delete(&self, query: &Query) -> Result<Vec<Row>, PlatformError> {
        log::debug!("redis platform: delete {query}");
        let descriptor = descriptor_for(&query.table)?;
        validate_query(&descriptor, query)?;
        let caller = self.caller();
        let mut conn = self.connection.clone();

        let targets: Vec<Row> = self
            .load_matching(&mut conn, &descriptor, query, &caller)
            .await?
            .into_iter()
            .map(|(row, _)| row)
            .filter(|row| policy::permits(&descriptor, Operation::Delete, &caller, row))
            .collect();
        if targets.is_empty() {
            return Ok(targets);
        }

        let mut pending: Vec<(TableDescriptor, Row, usize)> =
            targets.iter().map(|row| (descriptor.clone(), row.clone(), 0)).collect();
        let mut doomed: Vec<DeletedRow> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        while let Some((current, row, depth)) = pending.pop() {
            if depth > MAX_CASCADE_DEPTH {
                return Err(PlatformError::InvalidRequest {
                    message: format!("cascade from {} exceeds depth {MAX_CASCADE_DEPTH}", descriptor.table),
                });
            }
            let deleted = DeletedRow::new(&self.keys, &current, &row)?;
            if !seen.insert(deleted.key.clone()) {
                continue;
            }
            for dependent in registry::dependents_of(&current.table) {
                let child = descriptor_for(&dependent.table)?;
                let children = self.rows_referencing(&mut conn, &child, &dependent.column, &deleted.id).await?;
                if children.is_empty() {
                    continue;
                }
                match dependent.on_delete {
                    OnDelete::Restrict => {
                        return Err(PlatformError::ForeignKeyViolation {
                            table: dependent.table,
                            column: dependent.column,
                        });
                    }
                    OnDelete::Cascade => {
                        pending.extend(children.into_iter().map(|child_row| (child.clone(), child_row, depth + 1)));
                    }
                }
            }
            doomed.push(deleted);
        }

        let command = RowDelete {
            table: descriptor.table.clone(),
            rows: doomed,
        };
        let removed = execute_delete(&mut conn, &command).await?;
        log::debug!("redis platform: delete on {} removed {removed} rows", descriptor.table);
        Ok(targets)
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: &[u8],
        content_type: &str,
        upsert: bool,
    ) -> Result<StoredObject, PlatformError> {
        log::debug!("redis platform: upload {bucket}/{path} ({} bytes)", bytes.len());
        policy::check_object_path(&self.caller(), path)?;
        let key = self.keys.object(bucket, path);
        let mut conn = self.connection.clone();

        if upsert {
            let _: () = redis::cmd("DEL").arg(&key).query_async(&mut conn).await?;
        }
        let claimed: bool = redis::cmd("HSETNX")
            .arg(&key)
            .arg("content_type")
            .arg(content_type)
            .query_async(&mut conn)
            .await?;
        if !claimed {
            return Err(PlatformError::Duplicate {
                what: format!("object {bucket}/{path}"),
            });
        }
        let _: () = redis::cmd("HSET")
            .arg(&key)
            .arg("size")
            .arg(bytes.len())
            .arg("bytes")
            .arg(bytes)
            .query_async(&mut conn)
            .await?;

        Ok(StoredObject {
            bucket: bucket.to_string(),
            path: path.to_string(),
            content_type: content_type.to_string(),
            size: bytes.len(),
        })
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        object_url(&self.public_base_url, bucket, path)
    }

    async fn sign_up(&self, request: &SignUp) -> Result<Session, PlatformError> {
        validate_sign_up(request)?;
        let email = normalize_email(&request.email);
        let user = AuthUser {
            id: generate_user_id(),
            email: email.clone(),
            created_at: self.clock.now(),
        };
        let account = StoredAccount {
            user: user.clone(),
            password_hash: self.hasher.hash(&request.password)?,
        };
        let payload = serde_json::to_string(&account).map_err(PlatformError::serialization)?;
        let account_key = self.keys.account(&email);
        let mut conn = self.connection.clone();

        let claimed: Option<String> = redis::cmd("SET")
            .arg(&account_key)
            .arg(payload)
            .arg("NX")
            .query_async(&mut conn)
            .await?;
        if claimed.is_none() {
            return Err(PlatformError::Duplicate {
                what: "account".to_string(),
            });
        }

        if let Err(err) = self
            .insert_as(&Caller::System, "profiles", profile_row_for(&user, request))
            .await
        {
            let _: () = redis::cmd("DEL").arg(&account_key).query_async(&mut conn).await?;
            return Err(err);
        }
        log::info!("redis platform: created account {}", user.id);

        let session = issue_session(user);
        self.store_session(&session).await?;
        Ok(session)
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, PlatformError> {
        let email = normalize_email(&credentials.email);
        let mut conn = self.connection.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.keys.account(&email))
            .query_async(&mut conn)
            .await?;
        let Some(raw) = raw else {
            return Err(PlatformError::InvalidCredentials);
        };
        let account: StoredAccount = serde_json::from_str(&raw).map_err(PlatformError::serialization)?;
        if !self.hasher.verify(&credentials.password, &account.password_hash) {
            return Err(PlatformError::InvalidCredentials);
        }
        let session = issue_session(account.user);
        self.store_session(&session).await?;
        Ok(session)
    }

    async fn current_session(&self) -> Result<Option<Session>, PlatformError> {
        let mut slot = self.session_slot();
        if slot.as_ref().is_some_and(Session::is_expired) {
            *slot = None;
        }
        Ok(slot.clone())
    }

    async fn current_user(&self) -> Result<Option<AuthUser>, PlatformError> {
        Ok(self.current_session().await?.map(|session| session.user))
    }

    async fn sign_out(&self) -> Result<(), PlatformError> {
        let session = self.session_slot().take();
        if let Some(session) = session {
            let mut conn = self.connection.clone();
            let _: () = redis::cmd("DEL")
                .arg(self.keys.session(&session.access_token))
                .query_async(&mut conn)
                .await?;
        }
        Ok(())
    }
}
