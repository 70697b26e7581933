//! In-process platform.
//!
//! Keeps every table, stored object and account in memory and enforces the
//! same policies and constraints as the hosted backend. Every call is recorded
//! so callers can assert on the exact requests issued, and failures can be
//! injected per operation and table.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::Semaphore;

use super::auth::{CredentialHasher, issue_session, normalize_email, validate_sign_up};
use super::rows::{
    MAX_CASCADE_DEPTH, ServerClock, descriptor_for, format_timestamp, prepare_insert, prepare_update,
    profile_row_for, unique_conflict, unique_violation, validate_query,
};
use super::{AuthUser, Credentials, Platform, Session, SignUp, StoredObject, expect_single, object_url};
use crate::{
    errors::PlatformError,
    id::generate_user_id,
    models::register_schema,
    policy::{self, Caller, Operation},
    query::Query,
    registry,
    types::{OnDelete, Row, TableDescriptor},
};

const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:54321";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Select,
    Count,
    Insert,
    Update,
    Delete,
    Upload,
    Auth,
}

impl RequestKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            RequestKind::Select => "select",
            RequestKind::Count => "count",
            RequestKind::Insert => "insert",
            RequestKind::Update => "update",
            RequestKind::Delete => "delete",
            RequestKind::Upload => "upload",
            RequestKind::Auth => "auth",
        }
    }

    fn is_mutation(self) -> bool {
        matches!(
            self,
            RequestKind::Insert | RequestKind::Update | RequestKind::Delete | RequestKind::Upload
        )
    }
}

/// One recorded platform call.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub kind: RequestKind,
    /// Table, bucket, or `auth`.
    pub target: String,
    pub detail: String,
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.detail)
    }
}

/// Holds every mutation issued while it is alive. Reads pass through.
#[must_use = "mutations stay blocked only while the gate is held"]
pub struct MutationGate {
    semaphore: Arc<Semaphore>,
}

impl MutationGate {
    /// Let held and future mutations proceed.
    pub fn release(self) {}
}

impl Drop for MutationGate {
    fn drop(&mut self) {
        self.semaphore.close();
    }
}

struct Account {
    user: AuthUser,
    password_hash: String,
}

struct StoredBlob {
    bytes: Vec<u8>,
    content_type: String,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Row>>,
    objects: HashMap<(String, String), StoredBlob>,
    accounts: HashMap<String, Account>,
    session: Option<Session>,
    requests: Vec<Request>,
    faults: Vec<(RequestKind, String)>,
    gate: Option<Arc<Semaphore>>,
}

pub struct MemoryPlatform {
    state: Mutex<MemoryState>,
    clock: ServerClock,
    hasher: CredentialHasher,
    public_base_url: String,
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPlatform {
    pub fn new() -> Self {
        register_schema();
        Self {
            state: Mutex::new(MemoryState::default()),
            clock: ServerClock::default(),
            hasher: CredentialHasher::fast(),
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
        }
    }

    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = url.into();
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every request issued so far, in order.
    pub fn requests(&self) -> Vec<Request> {
        self.lock().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    pub fn request_count(&self, kind: RequestKind, target: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.kind == kind && r.target == target)
            .count()
    }

    /// Fail the next `kind` request against `target` with
    /// [`PlatformError::Injected`]. Faults queue up and each fires once.
    pub fn fail_next(&self, kind: RequestKind, target: &str) {
        self.lock().faults.push((kind, target.to_string()));
    }

    /// Suspend every mutation until the returned gate is released.
    pub fn hold_mutations(&self) -> MutationGate {
        let semaphore = Arc::new(Semaphore::new(0));
        self.lock().gate = Some(Arc::clone(&semaphore));
        MutationGate { semaphore }
    }

    /// Raw table contents, bypassing policies.
    pub fn table_rows(&self, table: &str) -> Vec<Row> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|blob| blob.bytes.clone())
    }

    pub fn object_content_type(&self, bucket: &str, path: &str) -> Option<String> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .map(|blob| blob.content_type.clone())
    }

    /// Record the request, fire any queued fault, then wait on the mutation
    /// gate if one is held.
    async fn begin(&self, kind: RequestKind, target: &str, detail: String) -> Result<(), PlatformError> {
        let gate = {
            let mut state = self.lock();
            log::debug!("memory platform: {} {detail}", kind.as_str());
            state.requests.push(Request {
                kind,
                target: target.to_string(),
                detail,
            });
            if let Some(index) = state.faults.iter().position(|(k, t)| *k == kind && t == target) {
                state.faults.remove(index);
                return Err(PlatformError::Injected {
                    table: target.to_string(),
                    operation: kind.as_str(),
                });
            }
            if kind.is_mutation() { state.gate.clone() } else { None }
        };
        if let Some(gate) = gate {
            // Resolves once the gate is closed.
            let _ = gate.acquire().await;
        }
        Ok(())
    }
}

impl MemoryState {
    fn caller(&self) -> Caller {
        Caller::from_user(
            self.session
                .as_ref()
                .filter(|session| !session.is_expired())
                .map(|session| session.user.id.as_str()),
        )
    }

    fn rows(&self, table: &str) -> impl Iterator<Item = &Row> + Clone {
        self.tables.get(table).into_iter().flatten()
    }

    fn visible(&self, descriptor: &TableDescriptor, caller: &Caller, query: &Query) -> Vec<Row> {
        self.rows(&descriptor.table)
            .filter(|row| query.matches(row) && policy::permits(descriptor, Operation::Select, caller, row))
            .cloned()
            .collect()
    }

    fn embed(&self, query: &Query, caller: &Caller, mut row: Row) -> Result<Row, PlatformError> {
        for expand in &query.expand {
            let target = descriptor_for(&expand.table)?;
            let embedded = row
                .get(&expand.column)
                .and_then(|key| {
                    self.rows(&target.table).find(|candidate| {
                        candidate.get(&target.id_column) == Some(key)
                            && policy::permits(&target, Operation::Select, caller, candidate)
                    })
                })
                .cloned()
                .map(Value::Object)
                .unwrap_or(Value::Null);
            row.insert(expand.alias.clone(), embedded);
        }
        Ok(row)
    }

    fn check_references(&self, descriptor: &TableDescriptor, row: &Row) -> Result<(), PlatformError> {
        for fk in &descriptor.foreign_keys {
            let Some(value) = row.get(&fk.column).filter(|v| !v.is_null()) else {
                continue;
            };
            let parent = descriptor_for(&fk.references)?;
            if !self.rows(&parent.table).any(|p| p.get(&parent.id_column) == Some(value)) {
                return Err(PlatformError::ForeignKeyViolation {
                    table: descriptor.table.clone(),
                    column: fk.column.clone(),
                });
            }
        }
        Ok(())
    }

    fn insert_row(
        &mut self,
        descriptor: &TableDescriptor,
        row: Row,
        caller: &Caller,
        now: &str,
    ) -> Result<Row, PlatformError> {
        let row = prepare_insert(descriptor, row, now)?;
        policy::check(descriptor, Operation::Insert, caller, &row)?;
        self.check_references(descriptor, &row)?;
        let id = row.get(&descriptor.id_column);
        if self.rows(&descriptor.table).any(|existing| existing.get(&descriptor.id_column) == id) {
            return Err(PlatformError::UniqueViolation {
                table: descriptor.table.clone(),
                columns: vec![descriptor.id_column.clone()],
            });
        }
        if let Some(constraint) = unique_conflict(descriptor, &row, self.rows(&descriptor.table)) {
            return Err(unique_violation(descriptor, constraint));
        }
        self.tables
            .entry(descriptor.table.clone())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    /// Collect `(table, id column, id)` for a row and everything that cascades
    /// from it. Fails if a restricting dependent still exists.
    fn collect_cascade(
        &self,
        descriptor: &TableDescriptor,
        id: &Value,
        doomed: &mut Vec<(String, String, Value)>,
        depth: usize,
    ) -> Result<(), PlatformError> {
        if depth > MAX_CASCADE_DEPTH {
            return Err(PlatformError::InvalidRequest {
                message: format!("cascade from {} exceeds depth {MAX_CASCADE_DEPTH}", descriptor.table),
            });
        }
        if doomed.iter().any(|(table, _, doomed_id)| *table == descriptor.table && doomed_id == id) {
            return Ok(());
        }
        doomed.push((descriptor.table.clone(), descriptor.id_column.clone(), id.clone()));

        for dependent in registry::dependents_of(&descriptor.table) {
            let child = descriptor_for(&dependent.table)?;
            let children: Vec<Value> = self
                .rows(&child.table)
                .filter(|row| row.get(&dependent.column) == Some(id))
                .filter_map(|row| row.get(&child.id_column).cloned())
                .collect();
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
                    for child_id in &children {
                        self.collect_cascade(&child, child_id, doomed, depth + 1)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Platform for MemoryPlatform {
    async fn select(&self, query: &Query) -> Result<Vec<Row>, PlatformError> {
        self.begin(RequestKind::Select, &query.table, query.to_string()).await?;
        let descriptor = descriptor_for(&query.table)?;
        validate_query(&descriptor, query)?;

        let state = self.lock();
        let caller = state.caller();
        let rows = query.sort_and_page(state.visible(&descriptor, &caller, query));
        let rows = rows
            .into_iter()
            .map(|row| state.embed(query, &caller, row).map(|row| query.project(row)))
            .collect::<Result<Vec<_>, _>>()?;
        expect_single(query, rows)
    }

    async fn count(&self, query: &Query) -> Result<u64, PlatformError> {
        self.begin(RequestKind::Count, &query.table, query.to_string()).await?;
        let descriptor = descriptor_for(&query.table)?;
        validate_query(&descriptor, query)?;

        let state = self.lock();
        let caller = state.caller();
        Ok(state.visible(&descriptor, &caller, query).len() as u64)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, PlatformError> {
        let detail = format!("{table} {}", Value::Object(row.clone()));
        self.begin(RequestKind::Insert, table, detail).await?;
        let descriptor = descriptor_for(table)?;
        let now = self.clock.timestamp();

        let mut state = self.lock();
        let caller = state.caller();
        state.insert_row(&descriptor, row, &caller, &now)
    }

    async fn update(&self, query: &Query, patch: Row) -> Result<Vec<Row>, PlatformError> {
        let detail = format!("{query} {}", Value::Object(patch.clone()));
        self.begin(RequestKind::Update, &query.table, detail).await?;
        let descriptor = descriptor_for(&query.table)?;
        validate_query(&descriptor, query)?;
        let now = self.clock.timestamp();

        let mut state = self.lock();
        let caller = state.caller();
        let targets: Vec<Row> = state
            .visible(&descriptor, &caller, query)
            .into_iter()
            .filter(|row| policy::permits(&descriptor, Operation::Update, &caller, row))
            .collect();

        let mut updated = Vec::with_capacity(targets.len());
        for existing in &targets {
            let merged = prepare_update(&descriptor, existing, &patch, &now)?;
            policy::check(&descriptor, Operation::Update, &caller, &merged)?;
            state.check_references(&descriptor, &merged)?;
            updated.push(merged);
        }

        let mut next: Vec<Row> = state.rows(&descriptor.table).cloned().collect();
        for merged in &updated {
            let id = merged.get(&descriptor.id_column);
            if let Some(slot) = next.iter_mut().find(|row| row.get(&descriptor.id_column) == id) {
                *slot = merged.clone();
            }
        }
        for merged in &updated {
            if let Some(constraint) = unique_conflict(&descriptor, merged, next.iter()) {
                return Err(unique_violation(&descriptor, constraint));
            }
        }
        state.tables.insert(descriptor.table.clone(), next);
        Ok(updated)
    }

    async fn delete(&self, query: &Query) -> Result<Vec<Row>, PlatformError> {
        self.begin(RequestKind::Delete, &query.table, query.to_string()).await?;
        let descriptor = descriptor_for(&query.table)?;
        validate_query(&descriptor, query)?;

        let mut state = self.lock();
        let caller = state.caller();
        let targets: Vec<Row> = state
            .visible(&descriptor, &caller, query)
            .into_iter()
            .filter(|row| policy::permits(&descriptor, Operation::Delete, &caller, row))
            .collect();

        let mut doomed = Vec::new();
        for target in &targets {
            if let Some(id) = target.get(&descriptor.id_column) {
                state.collect_cascade(&descriptor, id, &mut doomed, 0)?;
            }
        }
        for (table, id_column, id) in &doomed {
            if let Some(rows) = state.tables.get_mut(table) {
                rows.retain(|row| row.get(id_column) != Some(id));
            }
        }
        if doomed.len() > targets.len() {
            log::debug!(
                "memory platform: delete on {} cascaded to {} rows",
                descriptor.table,
                doomed.len() - targets.len()
            );
        }
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
        let detail = format!("{bucket}/{path} ({} bytes)", bytes.len());
        self.begin(RequestKind::Upload, bucket, detail).await?;

        let mut state = self.lock();
        policy::check_object_path(&state.caller(), path)?;
        let key = (bucket.to_string(), path.to_string());
        if !upsert && state.objects.contains_key(&key) {
            return Err(PlatformError::Duplicate {
                what: format!("object {bucket}/{path}"),
            });
        }
        state.objects.insert(
            key,
            StoredBlob {
                bytes: bytes.to_vec(),
                content_type: content_type.to_string(),
            },
        );
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
        let email = normalize_email(&request.email);
        self.begin(RequestKind::Auth, "auth", format!("signup {email}")).await?;
        validate_sign_up(request)?;
        let password_hash = self.hasher.hash(&request.password)?;
        let created_at = self.clock.now();
        let profiles = descriptor_for("profiles")?;

        let mut state = self.lock();
        if state.accounts.contains_key(&email) {
            return Err(PlatformError::Duplicate {
                what: "account".to_string(),
            });
        }
        let user = AuthUser {
            id: generate_user_id(),
            email: email.clone(),
            created_at,
        };
        let profile = profile_row_for(&user, request);
        state.insert_row(&profiles, profile, &Caller::System, &format_timestamp(created_at))?;
        state.accounts.insert(
            email,
            Account {
                user: user.clone(),
                password_hash,
            },
        );
        let session = issue_session(user);
        state.session = Some(session.clone());
        Ok(session)
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, PlatformError> {
        let email = normalize_email(&credentials.email);
        self.begin(RequestKind::Auth, "auth", format!("signin {email}")).await?;
        let account = self
            .lock()
            .accounts
            .get(&email)
            .map(|account| (account.user.clone(), account.password_hash.clone()));
        let Some((user, password_hash)) = account else {
            return Err(PlatformError::InvalidCredentials);
        };
        if !self.hasher.verify(&credentials.password, &password_hash) {
            return Err(PlatformError::InvalidCredentials);
        }
        let session = issue_session(user);
        self.lock().session = Some(session.clone());
        Ok(session)
    }

    async fn current_session(&self) -> Result<Option<Session>, PlatformError> {
        self.begin(RequestKind::Auth, "auth", "session".to_string()).await?;
        let mut state = self.lock();
        if state.session.as_ref().is_some_and(Session::is_expired) {
            state.session = None;
        }
        Ok(state.session.clone())
    }

    async fn current_user(&self) -> Result<Option<AuthUser>, PlatformError> {
        Ok(self.current_session().await?.map(|session| session.user))
    }

    async fn sign_out(&self) -> Result<(), PlatformError> {
        self.begin(RequestKind::Auth, "auth", "signout".to_string()).await?;
        self.lock().session = None;
        Ok(())
    }
}
