//! Write preparation shared by every platform backend.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, DurationRound, SecondsFormat, Utc};
use serde_json::Value;

use super::{AuthUser, SignUp, auth::requested_username};
use crate::{
    errors::PlatformError,
    id::generate_row_id,
    models::register_schema,
    query::{Filter, Query},
    registry,
    types::{Row, TableDescriptor, UniqueConstraint},
    validators::username_from_email,
};

/// Cascading deletes stop following foreign keys past this depth.
pub(crate) const MAX_CASCADE_DEPTH: usize = 8;

/// Hands out strictly increasing microsecond timestamps, so rows created in
/// sequence always sort in creation order.
#[derive(Debug, Default)]
pub(crate) struct ServerClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl ServerClock {
    pub(crate) fn now(&self) -> DateTime<Utc> {
        let current = Utc::now();
        let current = current
            .duration_trunc(Duration::microseconds(1))
            .unwrap_or(current);
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let next = match *last {
            Some(previous) if current <= previous => previous + Duration::microseconds(1),
            _ => current,
        };
        *last = Some(next);
        next
    }

    pub(crate) fn timestamp(&self) -> String {
        format_timestamp(self.now())
    }
}

pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn descriptor_for(table: &str) -> Result<TableDescriptor, PlatformError> {
    registry::descriptor(table)
        .or_else(|| {
            register_schema();
            registry::descriptor(table)
        })
        .ok_or_else(|| PlatformError::InvalidRequest {
            message: format!("relation \"{table}\" does not exist"),
        })
}

/// Reject queries naming columns the table does not have.
pub(crate) fn validate_query(descriptor: &TableDescriptor, query: &Query) -> Result<(), PlatformError> {
    let unknown = query
        .filters
        .iter()
        .map(Filter::column)
        .chain(query.order.iter().map(|order| order.column.as_str()))
        .chain(query.columns.iter().flatten().map(String::as_str))
        .chain(query.expand.iter().map(|expand| expand.column.as_str()))
        .find(|column| !descriptor.has_column(column));
    match unknown {
        Some(column) => Err(PlatformError::InvalidRequest {
            message: format!("column {}.{column} does not exist", descriptor.table),
        }),
        None => Ok(()),
    }
}

fn reject_unknown_columns(descriptor: &TableDescriptor, row: &Row) -> Result<(), PlatformError> {
    match row.keys().find(|key| !descriptor.has_column(key)) {
        Some(column) => Err(PlatformError::InvalidRequest {
            message: format!("column \"{column}\" of relation \"{}\" does not exist", descriptor.table),
        }),
        None => Ok(()),
    }
}

fn run_checks(descriptor: &TableDescriptor, row: &Row) -> Result<(), PlatformError> {
    match descriptor.checks.iter().find(|check| !check.holds(row)) {
        Some(check) => Err(PlatformError::CheckViolation {
            table: descriptor.table.clone(),
            constraint: check.name(),
        }),
        None => Ok(()),
    }
}

/// Stamp id and timestamps onto a new row and run its check constraints.
/// Timestamps are always server-assigned.
pub(crate) fn prepare_insert(descriptor: &TableDescriptor, mut row: Row, now: &str) -> Result<Row, PlatformError> {
    reject_unknown_columns(descriptor, &row)?;
    let has_id = row
        .get(&descriptor.id_column)
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty());
    if !has_id {
        row.insert(descriptor.id_column.clone(), Value::String(generate_row_id()));
    }
    for column in [&descriptor.created_at_column, &descriptor.updated_at_column].into_iter().flatten() {
        row.insert(column.clone(), Value::String(now.to_string()));
    }
    run_checks(descriptor, &row)?;
    Ok(row)
}

/// Merge `patch` over `existing`. The id and creation time never change.
pub(crate) fn prepare_update(
    descriptor: &TableDescriptor,
    existing: &Row,
    patch: &Row,
    now: &str,
) -> Result<Row, PlatformError> {
    reject_unknown_columns(descriptor, patch)?;
    if let Some(id) = patch.get(&descriptor.id_column)
        && existing.get(&descriptor.id_column) != Some(id)
    {
        return Err(PlatformError::InvalidRequest {
            message: format!("cannot change {}.{}", descriptor.table, descriptor.id_column),
        });
    }

    let mut merged = existing.clone();
    for (column, value) in patch {
        if descriptor.created_at_column.as_deref() == Some(column.as_str()) {
            continue;
        }
        merged.insert(column.clone(), value.clone());
    }
    if let Some(column) = &descriptor.updated_at_column {
        merged.insert(column.clone(), Value::String(now.to_string()));
    }
    run_checks(descriptor, &merged)?;
    Ok(merged)
}

/// First unique constraint `candidate` collides on among `others`.
pub(crate) fn unique_conflict<'d, 'r>(
    descriptor: &'d TableDescriptor,
    candidate: &Row,
    others: impl Iterator<Item = &'r Row> + Clone,
) -> Option<&'d UniqueConstraint> {
    let candidate_id = descriptor.id_of(candidate);
    descriptor.unique_constraints.iter().find(|constraint| {
        let Some(key) = constraint.key_values(candidate) else {
            return false;
        };
        others
            .clone()
            .filter(|other| descriptor.id_of(other) != candidate_id)
            .any(|other| constraint.key_values(other).as_ref() == Some(&key))
    })
}

pub(crate) fn unique_violation(descriptor: &TableDescriptor, constraint: &UniqueConstraint) -> PlatformError {
    PlatformError::UniqueViolation {
        table: descriptor.table.clone(),
        columns: constraint.columns.clone(),
    }
}

/// Profile row the platform creates for a new account.
pub(crate) fn profile_row_for(user: &AuthUser, request: &SignUp) -> Row {
    let username = requested_username(request).unwrap_or_else(|| username_from_email(&user.email));
    let mut row = Row::new();
    row.insert("id".to_string(), Value::String(user.id.clone()));
    row.insert("username".to_string(), Value::String(username));
    row.insert(
        "full_name".to_string(),
        request.full_name.clone().map(Value::String).unwrap_or(Value::Null),
    );
    row.insert("bio".to_string(), Value::Null);
    row.insert("avatar_url".to_string(), Value::Null);
    row
}
