use serde::Serialize;
use serde_json::Value;

use crate::{
    errors::PlatformError,
    keys::KeyContext,
    types::{Row, TableDescriptor},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    Insert,
    Update,
}

/// Insert or update of one row, executed by `row_write.lua`.
#[derive(Debug, Serialize)]
pub struct RowWrite {
    pub mode: WriteMode,
    pub table: String,
    pub key: String,
    pub id: String,
    pub id_column: String,
    pub ids_key: String,
    /// Creation time in microseconds; orders the id set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    pub payload_json: String,
    /// Update only: the row as it was read, to detect concurrent writers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_json: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ReferenceCheck>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unique_add: Vec<UniqueClaim>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unique_remove: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub index_add: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub index_remove: Vec<String>,
}

/// A parent row that must exist for the write to succeed.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceCheck {
    pub key: String,
    pub column: String,
}

/// A unique key the written row must hold.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UniqueClaim {
    pub key: String,
    pub columns: Vec<String>,
}

/// Removal of a row together with everything that cascades from it,
/// executed by `row_delete.lua`.
#[derive(Debug, Serialize)]
pub struct RowDelete {
    pub table: String,
    pub rows: Vec<DeletedRow>,
}

#[derive(Debug, Serialize)]
pub struct DeletedRow {
    pub key: String,
    pub id: String,
    pub ids_key: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub index_keys: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unique_keys: Vec<String>,
}

/// String form of a column value inside a key. Nulls are never indexed.
pub fn key_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

pub fn index_keys(keys: &KeyContext, descriptor: &TableDescriptor, row: &Row) -> Vec<String> {
    descriptor
        .indexed_columns()
        .filter(|column| *column != descriptor.id_column)
        .filter_map(|column| {
            let value = row.get(column).and_then(key_value)?;
            Some(keys.index(&descriptor.table, column, &value))
        })
        .collect()
}

pub fn unique_claims(keys: &KeyContext, descriptor: &TableDescriptor, row: &Row) -> Vec<UniqueClaim> {
    descriptor
        .unique_constraints
        .iter()
        .filter_map(|constraint| {
            let values = constraint.key_values(row)?;
            Some(UniqueClaim {
                key: keys.unique(&descriptor.table, &constraint.name(), &values),
                columns: constraint.columns.clone(),
            })
        })
        .collect()
}

fn references(keys: &KeyContext, descriptor: &TableDescriptor, row: &Row) -> Vec<ReferenceCheck> {
    descriptor
        .foreign_keys
        .iter()
        .filter_map(|fk| {
            let value = row.get(&fk.column).and_then(key_value)?;
            Some(ReferenceCheck {
                key: keys.row(&fk.references, &value),
                column: fk.column.clone(),
            })
        })
        .collect()
}

fn row_id(descriptor: &TableDescriptor, row: &Row) -> Result<String, PlatformError> {
    descriptor
        .id_of(row)
        .map(str::to_string)
        .ok_or_else(|| PlatformError::InvalidRequest {
            message: format!("{} row has no {}", descriptor.table, descriptor.id_column),
        })
}

fn encode(row: &Row) -> Result<String, PlatformError> {
    serde_json::to_string(row).map_err(PlatformError::serialization)
}

impl RowWrite {
    pub fn insert(keys: &KeyContext, descriptor: &TableDescriptor, row: &Row, score: i64) -> Result<Self, PlatformError> {
        let id = row_id(descriptor, row)?;
        Ok(Self {
            mode: WriteMode::Insert,
            table: descriptor.table.clone(),
            key: keys.row(&descriptor.table, &id),
            id,
            id_column: descriptor.id_column.clone(),
            ids_key: keys.ids(&descriptor.table),
            score: Some(score),
            payload_json: encode(row)?,
            expected_json: None,
            references: references(keys, descriptor, row),
            unique_add: unique_claims(keys, descriptor, row),
            unique_remove: Vec::new(),
            index_add: index_keys(keys, descriptor, row),
            index_remove: Vec::new(),
        })
    }

    /// `existing_json` is the stored payload exactly as read.
    pub fn update(
        keys: &KeyContext,
        descriptor: &TableDescriptor,
        existing: &Row,
        existing_json: String,
        merged: &Row,
    ) -> Result<Self, PlatformError> {
        let id = row_id(descriptor, merged)?;
        let new_claims = unique_claims(keys, descriptor, merged);
        let unique_remove = unique_claims(keys, descriptor, existing)
            .into_iter()
            .filter(|claim| !new_claims.contains(claim))
            .map(|claim| claim.key)
            .collect();
        let index_add = index_keys(keys, descriptor, merged);
        let index_remove = index_keys(keys, descriptor, existing)
            .into_iter()
            .filter(|key| !index_add.contains(key))
            .collect();
        Ok(Self {
            mode: WriteMode::Update,
            table: descriptor.table.clone(),
            key: keys.row(&descriptor.table, &id),
            id,
            id_column: descriptor.id_column.clone(),
            ids_key: keys.ids(&descriptor.table),
            score: None,
            payload_json: encode(merged)?,
            expected_json: Some(existing_json),
            references: references(keys, descriptor, merged),
            unique_add: new_claims,
            unique_remove,
            index_add,
            index_remove,
        })
    }
}

impl DeletedRow {
    pub fn new(keys: &KeyContext, descriptor: &TableDescriptor, row: &Row) -> Result<Self, PlatformError> {
        let id = row_id(descriptor, row)?;
        Ok(Self {
            key: keys.row(&descriptor.table, &id),
            ids_key: keys.ids(&descriptor.table),
            index_keys: index_keys(keys, descriptor, row),
            unique_keys: unique_claims(keys, descriptor, row).into_iter().map(|claim| claim.key).collect(),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Like, Profile},
        types::Record,
    };
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn insert_claims_unique_and_index_keys() {
        let keys = KeyContext::new("t");
        let like = row(json!({"id": "l1", "post_id": "p1", "user_id": "u1"}));
        let write = RowWrite::insert(&keys, &Like::descriptor(), &like, 42).expect("write");
        assert_eq!(write.key, "t:likes:l1");
        assert_eq!(write.unique_add[0].key, "t:likes:_unique:post_id,user_id:p1:u1");
        assert!(write.index_add.contains(&"t:likes:_idx:post_id:p1".to_string()));
        assert!(write.index_add.contains(&"t:likes:_idx:user_id:u1".to_string()));
        let refs: Vec<&str> = write.references.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(refs, vec!["t:posts:p1", "t:profiles:u1"]);
    }

    #[test]
    fn update_releases_old_username() {
        let keys = KeyContext::new("t");
        let descriptor = Profile::descriptor();
        let before = row(json!({"id": "u1", "username": "Jane"}));
        let after = row(json!({"id": "u1", "username": "janet"}));
        let write = RowWrite::update(&keys, &descriptor, &before, "{}".to_string(), &after).expect("write");
        assert_eq!(write.unique_remove, vec!["t:profiles:_unique:username:jane".to_string()]);
        assert_eq!(write.unique_add[0].key, "t:profiles:_unique:username:janet");
        assert_eq!(write.expected_json.as_deref(), Some("{}"));
    }

    #[test]
    fn serializes_without_empty_lists() {
        let keys = KeyContext::new("t");
        let delete = DeletedRow::new(&keys, &crate::models::Post::descriptor(), &row(json!({"id": "p1"})))
            .expect("row");
        let encoded = serde_json::to_value(&delete).expect("encode");
        assert!(encoded.get("unique_keys").is_none());
        assert_eq!(encoded["ids_key"], json!("t:posts:_ids"));
    }
}
