//! Table registry.
//!
//! `#[derive(Record)]` submits a [`TableRegistration`] to the inventory, so any
//! linked record type can be resolved by table name. Descriptors can also be
//! registered explicitly, which takes precedence.

use crate::types::{OnDelete, TableDescriptor};
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

/// Metadata submitted to the inventory by the `Record` derive macro.
pub struct TableRegistration {
    /// Platform table name (e.g., "posts")
    pub table: &'static str,
    /// The name of the row type (e.g., "Post")
    pub type_name: &'static str,
    /// Function to build the table descriptor
    pub descriptor_fn: fn() -> TableDescriptor,
}

inventory::collect!(TableRegistration);

static REGISTRY: OnceLock<RwLock<HashMap<String, TableDescriptor>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<String, TableDescriptor>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// All tables registered through the derive macro.
pub fn registered_tables() -> impl Iterator<Item = &'static TableRegistration> {
    inventory::iter::<TableRegistration>()
}

pub fn register_descriptor(descriptor: &TableDescriptor) {
    registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(descriptor.table.clone(), descriptor.clone());
}

/// Resolve a table descriptor by name.
pub fn descriptor(table: &str) -> Option<TableDescriptor> {
    if let Some(found) = registry().read().unwrap_or_else(PoisonError::into_inner).get(table) {
        return Some(found.clone());
    }
    let found = registered_tables().find(|r| r.table == table).map(|r| (r.descriptor_fn)())?;
    register_descriptor(&found);
    Some(found)
}

/// A table holding a foreign key into another table.
#[derive(Debug, Clone)]
pub struct Dependent {
    pub table: String,
    pub column: String,
    pub on_delete: OnDelete,
}

/// Find every foreign key pointing at `table`.
///
/// Used when deleting a row: cascading dependents are deleted with it,
/// restricting dependents block the delete.
pub fn dependents_of(table: &str) -> Vec<Dependent> {
    let mut tables: HashMap<String, TableDescriptor> = registered_tables()
        .map(|r| (r.table.to_string(), (r.descriptor_fn)()))
        .collect();
    for (name, descriptor) in registry().read().unwrap_or_else(PoisonError::into_inner).iter() {
        tables.insert(name.clone(), descriptor.clone());
    }

    let mut dependents: Vec<Dependent> = tables
        .values()
        .flat_map(|descriptor| {
            descriptor
                .foreign_keys
                .iter()
                .filter(|fk| fk.references == table)
                .map(|fk| Dependent {
                    table: descriptor.table.clone(),
                    column: fk.column.clone(),
                    on_delete: fk.on_delete,
                })
        })
        .collect();
    dependents.sort_by(|a, b| (&a.table, &a.column).cmp(&(&b.table, &b.column)));
    dependents
}
