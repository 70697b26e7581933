//! Declarative row-level policies.
//!
//! Every table descriptor carries one rule per operation. Platform
//! implementations evaluate these rules against the authenticated caller; the
//! data-access layer never checks them itself.
//!
//! Semantics follow the usual row-level security model:
//! - `select`, `update` and `delete` rules act as a filter: rows the caller
//!   may not touch are invisible and silently skipped.
//! - `insert` rules (and the post-image of an `update`) are a check: a
//!   violating row fails the whole request.

use crate::{
    errors::PlatformError,
    types::{Row, TableDescriptor},
};

/// Who may perform an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyRule {
    Anyone,
    Authenticated,
    /// The caller's id must equal the row's owner column.
    Owner,
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::Select => "select",
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TablePolicies {
    pub select: PolicyRule,
    pub insert: PolicyRule,
    pub update: PolicyRule,
    pub delete: PolicyRule,
}

impl TablePolicies {
    pub fn rule(&self, operation: Operation) -> PolicyRule {
        match operation {
            Operation::Select => self.select,
            Operation::Insert => self.insert,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }
}

/// The identity a platform request runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    User(String),
    /// Platform-internal work such as the sign-up trigger and cascades.
    System,
}

impl Caller {
    pub fn from_user(user_id: Option<&str>) -> Self {
        match user_id {
            Some(id) => Caller::User(id.to_string()),
            None => Caller::Anonymous,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Caller::User(id) => Some(id),
            _ => None,
        }
    }
}

/// Whether `caller` may apply `operation` to `row`.
pub fn permits(descriptor: &TableDescriptor, operation: Operation, caller: &Caller, row: &Row) -> bool {
    let user_id = match caller {
        Caller::System => return true,
        Caller::Anonymous => None,
        Caller::User(id) => Some(id.as_str()),
    };
    match descriptor.policies.rule(operation) {
        PolicyRule::Anyone => true,
        PolicyRule::Authenticated => user_id.is_some(),
        PolicyRule::Owner => match (user_id, descriptor.owner_of(row)) {
            (Some(caller_id), Some(owner_id)) => caller_id == owner_id,
            _ => false,
        },
        PolicyRule::Deny => false,
    }
}

/// Check form of [`permits`], used for inserts and update post-images.
pub fn check(descriptor: &TableDescriptor, operation: Operation, caller: &Caller, row: &Row) -> Result<(), PlatformError> {
    if permits(descriptor, operation, caller, row) {
        return Ok(());
    }
    if *caller == Caller::Anonymous && descriptor.policies.rule(operation) != PolicyRule::Anyone {
        return Err(PlatformError::Unauthenticated);
    }
    Err(PlatformError::PolicyViolation {
        table: descriptor.table.clone(),
        operation: operation.as_str(),
    })
}

/// Storage objects live under a folder named after the uploader.
pub fn check_object_path(caller: &Caller, path: &str) -> Result<(), PlatformError> {
    match caller {
        Caller::System => Ok(()),
        Caller::Anonymous => Err(PlatformError::Unauthenticated),
        Caller::User(id) => {
            if path.split('/').next() == Some(id.as_str()) && path.len() > id.len() + 1 {
                Ok(())
            } else {
                Err(PlatformError::PolicyViolation {
                    table: "storage.objects".to_string(),
                    operation: "insert",
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::Post, types::Record};
    use serde_json::json;

    fn post_row(owner: &str) -> Row {
        json!({"id": "p1", "user_id": owner}).as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn owner_rule_compares_owner_column() {
        let descriptor = Post::descriptor();
        let row = post_row("alice");
        let alice = Caller::User("alice".to_string());
        let bob = Caller::User("bob".to_string());
        assert!(permits(&descriptor, Operation::Delete, &alice, &row));
        assert!(!permits(&descriptor, Operation::Delete, &bob, &row));
        assert!(permits(&descriptor, Operation::Select, &Caller::Anonymous, &row));
        assert!(permits(&descriptor, Operation::Delete, &Caller::System, &row));
    }

    #[test]
    fn anonymous_insert_is_unauthenticated() {
        let descriptor = Post::descriptor();
        let err = check(&descriptor, Operation::Insert, &Caller::Anonymous, &post_row("alice"));
        assert!(matches!(err, Err(PlatformError::Unauthenticated)));
        let err = check(
            &descriptor,
            Operation::Insert,
            &Caller::User("bob".to_string()),
            &post_row("alice"),
        );
        assert!(matches!(err, Err(PlatformError::PolicyViolation { .. })));
    }

    #[test]
    fn object_paths_are_scoped_to_uploader() {
        let alice = Caller::User("alice".to_string());
        assert!(check_object_path(&alice, "alice/photo.png").is_ok());
        assert!(check_object_path(&alice, "bob/photo.png").is_err());
        assert!(check_object_path(&alice, "alice/").is_err());
        assert!(check_object_path(&Caller::Anonymous, "alice/photo.png").is_err());
    }
}
