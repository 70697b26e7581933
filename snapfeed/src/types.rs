use serde_json::{Map, Value};

use crate::policy::TablePolicies;

/// A row as exchanged with the platform: a JSON object keyed by column.
pub type Row = Map<String, Value>;

/// Schema metadata for one platform table. Emitted by `#[derive(Record)]`.
#[derive(Debug, Clone)]
pub struct TableDescriptor {
    pub table: String,
    pub id_column: String,
    /// Column compared against the caller's id by `Owner` policies.
    pub owner_column: Option<String>,
    pub created_at_column: Option<String>,
    pub updated_at_column: Option<String>,
    pub columns: Vec<ColumnDescriptor>,
    pub unique_constraints: Vec<UniqueConstraint>,
    pub foreign_keys: Vec<ForeignKey>,
    pub checks: Vec<CheckConstraint>,
    pub policies: TablePolicies,
}

impl TableDescriptor {
    /// Columns that platforms keep a lookup index for.
    pub fn indexed_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter(|c| c.indexed).map(|c| c.name.as_str())
    }

    pub fn is_indexed(&self, column: &str) -> bool {
        column == self.id_column || self.columns.iter().any(|c| c.indexed && c.name == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.name == column)
    }

    /// Owner id of a row, if the table has an owner column and the row sets it.
    pub fn owner_of<'a>(&self, row: &'a Row) -> Option<&'a str> {
        self.owner_column
            .as_deref()
            .and_then(|column| row.get(column))
            .and_then(Value::as_str)
    }

    pub fn id_of<'a>(&self, row: &'a Row) -> Option<&'a str> {
        row.get(&self.id_column).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub name: String,
    pub indexed: bool,
}

/// Describes a unique constraint on one or more columns.
#[derive(Debug, Clone)]
pub struct UniqueConstraint {
    pub columns: Vec<String>,
    /// Whether string comparisons ignore case (e.g., "Jane" == "jane").
    pub case_insensitive: bool,
}

impl UniqueConstraint {
    pub fn new<I, S>(columns: I, case_insensitive: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            case_insensitive,
        }
    }

    /// Normalized key values for a row, or `None` when any column is null
    /// (nulls never collide).
    pub fn key_values(&self, row: &Row) -> Option<Vec<String>> {
        self.columns
            .iter()
            .map(|column| match row.get(column) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) if self.case_insensitive => Some(s.to_lowercase()),
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            })
            .collect()
    }

    pub fn name(&self) -> String {
        self.columns.join(",")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnDelete {
    Cascade,
    #[default]
    Restrict,
}

#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub column: String,
    pub references: String,
    pub on_delete: OnDelete,
}

#[derive(Debug, Clone)]
pub enum CheckConstraint {
    /// The two columns must hold different values.
    Distinct { left: String, right: String },
}

impl CheckConstraint {
    pub fn name(&self) -> String {
        match self {
            CheckConstraint::Distinct { left, right } => format!("{left}_ne_{right}"),
        }
    }

    pub fn holds(&self, row: &Row) -> bool {
        match self {
            CheckConstraint::Distinct { left, right } => row.get(left) != row.get(right),
        }
    }
}

/// Trait for row types stored on the platform.
///
/// Implemented by `#[derive(Record)]`.
pub trait Record {
    /// Platform table name.
    const TABLE: &'static str;

    fn descriptor() -> TableDescriptor;

    /// Id of this row instance.
    fn row_id(&self) -> &str;

    /// Make the descriptor resolvable by table name.
    fn ensure_registered() {
        crate::registry::register_descriptor(&Self::descriptor());
    }
}
