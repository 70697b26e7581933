//! # Platform Query Model
//!
//! A [`Query`] describes one read (or the row selection of an update/delete)
//! against a single table:
//!
//! | Builder call                 | Meaning                              | Rendered as                  |
//! |------------------------------|--------------------------------------|------------------------------|
//! | `.eq("user_id", id)`         | column equals value                  | `user_id=eq.<id>`            |
//! | `.is_in("post_id", ids)`     | column is one of a set (batching)    | `post_id=in.(a,b)`           |
//! | `.ilike("username", "%ja%")` | case-insensitive pattern match       | `username=ilike.%ja%`        |
//! | `.order("created_at", Desc)` | ordering                             | `order=created_at.desc`      |
//! | `.range(0, 10)`              | offset / limit                       | `offset=0&limit=10`          |
//! | `.columns(["post_id"])`      | projection                           | `select=post_id`             |
//! | `.expand("author", ...)`     | embed the referenced row             | `select=*,author:profiles(*)`|
//! | `.single()`                  | exactly one row or `NoRows`          | `Accept: object`             |
//!
//! Platforms evaluate filters, ordering and ranges with the helpers below so
//! every backend answers the same query the same way.

use std::{cmp::Ordering, fmt};

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: Value },
    In { column: String, values: Vec<Value> },
    /// SQL `ILIKE` with `%` wildcards.
    ILike { column: String, pattern: String },
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq { column, .. } | Filter::In { column, .. } | Filter::ILike { column, .. } => column,
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        match self {
            Filter::Eq { column, value } => row.get(column).is_some_and(|v| v == value),
            Filter::In { column, values } => row.get(column).is_some_and(|v| values.contains(v)),
            Filter::ILike { column, pattern } => row
                .get(column)
                .and_then(Value::as_str)
                .is_some_and(|v| ilike(v, pattern)),
        }
    }
}

/// `%`-wildcard match ignoring case.
fn ilike(value: &str, pattern: &str) -> bool {
    let value = value.to_lowercase();
    let pattern = pattern.to_lowercase();
    let parts: Vec<&str> = pattern.split('%').collect();
    if parts.len() == 1 {
        return value == pattern;
    }

    let mut rest = value.as_str();
    let last = parts.len() - 1;
    for (index, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if index == 0 {
            match rest.strip_prefix(part) {
                Some(tail) => rest = tail,
                None => return false,
            }
        } else if index == last {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub order: SortOrder,
}

/// Embed the row of `table` whose id equals this row's `column`, under `alias`.
#[derive(Debug, Clone, PartialEq)]
pub struct Expand {
    pub alias: String,
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    /// `None` selects every column.
    pub columns: Option<Vec<String>>,
    pub filters: Vec<Filter>,
    pub order: Vec<OrderBy>,
    pub offset: usize,
    pub limit: Option<usize>,
    pub expand: Vec<Expand>,
    pub single: bool,
}

impl Query {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: None,
            filters: Vec::new(),
            order: Vec::new(),
            offset: 0,
            limit: None,
            expand: Vec::new(),
            single: false,
        }
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn is_in<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.filters.push(Filter::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn ilike(mut self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.filters.push(Filter::ILike {
            column: column.into(),
            pattern: pattern.into(),
        });
        self
    }

    pub fn order(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order.push(OrderBy {
            column: column.into(),
            order,
        });
        self
    }

    pub fn range(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn expand(mut self, alias: impl Into<String>, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.expand.push(Expand {
            alias: alias.into(),
            table: table.into(),
            column: column.into(),
        });
        self
    }

    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.filters.iter().all(|filter| filter.matches(row))
    }

    /// Order `rows`, then apply offset and limit.
    pub fn sort_and_page(&self, mut rows: Vec<Row>) -> Vec<Row> {
        if !self.order.is_empty() {
            rows.sort_by(|a, b| {
                for order in &self.order {
                    let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                    let ordering = match order.order {
                        SortOrder::Asc => ordering,
                        SortOrder::Desc => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }
        let limit = self.limit.unwrap_or(usize::MAX);
        rows.into_iter().skip(self.offset).take(limit).collect()
    }

    /// Keep only the selected columns (plus any embedded aliases).
    pub fn project(&self, row: Row) -> Row {
        match &self.columns {
            None => row,
            Some(columns) => row
                .into_iter()
                .filter(|(key, _)| columns.contains(key) || self.expand.iter().any(|e| &e.alias == key))
                .collect(),
        }
    }
}

/// Total order over JSON column values: nulls first, RFC 3339 timestamps by
/// instant, numbers numerically, everything else by string form.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or_default(), y.as_f64().unwrap_or_default());
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// PostgREST-style rendering, used for request logs.
impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut select = match &self.columns {
            Some(columns) => columns.join(","),
            None => "*".to_string(),
        };
        for expand in &self.expand {
            select.push_str(&format!(",{}:{}(*)", expand.alias, expand.table));
        }
        write!(f, "{}?select={select}", self.table)?;
        for filter in &self.filters {
            match filter {
                Filter::Eq { column, value } => write!(f, "&{column}=eq.{}", render_value(value))?,
                Filter::In { column, values } => {
                    let values: Vec<String> = values.iter().map(render_value).collect();
                    write!(f, "&{column}=in.({})", values.join(","))?
                }
                Filter::ILike { column, pattern } => write!(f, "&{column}=ilike.{pattern}")?,
            }
        }
        if !self.order.is_empty() {
            let order: Vec<String> = self
                .order
                .iter()
                .map(|o| format!("{}.{}", o.column, o.order.as_str()))
                .collect();
            write!(f, "&order={}", order.join(","))?;
        }
        if self.offset > 0 || self.limit.is_some() {
            write!(f, "&offset={}", self.offset)?;
        }
        if let Some(limit) = self.limit {
            write!(f, "&limit={limit}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn renders_postgrest_style() {
        let query = Query::from("posts")
            .expand("author", "profiles", "user_id")
            .eq("user_id", "u1")
            .order("created_at", SortOrder::Desc)
            .range(10, 5);
        assert_eq!(
            query.to_string(),
            "posts?select=*,author:profiles(*)&user_id=eq.u1&order=created_at.desc&offset=10&limit=5"
        );

        let batched = Query::from("likes").columns(["post_id"]).is_in("post_id", ["a", "b"]);
        assert_eq!(batched.to_string(), "likes?select=post_id&post_id=in.(a,b)");
    }

    #[test]
    fn filters_match_rows() {
        let r = row(json!({"post_id": "a", "user_id": "u1", "username": "JaneDoe"}));
        assert!(Filter::Eq { column: "user_id".into(), value: json!("u1") }.matches(&r));
        assert!(Filter::In { column: "post_id".into(), values: vec![json!("b"), json!("a")] }.matches(&r));
        assert!(!Filter::In { column: "post_id".into(), values: vec![] }.matches(&r));
        assert!(Filter::ILike { column: "username".into(), pattern: "%doe".into() }.matches(&r));
        assert!(Filter::ILike { column: "username".into(), pattern: "jane%".into() }.matches(&r));
        assert!(Filter::ILike { column: "username".into(), pattern: "%ned%".into() }.matches(&r));
        assert!(!Filter::ILike { column: "username".into(), pattern: "doe%".into() }.matches(&r));
        assert!(!Filter::Eq { column: "missing".into(), value: json!("x") }.matches(&r));
    }

    #[test]
    fn timestamps_sort_by_instant_not_text() {
        // Fractional digits differ in width; a string sort would get this wrong.
        let earlier = json!("2024-01-01T00:00:00.5Z");
        let later = json!("2024-01-01T00:00:00.55Z");
        assert_eq!(compare_values(Some(&earlier), Some(&later)), Ordering::Less);
    }

    #[test]
    fn sort_and_page_applies_order_then_range() {
        let rows = vec![
            row(json!({"id": "a", "n": 1})),
            row(json!({"id": "b", "n": 3})),
            row(json!({"id": "c", "n": 2})),
        ];
        let query = Query::from("t").order("n", SortOrder::Desc).range(1, 1);
        let paged = query.sort_and_page(rows);
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0]["id"], json!("c"));
    }

    #[test]
    fn projection_keeps_embeds() {
        let query = Query::from("comments").columns(["id"]).expand("author", "profiles", "user_id");
        let projected = query.project(row(json!({"id": "c1", "content": "hi", "author": {"id": "u"}})));
        assert!(projected.contains_key("id"));
        assert!(projected.contains_key("author"));
        assert!(!projected.contains_key("content"));
    }
}
