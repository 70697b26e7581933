/// Key-construction helpers for the Redis-hosted platform.
///
/// Layout under `prefix`:
/// - `{prefix}:{table}:{id}` row JSON
/// - `{prefix}:{table}:_ids` sorted set of ids scored by creation time
/// - `{prefix}:{table}:_idx:{column}:{value}` set of ids per indexed value
/// - `{prefix}:{table}:_unique:{constraint}:{values}` id holding a unique key
/// - `{prefix}:auth:users:{email}` account, `{prefix}:auth:sessions:{token}` session
/// - `{prefix}:storage:{bucket}:{path}` stored object hash
#[derive(Debug, Clone)]
pub struct KeyContext {
    prefix: String,
}

impl KeyContext {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn row(&self, table: &str, id: &str) -> String {
        format!("{}:{}:{}", self.prefix, table, id)
    }

    pub fn ids(&self, table: &str) -> String {
        format!("{}:{}:_ids", self.prefix, table)
    }

    pub fn index(&self, table: &str, column: &str, value: &str) -> String {
        format!("{}:{}:_idx:{}:{}", self.prefix, table, column, value)
    }

    pub fn unique(&self, table: &str, constraint: &str, values: &[String]) -> String {
        format!("{}:{}:_unique:{}:{}", self.prefix, table, constraint, values.join(":"))
    }

    pub fn account(&self, email: &str) -> String {
        format!("{}:auth:users:{}", self.prefix, email)
    }

    pub fn session(&self, token: &str) -> String {
        format!("{}:auth:sessions:{}", self.prefix, token)
    }

    pub fn object(&self, bucket: &str, path: &str) -> String {
        format!("{}:storage:{}:{}", self.prefix, bucket, path)
    }

    /// Pattern matching every key of this platform instance.
    pub fn pattern(&self) -> String {
        format!("{}:*", self.prefix)
    }
}
