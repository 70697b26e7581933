use redis::aio::ConnectionLike;
use serde::Serialize;
use serde_json::Value;

use crate::{
    errors::PlatformError,
    runtime::{
        commands::{RowDelete, RowWrite},
        scripts::{ROW_DELETE_SCRIPT, ROW_WRITE_SCRIPT},
    },
};

async fn invoke<C, T>(conn: &mut C, script: &redis::Script, table: &str, command: &T) -> Result<Value, PlatformError>
where
    C: ConnectionLike + Send,
    T: Serialize,
{
    let payload = serde_json::to_string(command).map_err(PlatformError::serialization)?;

    let mut invocation = script.prepare_invoke();
    invocation.arg(payload);
    let raw: String = invocation.invoke_async(conn).await?;

    let value: Value = serde_json::from_str(&raw)
        .map_err(|err| PlatformError::serialization(format!("failed to parse lua response: {err}")))?;

    if let Some(error) = value.get("error") {
        let table = table.to_string();
        return Err(match error.as_str() {
            Some("unique_violation") => PlatformError::UniqueViolation {
                table,
                columns: value
                    .get("columns")
                    .and_then(Value::as_array)
                    .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .unwrap_or_default(),
            },
            Some("foreign_key_violation") => PlatformError::ForeignKeyViolation {
                table,
                column: value
                    .get("column")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            Some("not_found") => PlatformError::NoRows { table },
            Some("conflict") => PlatformError::InvalidRequest {
                message: format!("{table} row changed while it was being updated"),
            },
            Some(other) => PlatformError::InvalidRequest {
                message: other.to_string(),
            },
            None => PlatformError::InvalidRequest {
                message: "lua_error".to_string(),
            },
        });
    }

    Ok(value)
}

pub async fn execute_write<C>(conn: &mut C, command: &RowWrite) -> Result<(), PlatformError>
where
    C: ConnectionLike + Send,
{
    invoke(conn, &ROW_WRITE_SCRIPT, &command.table, command).await?;
    Ok(())
}

/// Returns the number of row keys removed.
pub async fn execute_delete<C>(conn: &mut C, command: &RowDelete) -> Result<u64, PlatformError>
where
    C: ConnectionLike + Send,
{
    let value = invoke(conn, &ROW_DELETE_SCRIPT, &command.table, command).await?;
    Ok(value.get("deleted").and_then(Value::as_u64).unwrap_or_default())
}
