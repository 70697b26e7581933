use redis::Script;
use std::sync::LazyLock;

pub const ROW_WRITE_SCRIPT_BODY: &str = include_str!("../../lua/row_write.lua");
pub const ROW_DELETE_SCRIPT_BODY: &str = include_str!("../../lua/row_delete.lua");

pub static ROW_WRITE_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(ROW_WRITE_SCRIPT_BODY));
pub static ROW_DELETE_SCRIPT: LazyLock<Script> = LazyLock::new(|| Script::new(ROW_DELETE_SCRIPT_BODY));
