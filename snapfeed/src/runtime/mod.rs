//! Atomic row mutations on Redis, executed as Lua scripts.

pub mod commands;
pub mod executor;
pub mod scripts;
