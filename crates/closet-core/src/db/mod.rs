//! Database layer for Closet

mod connection;
mod migrations;
mod state_repository;

pub use connection::Database;
pub use state_repository::{
    state_key, LibSqlStateRepository, MemoryStateRepository, StateRepository,
};
