pub mod command_log;
pub mod config;
pub mod error;
pub mod rest_snapshot_store;
pub mod snapshot_store;
pub mod storage;
