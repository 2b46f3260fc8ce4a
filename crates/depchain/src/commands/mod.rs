//! Command implementations that don't fit in the engine.

pub mod ingest;
pub mod init;
