//! Input tables and result export.

pub mod export;
pub mod ingest;
