//! Data models shared by the pipeline stages.

pub mod association;
pub mod config;
pub mod page;
