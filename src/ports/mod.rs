//! Port traits: the I/O boundaries the domain depends on.

pub mod config_port;
pub mod data_port;
pub mod factor_cache_port;
pub mod report_port;
