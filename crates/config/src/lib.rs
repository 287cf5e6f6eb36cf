//! Configuration management for gaitstore
//!
//! `GaitStoreConfig` describes where the database, blob storage and backups
//! live and how the cache and backup manager behave. `ConfigLoader` resolves
//! it from defaults, the JSON config file and the environment.

pub mod config;
pub mod loader;

pub use config::*;
pub use loader::ConfigLoader;
