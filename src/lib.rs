//! # Fleetscan Library
//!
//! This library provides the core functionality for the fleetscan account
//! enrollment pipeline: the account registry, cross-account credential
//! exchange, bulk enrollment, and safe account retirement.

pub mod aliases;
pub mod config;
pub mod credentials;
pub mod db;
pub mod descriptors;
pub mod enrollment;
pub mod error;
pub mod models;
pub mod repositories;
pub mod retirement;
pub mod telemetry;
pub use migration;
