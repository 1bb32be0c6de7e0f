//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM
//! operations for the account registry and user entitlements. All mutation
//! of persisted state goes through these repositories.

pub mod account;
pub mod user;

pub use account::{AccountRepository, AccountUpsertParams, UpsertOutcome};
pub use user::UserRepository;
