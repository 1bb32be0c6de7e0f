//! # Data Models
//!
//! This module contains the SeaORM entity models for enrolled accounts,
//! users, and the user/account entitlement join table.

pub mod account;
pub mod user;
pub mod user_account;
