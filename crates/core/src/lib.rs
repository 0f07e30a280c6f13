//! EKart Core - Shared types library.
//!
//! This crate provides common types used across all EKart components:
//! - `api` - Domain services, data access, and the monolithic HTTP API
//! - `functions` - Function-per-route serverless handlers
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and their invariants - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and allows it
//! to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, money, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
