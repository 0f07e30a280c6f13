//! EKart API library.
//!
//! The single domain-service layer of the storefront backend. Both transports
//! consume it: the monolithic HTTP binary in this crate and the
//! function-per-route serverless handlers in `ekart-functions`.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
