//! # Organizit API Server Library
//!
//! HTTP surface for the Organizit task tracker: task CRUD gated by plan,
//! account endpoints, and the pro upgrade payment flow.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
