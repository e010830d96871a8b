//! # TaskAfy API Server Library
//!
//! HTTP and WebSocket surface of the TaskAfy marketplace.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Bearer authentication, rate limiting, security headers
//! - `routes`: REST handlers
//! - `ws`: Task chat over WebSocket

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod ws;
