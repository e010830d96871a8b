//! # TaskAfy Worker Library
//!
//! Background jobs that run beside the API.
//!
//! ## Modules
//!
//! - `config`: Environment configuration
//! - `scheduler`: Materializes due recurring schedules into bookings

pub mod config;
pub mod scheduler;
