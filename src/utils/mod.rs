//! # Utility Modules
//!
//! Supporting utilities shared across the session layer.
//!
//! ## Components
//! - **Logging**: structured logging configuration

pub mod logging;
