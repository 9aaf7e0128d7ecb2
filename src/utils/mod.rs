//! # Utility Modules
//!
//! Supporting utilities for logging and timing.
//!
//! ## Components
//! - **Logging**: structured logging initialization for the binaries
//! - **Timeout**: async deadline wrappers and default bounds

pub mod logging;
pub mod timeout;
