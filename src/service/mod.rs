//! # Service Layer
//!
//! Drives single-exchange protocol sessions over TCP.
//!
//! ## Components
//! - **Server**: sequential accept loop owning the mailbox, one connection
//!   session at a time
//! - **Client**: one-shot exchange against a running server

pub mod client;
pub mod server;
