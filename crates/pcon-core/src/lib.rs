//! Shared leaf types for the PCON stack.
//!
//! This crate contains:
//! - **Names** — hierarchical NDN-style names with prefix matching
//! - **Packets** — minimal Interest/Data carriers (full NDN encoding is out of scope)
//! - **Congestion tag** — the 4-byte per-packet congestion metadata
//! - **Env helpers** — typed environment-variable readers with defaults

pub mod env;
pub mod name;
pub mod packet;
pub mod tag;
