//! # pcon-forwarder
//!
//! Router side of the PCON congestion-control scheme: link queues that mark
//! instead of dropping, and a forwarding strategy that shifts traffic across
//! upstream faces in proportion to the marks coming back.
//!
//! ## Crate structure
//!
//! - [`config`] — strategy/queue tunables (environment variables, TOML profile)
//! - [`face`] — face descriptors and the face table with per-link queues
//! - [`queue`] — FIFO/CoDel/PCON link queues and the CoDel control law
//! - [`tables`] — FIB, PIT and measurement tables
//! - [`strategy`] — per-prefix forwarding weights and the PCON strategy
//! - [`trace`] — forwarding-percentage trace writer
//! - [`forwarder`] — pipeline glue tying the pieces together

pub mod config;
pub mod face;
pub mod forwarder;
pub mod queue;
pub mod strategy;
pub mod tables;
pub mod trace;
