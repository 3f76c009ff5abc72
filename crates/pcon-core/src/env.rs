//! Typed environment-variable readers.
//!
//! Deployment scripts tune the stack through environment variables; every
//! reader falls back to a default on absence, and logs on a value that does
//! not parse.

use std::env;
use std::fmt::Display;
use std::str::FromStr;

use tracing::warn;

/// Boolean variable: `TRUE` or `true` means true, anything else means false.
pub fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) if !v.is_empty() => v == "TRUE" || v == "true",
        _ => default,
    }
}

pub fn env_f64(name: &str, default: f64) -> f64 {
    env_parsed(name, default)
}

pub fn env_u64(name: &str, default: u64) -> u64 {
    env_parsed(name, default)
}

pub fn env_usize(name: &str, default: usize) -> usize {
    env_parsed(name, default)
}

fn env_parsed<T: FromStr + Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(v) if !v.is_empty() => v.parse().unwrap_or_else(|_| {
            warn!(var = name, value = %v, "unparseable environment variable, using default");
            default
        }),
        _ => default,
    }
}
