//! Builtin tool implementations

pub mod log_cycle;
