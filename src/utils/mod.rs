//! Utility modules shared across commands.

pub mod date;
