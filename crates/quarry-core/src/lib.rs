//! Quarry Core
//!
//! Shared utilities for the Quarry asset crates: optimized collections and
//! logging setup.

pub mod alloc;
pub mod logging;
