//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and camera/transform helpers
//! - Frame timing
//! - Logging setup and error reporting

pub mod logging;
pub mod math;
pub mod time;
