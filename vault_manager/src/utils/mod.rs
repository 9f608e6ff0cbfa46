//! Utility and helper functions needed for:
//! - Fixed point and basis point arithmetic
//! - Error handling
//! - Type casting

pub(crate) mod common;
pub(crate) mod error;
