//! Shared helpers

pub mod arrow_utils;
pub mod test_utils;
