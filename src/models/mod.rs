//! Data models for the attendance backend.
//!
//! The JSON shape of every model is snake_case, matching the column names.

mod employee;

pub use employee::*;
