//! Strategy execution against both venues

pub mod executor;

pub use executor::*;
