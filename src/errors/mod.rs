//! Error handling for the keeper

pub mod keeper_error;

pub use keeper_error::*;
