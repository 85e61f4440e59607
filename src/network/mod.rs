//! Network provider setup and retry helpers

pub mod providers;
pub mod retry;

pub use providers::*;
pub use retry::*;
