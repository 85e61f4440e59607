//! Core data types and structures

pub mod addresses;
pub mod balance;
pub mod chain;
pub mod cycle;
pub mod order;
pub mod orderbook;
pub mod symbol;
pub mod token;
pub mod trade;
pub mod transaction;

pub use addresses::*;
pub use balance::*;
pub use chain::*;
pub use cycle::*;
pub use order::*;
pub use orderbook::*;
pub use symbol::*;
pub use token::*;
pub use trade::*;
pub use transaction::*;
