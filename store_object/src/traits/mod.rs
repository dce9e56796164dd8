//! Traits for repository operations
//!
//! This module contains the seams of the repository layer: the underlying
//! data client contract and the decorator contract wrapped around it.

pub mod core;
pub mod decorator;

pub use self::core::{DataClient, TransactionClient};
pub use decorator::{Next, OperationContext, OperationDecorator};
