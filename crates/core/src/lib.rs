//! `stockmaster-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod event;
pub mod id;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion, execute};
pub use error::{DomainError, ErrorKind};
pub use event::Event;
pub use id::{AggregateId, UserId};
