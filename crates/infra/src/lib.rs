//! Infrastructure layer: stores, locking, units of work and the stock engine.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod locks;
pub mod reference_numbers;
pub mod services;
pub mod store;
pub mod unit_of_work;


pub use catalog::{Catalog, InMemoryCatalog};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use error::StockError;
pub use services::{Committed, StockEngine};
pub use store::{InMemoryStockStore, StockStore, StoreError};
