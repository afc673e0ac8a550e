//! dues-core
//!
//! Payment-coverage accounting and the services built around it.
//! Depends on dues-domain. No CLI, no terminal I/O, storage only through [`storage::DuesStorage`].

pub mod balance_service;
pub mod coverage_service;
pub mod dashboard_service;
pub mod error;
pub mod member_service;
pub mod memory_store;
pub mod money;
pub mod payment_service;
mod pool;
pub mod public_api;
pub mod report_service;
pub mod storage;
pub mod time;


pub use balance_service::*;
pub use coverage_service::*;
pub use dashboard_service::*;
pub use error::CoreError;
pub use member_service::*;
pub use memory_store::MemoryDuesStorage;
pub use payment_service::*;
pub use public_api::*;
pub use report_service::*;
pub use storage::DuesStorage;
pub use time::{Clock, FixedClock};
