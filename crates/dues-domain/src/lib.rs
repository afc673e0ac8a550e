//! dues-domain
//!
//! Pure domain models (Member, Payment, billing periods, derived summaries).
//! No I/O, no CLI, no storage. Only data types and core enums.

pub mod common;
pub mod coverage;
pub mod member;
pub mod payment;
pub mod snapshot;
pub mod summary;

pub use common::*;
pub use coverage::*;
pub use member::*;
pub use payment::*;
pub use snapshot::*;
pub use summary::*;
