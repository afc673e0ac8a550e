#![doc(test(attr(deny(warnings))))]

//! Dues Tracker keeps member subscriptions, payments and the coverage ledger
//! that shows which months those payments reach. The calculators live in
//! `dues-core`; this crate wires them to storage, configuration and the CLI.

pub mod cli;
pub mod errors;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Dues Tracker tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
