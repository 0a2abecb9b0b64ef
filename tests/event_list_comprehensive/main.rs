//! EventList Comprehensive Test Suite
//!
//! Tests the observable list end to end through the public facade.
//!
//! ## Test Tier Structure
//!
//! - **Tier 1: Scenarios** (fixed inputs, exact expected events)
//!   The canonical removal, append and multi-occurrence cases.
//!
//! - **Tier 2: Laws** (property-based)
//!   Insert/get, delete coverage, idempotence, listener bookkeeping, and
//!   sequential replay of random operation streams.
//!
//! - **Tier 3: Configuration**
//!   Lists built from TOML settings.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test event_list_comprehensive
//!
//! # With logs
//! RUST_LOG=eventlist_primitives=debug cargo test --test event_list_comprehensive
//! ```

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Test utilities
mod test_utils;


// Tier 2: Laws
mod law_tests;
mod replay_tests;
