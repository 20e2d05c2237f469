//! Shared test infrastructure for snmp-stack.
//!
//! Provides TestAgent (in-process SNMP agent), fixtures, and utilities.

// Allow dead code and unused imports since not all test files use all utilities
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod agent;
pub mod faulty;
pub mod fixtures;
pub mod handler;

pub use agent::TestAgent;
pub use faulty::{SlowAgent, SpoofingAgent};
pub use fixtures::{
    if_descr, interfaces_table, minimal_mib, standard_mib, sys_descr, sys_name, sys_uptime,
    system_subtree,
};
pub use handler::TestHandler;

/// Install a tracing subscriber honouring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
