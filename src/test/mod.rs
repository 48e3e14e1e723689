//! Shared fixtures for unit tests: signature and metadata builders plus in-memory
//! implementations of the runtime collaborators.


pub use builders::*;
pub use mocks::*;

/// Owned argument type names from literals
pub fn args(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

/// Routes `log` output through the test harness; safe to call from every test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
