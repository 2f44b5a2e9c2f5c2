//! Integration test crate for mixframe.
//!
//! This crate exists solely to hold cross-module integration tests that run
//! frames through producer, mixer and consumer threads.

#[cfg(test)]
mod mixer;

#[cfg(test)]
mod sharing;

/// Install a test subscriber honouring `RUST_LOG`. Safe to call from every test.
#[cfg(test)]
pub(crate) fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
