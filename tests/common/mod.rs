//! Shared helpers for integration tests

use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize tracing once per test binary so `RUST_LOG`-style debugging of
/// a failing scenario is a one-line change away.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}
