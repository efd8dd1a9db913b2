mod desk;

pub use desk::TestDesk;

use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber filtered by `CASEFOLD_LOG`. Safe to call
/// from every test.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("CASEFOLD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
