//! Log capture for tests.

use tracing_subscriber::EnvFilter;

/// Routes logs of the kvbench crates into the output captured by the test runner.
///
/// Logs of all other crates are filtered down to errors. Calling this more than once is
/// harmless.
///
/// # Example
///
/// ```
/// kvbench_test::tracing::init();
/// ```
pub fn init() {
    let env_filter = EnvFilter::new("ERROR,kvbench=TRACE,kvbench_test=TRACE");

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_test_writer()
        .without_time()
        .try_init()
        .ok();
}
