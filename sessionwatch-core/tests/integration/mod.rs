use std::sync::Once;

mod export_roundtrip;
mod monitoring_flow;

static TRACING: Once = Once::new();

/// Installs a test subscriber once so `RUST_LOG` works during test runs
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
