use tracing_subscriber::filter::EnvFilter;

/// Installs the stderr subscriber. `OPENFIELD_LOG` takes `RUST_LOG` syntax;
/// the default only shows warnings so stdout stays clean for reports.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("OPENFIELD_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
