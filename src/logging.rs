use tracing_subscriber::EnvFilter;

/// Initialise logging.
///
/// Without `debug` the level is fixed at `info` and `RUST_LOG` is ignored.
/// With it the default is `debug` and `RUST_LOG` may override it. Calling
/// this more than once is harmless.
pub fn init(debug: bool) {
    let level = if debug { "debug" } else { "info" };

    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}
