//! Logging utilities and the shared error reporting path

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system.
///
/// `default_level` is used as the filter unless `RUST_LOG` is set.
pub fn init(default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    // A second init (tests, embedding) keeps the first logger.
    let _ = env_logger::Builder::from_env(env).try_init();
}

/// Log an error together with its chain of sources.
pub fn report(context: &str, error: &dyn std::error::Error) {
    log::error!("{}: {}", context, error);
    let mut source = error.source();
    while let Some(cause) = source {
        log::error!("  caused by: {}", cause);
        source = cause.source();
    }
}
