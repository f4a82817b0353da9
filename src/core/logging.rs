//! Logger setup for query pipelines

/// Filter applied when RUST_LOG is not set
const DEFAULT_FILTER: &str = "info";

/// Install the global logger with the default filter
///
/// Build and query timing lines are emitted at debug level, so run with
/// RUST_LOG=debug to see them.
///
/// # Example
/// ```
/// tribvh::core::logging::init();
/// log::debug!("timing lines show up under RUST_LOG=debug");
/// ```
pub fn init() {
    init_with_filter(DEFAULT_FILTER);
}

/// Install the global logger with an explicit default filter
///
/// The RUST_LOG environment variable still takes precedence when set.
pub fn init_with_filter(filter: &str) {
    let env = env_logger::Env::new().default_filter_or(filter);
    env_logger::Builder::from_env(env).init();
}
