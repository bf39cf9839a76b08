use std::env;

/// Set up the process-wide logger.
///
/// An explicit `RUST_LOG` wins; otherwise the filter follows the
/// `debug_enabled` flag. Output is kept terse (no timestamps or module
/// paths) since the CLI is the only consumer.
pub fn init_logger(debug_enabled: bool) {
    let fallback = if debug_enabled { "debug" } else { "info" };
    let filter_spec = env::var("RUST_LOG").unwrap_or_else(|_| fallback.to_string());

    let mut builder = env_logger::Builder::new();
    builder.parse_filters(&filter_spec);
    builder
        .format_target(false)
        .format_module_path(false)
        .format_timestamp(None);

    // repeated calls (tests) are a no-op rather than a panic
    let _ = builder.try_init();
}
