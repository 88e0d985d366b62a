//! Logging setup

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "willow_server=info,tower_http=info";

/// Initialize the global subscriber
///
/// `RUST_LOG` overrides the default filter. `json` switches to one JSON
/// object per line.
pub fn init_logger(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false);

    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}
