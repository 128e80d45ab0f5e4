//! Process-wide tracing subscriber.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "erp_gateway=info,tower_http=info";

/// Installs the global subscriber. `RUST_LOG` overrides the default filter and
/// `LOG_FORMAT=json` switches to one JSON object per line.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let _ = if json {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };
}
