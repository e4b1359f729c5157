// crates/server/src/telemetry.rs
//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "warn,transcribe_server=info,transcribe_db=info,transcribe_broker=info";

/// Install the global subscriber. Development gets compact human-readable
/// output at debug level for this workspace; everything else gets JSON lines.
pub fn init_tracing(development: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if development {
            "info,transcribe_server=debug,transcribe_db=debug,transcribe_broker=debug".into()
        } else {
            DEFAULT_FILTER.into()
        }
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = if development {
        builder.compact().try_init()
    } else {
        builder.json().with_current_span(false).try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing already initialised: {e}");
    }
}
