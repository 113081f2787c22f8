use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Output goes to stderr; JSON lines when `json` is set.
pub fn init(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false);
    // A second init (tests, repeated calls) keeps the first subscriber.
    let _ = if json { builder.json().try_init() } else { builder.try_init() };
}
