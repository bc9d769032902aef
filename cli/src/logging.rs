//! Log setup for the CLI.

use std::time::Instant;

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Filter directive for a `-v` count.
fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize the tracing subscriber; `RUST_LOG` (then `REAGG_LOG`) overrides the `-v` count.
pub fn init_tracing(verbosity: u8) {
    let filter = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var("REAGG_LOG"))
        .unwrap_or_else(|_| level_for(verbosity).to_string());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(verbosity > 1)
        .with_writer(std::io::stderr)
        .init();
}

/// Run `f`, logging how long the named operation took.
pub fn timed<T>(operation: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    info!(operation, duration_ms = start.elapsed().as_secs_f64() * 1000.0, "done");
    result
}
