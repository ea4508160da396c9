use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber: compact lines on stderr, filtered by
/// `REPODRIVE_LOG`, then `RUST_LOG`, then `info`.
pub fn init() -> anyhow::Result<()> {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter_from_env())
        .with(fmt_layer)
        .try_init()?;
    Ok(())
}

fn filter_from_env() -> EnvFilter {
    EnvFilter::try_from_env("REPODRIVE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
