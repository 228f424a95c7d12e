//! Diagnostic logging setup
//!
//! Everything goes through `tracing`. The event log mirrors its entries here,
//! so an operator tailing stderr sees errors and notices as they happen.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set
pub const DEFAULT_LEVEL: &str = "info";

/// Install a stderr formatter honouring `RUST_LOG`, else `level`
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice() {
        init(DEFAULT_LEVEL);
        init("debug");
        tracing::info!("still logging");
    }
}
