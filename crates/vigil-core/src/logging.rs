//! Tracing subscriber setup.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "VIGIL_LOG";

/// Default directives when `VIGIL_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVES: &str = "info,vigil=debug";

/// Initialize the global tracing subscriber.
///
/// Returns `false` if a global subscriber was already installed, which makes
/// the call safe from tests and embedding applications.
pub fn init_tracing() -> bool {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        let _first = init_tracing();
        assert!(!init_tracing());
    }
}
