//! Diagnostic logging setup
//!
//! Bridge logs always go to the process's real stderr, never through the
//! redirectable stream slots, so they are not forwarded as output lines.

use tandem_config::Config;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global subscriber filtered by `filter`
///
/// `RUST_LOG` overrides `filter` when set. Returns `false` if a global
/// subscriber was already installed, in which case nothing changes.
pub fn init(filter: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init()
        .is_ok()
}

/// Install a global subscriber using the configured log filter
pub fn init_from_config(config: &Config) -> bool {
    init(config.log_filter())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        init("debug");
        assert!(!init("trace"));
    }
}
