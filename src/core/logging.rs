//! Log setup for runs without Bevy's `LogPlugin`
//!
//! The windowed app hands its filter to `LogPlugin`. Headless runs, tools and
//! integration tests install a plain `tracing-subscriber` formatter instead.
//! Every subsystem tags its lines (`[TURN]`, `[BATTLE]`, `[CAMERA]`,
//! `[PARTICLES]`, `[ANIM]`, `[AI]`, `[REGISTRY]`, `[ORACLE]`, `[SETTINGS]`)
//! so a single filter string is enough to follow one of them.

use tracing_subscriber::EnvFilter;

/// Installs a stderr subscriber honouring `RUST_LOG`, or `filter` when
/// `RUST_LOG` is unset. Returns `false` when a subscriber was already set.
pub fn init_headless_logging(filter: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        init_headless_logging("debug");
        assert!(!init_headless_logging("debug"));
    }
}
