use super::Verbosity;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
fn default_filter(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Verbose => "warn,qk_consolidate=debug,qk_pak=debug",
        Verbosity::Quiet | Verbosity::Normal => "warn",
    }
}

/// Install a stderr `fmt` subscriber. `RUST_LOG` takes precedence over the verbosity default.
pub fn init_logging(verbosity: Verbosity) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbosity).into());

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_enables_library_debug() {
        assert!(default_filter(Verbosity::Verbose).contains("qk_consolidate=debug"));
        assert_eq!(default_filter(Verbosity::Quiet), "warn");
    }
}
