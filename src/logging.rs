use std::io::{self, IsTerminal};
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter for a `-v` count
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Initialize diagnostics on stderr, leaving stdout to reports
///
/// `RUST_LOG` takes precedence over the verbosity flag. Calling this more
/// than once keeps the first subscriber.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_the_level() {
        assert_eq!(default_level(0), "info");
        assert_eq!(default_level(1), "debug");
        assert_eq!(default_level(5), "trace");
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_logging(0);
        init_logging(2);
    }
}
