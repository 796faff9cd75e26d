//! Tracing setup with optional span timing.
//!
//! With `--timing`, every `#[instrument]`ed span logs its duration when it
//! closes. The pipeline crates log through `log`, which the subscriber
//! picks up through its `tracing-log` bridge.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

/// Level used when `RUST_LOG` is unset.
pub fn default_level(verbose: bool, timing: bool) -> LevelFilter {
    if verbose {
        LevelFilter::DEBUG
    } else if timing {
        // Span close events are logged at INFO.
        LevelFilter::INFO
    } else {
        LevelFilter::WARN
    }
}

/// Install the global subscriber, writing to stderr.
pub fn init_tracing(verbose: bool, timing: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level(verbose, timing).into())
        .from_env_lossy();

    let span_events = if timing {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(verbose)
                .with_level(true)
                .with_span_events(span_events)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    // The subscriber is process-global, so only the level choice is tested.
    #[test]
    fn verbose_wins_over_timing() {
        assert_eq!(default_level(true, true), LevelFilter::DEBUG);
        assert_eq!(default_level(false, true), LevelFilter::INFO);
        assert_eq!(default_level(false, false), LevelFilter::WARN);
    }
}
