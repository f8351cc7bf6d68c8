//! Bridge between the `log` facade and the progress display.
//!
//! Records from `log::warn!` and friends are formatted by `env_logger` but
//! written while the progress bars are suspended, so diagnostic output
//! never lands in the middle of a frame.

use indicatif::MultiProgress;
use log::{Log, Metadata, Record, SetLoggerError};

/// `log::Log` implementation that suspends the draw target around writes
pub struct ProgressLogger {
    inner: env_logger::Logger,
    draw: MultiProgress,
}

impl ProgressLogger {
    /// Wrap `inner` so its writes suspend `draw`
    pub fn new(inner: env_logger::Logger, draw: MultiProgress) -> Self {
        Self { inner, draw }
    }
}

impl Log for ProgressLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if self.inner.matches(record) {
            self.draw.suspend(|| self.inner.log(record));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install `inner` as the global logger, coordinated with `draw`
pub fn install(inner: env_logger::Logger, draw: MultiProgress) -> Result<(), SetLoggerError> {
    let level = inner.filter();
    log::set_boxed_logger(Box::new(ProgressLogger::new(inner, draw)))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;
    use log::{Level, LevelFilter};

    #[test]
    fn test_enabled_follows_inner_filter() {
        let inner = env_logger::Builder::new()
            .filter_level(LevelFilter::Warn)
            .build();
        let logger = ProgressLogger::new(
            inner,
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
        );

        let warn = Metadata::builder().level(Level::Warn).target("dotwin").build();
        let debug = Metadata::builder().level(Level::Debug).target("dotwin").build();
        assert!(logger.enabled(&warn));
        assert!(!logger.enabled(&debug));
    }
}
