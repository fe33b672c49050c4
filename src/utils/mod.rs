//! Utilities: logging setup (verbosity flags or RUST_LOG).
//!
//! Key items:
//!   init_logging / derive_level

/// Logging helpers.
pub mod logging {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::EnvFilter;

    #[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
    pub enum LogLevel {
        Error = 0,
        Warn = 1,
        Info = 2,
        Debug = 3,
        Trace = 4,
    }

    impl LogLevel {
        pub fn as_filter(&self) -> LevelFilter {
            match self {
                LogLevel::Error => LevelFilter::ERROR,
                LogLevel::Warn => LevelFilter::WARN,
                LogLevel::Info => LevelFilter::INFO,
                LogLevel::Debug => LevelFilter::DEBUG,
                LogLevel::Trace => LevelFilter::TRACE,
            }
        }
    }

    pub fn derive_level(verbose: u8, quiet: bool) -> LogLevel {
        if quiet {
            return LogLevel::Error;
        }
        match verbose {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            2 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    /// Install the global subscriber on stderr. `RUST_LOG`, when set, wins.
    pub fn init_logging(level: LogLevel) {
        let filter = EnvFilter::builder()
            .with_default_directive(level.as_filter().into())
            .from_env_lossy();

        // A second init (tests) is not an error worth reporting.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .try_init();
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn verbosity_steps() {
            assert_eq!(derive_level(0, false), LogLevel::Warn);
            assert_eq!(derive_level(1, false), LogLevel::Info);
            assert_eq!(derive_level(2, false), LogLevel::Debug);
            assert_eq!(derive_level(9, false), LogLevel::Trace);
        }

        #[test]
        fn quiet_wins() {
            assert_eq!(derive_level(3, true), LogLevel::Error);
            assert_eq!(LogLevel::Error.as_filter(), LevelFilter::ERROR);
        }
    }
}

pub use logging::{derive_level, init_logging};
