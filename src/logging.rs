//! Logger initialization for the viewer binary
//!
//! The library only talks to the `log` facade; this is the one place that
//! installs a backend.

use std::sync::Once;

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `env_logger` filter string, e.g. "info" or "softraster=debug"
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Later calls are ignored.
///
/// Filter precedence: explicit config, then `RUST_LOG`, then `info`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        builder.write_style(config.write_style);
        // try_init so a test harness that already installed a logger doesn't panic
        let _ = builder.try_init();

        log::debug!("logging initialized");
    });
}
