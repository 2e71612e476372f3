use crate::config::Config;
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode, ThreadLogMode};

/// HTTP stack crates that log every connection and frame; silenced below Trace.
const HTTP_STACK: &[&str] = &["reqwest", "hyper", "hyper_util", "rustls", "h2", "mio"];

/// What the console logger should emit, derived from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LogSettings {
    level: LevelFilter,
    quiet_http_stack: bool,
}

impl LogSettings {
    fn for_level(level: LevelFilter) -> Self {
        Self {
            level,
            quiet_http_stack: level != LevelFilter::Trace,
        }
    }

    fn to_simplelog(self) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder
            .set_time_format_rfc3339()
            .set_thread_mode(ThreadLogMode::Names)
            .set_target_level(LevelFilter::Debug);
        if self.quiet_http_stack {
            for module in HTTP_STACK {
                builder.add_filter_ignore_str(module);
            }
        }
        builder.build()
    }
}

pub struct Logger {}

impl Logger {
    /// Installs the global terminal logger. Output goes to stderr so rendered tables on stdout
    /// stay clean. A second call keeps the logger installed first.
    pub fn init_logger(config: &Config) {
        let settings = LogSettings::for_level(config.log_level_filter);
        let installed = TermLogger::init(
            settings.level,
            settings.to_simplelog(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        );
        if installed.is_err() {
            log::debug!("Logger already initialised");
        }
    }
}
