use clap::ValueEnum;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::settings::{LogFormat, LoggingConfig, ServiceConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match *self {
            LogLevel::TRACE => "trace",
            LogLevel::DEBUG => "debug",
            LogLevel::INFO => "info",
            LogLevel::WARN => "warn",
            LogLevel::ERROR => "error",
        }
    }
}

/// Command line level beats the config file, which beats `info`.
pub fn resolve_logging_config(service_config: &ServiceConfig, arg_log_level: Option<LogLevel>) -> LoggingConfig {
    let configured = service_config.settings.logging.as_ref();
    let level = arg_log_level
        .map(|level| level.as_str().to_owned())
        .or_else(|| configured.map(|config| config.level.to_owned()))
        .unwrap_or_else(|| "info".to_owned());
    let format = configured.map(|config| config.format.to_owned()).unwrap_or_default();
    LoggingConfig::new(level, format)
}

/// Install the global subscriber. Later calls leave the first one in place.
pub fn run(service_config: &ServiceConfig, arg_log_level: Option<LogLevel>) {
    let cfg = resolve_logging_config(service_config, arg_log_level);
    let filter = EnvFilter::try_new(&cfg.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // exactly one of the two is Some
    let json = (cfg.format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_timer(UtcTime::rfc_3339())
            .flatten_event(true)
            .with_ansi(false)
    });
    let compact = (cfg.format == LogFormat::Compact)
        .then(|| fmt::layer().compact().with_timer(UtcTime::rfc_3339()));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(compact)
        .try_init();
}
