use std::path::Path;

use anyhow::{Context, Result};

use crate::config::settings::ServiceConfig;

/// Load settings from an optional YAML file. No path means defaults.
pub async fn load_config(config_path: Option<&str>) -> Result<ServiceConfig> {
    let Some(config_path) = config_path else {
        return Ok(ServiceConfig::default());
    };
    let path = Path::new(config_path);
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("Invalid config format: {}", path.display()))
}

pub fn parse_config(raw: &str) -> Result<ServiceConfig> {
    if raw.trim().is_empty() {
        return Ok(ServiceConfig::default());
    }
    let config: ServiceConfig = serde_yaml::from_str(raw)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::config::settings::LogFormat;

    use super::*;

    #[tokio::test]
    async fn missing_path_yields_defaults() {
        let cfg = load_config(None).await.unwrap();
        assert_eq!(cfg.settings.safety_margin_seconds, 60);
        assert_eq!(cfg.settings.request_timeout_ms, 5000);
        assert!(cfg.settings.metrics.is_enabled);
        assert!(cfg.settings.logging.is_none());
    }

    #[tokio::test]
    async fn reads_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "settings:\n  request_timeout_ms: 1500\n  logging:\n    level: debug\n    format: json\n  server:\n    port: 9100\n"
        )
        .unwrap();

        let cfg = load_config(file.path().to_str()).await.unwrap();
        assert_eq!(cfg.settings.request_timeout_ms, 1500);
        assert_eq!(cfg.settings.safety_margin_seconds, 60);
        assert_eq!(cfg.settings.server.port, 9100);
        assert_eq!(cfg.settings.server.host, "127.0.0.1");
        let logging = cfg.settings.logging.unwrap();
        assert_eq!(logging.level, "debug");
        assert_eq!(logging.format, LogFormat::Json);
    }

    #[tokio::test]
    async fn unreadable_file_is_an_error() {
        let err = load_config(Some("/definitely/not/here.yaml")).await.unwrap_err();
        assert!(err.to_string().contains("cannot read config file"));
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(parse_config("settings: [unclosed").is_err());
    }
}
