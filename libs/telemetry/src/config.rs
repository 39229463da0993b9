use std::env;

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    pub json_logs: bool,
    /// Human-readable output at `trace` unless `RUST_LOG` says otherwise.
    pub dev_logging: bool,
}

impl TelemetryConfig {
    pub fn from_env(default_service_name: &str, default_service_version: &str) -> Self {
        let service_name =
            env::var("SERVICE_NAME").unwrap_or_else(|_| default_service_name.to_string());
        let service_version = env::var("SERVICE_VERSION")
            .unwrap_or_else(|_| default_service_version.to_string());
        let json_logs = env::var("LOG_FORMAT")
            .map(|v| parse_json_logs(&v))
            .unwrap_or(true);

        Self {
            service_name,
            service_version,
            json_logs,
            dev_logging: false,
        }
    }

    /// Applies the `--dev-logging` switch shared by every binary.
    pub fn with_dev_logging(mut self, enabled: bool) -> Self {
        if enabled {
            self.dev_logging = true;
            self.json_logs = false;
        }
        self
    }

    pub fn default_directive(&self) -> &'static str {
        if self.dev_logging { "trace" } else { "info" }
    }
}

fn parse_json_logs(value: &str) -> bool {
    !matches!(
        value.to_lowercase().as_str(),
        "text" | "pretty" | "plain"
    )
}
