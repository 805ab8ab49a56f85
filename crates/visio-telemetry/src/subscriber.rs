use serde::{Deserialize, Serialize};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub json_output: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json_output: false,
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}

impl TelemetryConfig {
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_json_output(mut self, json_output: bool) -> Self {
        self.json_output = json_output;
        self
    }

    /// `RUST_LOG` when set, the configured level otherwise
    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays clean.
pub fn init_subscriber(config: &TelemetryConfig) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(config.filter());

    if config.json_output {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }

    tracing::debug!(
        level = %config.level,
        json = config.json_output,
        "telemetry initialized"
    );
    Ok(())
}
