use figment::{Figment, providers::Env};
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;

pub trait ContextProvider<Config>: Sized {
    type Error;

    fn new(config: Config) -> impl Future<Output = Result<Self, Self::Error>>;
}

#[derive(Debug, Error)]
pub enum AppContextError<E> {
    #[error("failed to load configuration: {0}")]
    Config(#[from] figment::Error),
    #[error("failed to initialize application context: {0}")]
    Context(E),
}

/// Output format of the log lines written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize)]
struct LoggingConfig {
    #[serde(default)]
    log_format: LogFormat,
}

/// Extract a configuration struct from the process environment.
///
/// Environment variable names are matched case-insensitively against the
/// struct's field names, so `PORT` populates a `port` field.
///
/// # Errors
/// If a variable cannot be converted into the type of its field, or a
/// required field has no value.
pub fn load_config<Config: DeserializeOwned>() -> Result<Config, figment::Error>
{
    Figment::new().merge(Env::raw()).extract()
}

/// Install the global tracing subscriber.
///
/// The log level can be overridden with the `RUST_LOG` env var and defaults
/// to `info`.
///
/// # Panics
/// If a global subscriber has already been installed.
pub fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                // this needs to be set to remove duplicated information in the log.
                .with_current_span(false)
                .with_ansi(false)
                .with_target(false)
                .init();
        }
    }
}

/// Initialize logging and the application context with configuration from
/// environment variables.
///
/// # Returns
/// The application context built by the `ContextProvider` implementation.
///
/// # Errors
/// If the configuration cannot be extracted from the environment variables
/// or if the context itself fails to initialize.
pub async fn create_app_context<A, Config>()
-> Result<A, AppContextError<A::Error>>
where
    A: ContextProvider<Config>,
    Config: DeserializeOwned,
{
    let logging: LoggingConfig = load_config()?;
    init_tracing(logging.log_format);

    let config: Config = load_config()?;

    A::new(config).await.map_err(AppContextError::Context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Deserialize, PartialEq)]
    struct SampleConfig {
        port: u16,
        #[serde(default)]
        output_dir: Option<String>,
    }

    #[test]
    fn test_load_config_matches_env_case_insensitively() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("PORT", "8080");
            jail.set_env("OUTPUT_DIR", "/srv/videos");

            let config: SampleConfig = load_config()?;
            assert_eq!(
                config,
                SampleConfig {
                    port: 8080,
                    output_dir: Some("/srv/videos".to_string()),
                }
            );
            Ok(())
        });
    }

    #[test]
    fn test_load_config_reports_missing_fields() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();

            assert!(load_config::<SampleConfig>().is_err());
            Ok(())
        });
    }

    #[test]
    fn test_log_format_defaults_to_pretty() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();

            let logging: LoggingConfig = load_config()?;
            assert_eq!(logging.log_format, LogFormat::Pretty);

            jail.set_env("LOG_FORMAT", "json");
            let logging: LoggingConfig = load_config()?;
            assert_eq!(logging.log_format, LogFormat::Json);
            Ok(())
        });
    }
}
