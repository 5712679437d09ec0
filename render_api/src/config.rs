use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use rv_render::{
    CleanupPolicy, Engine, EngineCommand, RenderError, RenderStrategy,
};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,

    /// Where rendered videos are kept and served from.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Root of the per-request workspaces.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    #[serde(default)]
    pub render_strategy: RenderStrategy,
    /// Overrides the strategy's default engine command, e.g. `npx remotion`.
    #[serde(default)]
    pub render_command: Option<String>,
    #[serde(default)]
    pub render_timeout_secs: Option<u64>,
    /// 0 means no limit.
    #[serde(default)]
    pub max_concurrent_renders: usize,
    #[serde(default)]
    pub workspace_cleanup: CleanupPolicy,

    #[serde(default)]
    pub video_retention_secs: Option<u64>,
    #[serde(default = "default_retention_sweep_secs")]
    pub retention_sweep_secs: u64,
}

const fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

const fn default_port() -> u16 {
    3000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("public").join("videos")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("temp")
}

const fn default_retention_sweep_secs() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            output_dir: default_output_dir(),
            temp_dir: default_temp_dir(),
            render_strategy: RenderStrategy::default(),
            render_command: None,
            render_timeout_secs: None,
            max_concurrent_renders: 0,
            workspace_cleanup: CleanupPolicy::default(),
            video_retention_secs: None,
            retention_sweep_secs: default_retention_sweep_secs(),
        }
    }
}

impl Config {
    #[must_use]
    pub const fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    #[must_use]
    pub fn render_timeout(&self) -> Option<Duration> {
        self.render_timeout_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub fn video_retention(&self) -> Option<Duration> {
        self.video_retention_secs.map(Duration::from_secs)
    }

    #[must_use]
    pub const fn retention_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.retention_sweep_secs)
    }

    /// Build the render engine described by this configuration.
    ///
    /// # Errors
    /// If `render_command` is set but blank.
    pub fn engine(&self) -> Result<Engine, RenderError> {
        let command = match &self.render_command {
            Some(command) => EngineCommand::parse(command)?,
            None => self.render_strategy.default_command(),
        };

        Ok(Engine::new(self.render_strategy, command)
            .with_timeout(self.render_timeout()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();

            let config: Config = rv_app::load_config()?;

            assert_eq!(config.listen_addr(), "0.0.0.0:3000".parse().unwrap());
            assert_eq!(config.output_dir, PathBuf::from("public/videos"));
            assert_eq!(config.temp_dir, PathBuf::from("temp"));
            assert_eq!(config.render_strategy, RenderStrategy::Cli);
            assert_eq!(config.workspace_cleanup, CleanupPolicy::Always);
            assert_eq!(config.max_concurrent_renders, 0);
            assert_eq!(config.render_timeout(), None);
            assert_eq!(config.video_retention(), None);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("PORT", "8080");
            jail.set_env("HOST", "127.0.0.1");
            jail.set_env("RENDER_STRATEGY", "pipeline");
            jail.set_env("RENDER_COMMAND", "node /opt/render-driver.mjs");
            jail.set_env("RENDER_TIMEOUT_SECS", "600");
            jail.set_env("MAX_CONCURRENT_RENDERS", "2");
            jail.set_env("WORKSPACE_CLEANUP", "on_success");
            jail.set_env("VIDEO_RETENTION_SECS", "86400");

            let config: Config = rv_app::load_config()?;

            assert_eq!(config.listen_addr(), "127.0.0.1:8080".parse().unwrap());
            assert_eq!(config.render_strategy, RenderStrategy::Pipeline);
            assert_eq!(config.max_concurrent_renders, 2);
            assert_eq!(config.workspace_cleanup, CleanupPolicy::OnSuccess);
            assert_eq!(config.render_timeout(), Some(Duration::from_secs(600)));
            assert_eq!(
                config.video_retention(),
                Some(Duration::from_secs(86400))
            );

            let engine = config.engine().unwrap();
            assert_eq!(engine.strategy(), RenderStrategy::Pipeline);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.clear_env();
            jail.set_env("PORT", "not-a-port");

            assert!(rv_app::load_config::<Config>().is_err());
            Ok(())
        });
    }

    #[test]
    fn test_blank_render_command_is_rejected() {
        let config = Config {
            render_command: Some("  ".to_string()),
            ..Config::default()
        };

        assert!(matches!(
            config.engine(),
            Err(RenderError::InvalidCommand(_))
        ));
    }
}
