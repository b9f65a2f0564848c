//! Configuration types and loading
//!
//! Precedence: environment > config file > defaults. The config file is
//! optional; a missing file at the default path means "defaults + env".
//! The OAuth client secret is never read from the TOML itself: it comes from
//! `GOOGLE_CLIENT_SECRET` or from `client_secret_file`.

use common::Secret;
use google_api::ApiEndpoints;
use google_auth::constants::{AUTHORIZE_ENDPOINT, TOKEN_ENDPOINT};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "workspace-gateway.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Browser origin allowed by CORS and redirected to after sign-in
    #[serde(default = "default_frontend_origin")]
    pub frontend_origin: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// OAuth client registration and Google endpoints
#[derive(Debug, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// File holding the client secret (alternative to GOOGLE_CLIENT_SECRET)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_authorize_endpoint")]
    pub authorize_endpoint: String,
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
    /// Per-surface API base URLs
    #[serde(default)]
    pub api: ApiEndpoints,
}

/// Admission control for quota-limited YouTube routes
#[derive(Debug, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,
}

/// Session cookie settings
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Mark the cookie `Secure` (HTTPS-only). Off for local development.
    #[serde(default)]
    pub secure: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    3000
}

fn default_frontend_origin() -> String {
    "http://localhost:5174".into()
}

fn default_max_connections() -> usize {
    1000
}

fn default_redirect_uri() -> String {
    "http://localhost:3000/auth/google/callback".into()
}

fn default_authorize_endpoint() -> String {
    AUTHORIZE_ENDPOINT.into()
}

fn default_token_endpoint() -> String {
    TOKEN_ENDPOINT.into()
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_requests() -> u32 {
    5
}

fn default_cookie_name() -> String {
    "gateway_session".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            frontend_origin: default_frontend_origin(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            client_secret_file: None,
            redirect_uri: default_redirect_uri(),
            authorize_endpoint: default_authorize_endpoint(),
            token_endpoint: default_token_endpoint(),
            api: ApiEndpoints::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_requests: default_max_requests(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            secure: false,
        }
    }
}

impl ServerConfig {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Where the config file comes from and whether it must exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Named explicitly (CLI or CONFIG_PATH); a missing file is then an error
    pub explicit: bool,
}

impl Config {
    /// Load from `source`, overlay the process environment, validate.
    pub fn load(source: &ConfigSource) -> common::Result<Self> {
        Self::load_with(source, |key| std::env::var(key).ok())
    }

    /// Same as `load` with an injectable environment lookup.
    pub fn load_with(
        source: &ConfigSource,
        env: impl Fn(&str) -> Option<String>,
    ) -> common::Result<Self> {
        let mut config: Config = match std::fs::read_to_string(&source.path) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !source.explicit => {
                Config::default()
            }
            Err(e) => return Err(e.into()),
        };

        config.apply_env(&env)?;
        config.resolve_client_secret(&env)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>) -> common::Result<()> {
        if let Some(id) = env("GOOGLE_CLIENT_ID") {
            self.google.client_id = id;
        }
        if let Some(uri) = env("GOOGLE_REDIRECT_URI") {
            self.google.redirect_uri = uri;
        }
        if let Some(origin) = env("FRONTEND_ORIGIN") {
            self.server.frontend_origin = origin;
        }
        if let Some(port) = env("PORT") {
            self.server.port = port.trim().parse().map_err(|_| {
                common::Error::Config(format!("PORT must be a port number, got: {port}"))
            })?;
        }
        Ok(())
    }

    /// Client secret: GOOGLE_CLIENT_SECRET env var, then `client_secret_file`.
    fn resolve_client_secret(
        &mut self,
        env: &impl Fn(&str) -> Option<String>,
    ) -> common::Result<()> {
        if let Some(secret) = env("GOOGLE_CLIENT_SECRET") {
            self.google.client_secret = Some(Secret::new(secret));
        } else if let Some(ref path) = self.google.client_secret_file {
            let secret = std::fs::read_to_string(path).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    path.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                self.google.client_secret = Some(Secret::new(secret));
            }
        }
        Ok(())
    }

    fn validate(&self) -> common::Result<()> {
        if self.google.client_id.trim().is_empty() {
            return Err(common::Error::Config(
                "google.client_id must be set (or GOOGLE_CLIENT_ID)".into(),
            ));
        }
        if self.google.client_secret.is_none() {
            return Err(common::Error::Config(
                "client secret missing: set GOOGLE_CLIENT_SECRET or google.client_secret_file"
                    .into(),
            ));
        }

        let urls = [
            ("google.redirect_uri", &self.google.redirect_uri),
            ("google.authorize_endpoint", &self.google.authorize_endpoint),
            ("google.token_endpoint", &self.google.token_endpoint),
            ("server.frontend_origin", &self.server.frontend_origin),
            ("google.api.drive", &self.google.api.drive),
            ("google.api.sheets", &self.google.api.sheets),
            ("google.api.docs", &self.google.api.docs),
            ("google.api.youtube", &self.google.api.youtube),
            ("google.api.youtube_analytics", &self.google.api.youtube_analytics),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }

        if self.rate_limit.window_secs == 0 {
            return Err(common::Error::Config(
                "rate_limit.window_secs must be greater than 0".into(),
            ));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(common::Error::Config(
                "rate_limit.max_requests must be greater than 0".into(),
            ));
        }
        if self.server.max_connections == 0 {
            return Err(common::Error::Config(
                "server.max_connections must be greater than 0".into(),
            ));
        }
        if self.session.cookie_name.trim().is_empty() {
            return Err(common::Error::Config(
                "session.cookie_name must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the config file from the CLI arg, then CONFIG_PATH, then the
    /// default path.
    pub fn resolve_path(cli_path: Option<&str>) -> ConfigSource {
        Self::resolve_path_with(cli_path, std::env::var("CONFIG_PATH").ok())
    }

    fn resolve_path_with(cli_path: Option<&str>, env_path: Option<String>) -> ConfigSource {
        if let Some(p) = cli_path {
            return ConfigSource {
                path: PathBuf::from(p),
                explicit: true,
            };
        }
        if let Some(p) = env_path {
            return ConfigSource {
                path: PathBuf::from(p),
                explicit: true,
            };
        }
        ConfigSource {
            path: PathBuf::from(DEFAULT_CONFIG_PATH),
            explicit: false,
        }
    }
}

/// Parse `--config <path>` from the process arguments.
pub fn cli_config_path(args: &[String]) -> Option<&str> {
    args.iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

impl ConfigSource {
    pub fn display(&self) -> std::path::Display<'_> {
        self.path.display()
    }

    #[cfg(test)]
    fn at(path: &std::path::Path, explicit: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            explicit,
        }
    }
}
