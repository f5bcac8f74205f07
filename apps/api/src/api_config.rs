use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use actionhub_application::payload::{DEFAULT_CHUNK_BYTES, PayloadPipe};
use actionhub_application::DEFAULT_MAX_BUFFERED_PAYLOAD_BYTES;
use actionhub_core::AppError;
use actionhub_infrastructure::{OAuth2ClientConfig, OAuthFileStoreConfig};
use tracing_subscriber::EnvFilter;
use url::Url;

const MIN_HUB_SECRET_LEN: usize = 32;

/// Registration outcome for the OAuth file store destination.
#[derive(Debug, Clone)]
pub enum OAuthFileStoreSetup {
    Configured(OAuthFileStoreConfig),
    Unconfigured { missing: Vec<&'static str> },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub base_url: Url,
    pub hub_secret: String,
    pub continuation_token_key: String,
    pub oauth_state_ttl_seconds: i64,
    pub max_buffered_payload_bytes: usize,
    pub stream_chunk_bytes: usize,
    pub stream_pipe_capacity: usize,
    pub http_timeout_seconds: u64,
    pub local_file_root: Option<PathBuf>,
    pub oauth_file_store: OAuthFileStoreSetup,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        let api_host = env
            .optional("API_HOST")
            .unwrap_or_else(|| "127.0.0.1".to_owned());
        let api_port = env.parsed("API_PORT", 3001_u16)?;

        let base_url = parse_url("ACTION_HUB_BASE_URL", &env.required("ACTION_HUB_BASE_URL")?)?;

        let hub_secret = env.required("ACTION_HUB_SECRET")?;
        if hub_secret.len() < MIN_HUB_SECRET_LEN {
            return Err(AppError::Validation(format!(
                "ACTION_HUB_SECRET must be at least {MIN_HUB_SECRET_LEN} characters"
            )));
        }

        let continuation_token_key = env.required("CONTINUATION_TOKEN_KEY")?;
        if continuation_token_key.trim().len() != 64 {
            return Err(AppError::Validation(
                "CONTINUATION_TOKEN_KEY must be 64 hex characters".to_owned(),
            ));
        }

        let oauth_state_ttl_seconds = env.parsed("OAUTH_STATE_TTL_SECONDS", 600_i64)?;
        if oauth_state_ttl_seconds <= 0 {
            return Err(AppError::Validation(
                "OAUTH_STATE_TTL_SECONDS must be positive".to_owned(),
            ));
        }

        let max_buffered_payload_bytes =
            env.parsed("MAX_BUFFERED_PAYLOAD_BYTES", DEFAULT_MAX_BUFFERED_PAYLOAD_BYTES)?;
        let stream_chunk_bytes = env.parsed("STREAM_CHUNK_BYTES", DEFAULT_CHUNK_BYTES)?;
        let stream_pipe_capacity =
            env.parsed("STREAM_PIPE_CAPACITY", PayloadPipe::DEFAULT_CAPACITY)?;
        if stream_chunk_bytes == 0 || stream_pipe_capacity == 0 {
            return Err(AppError::Validation(
                "STREAM_CHUNK_BYTES and STREAM_PIPE_CAPACITY must be positive".to_owned(),
            ));
        }

        let http_timeout_seconds = env.parsed("HTTP_TIMEOUT_SECONDS", 60_u64)?;
        let local_file_root = env.optional("LOCAL_FILE_ROOT").map(PathBuf::from);
        let oauth_file_store = oauth_file_store_setup(&env)?;

        Ok(Self {
            api_host,
            api_port,
            base_url,
            hub_secret,
            continuation_token_key,
            oauth_state_ttl_seconds,
            max_buffered_payload_bytes,
            stream_chunk_bytes,
            stream_pipe_capacity,
            http_timeout_seconds,
            local_file_root,
            oauth_file_store,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, name: &str) -> Result<String, AppError> {
        self.optional(name)
            .ok_or_else(|| AppError::Validation(format!("{name} is required")))
    }

    fn parsed<T>(&self, name: &str, default: T) -> Result<T, AppError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(value) => value
                .trim()
                .parse::<T>()
                .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
            None => Ok(default),
        }
    }
}

fn oauth_file_store_setup<F>(env: &EnvReader<F>) -> Result<OAuthFileStoreSetup, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let names = [
        "OAUTH_FILE_STORE_CLIENT_ID",
        "OAUTH_FILE_STORE_CLIENT_SECRET",
        "OAUTH_FILE_STORE_AUTHORIZE_URL",
        "OAUTH_FILE_STORE_TOKEN_URL",
        "OAUTH_FILE_STORE_API_URL",
    ];
    let missing: Vec<&'static str> = names
        .into_iter()
        .filter(|name| env.optional(name).is_none())
        .collect();
    if !missing.is_empty() {
        return Ok(OAuthFileStoreSetup::Unconfigured { missing });
    }

    let scopes = env
        .optional("OAUTH_FILE_STORE_SCOPES")
        .map(|value| {
            value
                .split([' ', ','])
                .filter(|scope| !scope.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    Ok(OAuthFileStoreSetup::Configured(OAuthFileStoreConfig {
        oauth: OAuth2ClientConfig {
            client_id: env.required("OAUTH_FILE_STORE_CLIENT_ID")?,
            client_secret: env.required("OAUTH_FILE_STORE_CLIENT_SECRET")?,
            authorize_url: parse_url(
                "OAUTH_FILE_STORE_AUTHORIZE_URL",
                &env.required("OAUTH_FILE_STORE_AUTHORIZE_URL")?,
            )?,
            token_url: parse_url(
                "OAUTH_FILE_STORE_TOKEN_URL",
                &env.required("OAUTH_FILE_STORE_TOKEN_URL")?,
            )?,
            scopes,
        },
        api_url: parse_url(
            "OAUTH_FILE_STORE_API_URL",
            &env.required("OAUTH_FILE_STORE_API_URL")?,
        )?,
    }))
}

fn parse_url(name: &str, value: &str) -> Result<Url, AppError> {
    let url = Url::parse(value.trim())
        .map_err(|error| AppError::Validation(format!("invalid {name}: {error}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(AppError::Validation(format!(
            "{name} must use http or https, got '{scheme}'"
        ))),
    }
}
