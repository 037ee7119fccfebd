use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use std::{env, fmt, str::FromStr, time::Duration};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Command-line entry point.
#[derive(Parser, Debug)]
#[command(author, version, about = "CSV upload gateway, analytics worker and client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the upload gateway (object storage + analytics)
    Gateway(GatewayArgs),
    /// Run the analytics worker
    Analytics(AnalyticsArgs),
    /// Talk to a running gateway
    Client(ClientArgs),
}

#[derive(Args, Debug, Default)]
pub struct GatewayArgs {
    /// Host to bind to (overrides GATEWAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides GATEWAY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Bucket that receives uploads (overrides MINIO_BUCKET)
    #[arg(long)]
    pub bucket: Option<String>,

    /// Base URL of the analytics worker (overrides ANALYTICS_URL)
    #[arg(long)]
    pub analytics_url: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct AnalyticsArgs {
    /// Host to bind to (overrides ANALYTICS_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides ANALYTICS_PORT)
    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Args, Debug)]
pub struct ClientArgs {
    /// Gateway base URL (overrides BACKEND_URL)
    #[arg(long)]
    pub gateway_url: Option<String>,

    #[command(subcommand)]
    pub action: ClientAction,
}

#[derive(Subcommand, Debug)]
pub enum ClientAction {
    /// Check whether the gateway is online
    Health,
    /// Upload a file and print its analysis
    Upload {
        /// File to upload
        path: std::path::PathBuf,
    },
    /// List stored files
    List,
}

/// Connection settings for the S3-compatible store.
#[derive(Clone)]
pub struct StorageConfig {
    /// `host[:port]` without scheme.
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub secure: bool,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("region", &self.region)
            .field("secure", &self.secure)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageConfig,
    pub bucket: String,
    pub analytics_url: String,
    pub analytics_timeout: Duration,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

/// Reads settings by name. The process environment in production, a map in tests.
trait Lookup {
    fn get(&self, key: &str) -> Option<String>;

    fn required(&self, key: &str) -> Result<String> {
        self.get(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("missing required setting {}", key))
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(key) {
            Some(value) => value
                .trim()
                .parse::<T>()
                .with_context(|| format!("parsing {} value `{}`", key, value)),
            None => Ok(default),
        }
    }
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

fn from_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Split an endpoint that may carry a scheme into (`host[:port]`, secure).
fn split_endpoint(raw: &str, secure_default: bool) -> (String, bool) {
    let raw = raw.trim().trim_end_matches('/');
    if let Some(rest) = raw.strip_prefix("https://") {
        (rest.to_string(), true)
    } else if let Some(rest) = raw.strip_prefix("http://") {
        (rest.to_string(), false)
    } else {
        (raw.to_string(), secure_default)
    }
}

impl GatewayConfig {
    /// Merge CLI overrides with the process environment.
    pub fn from_env_and_args(args: GatewayArgs) -> Result<Self> {
        Self::resolve(args, &from_env)
    }

    fn resolve(args: GatewayArgs, lookup: &impl Lookup) -> Result<Self> {
        let secure_default = lookup.parsed("MINIO_SECURE", false)?;
        let (endpoint, secure) = split_endpoint(&lookup.required("MINIO_ENDPOINT")?, secure_default);

        let storage = StorageConfig {
            endpoint,
            access_key: lookup.required("MINIO_ACCESS_KEY")?,
            secret_key: lookup.required("MINIO_SECRET_KEY")?,
            region: lookup
                .get("MINIO_REGION")
                .unwrap_or_else(|| "us-east-1".into()),
            secure,
        };

        let bucket = match args.bucket {
            Some(bucket) => bucket,
            None => lookup.required("MINIO_BUCKET")?,
        };
        let analytics_url = match args.analytics_url {
            Some(url) => url,
            None => lookup.required("ANALYTICS_URL")?,
        };

        Ok(Self {
            host: args
                .host
                .unwrap_or_else(|| lookup.get("GATEWAY_HOST").unwrap_or_else(|| "0.0.0.0".into())),
            port: match args.port {
                Some(port) => port,
                None => lookup.parsed("GATEWAY_PORT", 8000)?,
            },
            storage,
            bucket,
            analytics_url: analytics_url.trim_end_matches('/').to_string(),
            analytics_timeout: Duration::from_secs(lookup.parsed("ANALYTICS_TIMEOUT_SECS", 10)?),
            max_upload_bytes: lookup.parsed("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AnalyticsConfig {
    pub fn from_env_and_args(args: AnalyticsArgs) -> Result<Self> {
        Self::resolve(args, &from_env)
    }

    fn resolve(args: AnalyticsArgs, lookup: &impl Lookup) -> Result<Self> {
        Ok(Self {
            host: args
                .host
                .unwrap_or_else(|| lookup.get("ANALYTICS_HOST").unwrap_or_else(|| "0.0.0.0".into())),
            port: match args.port {
                Some(port) => port,
                None => lookup.parsed("ANALYTICS_PORT", 8001)?,
            },
            max_upload_bytes: lookup.parsed("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Gateway URL for the client: flag, then BACKEND_URL, then localhost.
pub fn client_gateway_url(flag: Option<String>) -> String {
    flag.or_else(|| from_env("BACKEND_URL"))
        .unwrap_or_else(|| "http://localhost:8000".into())
        .trim_end_matches('/')
        .to_string()
}
