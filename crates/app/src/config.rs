use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use storage::repository::DEFAULT_DEBOUNCE_WINDOW;
use storage::{Backend, RemoteConfig, RemoteConfigError, RemoteMergeMode};
use web::{DEFAULT_MAX_BODY_BYTES, WebConfig};

#[derive(Debug)]
pub enum ArgsError {
    HelpRequested,
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidPort { raw: String },
    InvalidBackend { raw: String },
    InvalidNumber { name: &'static str, raw: String },
    MissingRemoteUrl,
    Remote(RemoteConfigError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::HelpRequested => write!(f, "help requested"),
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidPort { raw } => write!(f, "invalid port: {raw}"),
            ArgsError::InvalidBackend { raw } => write!(
                f,
                "invalid backend: {raw} (expected memory, file, debounced, remote or sqlite)"
            ),
            ArgsError::InvalidNumber { name, raw } => write!(f, "invalid {name} value: {raw}"),
            ArgsError::MissingRemoteUrl => {
                write!(f, "the remote backend requires --remote-url or PROGRESS_REMOTE_URL")
            }
            ArgsError::Remote(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<RemoteConfigError> for ArgsError {
    fn from(err: RemoteConfigError) -> Self {
        ArgsError::Remote(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    File,
    Debounced,
    Remote,
    Sqlite,
}

impl BackendKind {
    fn from_arg(raw: &str) -> Result<Self, ArgsError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "debounced" | "debounced-file" => Ok(Self::Debounced),
            "remote" => Ok(Self::Remote),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(ArgsError::InvalidBackend {
                raw: raw.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub backend: Backend,
    pub web: WebConfig,
    pub log_json: bool,
}

impl ServerConfig {
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  checklist-progress [--port <port>] [--host <addr>] [--backend <kind>]");
    eprintln!("                     [--file <path>] [--debounce-ms <ms>] [--remote-url <url>]");
    eprintln!("                     [--db <sqlite_url>] [--static-dir <dir>]");
    eprintln!();
    eprintln!("Backends: memory, file (default), debounced, remote, sqlite");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PORT, PROGRESS_HOST, PROGRESS_BACKEND, PROGRESS_FILE, PROGRESS_DEBOUNCE_MS,");
    eprintln!("  PROGRESS_REMOTE_URL, PROGRESS_REMOTE_AUTH, PROGRESS_REMOTE_KEY,");
    eprintln!("  PROGRESS_REMOTE_MERGE (patch | read-modify-write), PROGRESS_REMOTE_TIMEOUT_MS,");
    eprintln!("  PROGRESS_DB_URL, PROGRESS_STATIC_DIR, PROGRESS_CORS_ORIGIN,");
    eprintln!("  PROGRESS_MAX_BODY_BYTES, PROGRESS_LOG_JSON, RUST_LOG");
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next()
        .filter(|value| !value.trim().is_empty())
        .ok_or(ArgsError::MissingValue { flag })
}

fn parse_port(raw: &str) -> Result<u16, ArgsError> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| ArgsError::InvalidPort {
            raw: raw.to_string(),
        })
}

fn parse_number<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ArgsError> {
    raw.trim().parse::<T>().map_err(|_| ArgsError::InvalidNumber {
        name,
        raw: raw.to_string(),
    })
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Build the server configuration from CLI flags, falling back to the
/// environment (via `env`) and then to defaults.
///
/// # Errors
///
/// Returns `ArgsError` for unknown flags, missing or malformed values, and
/// an incomplete remote backend configuration.
pub fn parse(
    args: &mut impl Iterator<Item = String>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ServerConfig, ArgsError> {
    let mut host = env("PROGRESS_HOST").unwrap_or_else(|| "0.0.0.0".into());
    let mut port = env("PORT").map_or(Ok(3000), |raw| parse_port(&raw))?;
    let mut backend = env("PROGRESS_BACKEND").map_or(Ok(BackendKind::File), |raw| {
        BackendKind::from_arg(&raw)
    })?;
    let mut file = env("PROGRESS_FILE").unwrap_or_else(|| "./progress.json".into());
    let mut debounce_ms = env("PROGRESS_DEBOUNCE_MS").map_or(
        Ok(u64::try_from(DEFAULT_DEBOUNCE_WINDOW.as_millis()).unwrap_or(500)),
        |raw| parse_number("PROGRESS_DEBOUNCE_MS", &raw),
    )?;
    let mut remote_url = env("PROGRESS_REMOTE_URL");
    let mut db_url = env("PROGRESS_DB_URL").unwrap_or_else(|| "sqlite://progress.sqlite3".into());
    let mut static_dir = env("PROGRESS_STATIC_DIR").unwrap_or_else(|| "public".into());

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--host" => host = require_value(args, "--host")?,
            "--port" => port = parse_port(&require_value(args, "--port")?)?,
            "--backend" => backend = BackendKind::from_arg(&require_value(args, "--backend")?)?,
            "--file" => file = require_value(args, "--file")?,
            "--debounce-ms" => {
                debounce_ms = parse_number("--debounce-ms", &require_value(args, "--debounce-ms")?)?;
            }
            "--remote-url" => remote_url = Some(require_value(args, "--remote-url")?),
            "--db" => db_url = require_value(args, "--db")?,
            "--static-dir" => static_dir = require_value(args, "--static-dir")?,
            "--help" | "-h" => return Err(ArgsError::HelpRequested),
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }

    let backend = match backend {
        BackendKind::Memory => Backend::Memory,
        BackendKind::File => Backend::File { path: file.into() },
        BackendKind::Debounced => Backend::DebouncedFile {
            path: file.into(),
            window: Duration::from_millis(debounce_ms),
        },
        BackendKind::Remote => {
            let url = remote_url.ok_or(ArgsError::MissingRemoteUrl)?;
            let mut config = RemoteConfig::new(&url)?.with_auth(env("PROGRESS_REMOTE_AUTH"));
            if let Some(key) = env("PROGRESS_REMOTE_KEY") {
                config = config.with_key(key)?;
            }
            if let Some(mode) = env("PROGRESS_REMOTE_MERGE") {
                config = config.with_merge_mode(mode.parse::<RemoteMergeMode>()?);
            }
            if let Some(raw) = env("PROGRESS_REMOTE_TIMEOUT_MS") {
                let ms: u64 = parse_number("PROGRESS_REMOTE_TIMEOUT_MS", &raw)?;
                config = config.with_timeout(Duration::from_millis(ms));
            }
            Backend::Remote(config)
        }
        BackendKind::Sqlite => Backend::Sqlite { url: db_url },
    };

    let static_dir = PathBuf::from(static_dir);
    let web = WebConfig {
        cors_origin: env("PROGRESS_CORS_ORIGIN").unwrap_or_else(|| "*".into()),
        max_body_bytes: env("PROGRESS_MAX_BODY_BYTES").map_or(Ok(DEFAULT_MAX_BODY_BYTES), |raw| {
            parse_number("PROGRESS_MAX_BODY_BYTES", &raw)
        })?,
        static_dir: Some(static_dir),
    };

    Ok(ServerConfig {
        host,
        port,
        backend,
        web,
        log_json: env("PROGRESS_LOG_JSON").is_some_and(|raw| parse_bool(&raw)),
    })
}
