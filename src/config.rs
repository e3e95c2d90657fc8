use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

pub const SECRET_KEY_ENV: &str = "DJANGO_SECRET";
pub const RENDER_ENV: &str = "RENDER";
pub const RENDER_EXTERNAL_HOSTNAME_ENV: &str = "RENDER_EXTERNAL_HOSTNAME";
pub const POSTGRES_URL_ENV: &str = "POSTGRES_URL";
pub const NUTRITIONIX_API_URL_ENV: &str = "NUTRITIONIX_API_URL";
pub const NUTRITIONIX_APP_ID_ENV: &str = "NUTRITIONIX_APP_ID";
pub const NUTRITIONIX_APP_KEY_ENV: &str = "NUTRITIONIX_APP_KEY";
pub const PORT_ENV: &str = "PORT";

const DEFAULT_PORT: u16 = 8000;
const DAY_SECS: u64 = 60 * 60 * 24;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DatabaseConfig {
    /// File-backed SQLite store used in debug mode.
    LocalFile { path: PathBuf },
    /// Remote connection string used when deployed.
    Remote {
        url: Option<String>,
        max_connection_age: Duration,
    },
}

impl DatabaseConfig {
    pub const MAX_CONNECTION_AGE: Duration = Duration::from_secs(600);

    pub fn is_local(&self) -> bool {
        matches!(self, DatabaseConfig::LocalFile { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NutritionixConfig {
    pub api_url: Option<String>,
    pub app_id: Option<String>,
    pub app_key: Option<String>,
}

impl NutritionixConfig {
    pub const APP_ID_HEADER: &'static str = "x-app-id";
    pub const APP_KEY_HEADER: &'static str = "x-app-key";

    /// Header mapping sent with every request; values may be absent.
    pub fn headers(&self) -> [(&'static str, Option<&str>); 2] {
        [
            (Self::APP_ID_HEADER, self.app_id.as_deref()),
            (Self::APP_KEY_HEADER, self.app_key.as_deref()),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JwtSettings {
    pub access_token_lifetime: Duration,
    pub refresh_token_lifetime: Duration,
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            access_token_lifetime: Duration::from_secs(30 * DAY_SECS),
            refresh_token_lifetime: Duration::from_secs(DAY_SECS),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestSettings {
    pub page_size: u32,
    pub max_limit: u32,
}

impl Default for RestSettings {
    fn default() -> Self {
        Self {
            page_size: 6,
            max_limit: 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorsSettings {
    pub allow_all_origins: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticFiles {
    pub url: String,
    pub dirs: Vec<PathBuf>,
    pub root: PathBuf,
}

impl StaticFiles {
    fn under(base_dir: &Path) -> Self {
        Self {
            url: "static/".to_string(),
            dirs: vec![base_dir.join("static")],
            root: base_dir.join("staticfiles"),
        }
    }

    /// Mount point for the router, e.g. `/static`.
    pub fn mount_path(&self) -> String {
        format!("/{}", self.url.trim_matches('/'))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiInfo {
    pub title: String,
    pub description: String,
    pub version: String,
}

impl Default for ApiInfo {
    fn default() -> Self {
        Self {
            title: "Calories API".to_string(),
            description: "Calories API".to_string(),
            version: "0.1.0".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct I18nSettings {
    pub language_code: String,
    pub time_zone: String,
}

impl Default for I18nSettings {
    fn default() -> Self {
        Self {
            language_code: "en-us".to_string(),
            time_zone: "UTC".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub max_similarity: f64,
    pub reject_common: bool,
    pub reject_numeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_similarity: 0.7,
            reject_common: true,
            reject_numeric: true,
        }
    }
}

/// Keeps only the pairs whose key and value are both valid Unicode.
pub fn unicode_vars<I>(vars: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub secret_key: Option<String>,
    pub debug: bool,
    pub allowed_hosts: Vec<String>,
    pub database: DatabaseConfig,
    pub nutritionix: NutritionixConfig,
    pub jwt: JwtSettings,
    pub rest: RestSettings,
    pub cors: CorsSettings,
    pub static_files: StaticFiles,
    pub api: ApiInfo,
    pub i18n: I18nSettings,
    pub password_policy: PasswordPolicy,
    pub bind: SocketAddr,
}

impl Settings {
    /// Resolves settings from the process environment, rooted at the
    /// current working directory.
    pub fn from_env() -> Self {
        let vars = unicode_vars(env::vars_os());
        let base_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::resolve(&vars, &base_dir)
    }

    /// Builds settings from an environment snapshot. Never fails: absent
    /// values are carried as `None` and surface where they are used.
    pub fn resolve(vars: &HashMap<String, String>, base_dir: &Path) -> Self {
        let lookup = |key: &str| vars.get(key).cloned();

        let debug = !vars.contains_key(RENDER_ENV);

        let mut allowed_hosts = vec!["*".to_string()];
        if let Some(hostname) = lookup(RENDER_EXTERNAL_HOSTNAME_ENV).filter(|h| !h.is_empty()) {
            allowed_hosts.push(hostname);
        }

        let database = if debug {
            DatabaseConfig::LocalFile {
                path: base_dir.join("db.sqlite3"),
            }
        } else {
            DatabaseConfig::Remote {
                url: lookup(POSTGRES_URL_ENV),
                max_connection_age: DatabaseConfig::MAX_CONNECTION_AGE,
            }
        };

        let port = lookup(PORT_ENV)
            .and_then(|p| p.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let host = if debug {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        };

        Self {
            secret_key: lookup(SECRET_KEY_ENV),
            debug,
            allowed_hosts,
            database,
            nutritionix: NutritionixConfig {
                api_url: lookup(NUTRITIONIX_API_URL_ENV),
                app_id: lookup(NUTRITIONIX_APP_ID_ENV),
                app_key: lookup(NUTRITIONIX_APP_KEY_ENV),
            },
            jwt: JwtSettings::default(),
            rest: RestSettings::default(),
            cors: CorsSettings {
                allow_all_origins: true,
            },
            static_files: StaticFiles::under(base_dir),
            api: ApiInfo::default(),
            i18n: I18nSettings::default(),
            password_policy: PasswordPolicy::default(),
            bind: SocketAddr::new(host, port),
        }
    }

    pub fn access_token_lifetime(&self) -> Duration {
        self.jwt.access_token_lifetime
    }

    pub fn page_size(&self) -> u32 {
        self.rest.page_size
    }

    /// Required keys that are absent or empty.
    pub fn missing_required(&self) -> Vec<&'static str> {
        fn blank(value: &Option<String>) -> bool {
            value.as_deref().map_or(true, |v| v.trim().is_empty())
        }

        let mut missing = Vec::new();
        if blank(&self.secret_key) {
            missing.push(SECRET_KEY_ENV);
        }
        if let DatabaseConfig::Remote { url, .. } = &self.database {
            if blank(url) {
                missing.push(POSTGRES_URL_ENV);
            }
        }
        if blank(&self.nutritionix.api_url) {
            missing.push(NUTRITIONIX_API_URL_ENV);
        }
        if blank(&self.nutritionix.app_id) {
            missing.push(NUTRITIONIX_APP_ID_ENV);
        }
        if blank(&self.nutritionix.app_key) {
            missing.push(NUTRITIONIX_APP_KEY_ENV);
        }
        missing
    }

    /// Startup check: debug mode tolerates missing keys and returns them so
    /// they can be logged, production rejects them.
    pub fn startup_check(&self) -> Result<Vec<&'static str>, ConfigError> {
        match self.validate() {
            Ok(()) => Ok(Vec::new()),
            Err(ConfigError::MissingKeys(keys)) if self.debug => Ok(keys),
            Err(err) => Err(err),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingKeys(missing))
        }
    }
}
