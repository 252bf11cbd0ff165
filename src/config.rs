//! Configuration management for glesys-ddns.
//!
//! Settings come from a YAML file (TOML when the file name ends in `.toml`)
//! and every key can be overridden by an environment variable of the same
//! name, e.g. `GLESYS_TTL=3600`.

use crate::error::{DdnsError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default budget, in seconds, for all provider calls of one run.
pub const DEFAULT_REQUEST_BUDGET_SECS: u64 = 10;

/// Default public IP echo service.
pub const DEFAULT_PUBLIC_IP_URL: &str = "https://api.ipify.org";

const KEY_USERNAME: &str = "GLESYS_USERNAME";
const KEY_APIKEY: &str = "GLESYS_APIKEY";
const KEY_USE_PUBLIC_IP: &str = "GLESYS_USE_PUBLIC_IP";
const KEY_IP_STARTS_WITH: &str = "GLESYS_IP_STARTS_WITH";
const KEY_TTL: &str = "GLESYS_TTL";
const KEY_INTERVAL: &str = "GLESYS_INTERVAL";
const KEY_DOMAINS: &str = "GLESYS_DOMAINS";
const KEY_VERBOSE: &str = "GLESYS_VERBOSE";
const KEY_PUBLIC_IP_URL: &str = "GLESYS_PUBLIC_IP_URL";
const KEY_REQUEST_BUDGET: &str = "GLESYS_REQUEST_BUDGET";
const KEY_EXIT_ON_IP_FAILURE: &str = "GLESYS_EXIT_ON_IP_FAILURE";

/// Main configuration structure.
///
/// Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GleSYS account (e.g. `cl12345`), or `$VAR` to read it from the environment.
    #[serde(rename = "GLESYS_USERNAME", alias = "glesys_username")]
    pub username: String,

    /// GleSYS API key, or `$VAR` to read it from the environment.
    #[serde(rename = "GLESYS_APIKEY", alias = "glesys_apikey")]
    pub api_key: String,

    /// Publish the public IP instead of a local interface address.
    #[serde(rename = "GLESYS_USE_PUBLIC_IP", alias = "glesys_use_public_ip")]
    pub use_public_ip: bool,

    /// Prefix a local IPv4 address must start with (local mode only).
    #[serde(rename = "GLESYS_IP_STARTS_WITH", alias = "glesys_ip_starts_with")]
    pub ip_starts_with: String,

    /// TTL to write on updated records; zero or negative keeps the record's TTL.
    #[serde(rename = "GLESYS_TTL", alias = "glesys_ttl")]
    pub ttl: i64,

    /// Seconds to sleep between runs.
    #[serde(rename = "GLESYS_INTERVAL", alias = "glesys_interval")]
    pub interval_secs: u64,

    /// Records to keep updated: `domain#host[,host...][|domain#host...]`.
    #[serde(rename = "GLESYS_DOMAINS", alias = "glesys_domains")]
    pub domains: String,

    /// Show detailed log lines.
    #[serde(rename = "GLESYS_VERBOSE", alias = "glesys_verbose")]
    pub verbose: bool,

    /// Public IP echo service.
    #[serde(rename = "GLESYS_PUBLIC_IP_URL", alias = "glesys_public_ip_url")]
    pub public_ip_url: String,

    /// Seconds all provider calls of a single run may take together.
    #[serde(rename = "GLESYS_REQUEST_BUDGET", alias = "glesys_request_budget")]
    pub request_budget_secs: u64,

    /// Stop the process when the IP cannot be resolved instead of waiting
    /// for the next run.
    #[serde(rename = "GLESYS_EXIT_ON_IP_FAILURE", alias = "glesys_exit_on_ip_failure")]
    pub exit_on_ip_failure: bool,
}

/// How the address to publish is found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpMode {
    /// Ask a public echo service.
    Public { url: String },
    /// Scan local interfaces for an IPv4 address starting with the prefix.
    LocalPrefix(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            api_key: String::new(),
            use_public_ip: false,
            ip_starts_with: String::new(),
            ttl: 0,
            interval_secs: 300,
            domains: String::new(),
            verbose: false,
            public_ip_url: DEFAULT_PUBLIC_IP_URL.to_string(),
            request_budget_secs: DEFAULT_REQUEST_BUDGET_SECS,
            exit_on_ip_failure: false,
        }
    }
}

impl Config {
    /// Load configuration: file (explicit or first default candidate found),
    /// then environment overrides, then `$VAR` credential references.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with(explicit, &default_candidates(), |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`] with explicit candidate paths and variable lookup.
    pub fn load_with<F>(explicit: Option<&Path>, candidates: &[PathBuf], lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match locate(explicit, candidates)? {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };

        config.apply_env_overrides(&lookup)?;
        config.resolve_credentials(&lookup)?;
        Ok(config)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DdnsError::Config(format!("Error reading config file {}: {}", path.display(), e))
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Parse YAML settings.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Parse TOML settings.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override settings with values returned by `lookup`, keyed by the
    /// upper-case setting name. Empty values count as unset.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get(KEY_USERNAME) {
            self.username = v;
        }
        if let Some(v) = get(KEY_APIKEY) {
            self.api_key = v;
        }
        if let Some(v) = get(KEY_USE_PUBLIC_IP) {
            self.use_public_ip = parse_bool(KEY_USE_PUBLIC_IP, &v)?;
        }
        if let Some(v) = get(KEY_IP_STARTS_WITH) {
            self.ip_starts_with = v;
        }
        if let Some(v) = get(KEY_TTL) {
            self.ttl = parse_number(KEY_TTL, &v)?;
        }
        if let Some(v) = get(KEY_INTERVAL) {
            self.interval_secs = parse_number(KEY_INTERVAL, &v)?;
        }
        if let Some(v) = get(KEY_DOMAINS) {
            self.domains = v;
        }
        if let Some(v) = get(KEY_VERBOSE) {
            self.verbose = parse_bool(KEY_VERBOSE, &v)?;
        }
        if let Some(v) = get(KEY_PUBLIC_IP_URL) {
            self.public_ip_url = v;
        }
        if let Some(v) = get(KEY_REQUEST_BUDGET) {
            self.request_budget_secs = parse_number(KEY_REQUEST_BUDGET, &v)?;
        }
        if let Some(v) = get(KEY_EXIT_ON_IP_FAILURE) {
            self.exit_on_ip_failure = parse_bool(KEY_EXIT_ON_IP_FAILURE, &v)?;
        }

        Ok(())
    }

    /// Replace `$VAR` credential values with the referenced variable.
    /// A reference to an unset variable is a configuration error.
    pub fn resolve_credentials<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.username = resolve_env(KEY_USERNAME, &self.username, &lookup)?;
        self.api_key = resolve_env(KEY_APIKEY, &self.api_key, &lookup)?;
        Ok(())
    }

    /// Check that the settings describe something runnable.
    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(DdnsError::Config(format!("{} is not set", KEY_USERNAME)));
        }
        if self.api_key.trim().is_empty() {
            return Err(DdnsError::Config(format!("{} is not set", KEY_APIKEY)));
        }
        if self.domains.trim().is_empty() {
            return Err(DdnsError::Config(format!("{} is not set", KEY_DOMAINS)));
        }
        if self.interval_secs == 0 {
            return Err(DdnsError::Config(format!(
                "{} must be at least 1 second",
                KEY_INTERVAL
            )));
        }
        if self.request_budget_secs == 0 {
            return Err(DdnsError::Config(format!(
                "{} must be at least 1 second",
                KEY_REQUEST_BUDGET
            )));
        }
        if self.use_public_ip {
            if self.public_ip_url.trim().is_empty() {
                return Err(DdnsError::Config(format!("{} is empty", KEY_PUBLIC_IP_URL)));
            }
        } else if self.ip_starts_with.is_empty() {
            return Err(DdnsError::Config(format!(
                "{} is required when {} is false",
                KEY_IP_STARTS_WITH, KEY_USE_PUBLIC_IP
            )));
        }
        Ok(())
    }

    /// The IP selection policy.
    pub fn ip_mode(&self) -> IpMode {
        if self.use_public_ip {
            IpMode::Public {
                url: self.public_ip_url.clone(),
            }
        } else {
            IpMode::LocalPrefix(self.ip_starts_with.clone())
        }
    }

    /// TTL to force on updated records, if any.
    pub fn ttl_override(&self) -> Option<u32> {
        if self.ttl > 0 {
            Some(u32::try_from(self.ttl).unwrap_or(u32::MAX))
        } else {
            None
        }
    }

    /// Time between runs.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Time budget for all provider calls of one run.
    pub fn request_budget(&self) -> Duration {
        Duration::from_secs(self.request_budget_secs)
    }
}

/// Pick the configuration file: the explicit path (which must exist), or the
/// first existing candidate. `None` means environment only.
fn locate(explicit: Option<&Path>, candidates: &[PathBuf]) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(DdnsError::Config(format!(
                "Config file {} does not exist",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }

    Ok(candidates.iter().find(|p| p.exists()).cloned())
}

fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from("config.yml"), PathBuf::from("config.yaml")];

    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(dir.join("config.yml"));
    }

    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("glesys-ddns").join("config.yml"));
    }

    candidates
}

/// Resolve environment variable references (values starting with $).
fn resolve_env<F>(key: &str, value: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match value.strip_prefix('$') {
        Some(var_name) => lookup(var_name).filter(|v| !v.is_empty()).ok_or_else(|| {
            DdnsError::Config(format!(
                "{} refers to environment variable {}, which is not set",
                key, var_name
            ))
        }),
        None => Ok(value.to_string()),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Ok(true),
        "0" | "f" | "false" | "no" | "off" => Ok(false),
        other => Err(DdnsError::Config(format!(
            "{} must be a boolean, got {:?}",
            key, other
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| DdnsError::Config(format!("{} must be a number, got {:?}", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn valid_config() -> Config {
        Config {
            username: "cl12345".to_string(),
            api_key: "secret".to_string(),
            use_public_ip: true,
            domains: "example.com#www".to_string(),
            ..Config::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.interval_secs, 300);
        assert_eq!(config.request_budget(), crate::reconciler::DEFAULT_REQUEST_BUDGET);
        assert_eq!(config.public_ip_url, DEFAULT_PUBLIC_IP_URL);
        assert!(config.ttl_override().is_none());
    }

    #[test]
    fn test_yaml_upper_case_keys() {
        let yaml = r#"
GLESYS_USERNAME: cl12345
GLESYS_APIKEY: abc
GLESYS_USE_PUBLIC_IP: false
GLESYS_IP_STARTS_WITH: "192.168."
GLESYS_TTL: 3600
GLESYS_INTERVAL: 60
GLESYS_DOMAINS: "example.com#www,@|example.org#home"
GLESYS_VERBOSE: true
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.username, "cl12345");
        assert_eq!(config.api_key, "abc");
        assert_eq!(
            config.ip_mode(),
            IpMode::LocalPrefix("192.168.".to_string())
        );
        assert_eq!(config.ttl_override(), Some(3600));
        assert_eq!(config.interval(), Duration::from_secs(60));
        assert_eq!(config.domains, "example.com#www,@|example.org#home");
        assert!(config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_lower_case_keys() {
        let yaml = "glesys_username: cl1\nglesys_apikey: k\nglesys_use_public_ip: true\n";
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.username, "cl1");
        assert_eq!(
            config.ip_mode(),
            IpMode::Public {
                url: DEFAULT_PUBLIC_IP_URL.to_string()
            }
        );
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = Config::from_yaml_str("  \n").unwrap();
        assert_eq!(config.interval_secs, 300);
    }

    #[test]
    fn test_toml_config() {
        let toml = "GLESYS_USERNAME = \"cl1\"\nGLESYS_TTL = -1\n";
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.username, "cl1");
        assert!(config.ttl_override().is_none());
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = Config::load_from(Path::new("/nonexistent/glesys-ddns/config.yml"));
        assert!(matches!(result, Err(DdnsError::Config(_))));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let result = locate(Some(Path::new("/nonexistent/config.yml")), &[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::from_yaml_str("GLESYS_TTL: 60\nGLESYS_USERNAME: file\n").unwrap();
        config
            .apply_env_overrides(lookup_from(&[
                ("GLESYS_TTL", "3600"),
                ("GLESYS_USE_PUBLIC_IP", "TRUE"),
                ("GLESYS_VERBOSE", "1"),
                ("GLESYS_USERNAME", ""),
            ]))
            .unwrap();

        assert_eq!(config.ttl, 3600);
        assert!(config.use_public_ip);
        assert!(config.verbose);
        // Empty values do not override.
        assert_eq!(config.username, "file");
    }

    #[test]
    fn test_env_override_rejects_bad_values() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(lookup_from(&[("GLESYS_INTERVAL", "soon")]));
        assert!(matches!(result, Err(DdnsError::Config(_))));

        let result = config.apply_env_overrides(lookup_from(&[("GLESYS_VERBOSE", "maybe")]));
        assert!(matches!(result, Err(DdnsError::Config(_))));
    }

    #[test]
    fn test_ttl_override() {
        let mut config = valid_config();
        config.ttl = 0;
        assert_eq!(config.ttl_override(), None);
        config.ttl = -5;
        assert_eq!(config.ttl_override(), None);
        config.ttl = 3600;
        assert_eq!(config.ttl_override(), Some(3600));
    }

    #[test]
    fn test_validate() {
        assert!(valid_config().validate().is_ok());

        let mut config = valid_config();
        config.api_key.clear();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.use_public_ip = false;
        assert!(config.validate().is_err());
        config.ip_starts_with = "10.".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolve_env_with_value() {
        let value = resolve_env(KEY_APIKEY, "plain_value", lookup_from(&[])).unwrap();
        assert_eq!(value, "plain_value");
    }

    #[test]
    fn test_resolve_env_with_existing_var() {
        let lookup = lookup_from(&[("GLESYS_SECRET", "resolved_value")]);
        let value = resolve_env(KEY_APIKEY, "$GLESYS_SECRET", lookup).unwrap();
        assert_eq!(value, "resolved_value");
    }

    #[test]
    fn test_unset_credential_reference_is_error() {
        let mut config = Config::from_yaml_str(
            "GLESYS_USERNAME: cl1\nGLESYS_APIKEY: $UNSET_GLESYS_SECRET_987\n",
        )
        .unwrap();

        let err = config.resolve_credentials(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, DdnsError::Config(_)));
        assert!(err.to_string().contains("UNSET_GLESYS_SECRET_987"));
    }

    #[test]
    fn test_load_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(
            &path,
            "GLESYS_USERNAME: cl12345\nGLESYS_APIKEY: abc\nGLESYS_TTL: 600\n\
             GLESYS_DOMAINS: \"example.com#www\"\nGLESYS_USE_PUBLIC_IP: true\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.username, "cl12345");
        assert_eq!(config.api_key, "abc");
        assert_eq!(config.ttl_override(), Some(600));
        assert_eq!(config.domains, "example.com#www");
        assert!(config.use_public_ip);
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "GLESYS_USERNAME = \"cl12345\"\nGLESYS_INTERVAL = 60\nGLESYS_VERBOSE = true\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.username, "cl12345");
        assert_eq!(config.interval(), Duration::from_secs(60));
        assert!(config.verbose);
    }

    #[test]
    fn test_explicit_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yml");
        std::fs::write(&path, "GLESYS_USERNAME: cl1\n").unwrap();

        assert_eq!(locate(Some(&path), &[]).unwrap(), Some(path.clone()));
    }

    #[test]
    fn test_first_existing_candidate_wins() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.yml");
        let second = dir.path().join("config.yaml");
        let third = dir.path().join("other.yml");
        std::fs::write(&second, "").unwrap();
        std::fs::write(&third, "").unwrap();

        let candidates = vec![missing.clone(), second.clone(), third];
        assert_eq!(locate(None, &candidates).unwrap(), Some(second));
        assert_eq!(locate(None, &[missing]).unwrap(), None);
    }

    #[test]
    fn test_load_file_then_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(
            &path,
            "GLESYS_USERNAME: cl1\nGLESYS_APIKEY: $GLESYS_SECRET\nGLESYS_TTL: 60\n\
             GLESYS_DOMAINS: \"example.com#www\"\n",
        )
        .unwrap();

        let lookup = lookup_from(&[("GLESYS_TTL", "3600"), ("GLESYS_SECRET", "from-env")]);
        let config = Config::load_with(None, &[path], lookup).unwrap();

        assert_eq!(config.username, "cl1");
        assert_eq!(config.api_key, "from-env");
        assert_eq!(config.ttl_override(), Some(3600));
    }

    #[test]
    fn test_load_env_only_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let lookup = lookup_from(&[("GLESYS_USERNAME", "cl9"), ("GLESYS_DOMAINS", "a.com#x")]);
        let config = Config::load_with(None, &[dir.path().join("config.yml")], lookup).unwrap();

        assert_eq!(config.username, "cl9");
        assert_eq!(config.domains, "a.com#x");
        assert_eq!(config.interval_secs, 300);
    }
}
