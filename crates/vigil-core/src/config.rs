//! Configuration management for vigil.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. Domains, budgets, and the severity
//! tables are all configuration; the engines only read them.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Category, DomainId, Severity};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Main application configuration.
///
/// This is loaded from `~/.config/vigil/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Page fetching settings
    pub fetch: FetchConfig,
    /// Run-level settings
    pub run: RunConfig,
    /// Severity classification tables and go/no-go thresholds
    pub severity: SeverityConfig,
    /// Audited domains
    pub domains: Vec<DomainConfig>,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string and validate it.
    pub fn from_toml_str(contents: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `VIGIL_MAX_RUNTIME_SECS`: Override the run-level runtime budget
    /// - `VIGIL_WORKER_POOL`: Override how many domains are audited in parallel
    /// - `VIGIL_YELLOW_THRESHOLD`: Override the HIGH count above which a run turns yellow
    /// - `VIGIL_USER_AGENT`: Override the fetch user agent
    /// - `VIGIL_HEADLESS`: Override browser headless mode (true/false)
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (normally the process environment).
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("VIGIL_MAX_RUNTIME_SECS") {
            match val.parse() {
                Ok(secs) => {
                    self.run.max_runtime_secs = secs;
                    tracing::debug!("Override run.max_runtime_secs from env: {}", secs);
                }
                Err(_) => tracing::warn!("Ignoring invalid VIGIL_MAX_RUNTIME_SECS={}", val),
            }
        }

        if let Some(val) = lookup("VIGIL_WORKER_POOL") {
            match val.parse() {
                Ok(pool) => {
                    self.run.worker_pool = pool;
                    tracing::debug!("Override run.worker_pool from env: {}", pool);
                }
                Err(_) => tracing::warn!("Ignoring invalid VIGIL_WORKER_POOL={}", val),
            }
        }

        if let Some(val) = lookup("VIGIL_YELLOW_THRESHOLD") {
            match val.parse() {
                Ok(threshold) => {
                    self.severity.yellow_high_threshold = threshold;
                    tracing::debug!("Override severity.yellow_high_threshold from env: {}", threshold);
                }
                Err(_) => tracing::warn!("Ignoring invalid VIGIL_YELLOW_THRESHOLD={}", val),
            }
        }

        if let Some(val) = lookup("VIGIL_USER_AGENT") {
            if !val.trim().is_empty() {
                tracing::debug!("Override fetch.user_agent from env");
                self.fetch.user_agent = val;
            }
        }

        if let Some(val) = lookup("VIGIL_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.fetch.headless = headless;
                tracing::debug!("Override fetch.headless from env: {}", headless);
            }
        }
    }

    /// Validate budgets, rate caps, and domain uniqueness.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.run.worker_pool == 0 {
            return Err(invalid("run.worker_pool", "must be greater than zero"));
        }
        if self.run.max_runtime_secs == 0 {
            return Err(invalid("run.max_runtime_secs", "must be greater than zero"));
        }
        if self.fetch.request_timeout_secs == 0 {
            return Err(invalid("fetch.request_timeout_secs", "must be greater than zero"));
        }

        let mut seen = HashSet::new();
        for (idx, domain) in self.domains.iter().enumerate() {
            domain.validate(idx)?;
            if !seen.insert(domain.hostname.clone()) {
                return Err(invalid(
                    &format!("domains[{idx}].hostname"),
                    &format!("duplicate domain '{}'", domain.hostname),
                ));
            }
        }

        self.severity.validate()
    }

    /// Enabled domains ordered by tier (lowest tier number first), then hostname.
    #[must_use]
    pub fn enabled_domains(&self) -> Vec<DomainConfig> {
        let mut domains: Vec<_> = self.domains.iter().filter(|d| d.enabled).cloned().collect();
        domains.sort_by(|a, b| a.tier.cmp(&b.tier).then_with(|| a.hostname.cmp(&b.hostname)));
        domains
    }

    /// Look up a domain by identity.
    #[must_use]
    pub fn domain(&self, id: &DomainId) -> Option<&DomainConfig> {
        self.domains.iter().find(|d| &d.hostname == id)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| invalid("config_path", "no parent directory"))?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/vigil/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("dev", "vigil", "vigil").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path (database location).
    ///
    /// Uses XDG base directories: `~/.local/share/vigil`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("dev", "vigil", "vigil").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Page fetching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// User agent sent with every request
    pub user_agent: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Render 2xx HTML pages in a headless browser
    pub render: bool,
    /// Run the browser headless
    pub headless: bool,
    /// Browser navigation timeout in seconds
    pub navigation_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("vigil/", env!("CARGO_PKG_VERSION"), " (+site-audit)").to_string(),
            request_timeout_secs: 30,
            render: false,
            headless: true,
            navigation_timeout_secs: 30,
        }
    }
}

impl FetchConfig {
    /// Request timeout as a `Duration`.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Run-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Wall-clock deadline for the whole run, in seconds
    pub max_runtime_secs: u64,
    /// Number of domains audited in parallel
    pub worker_pool: usize,
    /// Categories whose check modules run during the crawl
    pub categories: Vec<Category>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_runtime_secs: 3600,
            worker_pool: 4,
            categories: Category::ALL.to_vec(),
        }
    }
}

impl RunConfig {
    /// Run deadline as a `Duration`.
    #[must_use]
    pub fn max_runtime(&self) -> Duration {
        Duration::from_secs(self.max_runtime_secs)
    }
}

/// One audited domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Hostname; also the domain identity
    pub hostname: DomainId,
    /// Priority class, lower is audited first
    #[serde(default = "default_tier")]
    pub tier: u8,
    /// Whether the domain is audited at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Maximum distinct pages fetched per crawl
    #[serde(default = "default_page_budget")]
    pub page_budget: usize,
    /// Maximum link depth from the root page
    #[serde(default = "default_depth_budget")]
    pub depth_budget: usize,
    /// Maximum in-flight fetches
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Maximum fetch starts per second
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,
    /// Wall-clock budget for one domain crawl, in seconds
    #[serde(default = "default_domain_runtime")]
    pub max_runtime_secs: u64,
    /// Crawl entry point; defaults to `https://{hostname}/`
    #[serde(default)]
    pub root_url: Option<String>,
}

fn default_tier() -> u8 {
    2
}

fn default_true() -> bool {
    true
}

fn default_page_budget() -> usize {
    200
}

fn default_depth_budget() -> usize {
    5
}

fn default_max_concurrency() -> usize {
    4
}

fn default_requests_per_second() -> f64 {
    2.0
}

fn default_domain_runtime() -> u64 {
    600
}

impl DomainConfig {
    /// Domain configuration with default budgets.
    #[must_use]
    pub fn new(hostname: DomainId) -> Self {
        Self {
            hostname,
            tier: default_tier(),
            enabled: true,
            page_budget: default_page_budget(),
            depth_budget: default_depth_budget(),
            max_concurrency: default_max_concurrency(),
            requests_per_second: default_requests_per_second(),
            max_runtime_secs: default_domain_runtime(),
            root_url: None,
        }
    }

    /// Domain identity.
    #[must_use]
    pub fn id(&self) -> &DomainId {
        &self.hostname
    }

    /// Crawl entry point.
    pub fn root_url(&self) -> ConfigResult<Url> {
        let raw = self
            .root_url
            .clone()
            .unwrap_or_else(|| format!("https://{}/", self.hostname));
        Url::parse(&raw).map_err(|e| invalid("root_url", &format!("'{raw}': {e}")))
    }

    /// Per-domain crawl budget as a `Duration`.
    #[must_use]
    pub fn max_runtime(&self) -> Duration {
        Duration::from_secs(self.max_runtime_secs)
    }

    /// Minimum spacing between fetch starts implied by the rate cap.
    /// A non-positive cap means no spacing.
    #[must_use]
    pub fn min_fetch_interval(&self) -> Duration {
        if self.requests_per_second.is_finite() && self.requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / self.requests_per_second)
        } else {
            Duration::ZERO
        }
    }

    fn validate(&self, idx: usize) -> ConfigResult<()> {
        let field = |name: &str| format!("domains[{idx}].{name}");
        if self.page_budget == 0 {
            return Err(invalid(&field("page_budget"), "must be greater than zero"));
        }
        if self.max_concurrency == 0 {
            return Err(invalid(&field("max_concurrency"), "must be greater than zero"));
        }
        if !(self.requests_per_second.is_finite() && self.requests_per_second > 0.0) {
            return Err(invalid(
                &field("requests_per_second"),
                "must be a positive number",
            ));
        }
        if self.max_runtime_secs == 0 {
            return Err(invalid(&field("max_runtime_secs"), "must be greater than zero"));
        }
        let root = self.root_url()?;
        if !matches!(root.scheme(), "http" | "https") {
            return Err(invalid(&field("root_url"), "must be an http(s) URL"));
        }
        Ok(())
    }
}

/// Severity classification tables and go/no-go thresholds.
///
/// `rules` maps a rule identifier (`seo.title_missing`) or a wildcard
/// (`seo.*`, or a category name such as `security_headers.*`) to a severity. Entries here override the built-in table unless
/// `use_builtin_rules` is false. `metric_bands` do the same per rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityConfig {
    /// HIGH count strictly above which a run turns YELLOW
    pub yellow_high_threshold: u32,
    /// Start from the built-in rule table and bands
    pub use_builtin_rules: bool,
    /// Rule overrides
    pub rules: BTreeMap<String, Severity>,
    /// Metric band overrides
    pub metric_bands: Vec<MetricBand>,
}

impl Default for SeverityConfig {
    fn default() -> Self {
        Self {
            yellow_high_threshold: 10,
            use_builtin_rules: true,
            rules: BTreeMap::new(),
            metric_bands: Vec::new(),
        }
    }
}

impl SeverityConfig {
    /// Effective rule table: built-ins (if enabled) overlaid with `rules`.
    #[must_use]
    pub fn effective_rules(&self) -> BTreeMap<String, Severity> {
        let mut table = if self.use_builtin_rules {
            builtin_rules()
        } else {
            BTreeMap::new()
        };
        table.extend(self.rules.iter().map(|(k, v)| (k.clone(), *v)));
        table
    }

    /// Effective metric bands: built-ins (if enabled) with per-rule replacement.
    #[must_use]
    pub fn effective_bands(&self) -> Vec<MetricBand> {
        let mut bands: Vec<MetricBand> = if self.use_builtin_rules {
            builtin_bands()
                .into_iter()
                .filter(|b| !self.metric_bands.iter().any(|o| o.rule == b.rule))
                .collect()
        } else {
            Vec::new()
        };
        bands.extend(self.metric_bands.iter().cloned());
        bands
    }

    fn validate(&self) -> ConfigResult<()> {
        for key in self.rules.keys() {
            let pattern = key.strip_suffix(".*").unwrap_or(key);
            if pattern.is_empty() || pattern.contains('*') {
                return Err(invalid(
                    &format!("severity.rules.{key}"),
                    "expected a rule id or a 'prefix.*' wildcard",
                ));
            }
        }
        for band in &self.metric_bands {
            if band.thresholds.is_empty() {
                return Err(invalid(
                    &format!("severity.metric_bands.{}", band.rule),
                    "at least one threshold is required",
                ));
            }
            if band.thresholds.iter().any(|t| !t.at.is_finite()) {
                return Err(invalid(
                    &format!("severity.metric_bands.{}", band.rule),
                    "thresholds must be finite",
                ));
            }
        }
        Ok(())
    }
}

/// Severity bands for a numeric metric attached to a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBand {
    /// Rule identifier the metric belongs to
    pub rule: String,
    /// Which direction of the metric is worse
    #[serde(default)]
    pub direction: MetricDirection,
    /// Thresholds; every crossed threshold applies, the worst wins
    pub thresholds: Vec<Threshold>,
}

/// Direction in which a metric degrades.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricDirection {
    /// Larger values are worse (latency, bytes, status codes)
    #[default]
    HigherIsWorse,
    /// Smaller values are worse (scores)
    LowerIsWorse,
}

/// One band edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    /// Edge value (inclusive)
    pub at: f64,
    /// Severity once the edge is crossed
    pub severity: Severity,
}

impl MetricBand {
    /// Worst severity of all thresholds crossed by `value`.
    #[must_use]
    pub fn severity_for(&self, value: f64) -> Option<Severity> {
        self.thresholds
            .iter()
            .filter(|t| match self.direction {
                MetricDirection::HigherIsWorse => value >= t.at,
                MetricDirection::LowerIsWorse => value <= t.at,
            })
            .map(|t| t.severity)
            .max()
    }
}

fn builtin_rules() -> BTreeMap<String, Severity> {
    [
        ("crawl.fetch_failed", Severity::High),
        ("crawl.redirect_chain_too_long", Severity::Medium),
        ("crawl.external_redirect", Severity::Low),
        ("check.module_failed", Severity::Low),
        ("links.external_link", Severity::Low),
        ("links.empty_href", Severity::Low),
        ("links.insecure_link", Severity::Medium),
        ("seo.title_missing", Severity::Blocker),
        ("seo.title_too_long", Severity::Low),
        ("seo.meta_description_missing", Severity::Medium),
        ("seo.h1_missing", Severity::Medium),
        ("seo.canonical_missing", Severity::Low),
        ("security.hsts_missing", Severity::High),
        ("security.csp_missing", Severity::High),
        ("security.content_type_options_missing", Severity::Medium),
        ("security.frame_options_missing", Severity::Medium),
        ("security.referrer_policy_missing", Severity::Low),
        ("perf.runtime_errors", Severity::Medium),
        ("a11y.img_missing_alt", Severity::Medium),
        ("a11y.html_lang_missing", Severity::Medium),
        ("api.invalid_json", Severity::High),
        ("access.directory_listing", Severity::Blocker),
    ]
    .into_iter()
    .map(|(rule, severity)| (rule.to_string(), severity))
    .collect()
}

fn builtin_bands() -> Vec<MetricBand> {
    let band = |rule: &str, thresholds: &[(f64, Severity)]| MetricBand {
        rule: rule.to_string(),
        direction: MetricDirection::HigherIsWorse,
        thresholds: thresholds
            .iter()
            .map(|&(at, severity)| Threshold { at, severity })
            .collect(),
    };

    vec![
        band(
            "crawl.http_status",
            &[(400.0, Severity::High), (500.0, Severity::Blocker)],
        ),
        band(
            "perf.response_time_ms",
            &[(1000.0, Severity::Medium), (3000.0, Severity::High)],
        ),
        band(
            "perf.page_weight_bytes",
            &[
                (2.0 * 1024.0 * 1024.0, Severity::Medium),
                (5.0 * 1024.0 * 1024.0, Severity::High),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.run.worker_pool, 4);
        assert_eq!(config.severity.yellow_high_threshold, 10);
        assert_eq!(config.run.categories.len(), 6);
        assert!(config.domains.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_domain_defaults_from_toml() {
        let config = AppConfig::from_toml_str(
            r#"
[[domains]]
hostname = "example.com"
"#,
        )
        .expect("parse config");

        let domain = &config.domains[0];
        assert_eq!(domain.hostname.as_str(), "example.com");
        assert!(domain.enabled);
        assert_eq!(domain.page_budget, 200);
        assert_eq!(
            domain.root_url().expect("root url").as_str(),
            "https://example.com/"
        );
    }

    #[test]
    fn test_root_url_override() {
        let mut domain = DomainConfig::new(DomainId::new("localhost").expect("valid"));
        domain.root_url = Some("http://localhost:8080/start".to_string());
        assert_eq!(
            domain.root_url().expect("root url").as_str(),
            "http://localhost:8080/start"
        );
    }

    #[test]
    fn test_min_fetch_interval() {
        let mut domain = DomainConfig::new(DomainId::new("example.com").expect("valid"));
        domain.requests_per_second = 4.0;
        assert_eq!(domain.min_fetch_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_validation_rejects_zero_budget() {
        let result = AppConfig::from_toml_str(
            r#"
[[domains]]
hostname = "example.com"
page_budget = 0
"#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "domains[0].page_budget"
        ));
    }

    #[test]
    fn test_validation_rejects_bad_rate() {
        let result = AppConfig::from_toml_str(
            r#"
[[domains]]
hostname = "example.com"
requests_per_second = 0.0
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_duplicate_domains() {
        let result = AppConfig::from_toml_str(
            r#"
[[domains]]
hostname = "example.com"

[[domains]]
hostname = "EXAMPLE.com"
"#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_invalid_hostname_fails_to_parse() {
        let result = AppConfig::from_toml_str(
            r#"
[[domains]]
hostname = "https://example.com"
"#,
        );
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_enabled_domains_ordered_by_tier() {
        let config = AppConfig::from_toml_str(
            r#"
[[domains]]
hostname = "b.example.com"
tier = 2

[[domains]]
hostname = "a.example.com"
tier = 1

[[domains]]
hostname = "c.example.com"
tier = 1
enabled = false
"#,
        )
        .expect("parse config");

        let order: Vec<_> = config
            .enabled_domains()
            .into_iter()
            .map(|d| d.hostname.to_string())
            .collect();
        assert_eq!(order, vec!["a.example.com", "b.example.com"]);
    }

    #[test]
    fn test_severity_overrides_merge_with_builtins() {
        let config = AppConfig::from_toml_str(
            r#"
[severity]
yellow_high_threshold = 3

[severity.rules]
"seo.title_missing" = "HIGH"
"links.*" = "MEDIUM"

[[severity.metric_bands]]
rule = "perf.response_time_ms"
thresholds = [{ at = 500.0, severity = "HIGH" }]
"#,
        )
        .expect("parse config");

        let rules = config.severity.effective_rules();
        assert_eq!(rules["seo.title_missing"], Severity::High);
        assert_eq!(rules["links.*"], Severity::Medium);
        assert_eq!(rules["security.hsts_missing"], Severity::High);

        let bands = config.severity.effective_bands();
        let response = bands
            .iter()
            .filter(|b| b.rule == "perf.response_time_ms")
            .collect::<Vec<_>>();
        assert_eq!(response.len(), 1);
        assert_eq!(response[0].severity_for(600.0), Some(Severity::High));
        assert_eq!(config.severity.yellow_high_threshold, 3);
    }

    #[test]
    fn test_builtins_can_be_disabled() {
        let config = AppConfig::from_toml_str(
            r#"
[severity]
use_builtin_rules = false
"#,
        )
        .expect("parse config");
        assert!(config.severity.effective_rules().is_empty());
        assert!(config.severity.effective_bands().is_empty());
    }

    #[test]
    fn test_bad_wildcard_rejected() {
        let result = AppConfig::from_toml_str(
            r#"
[severity.rules]
"seo*x" = "HIGH"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_metric_band_directions() {
        let higher = MetricBand {
            rule: "perf.response_time_ms".to_string(),
            direction: MetricDirection::HigherIsWorse,
            thresholds: vec![
                Threshold { at: 1000.0, severity: Severity::Medium },
                Threshold { at: 3000.0, severity: Severity::High },
            ],
        };
        assert_eq!(higher.severity_for(500.0), None);
        assert_eq!(higher.severity_for(1000.0), Some(Severity::Medium));
        assert_eq!(higher.severity_for(4000.0), Some(Severity::High));

        let lower = MetricBand {
            rule: "perf.score".to_string(),
            direction: MetricDirection::LowerIsWorse,
            thresholds: vec![
                Threshold { at: 90.0, severity: Severity::Low },
                Threshold { at: 50.0, severity: Severity::High },
            ],
        };
        assert_eq!(lower.severity_for(95.0), None);
        assert_eq!(lower.severity_for(70.0), Some(Severity::Low));
        assert_eq!(lower.severity_for(40.0), Some(Severity::High));
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            "VIGIL_MAX_RUNTIME_SECS" => Some("120".to_string()),
            "VIGIL_YELLOW_THRESHOLD" => Some("5".to_string()),
            "VIGIL_WORKER_POOL" => Some("not-a-number".to_string()),
            "VIGIL_HEADLESS" => Some("false".to_string()),
            _ => None,
        });
        assert_eq!(config.run.max_runtime_secs, 120);
        assert_eq!(config.severity.yellow_high_threshold, 5);
        assert_eq!(config.run.worker_pool, 4);
        assert!(!config.fetch.headless);
    }

    #[test]
    fn test_config_file_roundtrip() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");

        let mut config = AppConfig::default();
        config.run.worker_pool = 8;
        let mut domain = DomainConfig::new(DomainId::new("example.com").expect("valid"));
        domain.page_budget = 25;
        config.domains.push(domain);

        let contents = toml::to_string_pretty(&config).expect("serialize config");
        fs::write(&config_path, contents).expect("write config file");

        let loaded = AppConfig::load_from(&config_path).expect("load config");
        assert_eq!(loaded.run.worker_pool, 8);
        assert_eq!(loaded.domains[0].page_budget, 25);
    }

    #[test]
    fn test_load_from_missing_file() {
        let tmp = TempDir::new().expect("create temp dir");
        let result = AppConfig::load_from(tmp.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }
}
