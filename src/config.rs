use regex::bytes::Regex;
use serde::Deserialize;
use std::{ffi::OsStr, fmt, fs, path::Path, str::FromStr};
use url::Url;

use crate::error::Error;

/// Origin of the Twilio REST API, used when `twilio.apiBaseUrl` is not set.
pub const DEFAULT_TWILIO_API_BASE_URL: &str = "https://api.twilio.com";

// Only used to check that relative references are well formed.
const REFERENCE_BASE_URL: &str = "http://localhost/";

/// Which pattern outcome raises an alert for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCondition {
    Match,
    NoMatch,
}

impl AlertCondition {
    /// Returns true when `body_matches` should trigger a notification.
    #[must_use]
    pub fn is_triggered_by(self, body_matches: bool) -> bool {
        match self {
            AlertCondition::Match => body_matches,
            AlertCondition::NoMatch => !body_matches,
        }
    }
}

impl FromStr for AlertCondition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Match" => Ok(AlertCondition::Match),
            "NoMatch" => Ok(AlertCondition::NoMatch),
            other => Err(Error::InvalidAlertCondition(other.to_string())),
        }
    }
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertCondition::Match => f.write_str("Match"),
            AlertCondition::NoMatch => f.write_str("NoMatch"),
        }
    }
}

/// One validated URL check.
///
/// `url` keeps the text as configured. It parses as a URL reference, but
/// whether it can actually be fetched is only known when its check runs.
#[derive(Debug, Clone)]
pub struct MonitorTarget {
    pub description: String,
    pub url: String,
    pub pattern: Regex,
    pub alert_if: AlertCondition,
}

/// Twilio credentials and phone numbers shared by every check.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub from_phone_number: String,
    pub to_phone_number: String,
    pub account_sid: String,
    pub auth_token: String,
    pub api_base_url: Url,
}

#[derive(Debug)]
pub struct RootConfig {
    pub twilio: NotificationConfig,
    pub urls: Vec<MonitorTarget>,
}

/// On-disk encoding of the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are read as TOML, everything else as YAML.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(OsStr::to_str) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Yaml,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    twilio: RawTwilio,
    #[serde(default)]
    urls: Vec<RawTarget>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTwilio {
    from_phone_number: String,
    to_phone_number: String,
    account_sid: String,
    auth_token: String,
    api_base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTarget {
    #[serde(default)]
    description: String,
    url: String,
    pattern: String,
    alert_if: String,
}

impl RootConfig {
    /// Reads and validates the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed, or if any target carries an
    /// invalid URL, pattern or alert condition. No partially valid
    /// configuration is ever returned.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<RootConfig, Error> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::parse(&content, ConfigFormat::from_path(path))
    }

    /// Parses and validates configuration text in the given format.
    ///
    /// # Errors
    ///
    /// Same as [`RootConfig::load`], minus the I/O.
    pub fn parse(content: &str, format: ConfigFormat) -> Result<RootConfig, Error> {
        let raw: RawConfig = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
        };

        let twilio = NotificationConfig::try_from(raw.twilio)?;
        let urls = raw
            .urls
            .into_iter()
            .map(MonitorTarget::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RootConfig { twilio, urls })
    }
}

impl TryFrom<RawTwilio> for NotificationConfig {
    type Error = Error;

    fn try_from(raw: RawTwilio) -> Result<Self, Self::Error> {
        let api_base_url = Url::parse(
            raw.api_base_url
                .as_deref()
                .unwrap_or(DEFAULT_TWILIO_API_BASE_URL),
        )?;

        Ok(NotificationConfig {
            from_phone_number: raw.from_phone_number,
            to_phone_number: raw.to_phone_number,
            account_sid: raw.account_sid,
            auth_token: raw.auth_token,
            api_base_url,
        })
    }
}

impl TryFrom<RawTarget> for MonitorTarget {
    type Error = Error;

    fn try_from(raw: RawTarget) -> Result<Self, Self::Error> {
        check_url_reference(&raw.url).map_err(|source| Error::InvalidUrl {
            description: raw.description.clone(),
            source,
        })?;

        let pattern = Regex::new(&raw.pattern).map_err(|source| Error::InvalidPattern {
            description: raw.description.clone(),
            source,
        })?;
        let alert_if = raw.alert_if.parse()?;

        Ok(MonitorTarget {
            description: raw.description,
            url: raw.url,
            pattern,
            alert_if,
        })
    }
}

/// Accepts absolute URLs of any scheme and well-formed relative references.
fn check_url_reference(text: &str) -> Result<(), url::ParseError> {
    match Url::parse(text) {
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(REFERENCE_BASE_URL)?;
            Url::options().base_url(Some(&base)).parse(text).map(drop)
        }
        parsed => parsed.map(drop),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    const TWILIO_YAML: &str = r#"
twilio:
  fromPhoneNumber: "+15550000001"
  toPhoneNumber: "+15550000002"
  accountSid: "AC0123456789"
  authToken: "secret"
"#;

    fn yaml_with_target(url: &str, pattern: &str, alert_if: &str) -> String {
        format!(
            "{TWILIO_YAML}urls:
  - description: health
    url: \"{url}\"
    pattern: \"{pattern}\"
    alertIf: \"{alert_if}\"
"
        )
    }

    #[test]
    fn test_load_config_from_yaml() {
        let yaml = format!(
            r#"{TWILIO_YAML}urls:
  - description: "Front page"
    url: "https://www.example.com/"
    pattern: "Example Domain"
    alertIf: NoMatch
  - description: "Health"
    url: "http://x/health"
    pattern: "OK"
    alertIf: Match
"#
        );

        let mut temp_file = Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("Failed to create temp file");
        write!(temp_file, "{yaml}").expect("Failed to write to temp file");

        let config = RootConfig::load(temp_file.path()).expect("Failed to parse config");

        assert_eq!(config.twilio.from_phone_number, "+15550000001");
        assert_eq!(config.twilio.to_phone_number, "+15550000002");
        assert_eq!(config.twilio.account_sid, "AC0123456789");
        assert_eq!(config.twilio.auth_token, "secret");
        assert_eq!(config.twilio.api_base_url.as_str(), "https://api.twilio.com/");
        assert_eq!(config.urls.len(), 2);
        assert_eq!(config.urls[0].description, "Front page");
        assert_eq!(config.urls[0].alert_if, AlertCondition::NoMatch);
        assert_eq!(config.urls[1].url, "http://x/health");
        assert_eq!(config.urls[1].alert_if, AlertCondition::Match);
        assert!(config.urls[1].pattern.is_match(b"status: OK"));
    }

    #[test]
    fn test_load_config_from_toml() {
        let toml_content = r#"
            [twilio]
            fromPhoneNumber = "+15550000001"
            toPhoneNumber = "+15550000002"
            accountSid = "AC0123456789"
            authToken = "secret"
            apiBaseUrl = "http://127.0.0.1:8080"

            [[urls]]
            description = "Health"
            url = "http://x/health"
            pattern = "OK"
            alertIf = "Match"
        "#;

        let mut temp_file = Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("Failed to create temp file");
        write!(temp_file, "{toml_content}").expect("Failed to write to temp file");

        let config = RootConfig::load(temp_file.path()).expect("Failed to parse config");

        assert_eq!(config.twilio.api_base_url.as_str(), "http://127.0.0.1:8080/");
        assert_eq!(config.urls.len(), 1);
        assert_eq!(config.urls[0].description, "Health");
    }

    #[test]
    fn test_unknown_alert_condition_is_rejected() {
        let yaml = yaml_with_target("http://x/health", "OK", "Maybe");
        let err = RootConfig::parse(&yaml, ConfigFormat::Yaml).unwrap_err();

        assert!(matches!(err, Error::InvalidAlertCondition(ref v) if v == "Maybe"));
        assert!(err.to_string().contains("'Maybe'"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let yaml = yaml_with_target("http://x/health", "(unclosed", "Match");
        let err = RootConfig::parse(&yaml, ConfigFormat::Yaml).unwrap_err();

        assert!(matches!(
            err,
            Error::InvalidPattern { ref description, .. } if description == "health"
        ));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let yaml = yaml_with_target("http://[::1", "OK", "Match");
        let err = RootConfig::parse(&yaml, ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));

        let yaml = yaml_with_target("http://exa mple.com/", "OK", "Match");
        let err = RootConfig::parse(&yaml, ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }

    #[test]
    fn test_relative_and_non_http_urls_load_as_configured() {
        let yaml = format!(
            r#"{TWILIO_YAML}urls:
  - description: rel
    url: "health"
    pattern: "OK"
    alertIf: Match
  - description: file
    url: "ftp://x/file"
    pattern: "OK"
    alertIf: Match
  - description: home
    url: "https://Example.COM"
    pattern: "OK"
    alertIf: Match
"#
        );

        let config = RootConfig::parse(&yaml, ConfigFormat::Yaml).expect("Failed to parse config");

        assert_eq!(config.urls[0].url, "health");
        assert_eq!(config.urls[1].url, "ftp://x/file");
        assert_eq!(config.urls[2].url, "https://Example.COM");
    }

    #[test]
    fn test_one_bad_target_fails_whole_config() {
        let yaml = format!(
            r#"{TWILIO_YAML}urls:
  - description: good
    url: "http://x/health"
    pattern: "OK"
    alertIf: Match
  - description: bad
    url: "http://y/health"
    pattern: "OK"
    alertIf: match
"#
        );

        assert!(RootConfig::parse(&yaml, ConfigFormat::Yaml).is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = RootConfig::load("/nonexistent/configuration.yaml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_malformed_yaml_is_rejected() {
        let err = RootConfig::parse("twilio: [unterminated", ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("configuration.yaml")),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("configuration.yml")),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("/etc/url-monitor/config.TOML")),
            ConfigFormat::Toml
        );
        assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Yaml);
    }

    #[test]
    fn test_alert_condition_truth_table() {
        assert!(AlertCondition::Match.is_triggered_by(true));
        assert!(!AlertCondition::Match.is_triggered_by(false));
        assert!(!AlertCondition::NoMatch.is_triggered_by(true));
        assert!(AlertCondition::NoMatch.is_triggered_by(false));
    }

    #[test]
    fn test_alert_condition_parse_is_case_sensitive() {
        assert_eq!("Match".parse::<AlertCondition>().unwrap(), AlertCondition::Match);
        assert_eq!(
            "NoMatch".parse::<AlertCondition>().unwrap(),
            AlertCondition::NoMatch
        );
        assert!("nomatch".parse::<AlertCondition>().is_err());
        assert!("".parse::<AlertCondition>().is_err());
    }
}
