use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
    #[error("Invalid URL for '{description}': {source}")]
    InvalidUrl {
        description: String,
        source: url::ParseError,
    },
    #[error("Invalid pattern for '{description}': {source}")]
    InvalidPattern {
        description: String,
        source: regex::Error,
    },
    #[error("Invalid alert condition: '{0}'")]
    InvalidAlertCondition(String),
    #[error("Unsupported URL scheme for '{description}': {scheme}")]
    UnsupportedScheme { description: String, scheme: String },
}
