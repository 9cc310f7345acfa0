use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("TOML deserialization error: {0}")]
    #[diagnostic(
        code(wharf_config::toml_deserialize),
        help("Check your config.toml syntax and structure")
    )]
    TomlDeError(#[from] toml::de::Error),

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(wharf_config::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error("Invalid edge node URL: {0}")]
    #[diagnostic(
        code(wharf_config::invalid_edge_url),
        help("Edge node URLs must be absolute http(s) URLs")
    )]
    InvalidEdgeUrl(String),

    #[error("Edge node `{0}` has an empty shared secret")]
    #[diagnostic(
        code(wharf_config::empty_edge_secret),
        help("Configure a non-empty secret for every edge node")
    )]
    EmptyEdgeSecret(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
