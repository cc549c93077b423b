use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PulseError>;

#[derive(Error, Debug)]
pub enum PulseError {
    #[error("Repository directory not found: {}", .0.display())]
    RepoNotFound(PathBuf),
    #[error("Git discover error: {0}")]
    GitDiscover(#[from] Box<gix::discover::Error>),
    #[error("Git command failed: {0}")]
    GitCommand(String),
    #[error("{what} timed out after {after:?}")]
    Timeout { what: String, after: Duration },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

impl From<gix::discover::Error> for PulseError {
    fn from(err: gix::discover::Error) -> Self {
        PulseError::GitDiscover(Box::new(err))
    }
}

impl From<toml::de::Error> for PulseError {
    fn from(err: toml::de::Error) -> Self {
        PulseError::Config(err.to_string())
    }
}
