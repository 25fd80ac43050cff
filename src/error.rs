use thiserror::Error;

pub type Result<T> = std::result::Result<T, FeedError>;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status code: {0}")]
    Status(u16),

    #[error("Entry not found")]
    NotFound,

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Backend reported no data")]
    Rejected,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown section: {0}")]
    UnknownSection(String),
}

impl FeedError {
    /// Not-found and transient failures are indistinguishable to the feed,
    /// this only decides how loudly the fetcher logs.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FeedError::NotFound)
    }
}
