/// Top-level hipminer error type.
#[derive(thiserror::Error, Debug)]
pub enum HipError {
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveFormatError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Format failures from the archive reader. These are the only errors the
/// parsing path can raise; everything else inside a scene is dropped silently.
#[derive(thiserror::Error, Debug)]
pub enum ArchiveFormatError {
    #[error("gzip stream is corrupt: {0}")]
    Gzip(String),

    #[error("no CPIO magic found in the leading bytes")]
    NoMagic,

    #[error("invalid CPIO header at offset {offset}: {message}")]
    BadHeader { offset: usize, message: String },
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Manifest error: {0}")]
    Manifest(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, HipError>;
