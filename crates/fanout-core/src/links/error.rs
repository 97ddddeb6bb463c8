use std::path::PathBuf;

/// Input/configuration problems with links or the destination map.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("empty link entry")]
    Empty,

    #[error("duplicate link: {0}")]
    Duplicate(String),

    #[error("invalid URL '{link}': {source}")]
    InvalidUrl {
        link: String,
        source: url::ParseError,
    },

    #[error("relative link '{0}' needs a base URL")]
    RelativeWithoutBase(String),

    #[error("no destination mapped for link {0}")]
    MissingMapping(String),

    #[error("destination for {link} must be a relative path inside the prefix: {path}")]
    UnsafePath { link: String, path: PathBuf },

    #[error("{first} and {second} both map to {path}")]
    DuplicateDestination {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error("file map is not a JSON object of link -> path: {0}")]
    Parse(#[from] serde_json::Error),
}
