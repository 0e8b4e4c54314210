use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Descriptor shape mismatch: expected {expected} columns, found {found}")]
    DescriptorShape { expected: usize, found: usize },

    #[error("Match refers to feature {index} of {len}")]
    InvalidMatch { index: usize, len: usize },

    #[error("Tracker file parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("Config Error: {0}")]
    Config(#[from] serde_json::Error),

    #[cfg(feature = "opencv")]
    #[error("OpenCV Error: {0}")]
    OpenCv(#[from] opencv::Error),
}
