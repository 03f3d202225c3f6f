/// The bookshelf server error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Binding, accepting or talking to a client socket failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A reply could not be encoded as JSON
    #[error("Failed to encode reply: {0}")]
    Encode(#[from] serde_json::Error),
    /// The environment holds an unusable setting
    #[error("Invalid configuration: {0}")]
    Config(String),
}
