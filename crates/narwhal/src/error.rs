#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] narwhal_graphlib::Error),

    #[error("invalid port type: {value:?} (expected \"input\" or \"output\")")]
    InvalidPortType { value: String },

    #[error("invalid crossing minimization options: {message}")]
    InvalidOptions { message: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
