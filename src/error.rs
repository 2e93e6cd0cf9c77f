// Hello developer. Please add your error to the according subsection
// that is commented, or make a new subsection. Keep it clean.

/// Main result type used throughout the codebase.
pub type Result<T> = std::result::Result<T, Error>;

/// General library errors used throughout the codebase.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    // ==============
    // Parsing errors
    // ==============
    #[error("Parse failed: {0}")]
    ParseFailed(&'static str),

    #[error(transparent)]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error(transparent)]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    #[error("URL parse error: {0}")]
    UrlParse(String),

    // ===============
    // Encoding errors
    // ===============
    #[error("decode failed: {0}")]
    DecodeError(&'static str),

    #[error("encode failed: {0}")]
    EncodeError(&'static str),

    #[error("json parse error: {0}")]
    JsonParseError(String),

    #[error("json generate error: {0}")]
    JsonGenerateError(String),

    // ======================
    // Network-related errors
    // ======================
    #[error("Unsupported network transport: {0}")]
    UnsupportedTransport(String),

    #[error("Connection failed")]
    ConnectFailed,

    #[error("Channel stopped")]
    ChannelStopped,

    #[error("Network operation failed")]
    NetworkOperationFailed,

    // ===============
    // JSON-RPC errors
    // ===============
    #[error(transparent)]
    RpcError(#[from] RpcError),

    #[error("JSON-RPC server error: {0:?}")]
    JsonRpcError((i32, String)),

    #[error("Unexpected JSON-RPC data received: {0}")]
    UnexpectedJsonRpc(String),

    #[error("JSON-RPC client stopped")]
    RpcClientStopped,

    #[error("JSON-RPC read timed out")]
    RpcReadTimeout,

    // ===============
    // Database errors
    // ===============
    #[error("Database error: {0}")]
    DatabaseError(String),

    // ===========
    // Misc errors
    // ===========
    #[error("IO error: {0:?}")]
    Io(std::io::ErrorKind),

    #[error("Custom error: {0}")]
    Custom(String),
}

/// Errors raised while handling JSON-RPC objects.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RpcError {
    #[error("Invalid JSON-RPC object: {0}")]
    InvalidJson(String),

    #[error("Request/response ID mismatch")]
    IdMismatch,

    #[error("Connection closed")]
    ConnectionClosed,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.kind())
    }
}

impl From<tinyjson::JsonParseError> for Error {
    fn from(err: tinyjson::JsonParseError) -> Self {
        Self::JsonParseError(err.to_string())
    }
}

impl From<tinyjson::JsonGenerateError> for Error {
    fn from(err: tinyjson::JsonGenerateError) -> Self {
        Self::JsonGenerateError(err.to_string())
    }
}

impl<T> From<smol::channel::SendError<T>> for Error {
    fn from(_err: smol::channel::SendError<T>) -> Self {
        Self::ChannelStopped
    }
}

impl From<smol::channel::RecvError> for Error {
    fn from(_err: smol::channel::RecvError) -> Self {
        Self::ChannelStopped
    }
}
