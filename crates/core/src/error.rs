use thiserror::Error;

#[derive(Debug, Error)]
pub enum IclogsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("cannot find value for key: '{0}'")]
    MissingField(String),

    #[error("cannot parse timestamp '{value}': {reason}")]
    TimestampParse { value: String, reason: String },

    #[error("line {line} exceeds the maximum line size of {limit} bytes")]
    LineTooLong { line: usize, limit: usize },

    #[error("cannot decode data line {line}: {source}")]
    LineDecode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot parse record from results on line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: Box<IclogsError>,
    },

    #[error("key path not found: '{0}'")]
    KeyNotFound(String),

    #[error("cannot decode user data: {0}")]
    UserDataDecode(#[source] serde_json::Error),

    #[error("cannot get token. status: {status}, code: {code}, message: {message}, details: {details}")]
    Auth {
        status: u16,
        code: String,
        message: String,
        details: String,
    },

    #[error("got HTTP error code: {status}, message: '{body}'")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, IclogsError>;
