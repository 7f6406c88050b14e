use aws_sdk_s3::primitives::ByteStreamError;
use aws_smithy_runtime_api::client::result::CreateUnhandledError;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::Response;
use thiserror::Error;

pub mod config;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    #[error("ByteStream error: {0}")]
    ByteStream(#[from] ByteStreamError),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error in field {field}: {message}")]
    Parse { field: String, message: String },

    #[error("Conditional check failed: {0}")]
    ConditionFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Simulated failure: {0}")]
    Simulated(String),
}

impl Error {
    pub fn parse(field: impl Into<String>, message: impl ToString) -> Self {
        Error::Parse {
            field: field.into(),
            message: message.to_string(),
        }
    }

    /// Whether a retry of the same call can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::AwsSdk(_)
                | Error::ByteStream(_)
                | Error::Storage(_)
                | Error::Simulated(_)
        )
    }
}

// Implement From for various SdkError types
impl<E: std::fmt::Debug + CreateUnhandledError> From<SdkError<E, Response>> for Error {
    fn from(err: SdkError<E, Response>) -> Self {
        Error::AwsSdk(format!("{:?}", err))
    }
}
