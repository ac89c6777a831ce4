use thiserror::Error;

#[derive(Error, Debug)]
pub enum RadarError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parsing error: {0}")]
    DateError(#[from] chrono::ParseError),

    #[error("Spreadsheet parsing error: {0}")]
    SpreadsheetError(#[from] calamine::Error),

    #[error("empty result: {0}")]
    EmptyResult(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("transient network error: {0}")]
    TransientNetwork(String),

    #[error("terminal adapter error: {0}")]
    TerminalAdapter(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl RadarError {
    /// Whether the retry policy should attempt the call again.
    pub fn is_retryable(&self) -> bool {
        match self {
            RadarError::RequestError(e) => {
                if e.is_timeout() || e.is_connect() || e.is_request() {
                    return true;
                }
                match e.status() {
                    Some(status) => status.is_server_error() || status.as_u16() == 429,
                    None => true,
                }
            }
            RadarError::IoError(_)
            | RadarError::JsonError(_)
            | RadarError::EmptyResult(_)
            | RadarError::TransientNetwork(_)
            | RadarError::Unknown(_) => true,
            RadarError::DateError(_)
            | RadarError::SpreadsheetError(_)
            | RadarError::ParseError(_)
            | RadarError::TerminalAdapter(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RadarError>;

impl From<String> for RadarError {
    fn from(s: String) -> Self {
        RadarError::Unknown(s)
    }
}

impl From<&str> for RadarError {
    fn from(s: &str) -> Self {
        RadarError::Unknown(s.to_string())
    }
}
