use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid elasticsearch url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("elasticsearch request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("elasticsearch answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("elasticsearch not ready after {attempts} attempts")]
    NotReady { attempts: u32 },

    #[error("elasticsearch response has no document id")]
    MissingId,
}
