use thiserror::Error;

pub type CurtidasResult<T> = anyhow::Result<T>;

#[derive(Error, Debug)]
pub enum CurtidasError {
    /// The dataset carries no post id under any accepted spelling.
    #[error("Control dataset has no post id")]
    MissingPostId,
    /// A dataset value exists but cannot be parsed into its typed field.
    #[error("Invalid value for {key}: {value}")]
    InvalidDatasetValue { key: String, value: String },
    /// The referenced control was never bound or has been unbound.
    #[error("No control bound with id {id}")]
    UnknownControl { id: u32 },
    #[error("ERROR: {msg}")]
    ConfigError { msg: String },
    /// Custom Error type for errors not covered by the above errors.
    #[error("{msg}")]
    CustomError { msg: String },
}

impl CurtidasError {
    pub fn config_error(msg: String) -> Self {
        Self::ConfigError { msg }
    }

    pub fn custom_error(msg: String) -> Self {
        Self::CustomError { msg }
    }
}
