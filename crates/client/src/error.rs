use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("ERROR: {msg}")]
    FixtureError { msg: String },

    #[error("ERROR: {msg}")]
    CustomError { msg: String },
}

impl ClientError {
    pub fn custom_error(msg: String) -> Self {
        Self::CustomError { msg }
    }
}
