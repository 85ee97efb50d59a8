use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShelterError>;

#[derive(Error, Debug)]
pub enum ShelterError {
    /// A required argument was absent. Always returned to the caller.
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The store could not be reached while constructing the shelter.
    #[error("Unable to connect to MongoDB: {0}")]
    Connection(String),
    /// The store rejected or failed an operation.
    #[error("Store operation failed: {0}")]
    Store(String),
}

impl From<mongodb::error::Error> for ShelterError {
    fn from(err: mongodb::error::Error) -> Self {
        ShelterError::Store(err.to_string())
    }
}
