use larder_store::StoreError;
use thiserror::Error;

/// All the ways things can go wrong in Larder
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage operation failed: {0}")]
    StorageError(StoreError),

    #[error("Food item not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Recipe lookup failed: {0}")]
    RecipeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<StoreError> for Error {
    // NotFound is lifted out; everything else stays wrapped
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Error::NotFound(id),
            other => Error::StorageError(other),
        }
    }
}

impl From<larder_api::RecipeApiError> for Error {
    fn from(err: larder_api::RecipeApiError) -> Self {
        Error::RecipeError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let err: Error = StoreError::NotFound("abc".into()).into();
        assert!(matches!(err, Error::NotFound(ref id) if id == "abc"));
    }

    #[test]
    fn test_other_store_errors_pass_through() {
        let err: Error = StoreError::ConstraintViolation("UNIQUE".into()).into();
        assert!(matches!(err, Error::StorageError(StoreError::ConstraintViolation(_))));
    }
}
