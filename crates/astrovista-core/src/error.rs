use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid APOD date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CoreError {
    pub fn invalid_date(value: impl Into<String>) -> Self {
        Self::InvalidDate(value.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_date_message() {
        let err = CoreError::invalid_date("2023-13-01");
        assert_eq!(
            err.to_string(),
            "Invalid APOD date '2023-13-01': expected YYYY-MM-DD"
        );
    }
}
