/// A validated `(path, url)` pair ready to be sent to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub path: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Path is required")]
    MissingPath,
    #[error("URL is required")]
    MissingUrl,
    #[error("Path and URL are required")]
    MissingBoth,
}

impl ValidationError {
    pub fn missing_path(self) -> bool {
        matches!(self, ValidationError::MissingPath | ValidationError::MissingBoth)
    }

    pub fn missing_url(self) -> bool {
        matches!(self, ValidationError::MissingUrl | ValidationError::MissingBoth)
    }
}

/// Rejects empty fields before anything touches the network.
pub fn validate_submission(path: &str, url: &str) -> Result<Submission, ValidationError> {
    match (path.is_empty(), url.is_empty()) {
        (true, true) => Err(ValidationError::MissingBoth),
        (true, false) => Err(ValidationError::MissingPath),
        (false, true) => Err(ValidationError::MissingUrl),
        (false, false) => Ok(Submission {
            path: path.to_string(),
            url: url.to_string(),
        }),
    }
}
