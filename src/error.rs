use std::path::PathBuf;

pub type ReelResult<T> = Result<T, ReelError>;

/// Errors fall into two groups: the first three variants are pre-flight
/// failures returned synchronously from the entry points before any
/// background work starts; everything else is a runtime failure that is only
/// observable through the completion callback's missing payload.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    #[error("at least two source images are required")]
    NoImages,

    #[error("duration and loop duration must be non-zero")]
    DurationZero,

    #[error("output '{}' already exists and overwrite is disabled", .0.display())]
    OutputExists(PathBuf),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("normalization error: {0}")]
    Normalization(String),

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn normalization(msg: impl Into<String>) -> Self {
        Self::Normalization(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ReelError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            ReelError::normalization("x")
                .to_string()
                .contains("normalization error:")
        );
        assert!(
            ReelError::encoding("x")
                .to_string()
                .contains("encoding error:")
        );
    }

    #[test]
    fn output_exists_names_the_path() {
        let err = ReelError::OutputExists(PathBuf::from("/tmp/out.mov"));
        assert!(err.to_string().contains("/tmp/out.mov"));
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ReelError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
