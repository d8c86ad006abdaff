pub type RailmotionResult<T> = Result<T, RailmotionError>;

#[derive(thiserror::Error, Debug)]
pub enum RailmotionError {
    #[error("trace error: {0}")]
    Trace(String),

    #[error("geometry error: {0}")]
    Geometry(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RailmotionError {
    pub fn trace(msg: impl Into<String>) -> Self {
        Self::Trace(msg.into())
    }

    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            RailmotionError::trace("x")
                .to_string()
                .contains("trace error:")
        );
        assert!(
            RailmotionError::geometry("x")
                .to_string()
                .contains("geometry error:")
        );
        assert!(
            RailmotionError::serde("x")
                .to_string()
                .contains("serialization error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = RailmotionError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
