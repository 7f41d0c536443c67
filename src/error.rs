//! Errors raised while building the dataset at start-up.
//!
//! Everything after the build is a read-only query and cannot fail.

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A source could not be read from disk or fetched over HTTP.
    #[error("source {source_label} is unavailable: {message}")]
    SourceUnavailable {
        source_label: String,
        message: String,
    },

    /// A source does not carry a column the pipeline requires.
    #[error("source {source_label} is missing required column {column:?}")]
    SchemaMismatch {
        source_label: String,
        column: String,
    },

    /// The CSV itself is structurally broken (ragged rows, bad quoting).
    #[error("source {source_label} is malformed: {message}")]
    MalformedSource {
        source_label: String,
        message: String,
    },

    #[error("no survey sources configured")]
    NoSources,
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn unavailable(source_label: impl Into<String>, message: impl ToString) -> Self {
        Self::SourceUnavailable {
            source_label: source_label.into(),
            message: message.to_string(),
        }
    }

    pub fn malformed(source_label: impl Into<String>, message: impl ToString) -> Self {
        Self::MalformedSource {
            source_label: source_label.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_source() {
        let err = PipelineError::SchemaMismatch {
            source_label: "burn_out_test.csv".to_string(),
            column: "Burn Rate".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "source burn_out_test.csv is missing required column \"Burn Rate\""
        );

        let err = PipelineError::unavailable("https://example.com/a.csv", "HTTP 404");
        assert!(err.to_string().contains("HTTP 404"));
    }
}
