//! Reading raw CSV sources from disk or over HTTP.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::error::{PipelineError, Result};

const FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Url(String),
}

impl Source {
    pub fn parse(location: &str) -> Self {
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            Source::Url(location.to_string())
        } else {
            Source::File(PathBuf::from(location))
        }
    }

    pub fn label(&self) -> String {
        self.to_string()
    }

    #[instrument(skip_all, fields(source = %self))]
    pub async fn read_to_string(&self) -> Result<String> {
        match self {
            Source::File(path) => tokio::fs::read_to_string(path)
                .await
                .map_err(|err| PipelineError::unavailable(self.label(), err)),
            Source::Url(url) => {
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
                    .build()
                    .map_err(|err| PipelineError::unavailable(self.label(), err))?;
                let response = client
                    .get(url)
                    .send()
                    .await
                    .map_err(|err| PipelineError::unavailable(self.label(), err))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(PipelineError::unavailable(
                        self.label(),
                        format!("HTTP {status}"),
                    ));
                }
                let body = response
                    .text()
                    .await
                    .map_err(|err| PipelineError::unavailable(self.label(), err))?;
                debug!(bytes = body.len(), "fetched source");
                Ok(body)
            }
        }
    }

    /// Reads the source and deserializes every row after checking the
    /// header carries `required` columns.
    pub async fn load_rows<T: DeserializeOwned>(&self, required: &[&str]) -> Result<Vec<T>> {
        let text = self.read_to_string().await?;
        parse_rows(&self.label(), &text, required)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Url(url) => f.write_str(url),
        }
    }
}

pub fn parse_rows<T: DeserializeOwned>(
    source_label: &str,
    text: &str,
    required: &[&str],
) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|err| PipelineError::malformed(source_label, err))?
        .clone();
    for column in required {
        if !headers.iter().any(|header| header == *column) {
            return Err(PipelineError::SchemaMismatch {
                source_label: source_label.to_string(),
                column: (*column).to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    for result in reader.deserialize::<T>() {
        rows.push(result.map_err(|err| PipelineError::malformed(source_label, err))?);
    }
    debug!(source = source_label, rows = rows.len(), "parsed source");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawSurveyRow, REQUIRED_SURVEY_COLUMNS};

    const HEADER: &str = "Employee ID,Date of Joining,Gender,Company Type,WFH Setup Available,Designation,Resource Allocation,Mental Fatigue Score,Burn Rate";

    #[test]
    fn classifies_locations() {
        assert_eq!(
            Source::parse("https://example.com/a.csv"),
            Source::Url("https://example.com/a.csv".to_string())
        );
        assert_eq!(
            Source::parse("data/burn_out_train.csv"),
            Source::File(PathBuf::from("data/burn_out_train.csv"))
        );
    }

    #[test]
    fn parses_rows_and_treats_bad_numbers_as_missing() {
        let text = format!(
            "{HEADER}\nfffe32,2008-09-30,Female,Service,No,2,3,3.8,0.16\nfffe33,2008-11-30,Male,Product,Yes,1,,abc,0.36\n"
        );
        let rows: Vec<RawSurveyRow> =
            parse_rows("inline", &text, &REQUIRED_SURVEY_COLUMNS).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].gender.as_deref(), Some("Female"));
        assert_eq!(rows[0].mental_fatigue_score, Some(3.8));
        assert_eq!(rows[1].resource_allocation, None);
        assert_eq!(rows[1].mental_fatigue_score, None);
        assert_eq!(rows[1].burn_rate, Some(0.36));
    }

    #[test]
    fn missing_required_column_is_a_schema_mismatch() {
        let text = "Gender,Designation,Resource Allocation,Mental Fatigue Score\nMale,1,2,3\n";
        let err = parse_rows::<RawSurveyRow>("test.csv", text, &REQUIRED_SURVEY_COLUMNS)
            .unwrap_err();
        match err {
            PipelineError::SchemaMismatch {
                source_label,
                column,
            } => {
                assert_eq!(source_label, "test.csv");
                assert_eq!(column, "Burn Rate");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let text = format!("{HEADER}\na,b,c\n");
        let err = parse_rows::<RawSurveyRow>("ragged.csv", &text, &REQUIRED_SURVEY_COLUMNS)
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedSource { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let source = Source::parse("/definitely/not/here.csv");
        let err = source.read_to_string().await.unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn fetches_rows_over_http() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/train.csv"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(format!(
                "{HEADER}\nfffe32,2008-09-30,Female,Service,No,2,3,3.8,0.16\n"
            )))
            .mount(&server)
            .await;

        let source = Source::parse(&format!("{}/train.csv", server.uri()));
        let rows: Vec<RawSurveyRow> = source.load_rows(&REQUIRED_SURVEY_COLUMNS).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].employee_id.as_deref(), Some("fffe32"));
    }

    #[tokio::test]
    async fn http_errors_are_unavailable() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = Source::parse(&format!("{}/gone.csv", server.uri()));
        let err = source.read_to_string().await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
