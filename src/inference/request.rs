//! Request validation and the canonical single-row feature table

use crate::error::{FieldProblem, Result, ValidationError};
use crate::preprocessing::FEATURE_ORDER;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Lowest and highest valid exam score
pub const SCORE_RANGE: (f64, f64) = (0.0, 100.0);

/// A score as supplied by a caller: form fields arrive as text, JSON as numbers.
/// Any other JSON value is kept so validation can report it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawScore {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl From<f64> for RawScore {
    fn from(v: f64) -> Self {
        RawScore::Number(v)
    }
}

impl From<&str> for RawScore {
    fn from(v: &str) -> Self {
        RawScore::Text(v.to_string())
    }
}

/// Unvalidated prediction input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionRequest {
    pub gender: Option<String>,
    #[serde(alias = "ethnicity")]
    pub race_ethnicity: Option<String>,
    pub parental_level_of_education: Option<String>,
    pub lunch: Option<String>,
    pub test_preparation_course: Option<String>,
    pub reading_score: Option<RawScore>,
    pub writing_score: Option<RawScore>,
}

impl PredictionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field by name; `ethnicity` is accepted for `race_ethnicity`.
    /// Returns `false` for an unknown name.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        let text = Some(value.to_string());
        match name {
            "gender" => self.gender = text,
            "race_ethnicity" | "ethnicity" => self.race_ethnicity = text,
            "parental_level_of_education" => self.parental_level_of_education = text,
            "lunch" => self.lunch = text,
            "test_preparation_course" => self.test_preparation_course = text,
            "reading_score" => self.reading_score = Some(RawScore::from(value)),
            "writing_score" => self.writing_score = Some(RawScore::from(value)),
            _ => return false,
        }
        true
    }

    /// Build a request from `(name, value)` pairs in any order; unknown
    /// names are ignored
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut request = Self::new();
        for (name, value) in fields {
            request.set(name, value);
        }
        request
    }

    /// Check every field and build the feature row.
    ///
    /// All problems are collected, in canonical column order.
    pub fn validate(&self) -> std::result::Result<FeatureRow, ValidationError> {
        let mut errors = ValidationError::new();

        let categories = [
            &self.gender,
            &self.race_ethnicity,
            &self.parental_level_of_education,
            &self.lunch,
            &self.test_preparation_course,
        ];
        let mut checked: Vec<String> = Vec::with_capacity(categories.len());
        for (field, value) in FEATURE_ORDER.iter().zip(categories) {
            match value.as_deref().map(str::trim) {
                None => errors.push(*field, FieldProblem::Missing),
                Some("") => errors.push(*field, FieldProblem::Empty),
                Some(v) => checked.push(v.to_string()),
            }
        }

        let reading = check_score(FEATURE_ORDER[5], self.reading_score.as_ref(), &mut errors);
        let writing = check_score(FEATURE_ORDER[6], self.writing_score.as_ref(), &mut errors);

        match (reading, writing, <[String; 5]>::try_from(checked)) {
            (
                Some(reading_score),
                Some(writing_score),
                Ok([gender, race_ethnicity, parental_level_of_education, lunch, test_preparation_course]),
            ) if errors.is_empty() => Ok(FeatureRow {
                gender,
                race_ethnicity,
                parental_level_of_education,
                lunch,
                test_preparation_course,
                reading_score,
                writing_score,
            }),
            _ => Err(errors),
        }
    }
}

fn check_score(field: &str, raw: Option<&RawScore>, errors: &mut ValidationError) -> Option<f64> {
    let value = match raw {
        None => {
            errors.push(field, FieldProblem::Missing);
            return None;
        }
        Some(RawScore::Number(v)) => *v,
        Some(RawScore::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                errors.push(field, FieldProblem::Empty);
                return None;
            }
            match text.parse::<f64>() {
                Ok(v) => v,
                Err(_) => {
                    errors.push(field, FieldProblem::NotNumeric(text.to_string()));
                    return None;
                }
            }
        }
        Some(RawScore::Other(other)) => {
            errors.push(field, FieldProblem::NotNumeric(other.to_string()));
            return None;
        }
    };

    let (min, max) = SCORE_RANGE;
    if value.is_nan() {
        errors.push(field, FieldProblem::NotNumeric(value.to_string()));
        None
    } else if !(min..=max).contains(&value) {
        errors.push(field, FieldProblem::OutOfRange { value, min, max });
        None
    } else {
        Some(value)
    }
}

/// A validated input row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub gender: String,
    pub race_ethnicity: String,
    pub parental_level_of_education: String,
    pub lunch: String,
    pub test_preparation_course: String,
    pub reading_score: f64,
    pub writing_score: f64,
}

impl FeatureRow {
    /// One-row table whose columns follow [`FEATURE_ORDER`]
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let categorical = [
            &self.gender,
            &self.race_ethnicity,
            &self.parental_level_of_education,
            &self.lunch,
            &self.test_preparation_course,
        ];
        let mut columns: Vec<Column> = FEATURE_ORDER[..5]
            .iter()
            .zip(categorical)
            .map(|(name, value)| Column::new((*name).into(), &[value.as_str()]))
            .collect();
        columns.push(Column::new(FEATURE_ORDER[5].into(), &[self.reading_score]));
        columns.push(Column::new(FEATURE_ORDER[6].into(), &[self.writing_score]));
        Ok(DataFrame::new(columns)?)
    }
}

/// Map a raw model output onto the score domain
pub fn clamp_score(raw: f64) -> f64 {
    let (min, max) = SCORE_RANGE;
    raw.max(min).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PredictionRequest {
        PredictionRequest::from_fields([
            ("gender", "female"),
            ("race_ethnicity", "group B"),
            ("parental_level_of_education", "bachelor's degree"),
            ("lunch", "standard"),
            ("test_preparation_course", "none"),
            ("reading_score", "72"),
            ("writing_score", "74"),
        ])
    }

    #[test]
    fn test_valid_request() {
        let row = valid().validate().unwrap();
        assert_eq!(row.race_ethnicity, "group B");
        assert_eq!(row.reading_score, 72.0);
    }

    #[test]
    fn test_field_order_does_not_matter() {
        let shuffled = PredictionRequest::from_fields([
            ("writing_score", "74"),
            ("lunch", "standard"),
            ("ethnicity", "group B"),
            ("reading_score", "72"),
            ("test_preparation_course", "none"),
            ("gender", "female"),
            ("parental_level_of_education", "bachelor's degree"),
        ]);
        assert_eq!(shuffled.validate().unwrap(), valid().validate().unwrap());
    }

    #[test]
    fn test_missing_and_out_of_range_reported_together() {
        let mut request = valid();
        request.writing_score = None;
        request.reading_score = Some(RawScore::Number(150.0));

        let err = request.validate().unwrap_err();
        assert_eq!(err.fields(), vec!["reading_score", "writing_score"]);
        assert_eq!(err.problems_for("writing_score"), vec![&FieldProblem::Missing]);
        assert!(matches!(
            err.problems_for("reading_score")[0],
            FieldProblem::OutOfRange { value, .. } if *value == 150.0
        ));
    }

    #[test]
    fn test_blank_and_non_numeric() {
        let mut request = valid();
        request.gender = Some("   ".to_string());
        request.reading_score = Some(RawScore::from("seventy"));
        let err = request.validate().unwrap_err();
        assert_eq!(err.problems_for("gender"), vec![&FieldProblem::Empty]);
        assert_eq!(
            err.problems_for("reading_score"),
            vec![&FieldProblem::NotNumeric("seventy".to_string())]
        );
    }

    #[test]
    fn test_empty_request_lists_every_field() {
        let err = PredictionRequest::new().validate().unwrap_err();
        assert_eq!(err.fields(), FEATURE_ORDER.to_vec());
    }

    #[test]
    fn test_json_alias_and_numbers() {
        let request: PredictionRequest = serde_json::from_str(
            r#"{"gender": "male", "ethnicity": "group C", "parental_level_of_education": "high school",
                "lunch": "free/reduced", "test_preparation_course": "completed",
                "reading_score": 55, "writing_score": "60.5"}"#,
        )
        .unwrap();
        let row = request.validate().unwrap();
        assert_eq!(row.race_ethnicity, "group C");
        assert_eq!(row.reading_score, 55.0);
        assert_eq!(row.writing_score, 60.5);
    }

    #[test]
    fn test_json_non_scalar_scores_are_not_numeric() {
        let request: PredictionRequest = serde_json::from_str(
            r#"{"gender": "male", "ethnicity": "group C", "parental_level_of_education": "high school",
                "lunch": "free/reduced", "test_preparation_course": "completed",
                "reading_score": true, "writing_score": [60]}"#,
        )
        .unwrap();
        assert_eq!(request.reading_score, Some(RawScore::Other(serde_json::Value::Bool(true))));

        let err = request.validate().unwrap_err();
        assert_eq!(err.fields(), vec!["reading_score", "writing_score"]);
        assert_eq!(
            err.problems_for("reading_score"),
            vec![&FieldProblem::NotNumeric("true".to_string())]
        );
        assert_eq!(
            err.problems_for("writing_score"),
            vec![&FieldProblem::NotNumeric("[60]".to_string())]
        );
    }

    #[test]
    fn test_dataframe_column_order() {
        let df = valid().validate().unwrap().to_dataframe().unwrap();
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, FEATURE_ORDER.to_vec());
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(142.7), 100.0);
        assert_eq!(clamp_score(-3.2), 0.0);
        assert_eq!(clamp_score(57.4), 57.4);
    }
}
