//! Built-in attribute validators
//!
//! Validators only see known, non-null values; the schema skips the rest.

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{AttributePath, Diagnostic, Dynamic};

/// Accepts only strings from a fixed set
pub struct StringOneOfValidator {
    allowed: Vec<String>,
}

impl StringOneOfValidator {
    pub fn create(allowed: &[&str]) -> Box<dyn Validator> {
        Box::new(Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl Validator for StringOneOfValidator {
    fn description(&self) -> String {
        format!("value must be one of: {}", quoted(&self.allowed))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];

        if let Some(s) = request.value.as_string() {
            if !self.allowed.iter().any(|allowed| allowed == s) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid Attribute Value Match",
                        format!(
                            "Attribute {} value must be one of: {}, got: \"{}\"",
                            request.path,
                            quoted(&self.allowed),
                            s
                        ),
                    )
                    .with_attribute(request.path),
                );
            }
        }

        ValidatorResponse { diagnostics }
    }
}

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    pub fn at_least(min: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: Some(min),
            max: None,
        })
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        format!("string length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];

        if let Some(s) = request.value.as_string() {
            let len = s.chars().count();
            if let Some(min) = self.min {
                if len < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have minimum length of {}", request.path, min),
                            format!("Got length {}", len),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if len > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have maximum length of {}", request.path, max),
                            format!("Got length {}", len),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
        }

        ValidatorResponse { diagnostics }
    }
}

pub struct StringPatternValidator {
    pub pattern: regex::Regex,
    pub description: String,
}

impl StringPatternValidator {
    pub fn create(pattern: regex::Regex, description: &str) -> Box<dyn Validator> {
        Box::new(Self {
            pattern,
            description: description.to_string(),
        })
    }
}

impl Validator for StringPatternValidator {
    fn description(&self) -> String {
        self.description.clone()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];

        if let Some(s) = request.value.as_string() {
            if !self.pattern.is_match(s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} must match {}", request.path, self.description),
                        format!("Value '{}' does not match pattern", s),
                    )
                    .with_attribute(request.path),
                );
            }
        }

        ValidatorResponse { diagnostics }
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl ListLengthValidator {
    pub fn at_most(max: usize) -> Box<dyn Validator> {
        Box::new(Self {
            min: None,
            max: Some(max),
        })
    }
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        format!("list length between {:?} and {:?}", self.min, self.max)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];

        if let Dynamic::List(items) = &request.value {
            if let Some(min) = self.min {
                if items.len() < min {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have at least {} items", request.path, min),
                            format!("Got {} items", items.len()),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
            if let Some(max) = self.max {
                if items.len() > max {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("{} must have at most {} items", request.path, max),
                            format!("Got {} items", items.len()),
                        )
                        .with_attribute(request.path.clone()),
                    );
                }
            }
        }

        ValidatorResponse { diagnostics }
    }
}

/// Applies the inner validator to every known element of a list
pub struct EachElement {
    inner: Box<dyn Validator>,
}

impl EachElement {
    pub fn create(inner: Box<dyn Validator>) -> Box<dyn Validator> {
        Box::new(Self { inner })
    }
}

impl Validator for EachElement {
    fn description(&self) -> String {
        format!("each element: {}", self.inner.description())
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = vec![];

        if let Dynamic::List(items) = request.value {
            for (idx, item) in items.into_iter().enumerate() {
                if item.is_null() || item.is_unknown() {
                    continue;
                }
                let path: AttributePath = request.path.clone().index(idx as i64);
                let response = self.inner.validate(ValidatorRequest { value: item, path });
                diagnostics.extend(response.diagnostics);
            }
        }

        ValidatorResponse { diagnostics }
    }
}

fn quoted(values: &[String]) -> String {
    values
        .iter()
        .map(|v| format!("\"{}\"", v))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(validator: &dyn Validator, value: Dynamic) -> Vec<Diagnostic> {
        validator
            .validate(ValidatorRequest {
                value,
                path: AttributePath::new("test_field"),
            })
            .diagnostics
    }

    #[test]
    fn one_of_accepts_listed_value() {
        let validator = StringOneOfValidator::create(&["Full Access", "Site Access"]);
        assert!(run(validator.as_ref(), Dynamic::String("Site Access".into())).is_empty());
    }

    #[test]
    fn one_of_rejects_unlisted_value() {
        let validator = StringOneOfValidator::create(&["Enabled", "Disabled"]);
        let diags = run(validator.as_ref(), Dynamic::String("enabled".into()));

        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("\"Enabled\", \"Disabled\""));
        assert_eq!(diags[0].attribute, Some(AttributePath::new("test_field")));
    }

    #[test]
    fn string_length_validator_rejects_too_short() {
        let validator = StringLengthValidator::at_least(1);

        let diags = run(validator.as_ref(), Dynamic::String(String::new()));

        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("minimum length"));
    }

    #[test]
    fn string_length_validator_rejects_too_long() {
        let validator = StringLengthValidator {
            min: None,
            max: Some(5),
        };

        let diags = run(&validator, Dynamic::String("toolong".into()));

        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("maximum length"));
    }

    #[test]
    fn pattern_validator() {
        let validator = StringPatternValidator::create(
            regex::Regex::new(r"^(Create|Read|Update|Delete) .+").unwrap(),
            "a CRUD privilege",
        );

        assert!(run(validator.as_ref(), Dynamic::String("Read Computers".into())).is_empty());
        assert_eq!(
            run(validator.as_ref(), Dynamic::String("Computers".into())).len(),
            1
        );
    }

    #[test]
    fn list_length_validator_rejects_too_many() {
        let validator = ListLengthValidator::at_most(1);
        let value = Dynamic::List(vec![Dynamic::Null, Dynamic::Null]);

        let diags = run(validator.as_ref(), value);
        assert_eq!(diags.len(), 1);
        assert!(diags[0].summary.contains("at most 1"));
    }

    #[test]
    fn each_element_reports_indexed_paths() {
        let validator = EachElement::create(StringOneOfValidator::create(&["a", "b"]));
        let value = Dynamic::List(vec![
            Dynamic::String("a".into()),
            Dynamic::String("z".into()),
            Dynamic::Unknown,
        ]);

        let diags = run(validator.as_ref(), value);
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].attribute,
            Some(AttributePath::new("test_field").index(1))
        );
    }
}
