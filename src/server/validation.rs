use axum::extract::FromRequest;

use crate::availability::{parse_date, parse_time};
use crate::server::response::{ApiError, FieldError};

/// JSON body extractor whose rejections use the API error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Collects field errors so a response can report all of them at once.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Character-count bounds, inclusive. `min_message` replaces the
    /// generic message for values that are too short.
    pub fn length(
        &mut self,
        field: &str,
        value: &str,
        min: usize,
        max: usize,
        min_message: Option<&str>,
    ) {
        let len = value.chars().count();
        if len < min {
            let message = min_message
                .map(str::to_string)
                .unwrap_or_else(|| format!("Must be at least {min} characters"));
            self.error(field, message);
        } else if len > max {
            self.error(field, format!("Must be at most {max} characters"));
        }
    }

    /// Like [`Validator::length`] for a field that must be present.
    pub fn required(
        &mut self,
        field: &str,
        value: Option<&str>,
        min: usize,
        max: usize,
        min_message: &str,
    ) {
        match value {
            Some(v) => self.length(field, v, min, max, Some(min_message)),
            None => self.error(field, "Required"),
        }
    }

    pub fn max_length(&mut self, field: &str, value: Option<&str>, max: usize) {
        if let Some(v) = value {
            self.length(field, v, 0, max, None);
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        if !is_valid_email(value) {
            self.error(field, "Invalid email address");
        }
    }

    pub fn one_of(&mut self, field: &str, value: Option<&str>, allowed: &[&str]) {
        match value {
            Some(v) if allowed.contains(&v) => {}
            Some(_) => self.error(
                field,
                format!("Must be one of: {}", allowed.join(", ")),
            ),
            None => self.error(field, "Required"),
        }
    }

    pub fn date_time(&mut self, field: &str, value: Option<&str>) {
        let valid = value
            .and_then(|v| v.split_once(' '))
            .is_some_and(|(date, time)| parse_date(date).is_ok() && parse_time(time).is_ok());
        if !valid {
            self.error(field, "Date/time must be in format: YYYY-MM-DD HH:MM");
        }
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(self.errors))
        }
    }
}

#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        && !domain.ends_with('.')
        && !domain.contains("..")
}
