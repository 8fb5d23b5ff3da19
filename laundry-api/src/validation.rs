//! Field-level input validation.
//!
//! Every violation found in a payload is collected and reported in one
//! response rather than failing on the first error.

use chrono::{DateTime, Utc};
use common_http_errors::{ApiError, FieldError};

#[derive(Debug, Default)]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Consumes the collector; `Err(ApiError::Validation)` when anything was
    /// recorded.
    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }

    pub fn str_len(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            if min <= 1 {
                self.push(field, format!("{field} cannot be empty."));
            } else {
                self.push(field, format!("{field} must be at least {min} characters long."));
            }
        } else if len > max {
            self.push(field, format!("{field} can be at most {max} characters long."));
        }
    }

    pub fn one_of(&mut self, field: &str, value: &str, allowed: &[&str]) {
        if !allowed.contains(&value) {
            self.push(
                field,
                format!("{field} must be one of: {}.", allowed.join(", ")),
            );
        }
    }

    pub fn positive_i32(&mut self, field: &str, value: i32) {
        if value <= 0 {
            self.push(field, format!("{field} must be a positive number."));
        }
    }

    pub fn positive_i64(&mut self, field: &str, value: i64) {
        if value <= 0 {
            self.push(field, format!("{field} must be a positive number."));
        }
    }

    pub fn non_negative_i32(&mut self, field: &str, value: i32) {
        if value < 0 {
            self.push(field, format!("{field} must be non-negative."));
        }
    }

    pub fn non_negative_f64(&mut self, field: &str, value: f64) {
        if !(value >= 0.0) {
            self.push(field, format!("{field} must be non-negative."));
        }
    }

    /// Percentage clamped to [0, 100].
    pub fn percentage(&mut self, field: &str, value: f64) {
        self.non_negative_f64(field, value);
        if value > 100.0 {
            self.push(field, format!("{field} cannot exceed 100%."));
        }
    }

    // The require_* helpers validate presence and hand the value back; on a
    // missing field they record the violation and return a placeholder, which
    // never escapes because finish() fails.

    pub fn require_str(
        &mut self,
        field: &str,
        value: Option<&str>,
        min: usize,
        max: usize,
    ) -> String {
        match value {
            Some(s) => {
                self.str_len(field, s, min, max);
                s.to_string()
            }
            None => {
                self.push(field, format!("{field} is required."));
                String::new()
            }
        }
    }

    pub fn require_one_of(&mut self, field: &str, value: Option<&str>, allowed: &[&str]) -> String {
        match value {
            Some(s) => {
                self.one_of(field, s, allowed);
                s.to_string()
            }
            None => {
                self.push(field, format!("{field} is required."));
                String::new()
            }
        }
    }

    pub fn require_positive_i32(&mut self, field: &str, value: Option<i32>) -> i32 {
        match value {
            Some(v) => {
                self.positive_i32(field, v);
                v
            }
            None => {
                self.push(field, format!("{field} is required."));
                0
            }
        }
    }

    pub fn require_positive_i64(&mut self, field: &str, value: Option<i64>) -> i64 {
        match value {
            Some(v) => {
                self.positive_i64(field, v);
                v
            }
            None => {
                self.push(field, format!("{field} is required."));
                0
            }
        }
    }

    pub fn require_non_negative_i32(&mut self, field: &str, value: Option<i32>) -> i32 {
        match value {
            Some(v) => {
                self.non_negative_i32(field, v);
                v
            }
            None => {
                self.push(field, format!("{field} is required."));
                0
            }
        }
    }

    pub fn require_non_negative_f64(&mut self, field: &str, value: Option<f64>) -> f64 {
        match value {
            Some(v) => {
                self.non_negative_f64(field, v);
                v
            }
            None => {
                self.push(field, format!("{field} is required."));
                0.0
            }
        }
    }

    pub fn require_percentage(&mut self, field: &str, value: Option<f64>) -> f64 {
        match value {
            Some(v) => {
                self.percentage(field, v);
                v
            }
            None => {
                self.push(field, format!("{field} is required."));
                0.0
            }
        }
    }

    pub fn require_date(
        &mut self,
        field: &str,
        value: Option<DateTime<Utc>>,
    ) -> DateTime<Utc> {
        match value {
            Some(v) => v,
            None => {
                self.push(field, format!("{field} is required."));
                DateTime::<Utc>::UNIX_EPOCH
            }
        }
    }
}
