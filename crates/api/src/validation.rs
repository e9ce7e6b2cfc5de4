//! Request body validation.
//!
//! DTOs implement [`Validate`] by chaining [`Rules`]; handlers receive them
//! through [`ValidatedJson`], which answers malformed JSON with 400 and rule
//! failures with 400 plus the field map.

use std::fmt::Display;
use std::sync::LazyLock;

use axum::Json;
use axum::extract::{FromRequest, Request};
use base64::{Engine, engine::general_purpose::STANDARD};
use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, FieldErrors};

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid email regex pattern")
});

static IMAGE_ENCODING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^image/(png|jpg|jpeg)$").expect("Invalid image encoding regex pattern")
});

/// A request body that can check itself.
pub trait Validate {
    fn validate(&self) -> Result<(), FieldErrors>;
}

/// Collects the first failure of each field.
#[derive(Debug, Default)]
pub struct Rules {
    errors: FieldErrors,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(mut self, field: &str, reason: impl Into<String>) -> Self {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| reason.into());
        self
    }

    fn check(self, field: &str, ok: bool, reason: impl Into<String>) -> Self {
        if ok { self } else { self.fail(field, reason) }
    }

    pub fn required(self, field: &str, value: &str) -> Self {
        self.check(field, !value.is_empty(), "is required")
    }

    pub fn not_blank(self, field: &str, value: &str) -> Self {
        self.check(field, !value.trim().is_empty(), "must not be blank")
    }

    /// Length in characters, inclusive bounds.
    pub fn length(self, field: &str, value: &str, min: usize, max: usize) -> Self {
        let len = value.chars().count();
        self.check(
            field,
            (min..=max).contains(&len),
            format!("must be between {min} and {max} characters"),
        )
    }

    pub fn starts_with_letter(self, field: &str, value: &str) -> Self {
        let ok = value.chars().next().is_some_and(char::is_alphabetic);
        self.check(field, ok, "must start with a letter")
    }

    pub fn email(self, field: &str, value: &str) -> Self {
        self.check(field, EMAIL.is_match(value), "must be a valid email address")
    }

    pub fn min<T: PartialOrd + Display>(self, field: &str, value: T, min: T) -> Self {
        let reason = format!("must be at least {min}");
        self.check(field, value >= min, reason)
    }

    /// Inclusive numeric range.
    pub fn range<T: PartialOrd + Display>(self, field: &str, value: T, min: T, max: T) -> Self {
        let reason = format!("must be between {min} and {max}");
        self.check(field, value >= min && value <= max, reason)
    }

    pub fn image_encoding(self, field: &str, value: &str) -> Self {
        self.check(
            field,
            IMAGE_ENCODING.is_match(value),
            "must be one of image/png, image/jpg, image/jpeg",
        )
    }

    pub fn base64(self, field: &str, value: &str) -> Self {
        let ok = STANDARD.decode(value.trim()).is_ok();
        self.check(field, ok, "must be base64 encoded")
    }

    /// Merges the failures of a nested body under `prefix.field` keys.
    pub fn nested(mut self, prefix: &str, result: Result<(), FieldErrors>) -> Self {
        if let Err(errors) = result {
            for (field, reason) in errors {
                self = self.fail(&format!("{prefix}.{field}"), reason);
            }
        }
        self
    }

    pub fn finish(self) -> Result<(), FieldErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// JSON extractor that runs [`Validate`] before the handler sees the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
        value.validate().map_err(ApiError::Validation)?;
        Ok(ValidatedJson(value))
    }
}
