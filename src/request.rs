//! Query parameter validation
//!
//! Converts the raw strings of a `/api/screenshot` query into a typed
//! [`ScreenshotRequest`]. Validation is exhaustive: every offending field is
//! reported, in the order the fields are declared below.

use crate::config::{CaptureSettings, OutputFormat};
use crate::geometry::{resolve, GeometryInput, ResolvedOptions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::time::Duration;
use url::Url;

/// Largest accepted device or clip dimension, in pixels.
pub const MAX_DIMENSION: u32 = 3840;

/// Longest accepted post-load delay, in milliseconds.
pub const MAX_DELAY_MS: u32 = 30_000;

const DIMENSION_RANGE: RangeInclusive<u32> = 1..=MAX_DIMENSION;
const OFFSET_RANGE: RangeInclusive<u32> = 0..=MAX_DIMENSION;
const DELAY_RANGE: RangeInclusive<u32> = 0..=MAX_DELAY_MS;

/// Query parameters exactly as received
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawScreenshotQuery {
    pub url: Option<String>,
    pub format: Option<String>,
    pub device_width: Option<String>,
    pub device_height: Option<String>,
    pub clip_x: Option<String>,
    pub clip_y: Option<String>,
    pub clip_width: Option<String>,
    pub clip_height: Option<String>,
    pub delay: Option<String>,
}

/// One rejected query parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

impl FieldError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Every violation found in a query, never empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Wrap collected violations, or `None` if there are none.
    pub fn new(errors: Vec<FieldError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    /// The violation reported as the headline of the HTTP error.
    pub fn representative(&self) -> &FieldError {
        // Both constructors reject an empty list.
        &self.0[0]
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|error| error.field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|error| error.field == field)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FieldError> {
        self.0.iter()
    }
}

impl From<FieldError> for ValidationErrors {
    fn from(error: FieldError) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", error.field, error.reason)?;
        }
        Ok(())
    }
}

/// Typed, range-checked screenshot request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotRequest {
    pub url: Url,
    pub format: Option<OutputFormat>,
    pub geometry: GeometryInput,
    pub delay: Duration,
}

impl ScreenshotRequest {
    /// Validate every field of `raw`, collecting all violations.
    pub fn validate(raw: &RawScreenshotQuery) -> Result<Self, ValidationErrors> {
        let mut errors = Vec::new();

        let url = match parse_url(raw.url.as_deref()) {
            Ok(url) => Some(url),
            Err(reason) => {
                errors.push(FieldError::new("url", reason));
                None
            }
        };

        let format = match raw.format.as_deref().map(str::parse::<OutputFormat>) {
            None => None,
            Some(Ok(format)) => Some(format),
            Some(Err(reason)) => {
                errors.push(FieldError::new("format", reason));
                None
            }
        };

        let mut integer = |field: &'static str, value: &Option<String>, range: RangeInclusive<u32>| {
            match parse_bounded(value.as_deref(), &range) {
                Ok(parsed) => parsed,
                Err(reason) => {
                    errors.push(FieldError::new(field, reason));
                    None
                }
            }
        };

        let geometry = GeometryInput {
            device_width: integer("device_width", &raw.device_width, DIMENSION_RANGE),
            device_height: integer("device_height", &raw.device_height, DIMENSION_RANGE),
            clip_x: integer("clip_x", &raw.clip_x, OFFSET_RANGE),
            clip_y: integer("clip_y", &raw.clip_y, OFFSET_RANGE),
            clip_width: integer("clip_width", &raw.clip_width, DIMENSION_RANGE),
            clip_height: integer("clip_height", &raw.clip_height, DIMENSION_RANGE),
        };
        let delay_ms = integer("delay", &raw.delay, DELAY_RANGE).unwrap_or(0);

        if let Some(errors) = ValidationErrors::new(errors) {
            return Err(errors);
        }
        let Some(url) = url else {
            return Err(FieldError::new("url", "is required").into());
        };

        Ok(Self {
            url,
            format,
            geometry,
            delay: Duration::from_millis(u64::from(delay_ms)),
        })
    }

    /// Apply capture defaults and geometry rules.
    pub fn resolve(&self, defaults: &CaptureSettings) -> ResolvedOptions {
        resolve(&self.geometry, self.format, self.delay, defaults)
    }
}

fn parse_url(value: Option<&str>) -> Result<Url, String> {
    let value = match value {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Err("is required".to_string()),
    };

    let url = Url::parse(value).map_err(|err| format!("is not a valid URL ({err})"))?;


    match url.scheme() {
        "http" | "https" => {}
        other => return Err(format!("scheme '{other}' is not allowed, expected http or https")),
    }

    // The parser repairs `http:host` into `http://host`; only the explicit form is accepted.
    let after_scheme = value.trim_start().get(url.scheme().len() + 1..).unwrap_or("");
    if !after_scheme.starts_with("//") {
        return Err("must start with http:// or https://".to_string());
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err("must include a host".to_string());
    }

    Ok(url)
}

fn parse_bounded(value: Option<&str>, range: &RangeInclusive<u32>) -> Result<Option<u32>, String> {
    let Some(value) = value else {
        return Ok(None);
    };

    let out_of_range = || {
        format!(
            "must be an integer between {} and {}",
            range.start(),
            range.end()
        )
    };

    // i64 so that negative input reports a range violation like any other bound.
    let parsed: i64 = value.parse().map_err(|_| out_of_range())?;
    u32::try_from(parsed)
        .ok()
        .filter(|parsed| range.contains(parsed))
        .map(Some)
        .ok_or_else(out_of_range)
}
