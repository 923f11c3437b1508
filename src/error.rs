use crate::request::ValidationErrors;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ScreenshotError {
    #[error("Invalid input: {0}")]
    InvalidInput(ValidationErrors),

    #[error("Navigation did not settle within {0:?}")]
    NavigationTimeout(Duration),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Browser instance unavailable")]
    BrowserUnavailable,

    #[error("Screenshot capture failed: {0}")]
    CaptureFailure(String),

    #[error("Browser launch failed: {0}")]
    BrowserLaunchFailed(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Chrome error: {0}")]
    Chrome(String),
}

impl ScreenshotError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ScreenshotError::InvalidInput(_) => ErrorSeverity::Low,
            ScreenshotError::NavigationTimeout(_) | ScreenshotError::NavigationFailed(_) => {
                ErrorSeverity::Medium
            }
            ScreenshotError::CaptureFailure(_) | ScreenshotError::Chrome(_) => ErrorSeverity::High,
            ScreenshotError::ConfigurationError(_) => ErrorSeverity::High,
            // The shared process is gone or closing; every request fails until restart.
            ScreenshotError::BrowserUnavailable | ScreenshotError::BrowserLaunchFailed(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    /// Stable machine-readable code used in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ScreenshotError::InvalidInput(_) => "invalid_input",
            ScreenshotError::NavigationTimeout(_) => "navigation_timeout",
            ScreenshotError::NavigationFailed(_) => "navigation_failed",
            ScreenshotError::BrowserUnavailable => "browser_unavailable",
            ScreenshotError::CaptureFailure(_) => "capture_failure",
            ScreenshotError::BrowserLaunchFailed(_) => "browser_launch_failed",
            ScreenshotError::ConfigurationError(_) => "configuration_error",
            ScreenshotError::Chrome(_) => "chrome_error",
        }
    }

    /// Label used for the outcome dimension of request metrics.
    pub fn metric_label(&self) -> &'static str {
        match self {
            ScreenshotError::InvalidInput(_) => "invalid_input",
            ScreenshotError::NavigationTimeout(_) => "timeout",
            ScreenshotError::NavigationFailed(_) => "navigation",
            ScreenshotError::BrowserUnavailable | ScreenshotError::BrowserLaunchFailed(_) => {
                "browser"
            }
            _ => "capture",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl From<chromiumoxide::error::CdpError> for ScreenshotError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        ScreenshotError::Chrome(err.to_string())
    }
}

impl From<ValidationErrors> for ScreenshotError {
    fn from(errors: ValidationErrors) -> Self {
        ScreenshotError::InvalidInput(errors)
    }
}
