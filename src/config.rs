//! Configuration management with serde serialization/deserialization
//!
//! This module provides all configuration structures for the screenshot API,
//! including server binding, browser launch settings, capture defaults and
//! metrics export. Every section has a `Default` so a partial JSON file is enough.

use crate::geometry::Viewport;
use crate::ScreenshotError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure for the screenshot API
///
/// # Examples
///
/// ```rust
/// use screenshot_api::{Config, OutputFormat};
///
/// let config = Config::default();
/// assert_eq!(config.capture.default_format, OutputFormat::Jpeg);
/// assert_eq!(config.server.bind.port(), 3000);
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerSettings,

    /// Chrome/Chromium launch settings
    pub browser: BrowserSettings,

    /// Defaults applied to every capture request
    pub capture: CaptureSettings,

    /// Metrics export settings
    pub metrics: MetricsSettings,
}

impl Config {
    /// Check the invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ScreenshotError> {
        if self.capture.viewport.width == 0 || self.capture.viewport.height == 0 {
            return Err(ScreenshotError::ConfigurationError(
                "Viewport dimensions must be greater than 0".to_string(),
            ));
        }

        if self.capture.viewport.width > crate::request::MAX_DIMENSION
            || self.capture.viewport.height > crate::request::MAX_DIMENSION
        {
            return Err(ScreenshotError::ConfigurationError(format!(
                "Viewport dimensions must not exceed {}",
                crate::request::MAX_DIMENSION
            )));
        }

        if self.capture.navigation_timeout.is_zero() {
            return Err(ScreenshotError::ConfigurationError(
                "Navigation timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(quality) = self.capture.jpeg_quality {
            if !(1..=100).contains(&quality) {
                return Err(ScreenshotError::ConfigurationError(format!(
                    "JPEG quality must be between 1 and 100, got {quality}"
                )));
            }
        }

        if self.browser.launch_timeout.is_zero() {
            return Err(ScreenshotError::ConfigurationError(
                "Browser launch timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address the HTTP server listens on (default: 0.0.0.0:3000)
    pub bind: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
        }
    }
}

/// Browser process launch configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Path to Chrome/Chromium executable (default: auto-detect)
    pub chrome_path: Option<String>,

    /// Run without a visible window (default: true)
    pub headless: bool,

    /// How long to wait for the browser process to expose its DevTools endpoint
    pub launch_timeout: Duration,

    /// Custom User-Agent string (default: Chrome default)
    pub user_agent: Option<String>,

    /// Additional command-line flags appended after the built-in ones
    pub extra_args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            launch_timeout: Duration::from_secs(20),
            user_agent: None,
            extra_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Format used when a request does not name one (default: JPEG)
    pub default_format: OutputFormat,

    /// Viewport used when a request omits device dimensions (default: 1920x1080)
    pub viewport: Viewport,

    /// Upper bound for navigation to reach network idle (default: 15 seconds)
    pub navigation_timeout: Duration,

    /// JPEG encoder quality, 1-100 (default: browser default)
    pub jpeg_quality: Option<u8>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            default_format: OutputFormat::Jpeg,
            viewport: Viewport::default(),
            navigation_timeout: Duration::from_secs(15),
            jpeg_quality: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MetricsSettings {
    /// Address for the Prometheus scrape endpoint; disabled when unset
    pub prometheus_listen: Option<SocketAddr>,
}

/// Supported output image formats for screenshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG format - lossless compression
    Png,
    /// JPEG format - lossy compression, smaller files
    Jpeg,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }

    /// Value for the `Content-Disposition` response header.
    pub fn content_disposition(&self) -> String {
        format!("inline; filename=\"screenshot.{}\"", self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "png" => Ok(OutputFormat::Png),
            "jpeg" => Ok(OutputFormat::Jpeg),
            other => Err(format!("unsupported format '{other}', expected png or jpeg")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generate Chrome command-line arguments based on configuration
///
/// The sandbox flags match what containerized deployments need; everything in
/// `extra_args` is appended verbatim.
pub fn get_chrome_args(settings: &BrowserSettings) -> Vec<String> {
    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-setuid-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-gpu".to_string(),
        "--disable-extensions".to_string(),
        "--disable-default-apps".to_string(),
        "--disable-sync".to_string(),
        "--no-first-run".to_string(),
        "--hide-scrollbars".to_string(),
    ];

    if let Some(user_agent) = &settings.user_agent {
        args.push(format!("--user-agent={user_agent}"));
    }

    args.extend(settings.extra_args.iter().cloned());
    args
}

pub fn create_browser_config(
    settings: &BrowserSettings,
) -> Result<chromiumoxide::browser::BrowserConfig, ScreenshotError> {
    use chromiumoxide::browser::BrowserConfig;
    use chromiumoxide::handler::viewport::Viewport as ChromeViewport;

    // Pages get their metrics from Emulation.setDeviceMetricsOverride per request.
    let mut builder = BrowserConfig::builder()
        .no_sandbox()
        .viewport(None::<ChromeViewport>)
        .launch_timeout(settings.launch_timeout)
        .args(get_chrome_args(settings));

    if !settings.headless {
        builder = builder.with_head();
    }

    if let Some(chrome_path) = &settings.chrome_path {
        builder = builder.chrome_executable(chrome_path);
    }

    builder.build().map_err(ScreenshotError::ConfigurationError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.bind, SocketAddr::from(([0, 0, 0, 0], 3000)));
        assert_eq!(config.capture.default_format, OutputFormat::Jpeg);
        assert_eq!(config.capture.viewport, Viewport::new(1920, 1080));
        assert_eq!(config.capture.navigation_timeout, Duration::from_secs(15));
        assert!(config.browser.headless);
        assert!(config.metrics.prometheus_listen.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "capture": { "default_format": "png" }, "server": { "bind": "127.0.0.1:8080" } }"#,
        )
        .unwrap();

        assert_eq!(config.capture.default_format, OutputFormat::Png);
        assert_eq!(config.capture.viewport, Viewport::new(1920, 1080));
        assert_eq!(config.server.bind.port(), 8080);
        assert!(config.browser.chrome_path.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.capture.jpeg_quality = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ScreenshotError::ConfigurationError(_))
        ));

        let mut config = Config::default();
        config.capture.viewport = Viewport::new(0, 1080);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.capture.navigation_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("png".parse::<OutputFormat>(), Ok(OutputFormat::Png));
        assert_eq!("jpeg".parse::<OutputFormat>(), Ok(OutputFormat::Jpeg));
        assert!("jpg".parse::<OutputFormat>().is_err());
        assert!("PNG".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(
            OutputFormat::Png.content_disposition(),
            "inline; filename=\"screenshot.png\""
        );
    }

    #[test]
    fn test_chrome_args_generation() {
        let settings = BrowserSettings {
            user_agent: Some("screenshot-api/0.1".to_string()),
            extra_args: vec!["--lang=en-US".to_string()],
            ..Default::default()
        };
        let args = get_chrome_args(&settings);

        assert!(args.contains(&"--no-sandbox".to_string()));
        assert!(args.contains(&"--disable-setuid-sandbox".to_string()));
        assert!(args.contains(&"--user-agent=screenshot-api/0.1".to_string()));
        assert_eq!(args.last(), Some(&"--lang=en-US".to_string()));
    }
}
