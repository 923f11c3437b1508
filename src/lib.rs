//! # Screenshot API
//!
//! An HTTP service that renders a web page in headless Chrome and returns the
//! captured image. One browser process is shared by the whole service; every
//! request runs in its own isolated browser context which is disposed as soon
//! as the request finishes, successfully or not.
//!
//! ## Request pipeline
//!
//! | Stage | Module | Responsibility |
//! |-------|--------|----------------|
//! | Validation | [`request`] | Typed, range-checked query parameters |
//! | Geometry | [`geometry`] | Viewport defaults and clip clamping |
//! | Session | [`browser`] | Shared browser process, per-request contexts |
//! | Capture | [`capture`] | Navigate, wait for network idle, delay, capture |
//! | HTTP | [`http`] | `GET /api/screenshot` and `GET /health` |
//!
//! ## Query parameters
//!
//! | Parameter | Range | Default |
//! |-----------|-------|---------|
//! | `url` | absolute `http`/`https` URL | required |
//! | `format` | `png`, `jpeg` | `jpeg` (configurable) |
//! | `device_width`, `device_height` | 1-3840 | 1920x1080 |
//! | `clip_x`, `clip_y` | 0-3840 | 0 |
//! | `clip_width`, `clip_height` | 1-3840 | viewport size |
//! | `delay` | 0-30000 ms | 0 |
//!
//! Supplying any clip parameter captures that rectangle, clamped to the
//! viewport; otherwise the full scrollable page is captured.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use screenshot_api::{build_router, AppState, BrowserSession, Config, ScreenshotCapturer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let session = Arc::new(BrowserSession::launch(&config.browser).await?);
//!     let capturer = ScreenshotCapturer::new(session.clone(), config.capture.navigation_timeout);
//!     let router = build_router(AppState::new(Arc::new(capturer), config.capture.clone()));
//!
//!     let listener = tokio::net::TcpListener::bind(config.server.bind).await?;
//!     axum::serve(listener, router).await?;
//!
//!     session.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ```bash
//! curl -o page.png 'http://localhost:3000/api/screenshot?url=https%3A%2F%2Fexample.com&format=png'
//! ```

/// Shared browser process and per-request browsing contexts
pub mod browser;

/// Screenshot capture pipeline and the backend trait the HTTP layer depends on
pub mod capture;

/// Command-line interface
pub mod cli;

/// Configuration and settings
pub mod config;

/// Error types
pub mod error;

/// Viewport and clip resolution
pub mod geometry;

/// HTTP routes and error responses
pub mod http;

/// Query parameter validation
pub mod request;

/// Logging and metrics installation
pub mod telemetry;


pub use browser::*;
pub use capture::*;
pub use cli::*;
pub use config::*;
pub use error::*;
pub use geometry::*;
pub use http::*;
pub use request::*;
pub use telemetry::*;
