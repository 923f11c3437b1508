//! Screenshot capture pipeline
//!
//! Given a URL and [`ResolvedOptions`], opens an isolated browsing context,
//! navigates until the network settles, waits the requested delay and captures
//! the image. The context is disposed on every exit path.

use crate::browser::{BrowserSession, BrowsingContext};
use crate::config::OutputFormat;
use crate::geometry::{Clip, ResolvedOptions};
use crate::ScreenshotError;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, EventLifecycleEvent, NavigateParams, SetLifecycleEventsEnabledParams,
    Viewport as ClipRect,
};
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, info_span, Instrument};
use url::Url;

/// Lifecycle event Chrome emits once a frame has had no network activity for 500ms.
const NETWORK_IDLE_EVENT: &str = "networkIdle";

/// Capability that turns a URL and resolved options into encoded image bytes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScreenshotBackend: Send + Sync {
    async fn capture(&self, url: &Url, options: &ResolvedOptions) -> Result<Vec<u8>, ScreenshotError>;

    /// Whether new captures can currently be served.
    fn is_available(&self) -> bool;
}

/// Browser-backed [`ScreenshotBackend`]
pub struct ScreenshotCapturer {
    session: Arc<BrowserSession>,
    navigation_timeout: Duration,
}

impl ScreenshotCapturer {
    pub fn new(session: Arc<BrowserSession>, navigation_timeout: Duration) -> Self {
        Self {
            session,
            navigation_timeout,
        }
    }

    async fn capture_in_context(
        &self,
        context: &BrowsingContext,
        url: &Url,
        options: &ResolvedOptions,
    ) -> Result<Vec<u8>, ScreenshotError> {
        let page = context.new_page(options.viewport).await?;

        match timeout(self.navigation_timeout, navigate_until_idle(&page, url)).await {
            Ok(result) => result?,
            Err(_) => return Err(ScreenshotError::NavigationTimeout(self.navigation_timeout)),
        }

        if !options.delay.is_zero() {
            debug!("Waiting {:?} before capture", options.delay);
            sleep(options.delay).await;
        }

        page.screenshot(screenshot_params(options))
            .await
            .map_err(|e| ScreenshotError::CaptureFailure(e.to_string()))
    }
}

#[async_trait]
impl ScreenshotBackend for ScreenshotCapturer {
    async fn capture(&self, url: &Url, options: &ResolvedOptions) -> Result<Vec<u8>, ScreenshotError> {
        ensure_capturable(options)?;

        let span = info_span!(
            "capture",
            request_id = %uuid::Uuid::new_v4(),
            url = %url,
            format = %options.format,
        );

        async move {
            let start_time = Instant::now();

            let context = self.session.open_context().await.map_err(|e| {
                if matches!(e, ScreenshotError::BrowserUnavailable) {
                    metrics::counter!("browser_unavailable_total").increment(1);
                    error!(alarm = true, "Browser session unavailable");
                }
                e
            })?;

            let result = self.capture_in_context(&context, url, options).await;
            context.close().await;

            let elapsed = start_time.elapsed();
            metrics::histogram!("screenshot_capture_seconds").record(elapsed.as_secs_f64());

            match &result {
                Ok(data) => info!("Captured {} bytes in {:?}", data.len(), elapsed),
                Err(e) => info!("Capture failed after {:?}: {}", elapsed, e),
            }
            result
        }
        .instrument(span)
        .await
    }

    fn is_available(&self) -> bool {
        self.session.is_available()
    }
}

/// Reject options the browser cannot capture, before any context is opened.
pub fn ensure_capturable(options: &ResolvedOptions) -> Result<(), ScreenshotError> {
    match options.clip {
        Some(clip) if clip.is_empty() => Err(ScreenshotError::CaptureFailure(format!(
            "clip rectangle at ({}, {}) has no area inside the {}x{} viewport",
            clip.x, clip.y, options.viewport.width, options.viewport.height
        ))),
        Some(clip) if !clip.fits_within(&options.viewport) => Err(ScreenshotError::CaptureFailure(
            "clip rectangle exceeds the viewport".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Navigate `page` to `url` and wait for the navigation's network-idle event.
async fn navigate_until_idle(page: &Page, url: &Url) -> Result<(), ScreenshotError> {
    page.execute(SetLifecycleEventsEnabledParams::new(true)).await?;
    // Subscribe first so the idle event of a fast page cannot be missed.
    let mut lifecycle = page.event_listener::<EventLifecycleEvent>().await?;

    let navigation = page.execute(NavigateParams::new(url.as_str())).await?.result;
    if let Some(error_text) = navigation.error_text {
        return Err(ScreenshotError::NavigationFailed(error_text));
    }

    while let Some(event) = lifecycle.next().await {
        let same_navigation = navigation
            .loader_id
            .as_ref()
            .map_or(true, |loader_id| *loader_id == event.loader_id);

        if event.name == NETWORK_IDLE_EVENT && event.frame_id == navigation.frame_id && same_navigation
        {
            return Ok(());
        }
    }

    Err(ScreenshotError::BrowserUnavailable)
}

fn screenshot_params(options: &ResolvedOptions) -> ScreenshotParams {
    let mut builder = ScreenshotParams::builder().format(cdp_format(options.format));

    if let Some(quality) = options.quality {
        builder = builder.quality(i64::from(quality));
    }

    builder = match options.clip {
        Some(clip) => builder.clip(clip_rect(clip)),
        None => builder.full_page(true),
    };

    builder.build()
}

fn cdp_format(format: OutputFormat) -> CaptureScreenshotFormat {
    match format {
        OutputFormat::Png => CaptureScreenshotFormat::Png,
        OutputFormat::Jpeg => CaptureScreenshotFormat::Jpeg,
    }
}

fn clip_rect(clip: Clip) -> ClipRect {
    ClipRect {
        x: f64::from(clip.x),
        y: f64::from(clip.y),
        width: f64::from(clip.width),
        height: f64::from(clip.height),
        scale: 1.0,
    }
}
