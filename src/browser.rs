//! Shared browser process and per-request browsing contexts
//!
//! One Chrome process is launched at startup and lives until shutdown. Every
//! request gets its own isolated browser context (a separate cookie and storage
//! jar, like a private window) which is disposed when the request finishes.

use crate::config::{create_browser_config, BrowserSettings};
use crate::geometry::Viewport;
use crate::ScreenshotError;
use chromiumoxide::browser::Browser;
use chromiumoxide::cdp::browser_protocol::browser::{BrowserContextId, CloseParams};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
    GetBrowserContextsParams,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const HANDLER_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Handle to the single long-lived browser process
///
/// All request-path methods take `&self`; the browser isolates concurrent
/// contexts on its own, so no lock is held while a capture runs.
pub struct BrowserSession {
    browser: Arc<Browser>,
    /// Background task handling Chrome DevTools Protocol communication
    handler: Mutex<Option<tokio::task::JoinHandle<()>>>,
    /// Cleared by the handler task when the DevTools connection ends
    connected: Arc<AtomicBool>,
    is_shutting_down: AtomicBool,
}

impl BrowserSession {
    /// Launch the browser process. Failure here must abort startup.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, ScreenshotError> {
        let config = create_browser_config(settings)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScreenshotError::BrowserLaunchFailed(e.to_string()))?;

        let connected = Arc::new(AtomicBool::new(true));
        let handler_connected = connected.clone();

        // The handler implements Stream and must be polled for the browser to make progress
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {}", e);
                }
            }
            handler_connected.store(false, Ordering::Release);
            warn!("Browser handler stream ended");
        });

        let session = Self {
            browser: Arc::new(browser),
            handler: Mutex::new(Some(handler_task)),
            connected,
            is_shutting_down: AtomicBool::new(false),
        };

        match session.browser.version().await {
            Ok(version) => info!("Browser launched: {}", version.product),
            Err(e) => {
                session.shutdown().await;
                return Err(ScreenshotError::BrowserLaunchFailed(format!(
                    "browser did not answer version query: {e}"
                )));
            }
        }

        Ok(session)
    }

    /// Whether the process is running and accepting new contexts.
    pub fn is_available(&self) -> bool {
        !self.is_shutting_down.load(Ordering::Acquire) && self.connected.load(Ordering::Acquire)
    }

    /// Create a fresh isolated browsing context.
    pub async fn open_context(&self) -> Result<BrowsingContext, ScreenshotError> {
        if !self.is_available() {
            return Err(ScreenshotError::BrowserUnavailable);
        }

        let response = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| context_error(self.connected.load(Ordering::Acquire), e))?;

        let id = response.result.browser_context_id;
        metrics::gauge!("screenshot_active_contexts").increment(1.0);
        debug!("Opened browser context {:?}", id);

        Ok(BrowsingContext {
            id: Some(id),
            browser: self.browser.clone(),
        })
    }

    /// Number of browsing contexts the browser currently holds, default context excluded.
    pub async fn context_count(&self) -> Result<usize, ScreenshotError> {
        let response = self.browser.execute(GetBrowserContextsParams::default()).await?;
        Ok(response.result.browser_context_ids.len())
    }

    /// Close the browser process; later `open_context` calls fail.
    pub async fn shutdown(&self) {
        if self.is_shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Shutting down browser session...");

        if let Err(e) = self.browser.execute(CloseParams::default()).await {
            warn!("Browser did not acknowledge close: {}", e);
        }

        if let Some(mut handler) = self.handler.lock().await.take() {
            if tokio::time::timeout(HANDLER_SHUTDOWN_GRACE, &mut handler)
                .await
                .is_err()
            {
                warn!("Browser handler still running after close, aborting");
                handler.abort();
            }
        }

        info!("Browser session shutdown complete");
    }
}

/// One isolated browser context, disposed when the guard is closed or dropped
pub struct BrowsingContext {
    id: Option<BrowserContextId>,
    browser: Arc<Browser>,
}

impl BrowsingContext {
    /// Open a blank page in this context sized to `viewport`.
    pub async fn new_page(&self, viewport: Viewport) -> Result<Page, ScreenshotError> {
        let id = self.id.clone().ok_or(ScreenshotError::BrowserUnavailable)?;

        let mut target = CreateTargetParams::new("about:blank");
        target.browser_context_id = Some(id);

        let page = self
            .browser
            .new_page(target)
            .await
            .map_err(|e| ScreenshotError::Chrome(format!("failed to open page: {e}")))?;

        let metrics = SetDeviceMetricsOverrideParams::builder()
            .width(viewport.width)
            .height(viewport.height)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(ScreenshotError::Chrome)?;

        page.execute(metrics).await?;
        Ok(page)
    }

    /// Dispose the context and every page in it.
    pub async fn close(mut self) {
        if let Some(id) = self.id.take() {
            dispose(&self.browser, id).await;
        }
    }
}

impl Drop for BrowsingContext {
    fn drop(&mut self) {
        // Reached when the request future is cancelled before `close` ran.
        let Some(id) = self.id.take() else {
            return;
        };
        let browser = self.browser.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    dispose(&browser, id).await;
                });
            }
            Err(_) => warn!("No runtime to dispose browser context {:?}", id),
        }
    }
}

/// A failed `createBrowserContext` only means the browser is gone once the connection is.
fn context_error(connected: bool, err: impl std::fmt::Display) -> ScreenshotError {
    if connected {
        warn!("Failed to create browser context: {}", err);
        ScreenshotError::Chrome(format!("failed to create browser context: {err}"))
    } else {
        error!("Browser connection lost while creating context: {}", err);
        ScreenshotError::BrowserUnavailable
    }
}

async fn dispose(browser: &Browser, id: BrowserContextId) {
    metrics::gauge!("screenshot_active_contexts").decrement(1.0);

    match browser.execute(DisposeBrowserContextParams::new(id.clone())).await {
        Ok(_) => debug!("Disposed browser context {:?}", id),
        Err(e) => warn!("Failed to dispose browser context {:?}: {}", id, e),
    }
}
