//! Real browser control over the Chrome `DevTools` Protocol.
//!
//! Only compiled with the `browser` feature. Each [`ChromiumDriver`] owns one
//! Chromium process with its own temporary profile directory, removed when the
//! driver is dropped.

use crate::config::BrowserOptions;
use crate::driver::{BrowserDriver, ElementState, WindowHandle};
use crate::error::{FlowError, FlowResult};
use crate::locator::Locator;
use crate::session::SessionFactory;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    Bounds, GetWindowForTargetParams, SetWindowBoundsParams, WindowState,
};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::sync::Mutex;

const CLEAR_FN: &str =
    "function() { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); }";

fn session_error(e: impl std::fmt::Display) -> FlowError {
    FlowError::session(e.to_string())
}

// Script failures while a page is replaced are retried by waits; transport
// failures end the session.
fn probe_error(locator: &Locator, e: CdpError) -> FlowError {
    match e {
        CdpError::Chrome(_) | CdpError::JavascriptException(_) | CdpError::NotFound => {
            FlowError::interaction(locator, e.to_string())
        }
        other => session_error(other),
    }
}

/// Chromium instance driven over CDP
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: Mutex<CdpBrowser>,
    page: CdpPage,
    handler: tokio::task::JoinHandle<()>,
    profile: TempDir,
    closed: bool,
}

impl ChromiumDriver {
    /// Launch Chromium with a fresh profile and open a blank page
    pub async fn launch(options: &BrowserOptions) -> FlowResult<Self> {
        let profile = tempfile::Builder::new()
            .prefix("loginflow-profile-")
            .tempdir()
            .map_err(|e| FlowError::BrowserLaunch {
                message: format!("cannot create profile directory: {e}"),
            })?;

        let mut builder = CdpConfig::builder()
            .user_data_dir(profile.path())
            .window_size(options.window_width, options.window_height)
            .viewport(None);

        if !options.headless {
            builder = builder.with_head();
        }
        if !options.sandbox {
            builder = builder.no_sandbox();
        }
        for arg in options.extra_args() {
            builder = builder.arg(arg);
        }
        if let Some(ref path) = options.chromium_path {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder
            .build()
            .map_err(|message| FlowError::BrowserLaunch { message })?;

        let (browser, mut handler) =
            CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| FlowError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| FlowError::BrowserLaunch {
                message: e.to_string(),
            })?;

        tracing::debug!(profile = %profile.path().display(), "chromium launched");
        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            profile,
            closed: false,
        })
    }

    fn ensure_open(&self) -> FlowResult<()> {
        if self.closed {
            Err(FlowError::session("session already closed"))
        } else {
            Ok(())
        }
    }

    async fn element(&self, locator: &Locator) -> FlowResult<Element> {
        let found = match locator {
            Locator::XPath(expr) => self.page.find_xpath(expr.as_str()).await,
            other => {
                let css = other.to_css().unwrap_or_default();
                self.page.find_element(css).await
            }
        };
        found.map_err(|e| FlowError::interaction(locator, e.to_string()))
    }

    async fn pages(&self) -> FlowResult<Vec<CdpPage>> {
        self.browser.lock().await.pages().await.map_err(session_error)
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn navigate(&mut self, url: &str) -> FlowResult<()> {
        self.ensure_open()?;
        self.page
            .goto(url)
            .await
            .map_err(|e| FlowError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn title(&self) -> FlowResult<String> {
        self.ensure_open()?;
        Ok(self
            .page
            .get_title()
            .await
            .map_err(session_error)?
            .unwrap_or_default())
    }

    async fn current_url(&self) -> FlowResult<String> {
        self.ensure_open()?;
        Ok(self
            .page
            .url()
            .await
            .map_err(session_error)?
            .unwrap_or_default())
    }

    async fn maximize_window(&mut self) -> FlowResult<()> {
        self.ensure_open()?;
        let window = self
            .page
            .execute(
                GetWindowForTargetParams::builder()
                    .target_id(self.page.target_id().clone())
                    .build(),
            )
            .await
            .map_err(session_error)?;
        let bounds = Bounds::builder().window_state(WindowState::Maximized).build();
        self.page
            .execute(SetWindowBoundsParams::new(window.window_id.clone(), bounds))
            .await
            .map_err(session_error)?;
        Ok(())
    }

    async fn probe(&self, locator: &Locator) -> FlowResult<ElementState> {
        self.ensure_open()?;
        let raw: String = self
            .page
            .evaluate(locator.to_state_script())
            .await
            .map_err(|e| probe_error(locator, e))?
            .into_value()?;
        Ok(serde_json::from_str(&raw)?)
    }

    async fn clear(&mut self, locator: &Locator) -> FlowResult<()> {
        self.ensure_open()?;
        self.element(locator)
            .await?
            .call_js_fn(CLEAR_FN, false)
            .await
            .map_err(|e| FlowError::interaction(locator, e.to_string()))?;
        Ok(())
    }

    async fn type_text(&mut self, locator: &Locator, text: &str) -> FlowResult<()> {
        self.ensure_open()?;
        let element = self.element(locator).await?;
        element
            .focus()
            .await
            .map_err(|e| FlowError::interaction(locator, e.to_string()))?
            .type_str(text)
            .await
            .map_err(|e| FlowError::interaction(locator, e.to_string()))?;
        Ok(())
    }

    async fn click(&mut self, locator: &Locator) -> FlowResult<()> {
        self.ensure_open()?;
        self.element(locator)
            .await?
            .click()
            .await
            .map_err(|e| FlowError::interaction(locator, e.to_string()))?;
        Ok(())
    }

    async fn current_window(&self) -> FlowResult<WindowHandle> {
        self.ensure_open()?;
        Ok(self.page.target_id().inner().clone())
    }

    async fn window_handles(&self) -> FlowResult<Vec<WindowHandle>> {
        self.ensure_open()?;
        Ok(self
            .pages()
            .await?
            .iter()
            .map(|page| page.target_id().inner().clone())
            .collect())
    }

    async fn switch_to_window(&mut self, handle: &str) -> FlowResult<()> {
        self.ensure_open()?;
        let page = self
            .pages()
            .await?
            .into_iter()
            .find(|page| page.target_id().inner() == handle)
            .ok_or_else(|| FlowError::session(format!("no such window: {handle}")))?;
        page.bring_to_front().await.map_err(session_error)?;
        self.page = page;
        Ok(())
    }

    async fn screenshot(&self) -> FlowResult<Vec<u8>> {
        self.ensure_open()?;
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let screenshot = self
            .page
            .execute(params)
            .await
            .map_err(|e| FlowError::Screenshot {
                message: e.to_string(),
            })?;

        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(&screenshot.data)
            .map_err(|e| FlowError::Screenshot {
                message: e.to_string(),
            })
    }

    async fn close(&mut self) -> FlowResult<()> {
        self.ensure_open()?;
        self.closed = true;
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(session_error)?;
        browser.wait().await.map_err(session_error)?;
        self.handler.abort();
        tracing::debug!(profile = %self.profile.path().display(), "chromium closed");
        Ok(())
    }
}

/// Launches one [`ChromiumDriver`] per session
#[derive(Debug, Clone, Default)]
pub struct ChromiumFactory {
    options: BrowserOptions,
}

impl ChromiumFactory {
    /// Create a factory
    #[must_use]
    pub const fn new(options: BrowserOptions) -> Self {
        Self { options }
    }

    /// Launch options
    #[must_use]
    pub const fn options(&self) -> &BrowserOptions {
        &self.options
    }
}

#[async_trait]
impl SessionFactory for ChromiumFactory {
    type Driver = ChromiumDriver;

    async fn launch(&self) -> FlowResult<ChromiumDriver> {
        ChromiumDriver::launch(&self.options).await
    }
}
