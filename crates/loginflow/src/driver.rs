//! BrowserDriver - Abstract Browser Control Trait
//!
//! The login flow talks to the browser only through [`BrowserDriver`]. Two
//! implementations exist:
//!
//! - `ChromiumDriver` (feature `browser`): real Chromium over CDP via chromiumoxide
//! - [`MockDriver`]: scripted pages and windows for unit tests and dry runs
//!
//! Element lookups go through [`BrowserDriver::probe`], which reports whether an
//! element is present, visible and enabled. Wait conditions are evaluated on top
//! of that state, so a driver never blocks on its own.

use crate::error::{FlowError, FlowResult};
use crate::locator::Locator;
use crate::session::SessionFactory;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

/// Opaque identifier of a browser window or tab
pub type WindowHandle = String;

/// PNG signature, returned as the mock screenshot payload
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Observable state of an element at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementState {
    /// Element is attached to the DOM
    pub present: bool,
    /// Element is rendered with a non-empty box
    pub visible: bool,
    /// Element is not disabled
    pub enabled: bool,
}

impl ElementState {
    /// No matching element
    pub const ABSENT: Self = Self {
        present: false,
        visible: false,
        enabled: false,
    };

    /// In the DOM but not rendered
    pub const HIDDEN: Self = Self {
        present: true,
        visible: false,
        enabled: true,
    };

    /// Rendered and enabled
    pub const INTERACTABLE: Self = Self {
        present: true,
        visible: true,
        enabled: true,
    };

    /// Rendered but disabled
    pub const DISABLED: Self = Self {
        present: true,
        visible: true,
        enabled: false,
    };

    /// Visible on the page
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.present && self.visible
    }

    /// Visible and enabled, i.e. a click would land
    #[must_use]
    pub const fn is_clickable(&self) -> bool {
        self.present && self.visible && self.enabled
    }
}

/// Abstract driver trait for browser control
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate the active window to URL
    async fn navigate(&mut self, url: &str) -> FlowResult<()>;

    /// Title of the active window
    async fn title(&self) -> FlowResult<String>;

    /// URL of the active window
    async fn current_url(&self) -> FlowResult<String>;

    /// Maximize the browser window
    async fn maximize_window(&mut self) -> FlowResult<()>;

    /// Current state of the element matching the locator
    async fn probe(&self, locator: &Locator) -> FlowResult<ElementState>;

    /// Clear an input element
    async fn clear(&mut self, locator: &Locator) -> FlowResult<()>;

    /// Type text into an element
    async fn type_text(&mut self, locator: &Locator, text: &str) -> FlowResult<()>;

    /// Click an element
    async fn click(&mut self, locator: &Locator) -> FlowResult<()>;

    /// Handle of the active window
    async fn current_window(&self) -> FlowResult<WindowHandle>;

    /// Handles of all open windows, in enumeration order
    async fn window_handles(&self) -> FlowResult<Vec<WindowHandle>>;

    /// Make another window the active one
    async fn switch_to_window(&mut self, handle: &str) -> FlowResult<()>;

    /// PNG capture of the active viewport
    async fn screenshot(&self) -> FlowResult<Vec<u8>>;

    /// Tear the browser down
    async fn close(&mut self) -> FlowResult<()>;
}

// ============================================================================
// Mock driver
// ============================================================================

/// Shared call log of mock drivers
///
/// Clones share the same log, so a test can keep a journal while the driver is
/// moved into a session.
#[derive(Debug, Clone, Default)]
pub struct MockJournal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl MockJournal {
    /// Create an empty journal
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry
    pub fn record(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    /// Snapshot of all entries
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of entries starting with prefix
    #[must_use]
    pub fn count(&self, prefix: &str) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    /// Check if an exact entry was recorded
    #[must_use]
    pub fn contains(&self, entry: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|e| e == entry)
    }
}

/// Element of a mock window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockElement {
    /// Current state
    pub state: ElementState,
    /// Text typed into the element
    pub value: String,
}

/// A scripted window or tab
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockWindow {
    /// Window handle
    pub handle: WindowHandle,
    /// Document title
    pub title: String,
    /// Current URL
    pub url: String,
    /// Elements by locator
    pub elements: HashMap<Locator, MockElement>,
}

impl MockWindow {
    /// Create an empty window
    #[must_use]
    pub fn new(handle: impl Into<WindowHandle>) -> Self {
        Self {
            handle: handle.into(),
            url: "about:blank".to_string(),
            ..Self::default()
        }
    }

    /// Set the title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the URL
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Add an element
    #[must_use]
    pub fn with_element(mut self, locator: Locator, state: ElementState) -> Self {
        let _ = self.elements.insert(
            locator,
            MockElement {
                state,
                value: String::new(),
            },
        );
        self
    }
}

/// Change applied to the mock when a scripted trigger fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockEffect {
    /// Set the active window title
    SetTitle(String),
    /// Set the active window URL
    SetUrl(String),
    /// Insert or update an element of the active window
    Show(Locator, ElementState),
    /// Remove an element from the active window
    Remove(Locator),
    /// Open a new window without switching to it
    OpenWindow(MockWindow),
}

/// Queue consumed through `&self`; a clone copies the remaining entries
#[derive(Debug, Default)]
struct Scripted<T>(Mutex<VecDeque<T>>);

impl<T: Clone> Clone for Scripted<T> {
    fn clone(&self) -> Self {
        Self(Mutex::new(
            self.0.lock().unwrap_or_else(PoisonError::into_inner).clone(),
        ))
    }
}

impl<T> Scripted<T> {
    fn push(&mut self, item: T) {
        self.0
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(item);
    }

    fn pop(&self) -> Option<T> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

/// Mock driver for unit testing and dry runs
///
/// Navigation applies the `on_navigate` effects. Each click on a locator
/// consumes the next batch queued with `on_click` for that locator.
/// Queued title reads and stale probes are served before the page state.
#[derive(Debug, Clone)]
pub struct MockDriver {
    windows: Vec<MockWindow>,
    current: usize,
    navigate_effects: Vec<MockEffect>,
    click_effects: HashMap<Locator, VecDeque<Vec<MockEffect>>>,
    title_reads: Scripted<String>,
    stale_probes: Scripted<()>,
    failing_screenshots: bool,
    maximized: bool,
    closed: bool,
    journal: MockJournal,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// Create a mock with one blank window
    #[must_use]
    pub fn new() -> Self {
        Self {
            windows: vec![MockWindow::new("window-1")],
            current: 0,
            navigate_effects: Vec::new(),
            click_effects: HashMap::new(),
            title_reads: Scripted::default(),
            stale_probes: Scripted::default(),
            failing_screenshots: false,
            maximized: false,
            closed: false,
            journal: MockJournal::new(),
        }
    }

    /// Set the title of the active window
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.windows[self.current].title = title.into();
        self
    }

    /// Add an element to the active window
    #[must_use]
    pub fn with_element(mut self, locator: Locator, state: ElementState) -> Self {
        let _ = self.windows[self.current].elements.insert(
            locator,
            MockElement {
                state,
                value: String::new(),
            },
        );
        self
    }

    /// Add an extra window
    #[must_use]
    pub fn with_window(mut self, window: MockWindow) -> Self {
        self.windows.push(window);
        self
    }

    /// Effect applied on every navigation
    #[must_use]
    pub fn on_navigate(mut self, effect: MockEffect) -> Self {
        self.navigate_effects.push(effect);
        self
    }

    /// Queue a batch of effects for the next click on locator
    #[must_use]
    pub fn on_click(mut self, locator: Locator, effects: Vec<MockEffect>) -> Self {
        self.click_effects
            .entry(locator)
            .or_default()
            .push_back(effects);
        self
    }

    /// Queue titles returned by the next `title` calls, in order
    #[must_use]
    pub fn with_title_reads<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for title in titles {
            self.title_reads.push(title.into());
        }
        self
    }

    /// Fail the next `count` probes as a stale element
    #[must_use]
    pub fn with_stale_probes(mut self, count: usize) -> Self {
        for _ in 0..count {
            self.stale_probes.push(());
        }
        self
    }

    /// Make every screenshot fail
    #[must_use]
    pub fn with_failing_screenshots(mut self) -> Self {
        self.failing_screenshots = true;
        self
    }

    /// Call log
    #[must_use]
    pub fn journal(&self) -> &MockJournal {
        &self.journal
    }

    /// Typed value of an element in the active window
    #[must_use]
    pub fn value_of(&self, locator: &Locator) -> Option<&str> {
        self.windows[self.current]
            .elements
            .get(locator)
            .map(|e| e.value.as_str())
    }

    /// Whether `maximize_window` was called
    #[must_use]
    pub const fn is_maximized(&self) -> bool {
        self.maximized
    }

    /// Whether `close` was called
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> FlowResult<()> {
        if self.closed {
            Err(FlowError::session("session already closed"))
        } else {
            Ok(())
        }
    }

    fn element_mut(&mut self, locator: &Locator) -> FlowResult<&mut MockElement> {
        self.windows[self.current]
            .elements
            .get_mut(locator)
            .filter(|e| e.state.present)
            .ok_or_else(|| FlowError::interaction(locator, "no such element"))
    }

    fn apply(&mut self, effect: MockEffect) {
        let current = self.current;
        match effect {
            MockEffect::SetTitle(title) => self.windows[current].title = title,
            MockEffect::SetUrl(url) => self.windows[current].url = url,
            MockEffect::Show(locator, state) => {
                self.windows[current]
                    .elements
                    .entry(locator)
                    .or_default()
                    .state = state;
            }
            MockEffect::Remove(locator) => {
                let _ = self.windows[current].elements.remove(&locator);
            }
            MockEffect::OpenWindow(new_window) => self.windows.push(new_window),
        }
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(&mut self, url: &str) -> FlowResult<()> {
        self.ensure_open()?;
        self.journal.record(format!("navigate:{url}"));
        self.windows[self.current].url = url.to_string();
        for effect in self.navigate_effects.clone() {
            self.apply(effect);
        }
        Ok(())
    }

    async fn title(&self) -> FlowResult<String> {
        self.ensure_open()?;
        Ok(self
            .title_reads
            .pop()
            .unwrap_or_else(|| self.windows[self.current].title.clone()))
    }

    async fn current_url(&self) -> FlowResult<String> {
        self.ensure_open()?;
        Ok(self.windows[self.current].url.clone())
    }

    async fn maximize_window(&mut self) -> FlowResult<()> {
        self.ensure_open()?;
        self.journal.record("maximize");
        self.maximized = true;
        Ok(())
    }

    async fn probe(&self, locator: &Locator) -> FlowResult<ElementState> {
        self.ensure_open()?;
        if self.stale_probes.pop().is_some() {
            return Err(FlowError::interaction(locator, "stale element reference"));
        }
        Ok(self.windows[self.current]
            .elements
            .get(locator)
            .map_or(ElementState::ABSENT, |e| e.state))
    }

    async fn clear(&mut self, locator: &Locator) -> FlowResult<()> {
        self.ensure_open()?;
        self.journal.record(format!("clear:{locator}"));
        self.element_mut(locator)?.value.clear();
        Ok(())
    }

    async fn type_text(&mut self, locator: &Locator, text: &str) -> FlowResult<()> {
        self.ensure_open()?;
        self.journal.record(format!("type:{locator}:{text}"));
        self.element_mut(locator)?.value.push_str(text);
        Ok(())
    }

    async fn click(&mut self, locator: &Locator) -> FlowResult<()> {
        self.ensure_open()?;
        self.journal.record(format!("click:{locator}"));
        if !self.element_mut(locator)?.state.is_clickable() {
            return Err(FlowError::interaction(locator, "element not interactable"));
        }
        let batch = self
            .click_effects
            .get_mut(locator)
            .and_then(VecDeque::pop_front)
            .unwrap_or_default();
        for effect in batch {
            self.apply(effect);
        }
        Ok(())
    }

    async fn current_window(&self) -> FlowResult<WindowHandle> {
        self.ensure_open()?;
        Ok(self.windows[self.current].handle.clone())
    }

    async fn window_handles(&self) -> FlowResult<Vec<WindowHandle>> {
        self.ensure_open()?;
        Ok(self.windows.iter().map(|w| w.handle.clone()).collect())
    }

    async fn switch_to_window(&mut self, handle: &str) -> FlowResult<()> {
        self.ensure_open()?;
        self.journal.record(format!("switch:{handle}"));
        self.current = self
            .windows
            .iter()
            .position(|w| w.handle == handle)
            .ok_or_else(|| FlowError::session(format!("no such window: {handle}")))?;
        Ok(())
    }

    async fn screenshot(&self) -> FlowResult<Vec<u8>> {
        self.ensure_open()?;
        self.journal.record("screenshot");
        if self.failing_screenshots {
            return Err(FlowError::Screenshot {
                message: "mock screenshot failure".to_string(),
            });
        }
        Ok(PNG_SIGNATURE.to_vec())
    }

    async fn close(&mut self) -> FlowResult<()> {
        self.ensure_open()?;
        self.journal.record("close");
        self.closed = true;
        Ok(())
    }
}

/// Session factory handing out clones of a template [`MockDriver`]
#[derive(Debug, Clone)]
pub struct MockFactory {
    template: MockDriver,
    launch_error: Option<String>,
}

impl MockFactory {
    /// Create a factory from a template
    #[must_use]
    pub fn new(template: MockDriver) -> Self {
        Self {
            template,
            launch_error: None,
        }
    }

    /// Make every launch fail with message
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.launch_error = Some(message.into());
        self
    }

    /// Journal shared by every launched driver
    #[must_use]
    pub fn journal(&self) -> &MockJournal {
        self.template.journal()
    }
}

#[async_trait]
impl SessionFactory for MockFactory {
    type Driver = MockDriver;

    async fn launch(&self) -> FlowResult<MockDriver> {
        if let Some(ref message) = self.launch_error {
            return Err(FlowError::BrowserLaunch {
                message: message.clone(),
            });
        }
        self.template.journal().record("launch");
        Ok(self.template.clone())
    }
}
