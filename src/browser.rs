//! Headless browser collaborator.
//!
//! The renderer only needs a small slice of browser automation: load an
//! HTML string, wait for a selector, measure an element, and take a clipped
//! screenshot. Hosts plug in a real automation backend by implementing these
//! traits.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("page operation failed: {0}")]
    Page(String),

    #[error("screenshot failed: {0}")]
    Screenshot(String),
}

/// A rectangle in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// A running browser. Each render opens its own page.
#[async_trait]
pub trait BrowserSession: Send {
    async fn new_page(&mut self) -> Result<Box<dyn BrowserPage>, BrowserError>;

    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

#[async_trait]
pub trait BrowserPage: Send {
    async fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), BrowserError>;

    async fn set_content(&mut self, html: &str) -> Result<(), BrowserError>;

    /// Resolves once an element matches `selector`. May never resolve; callers
    /// bound it with their own timeout.
    async fn wait_for_selector(&mut self, selector: &str) -> Result<(), BrowserError>;

    async fn bounding_box(&mut self, selector: &str) -> Result<Option<Rect>, BrowserError>;

    /// PNG bytes of the page region `clip`.
    async fn screenshot(&mut self, clip: Rect) -> Result<Vec<u8>, BrowserError>;

    async fn close(self: Box<Self>) -> Result<(), BrowserError>;
}

/// Launcher for environments without browser automation. Every launch
/// fails, so diagrams degrade to their source text.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableBrowser;

#[async_trait]
impl BrowserLauncher for UnavailableBrowser {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        Err(BrowserError::Launch(
            "no browser automation backend configured".to_string(),
        ))
    }
}
