//! Rasterizes diagram source by loading it into a headless browser page and
//! screenshotting the rendered element.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;

use crate::block::Dialect;
use crate::browser::{BrowserError, BrowserLauncher, BrowserPage, BrowserSession, Rect};
use crate::config::RendererConfig;
use crate::plantuml;
use crate::probe;

const MERMAID_READY: &str = "#diagram svg";
const PLANTUML_READY: &str = "#diagram.loaded";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no browser session available: {0}")]
    NoSession(#[source] BrowserError),

    #[error("timed out after {after:?} waiting for `{selector}`")]
    Timeout {
        selector: &'static str,
        after: Duration,
    },

    #[error("browser stalled for {after:?} during {operation}")]
    Stalled {
        operation: &'static str,
        after: Duration,
    },

    #[error("rendered element `{0}` has no bounding box")]
    ElementNotFound(&'static str),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// A rendered diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramImage {
    /// PNG bytes.
    pub data: Vec<u8>,
    /// Device pixels.
    pub width: u32,
    pub height: u32,
}

/// Every call into the browser goes through here, so a collaborator that
/// never answers costs at most `after` per call.
async fn bounded<T>(
    operation: &'static str,
    after: Duration,
    call: impl Future<Output = Result<T, BrowserError>>,
) -> Result<T, RenderError> {
    match tokio::time::timeout(after, call).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(RenderError::Stalled { operation, after }),
    }
}

pub struct DiagramRenderer {
    config: RendererConfig,
    launcher: Arc<dyn BrowserLauncher>,
}

impl DiagramRenderer {
    pub fn new(config: RendererConfig, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self { config, launcher }
    }

    /// Launch a browser session, bounded by the render timeout.
    pub async fn open_session(&self) -> Result<Box<dyn BrowserSession>, RenderError> {
        let after = self.config.timeout();
        match tokio::time::timeout(after, self.launcher.launch()).await {
            Ok(result) => result.map_err(RenderError::NoSession),
            Err(_) => Err(RenderError::Stalled {
                operation: "launch",
                after,
            }),
        }
    }

    pub async fn close_session(
        &self,
        session: Box<dyn BrowserSession>,
    ) -> Result<(), RenderError> {
        bounded("session close", self.config.timeout(), session.close()).await
    }

    /// Render one diagram.
    ///
    /// With `session` the render runs in a fresh page of that session, which
    /// is left open. Without one, a session is launched for this render and
    /// closed afterwards.
    pub async fn render(
        &self,
        dialect: Dialect,
        source: &str,
        session: Option<&mut dyn BrowserSession>,
    ) -> Result<DiagramImage, RenderError> {
        if let Some(session) = session {
            return self.render_with_session(session, dialect, source).await;
        }

        let mut own = self.open_session().await?;
        let result = self.render_with_session(own.as_mut(), dialect, source).await;
        if let Err(err) = self.close_session(own).await {
            warn!(error:% = err; "Failed to close browser session");
        }
        result
    }

    /// Render one diagram in a fresh page of `session`. The page is closed
    /// afterwards, the session is not.
    pub async fn render_with_session(
        &self,
        session: &mut dyn BrowserSession,
        dialect: Dialect,
        source: &str,
    ) -> Result<DiagramImage, RenderError> {
        let after = self.config.timeout();
        let mut page = bounded("page open", after, session.new_page()).await?;
        let result = self.capture(page.as_mut(), dialect, source).await;
        if let Err(err) = bounded("page close", after, page.close()).await {
            warn!(error:% = err; "Failed to close browser page");
        }
        result
    }

    async fn capture(
        &self,
        page: &mut dyn BrowserPage,
        dialect: Dialect,
        source: &str,
    ) -> Result<DiagramImage, RenderError> {
        let html = page_html(&self.config, dialect, source);
        let selector = ready_selector(dialect);
        let padding = f64::from(self.config.padding);

        let viewport = (self.config.viewport_width, self.config.viewport_height);
        let mut bounds = self.load(page, &html, selector, viewport).await?;

        let needed = required_viewport(bounds, padding);
        if needed.0 > viewport.0 || needed.1 > viewport.1 {
            debug!(width = needed.0, height = needed.1; "Diagram exceeds viewport, re-rendering");
            bounds = self.load(page, &html, selector, needed).await?;
        }

        let clip = clip_rect(bounds, padding);
        let data = bounded("screenshot", self.config.timeout(), page.screenshot(clip)).await?;
        let (width, height) = match probe::probe(&data) {
            Some(dims) => (dims.width, dims.height),
            None => (clip.width.round() as u32, clip.height.round() as u32),
        };
        Ok(DiagramImage {
            data,
            width,
            height,
        })
    }

    /// Load `html` at the given viewport and measure the rendered diagram.
    async fn load(
        &self,
        page: &mut dyn BrowserPage,
        html: &str,
        selector: &'static str,
        (width, height): (u32, u32),
    ) -> Result<Rect, RenderError> {
        let after = self.config.timeout();
        bounded("viewport resize", after, page.set_viewport(width, height)).await?;

        let ready = async {
            page.set_content(html).await?;
            page.wait_for_selector(selector).await?;
            Ok::<_, BrowserError>(())
        };
        match tokio::time::timeout(after, ready).await {
            Ok(result) => result?,
            Err(_) => return Err(RenderError::Timeout { selector, after }),
        }

        bounded("bounding box", after, page.bounding_box(selector))
            .await?
            .ok_or(RenderError::ElementNotFound(selector))
    }
}

fn ready_selector(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Mermaid => MERMAID_READY,
        Dialect::PlantUml => PLANTUML_READY,
    }
}

/// Self-contained page that renders `source`.
pub fn page_html(config: &RendererConfig, dialect: Dialect, source: &str) -> String {
    let body = match dialect {
        Dialect::Mermaid => format!(
            "<div id=\"diagram\" class=\"mermaid\">{}</div>\n\
             <script>mermaid.initialize({{ startOnLoad: true, securityLevel: 'loose' }});</script>",
            html_escape::encode_text(source)
        ),
        Dialect::PlantUml => format!(
            "<img id=\"diagram\" src=\"{}\" \
             onload=\"if (this.naturalWidth > 0) this.classList.add('loaded')\">",
            html_escape::encode_double_quoted_attribute(&plantuml::url(
                &config.plantuml_server,
                &config.plantuml_format,
                source
            ))
        ),
    };
    let head_script = match dialect {
        Dialect::Mermaid => format!(
            "<script src=\"{}\"></script>\n",
            html_escape::encode_double_quoted_attribute(&config.mermaid_script)
        ),
        Dialect::PlantUml => String::new(),
    };
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <style>body {{ margin: 0; padding: 16px; background: white; }}</style>\n\
         {head_script}</head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}

/// Smallest viewport that shows `bounds` plus padding without clipping.
fn required_viewport(bounds: Rect, padding: f64) -> (u32, u32) {
    (
        (bounds.x + bounds.width + padding).ceil().max(1.0) as u32,
        (bounds.y + bounds.height + padding).ceil().max(1.0) as u32,
    )
}

/// Screenshot region: `bounds` grown by `padding` on every side, never
/// starting at negative coordinates and never smaller than one pixel.
fn clip_rect(bounds: Rect, padding: f64) -> Rect {
    Rect {
        x: (bounds.x - padding).max(0.0),
        y: (bounds.y - padding).max(0.0),
        width: (bounds.width + padding * 2.0).max(1.0),
        height: (bounds.height + padding * 2.0).max(1.0),
    }
}
