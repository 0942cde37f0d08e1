//! Scripted browser collaborators and document helpers shared by the
//! integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mdocx::browser::{BrowserError, BrowserLauncher, BrowserPage, BrowserSession, Rect};
use mdocx::document::{Element, Paragraph, Run};

/// What a page does once content is loaded into it.
#[derive(Debug, Clone)]
pub enum PageScript {
    /// The diagram appears; bounding boxes are served in order and the last
    /// one repeats.
    Render(Vec<Rect>),
    /// The ready selector never matches.
    Hang,
    /// The ready selector matches but the element has no box.
    Missing,
    /// Waiting for the selector fails outright.
    Fail,
    /// The diagram renders but the screenshot never arrives.
    StallScreenshot,
}

/// Everything the fake browser was asked to do.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    pub launches: usize,
    pub sessions_closed: usize,
    pub pages_opened: usize,
    pub pages_closed: usize,
    pub viewports: Vec<(u32, u32)>,
    pub contents: Vec<String>,
    pub selectors: Vec<String>,
    pub clips: Vec<Rect>,
}

#[derive(Clone)]
pub struct FakeBrowser {
    journal: Arc<Mutex<Journal>>,
    pages: Arc<Mutex<VecDeque<PageScript>>>,
    default: PageScript,
    fail_launch: bool,
    stall_launch: bool,
}

impl FakeBrowser {
    /// Every page follows `default`.
    pub fn new(default: PageScript) -> Self {
        Self {
            journal: Arc::default(),
            pages: Arc::default(),
            default,
            fail_launch: false,
            stall_launch: false,
        }
    }

    /// Pages render a 300x200 diagram at (16, 16).
    pub fn rendering() -> Self {
        Self::new(PageScript::Render(vec![rect(16.0, 16.0, 300.0, 200.0)]))
    }

    pub fn failing_launch() -> Self {
        Self {
            fail_launch: true,
            ..Self::rendering()
        }
    }

    pub fn stalling_launch() -> Self {
        Self {
            stall_launch: true,
            ..Self::rendering()
        }
    }

    /// Pages opened in order follow `scripts`, then fall back to the default.
    pub fn with_pages(self, scripts: Vec<PageScript>) -> Self {
        *self.pages.lock().unwrap() = scripts.into();
        self
    }

    pub fn launcher(&self) -> Arc<dyn BrowserLauncher> {
        Arc::new(self.clone())
    }

    pub fn journal(&self) -> Journal {
        self.journal.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserLauncher for FakeBrowser {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        self.journal.lock().unwrap().launches += 1;
        if self.stall_launch {
            return std::future::pending().await;
        }
        if self.fail_launch {
            return Err(BrowserError::Launch("scripted launch failure".to_string()));
        }
        Ok(Box::new(FakeSession {
            browser: self.clone(),
        }))
    }
}

struct FakeSession {
    browser: FakeBrowser,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn new_page(&mut self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        self.browser.journal.lock().unwrap().pages_opened += 1;
        let script = self
            .browser
            .pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.browser.default.clone());
        Ok(Box::new(FakePage {
            journal: self.browser.journal.clone(),
            script,
            boxes_served: 0,
        }))
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.browser.journal.lock().unwrap().sessions_closed += 1;
        Ok(())
    }
}

struct FakePage {
    journal: Arc<Mutex<Journal>>,
    script: PageScript,
    boxes_served: usize,
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn set_viewport(&mut self, width: u32, height: u32) -> Result<(), BrowserError> {
        self.journal.lock().unwrap().viewports.push((width, height));
        Ok(())
    }

    async fn set_content(&mut self, html: &str) -> Result<(), BrowserError> {
        self.journal.lock().unwrap().contents.push(html.to_string());
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str) -> Result<(), BrowserError> {
        self.journal
            .lock()
            .unwrap()
            .selectors
            .push(selector.to_string());
        match self.script {
            PageScript::Hang => std::future::pending().await,
            PageScript::Fail => Err(BrowserError::Page("scripted page failure".to_string())),
            PageScript::Render(_) | PageScript::Missing | PageScript::StallScreenshot => Ok(()),
        }
    }

    async fn bounding_box(&mut self, _selector: &str) -> Result<Option<Rect>, BrowserError> {
        let boxes = match &self.script {
            PageScript::Render(boxes) => boxes,
            PageScript::StallScreenshot => return Ok(Some(rect(16.0, 16.0, 300.0, 200.0))),
            _ => return Ok(None),
        };
        let index = self.boxes_served.min(boxes.len().saturating_sub(1));
        self.boxes_served += 1;
        Ok(boxes.get(index).copied())
    }

    async fn screenshot(&mut self, clip: Rect) -> Result<Vec<u8>, BrowserError> {
        self.journal.lock().unwrap().clips.push(clip);
        if matches!(self.script, PageScript::StallScreenshot) {
            return std::future::pending().await;
        }
        Ok(png(
            clip.width.round() as u32,
            clip.height.round() as u32,
        ))
    }

    async fn close(self: Box<Self>) -> Result<(), BrowserError> {
        self.journal.lock().unwrap().pages_closed += 1;
        Ok(())
    }
}

pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Rect {
    Rect {
        x,
        y,
        width,
        height,
    }
}

/// Signature and IHDR chunk of a PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
    bytes.extend_from_slice(&[0; 4]);
    bytes
}

/// HTML the way a document-to-HTML extractor presents generated elements:
/// images keep their alt text, hidden markers stay in a hidden span, and
/// literal paragraphs come out preformatted.
pub fn to_html(elements: &[Element]) -> String {
    let mut html = String::new();
    for element in elements {
        match element {
            Element::Paragraph(paragraph) => html.push_str(&paragraph_html(paragraph)),
            Element::Table(table) => {
                html.push_str("<table>");
                for (i, row) in table.rows.iter().enumerate() {
                    let tag = if i == 0 { "th" } else { "td" };
                    html.push_str("<tr>");
                    for cell in row {
                        html.push_str(&format!("<{tag}>{}</{tag}>", runs_html(&cell.runs)));
                    }
                    html.push_str("</tr>");
                }
                html.push_str("</table>");
            }
            Element::Image(image) => html.push_str(&format!(
                "<p><img src=\"image.png\" alt=\"{}\" /></p>",
                escape(&image.alt)
            )),
            Element::Marker { text } => html.push_str(&format!(
                "<p><span style=\"display:none\">{}</span></p>",
                escape(text)
            )),
        }
        html.push('\n');
    }
    html
}

fn paragraph_html(paragraph: &Paragraph) -> String {
    if let Some(level) = paragraph.heading {
        return format!("<h{level}>{}</h{level}>", runs_html(&paragraph.runs));
    }
    if paragraph.shaded {
        return format!("<pre><code>{}</code></pre>", escape(&paragraph.text()));
    }
    if paragraph.bottom_border && paragraph.runs.is_empty() {
        return "<hr />".to_string();
    }
    if paragraph.left_border {
        return format!(
            "<blockquote><p>{}</p></blockquote>",
            runs_html(&paragraph.runs)
        );
    }
    format!("<p>{}</p>", runs_html(&paragraph.runs))
}

fn runs_html(runs: &[Run]) -> String {
    runs.iter()
        .map(|run| {
            let mut text = escape(&run.text);
            if run.monospace {
                text = format!("<code>{text}</code>");
            }
            if run.italic {
                text = format!("<em>{text}</em>");
            }
            if run.bold {
                text = format!("<strong>{text}</strong>");
            }
            if let Some(href) = &run.link {
                text = format!("<a href=\"{}\">{text}</a>", escape(href));
            }
            text
        })
        .collect()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
