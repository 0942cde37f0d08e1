mod assembler;
mod block;
mod config;
mod error;
mod parser;

pub mod browser;
pub mod diagram;
pub mod document;
pub mod inline;
pub mod marker;
pub mod plantuml;
pub mod probe;
pub mod reverse;

pub use assembler::Assembler;
pub use block::{Block, Dialect};
pub use config::{Config, ConfigError, LayoutConfig, RendererConfig};
pub use error::Error;

use std::path::Path;
use std::sync::Arc;

use browser::BrowserLauncher;
use document::Element;

/// Parse markdown text into a vector of blocks.
pub fn parse(markdown: &str) -> Vec<Block> {
    parser::parse(markdown)
}

/// Convert markdown to document elements.
///
/// Relative image paths resolve against `base_dir`. Diagrams are rendered
/// through browser sessions from `launcher`; any that cannot be rendered
/// are kept as literal text.
pub async fn markdown_to_elements(
    markdown: &str,
    base_dir: &Path,
    config: &Config,
    launcher: Arc<dyn BrowserLauncher>,
) -> Vec<Element> {
    let blocks = parse(markdown);
    Assembler::new(config, launcher)
        .assemble(&blocks, base_dir)
        .await
}

/// Recover markdown from the HTML rendition of a generated document,
/// restoring diagram sources from their markers.
pub fn markdown_from_html(html: &str) -> String {
    reverse::to_markdown(html)
}
