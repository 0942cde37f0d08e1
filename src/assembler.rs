//! Turns parsed blocks into document elements.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::block::{Block, Dialect};
use crate::browser::{BrowserLauncher, BrowserSession};
use crate::config::{Config, LayoutConfig};
use crate::diagram::DiagramRenderer;
use crate::document::{Cell, Element, Image, Paragraph, Run, Table};
use crate::inline;
use crate::marker;
use crate::probe;

pub struct Assembler {
    layout: LayoutConfig,
    renderer: DiagramRenderer,
}

impl Assembler {
    pub fn new(config: &Config, launcher: Arc<dyn BrowserLauncher>) -> Self {
        Self {
            layout: config.layout.clone(),
            renderer: DiagramRenderer::new(config.renderer.clone(), launcher),
        }
    }

    /// Convert `blocks` to document elements, in order.
    ///
    /// Relative image targets are resolved against `base_dir`. Diagrams
    /// share one browser session, opened only if the document has at least
    /// one diagram and closed once every block is done. Diagrams and images
    /// that fail to render degrade to text; nothing here aborts the document.
    pub async fn assemble(&self, blocks: &[Block], base_dir: &Path) -> Vec<Element> {
        let mut session = if blocks.iter().any(Block::is_diagram) {
            self.open_session().await
        } else {
            None
        };

        let mut elements = Vec::with_capacity(blocks.len());
        for block in blocks {
            debug!(kind = block.kind(); "Assembling block");
            self.assemble_block(block, base_dir, &mut session, &mut elements)
                .await;
        }

        if let Some(session) = session {
            info!("Closing shared browser session");
            if let Err(err) = self.renderer.close_session(session).await {
                warn!(error:% = err; "Failed to close shared browser session");
            }
        }

        elements
    }

    async fn open_session(&self) -> Option<Box<dyn BrowserSession>> {
        match self.renderer.open_session().await {
            Ok(session) => {
                info!("Opened shared browser session");
                Some(session)
            }
            Err(err) => {
                warn!(error:% = err; "No browser session, diagrams will be kept as text");
                None
            }
        }
    }

    async fn assemble_block(
        &self,
        block: &Block,
        base_dir: &Path,
        session: &mut Option<Box<dyn BrowserSession>>,
        out: &mut Vec<Element>,
    ) {
        match block {
            Block::Heading { level, text } => {
                let mut paragraph = styled(text);
                paragraph.heading = Some(*level);
                out.push(Element::Paragraph(paragraph));
            }
            Block::Paragraph { text } => {
                out.push(Element::Paragraph(styled(text)));
            }
            Block::Blockquote { text } => {
                let mut paragraph = styled(text);
                paragraph.indent = 1;
                paragraph.left_border = true;
                out.push(Element::Paragraph(paragraph));
            }
            Block::Code { text, .. } => {
                out.push(Element::Paragraph(literal(text)));
            }
            Block::Diagram { dialect, source } => {
                out.extend(self.diagram(*dialect, source, session).await);
            }
            Block::List { ordered, items } => {
                for (n, item) in items.iter().enumerate() {
                    let bullet = if *ordered {
                        format!("{}. ", n + 1)
                    } else {
                        "• ".to_string()
                    };
                    let mut runs = vec![Run::plain(bullet)];
                    runs.extend(inline::parse(item).iter().map(Run::from_span));
                    let mut paragraph = Paragraph::new(runs);
                    paragraph.indent = 1;
                    out.push(Element::Paragraph(paragraph));
                }
            }
            Block::Table { rows } => {
                out.push(Element::Table(table(rows)));
            }
            Block::Rule => {
                out.push(Element::Paragraph(Paragraph {
                    bottom_border: true,
                    ..Paragraph::default()
                }));
            }
            Block::Image { alt, target } => {
                out.push(self.image(alt, target, base_dir).await);
            }
        }
    }

    /// Rendered image followed by its marker, or the source as literal text.
    async fn diagram(
        &self,
        dialect: Dialect,
        source: &str,
        session: &mut Option<Box<dyn BrowserSession>>,
    ) -> Vec<Element> {
        let Some(session) = session.as_deref_mut() else {
            return vec![Element::Paragraph(literal(source))];
        };

        match self
            .renderer
            .render_with_session(session, dialect, source)
            .await
        {
            Ok(image) => {
                let marker = marker::encode(dialect, source);
                let (width, height) = self.layout.fit(image.width, image.height);
                vec![
                    Element::Image(Image {
                        data: image.data,
                        width,
                        height,
                        alt: marker.clone(),
                    }),
                    Element::Marker { text: marker },
                ]
            }
            Err(err) => {
                warn!(dialect:% = dialect, error:% = err; "Diagram render failed, keeping source text");
                vec![Element::Paragraph(literal(source))]
            }
        }
    }

    async fn image(&self, alt: &str, target: &str, base_dir: &Path) -> Element {
        let path = resolve(target, base_dir);
        match tokio::fs::read(&path).await {
            Ok(data) => {
                let (width, height) = match probe::probe(&data) {
                    Some(dims) => (dims.width, dims.height),
                    None => (
                        self.layout.default_image_width,
                        self.layout.default_image_height,
                    ),
                };
                let (width, height) = self.layout.fit(width, height);
                Element::Image(Image {
                    data,
                    width,
                    height,
                    alt: alt.to_string(),
                })
            }
            Err(err) => {
                warn!(path = path.display().to_string(), error:% = err; "Image unreadable, using placeholder");
                let label = if alt.is_empty() { target } else { alt };
                Element::Paragraph(Paragraph::new(vec![Run {
                    italic: true,
                    ..Run::plain(format!("[Image: {label}]"))
                }]))
            }
        }
    }
}

fn resolve(target: &str, base_dir: &Path) -> PathBuf {
    let path = Path::new(target);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn styled(text: &str) -> Paragraph {
    Paragraph::from_spans(&inline::parse(text))
}

/// Fixed-width text on a shaded background, no inline markup.
fn literal(text: &str) -> Paragraph {
    let mut paragraph = Paragraph::new(vec![Run {
        monospace: true,
        ..Run::plain(text)
    }]);
    paragraph.shaded = true;
    paragraph
}

fn table(rows: &[Vec<String>]) -> Table {
    let rows = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| Cell {
                    runs: inline::parse(cell).iter().map(Run::from_span).collect(),
                })
                .collect()
        })
        .collect();
    Table {
        rows,
        header_shaded: true,
    }
}
