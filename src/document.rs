//! Word-processor document elements produced by the assembler.
//!
//! The file writer itself lives outside this crate: it receives the ordered
//! element list through a [`DocumentSink`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Serialize, Serializer};

use crate::inline::Span;

/// A run of uniformly styled text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub monospace: bool,
    pub link: Option<String>,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn from_span(span: &Span) -> Self {
        match span {
            Span::Text(text) => Self::plain(text.clone()),
            Span::Bold(text) => Self {
                bold: true,
                ..Self::plain(text.clone())
            },
            Span::Italic(text) => Self {
                italic: true,
                ..Self::plain(text.clone())
            },
            Span::Code(text) => Self {
                monospace: true,
                ..Self::plain(text.clone())
            },
            Span::Link { text, href } => Self {
                link: Some(href.clone()),
                ..Self::plain(text.clone())
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    /// Heading level 1-6, if this is a heading.
    pub heading: Option<u8>,
    /// Left indent in levels.
    pub indent: u8,
    pub left_border: bool,
    pub bottom_border: bool,
    pub shaded: bool,
}

impl Paragraph {
    pub fn new(runs: Vec<Run>) -> Self {
        Self {
            runs,
            ..Self::default()
        }
    }

    pub fn from_spans(spans: &[Span]) -> Self {
        Self::new(spans.iter().map(Run::from_span).collect())
    }

    /// Concatenated text of every run.
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub runs: Vec<Run>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    /// First row is the header.
    pub rows: Vec<Vec<Cell>>,
    pub header_shaded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    #[serde(serialize_with = "as_base64")]
    pub data: Vec<u8>,
    /// Display size in pixels.
    pub width: u32,
    pub height: u32,
    pub alt: String,
}

fn as_base64<T: AsRef<[u8]>, S: Serializer>(
    data: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(data.as_ref()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Paragraph(Paragraph),
    Table(Table),
    Image(Image),
    /// Hidden-text paragraph holding a diagram marker.
    Marker { text: String },
}

/// External document writer.
pub trait DocumentSink {
    type Error: std::error::Error;

    fn write(&mut self, elements: &[Element]) -> Result<Vec<u8>, Self::Error>;
}

/// Writes the element list as JSON, the hand-off format for external
/// document writers.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSink {
    pub pretty: bool,
}

impl DocumentSink for JsonSink {
    type Error = serde_json::Error;

    fn write(&mut self, elements: &[Element]) -> Result<Vec<u8>, Self::Error> {
        if self.pretty {
            serde_json::to_vec_pretty(elements)
        } else {
            serde_json::to_vec(elements)
        }
    }
}
