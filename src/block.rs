use std::fmt;

use serde::{Deserialize, Serialize};

/// Diagram description language of a fenced diagram block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Mermaid,
    PlantUml,
}

impl Dialect {
    /// Tag used as the fence language and in diagram markers.
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Mermaid => "mermaid",
            Dialect::PlantUml => "plantuml",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "mermaid" => Some(Dialect::Mermaid),
            "plantuml" => Some(Dialect::PlantUml),
            _ => None,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Block-level elements parsed from Markdown.
///
/// Text payloads are raw: inline markup is resolved later, when the block
/// is assembled into document elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Block {
    Heading {
        level: u8,
        text: String,
    },
    Paragraph {
        text: String,
    },
    Code {
        language: Option<String>,
        text: String,
    },
    Diagram {
        dialect: Dialect,
        source: String,
    },
    List {
        ordered: bool,
        items: Vec<String>,
    },
    /// First row is the header.
    Table {
        rows: Vec<Vec<String>>,
    },
    Blockquote {
        text: String,
    },
    Rule,
    Image {
        alt: String,
        target: String,
    },
}

impl Block {
    pub fn kind(&self) -> &'static str {
        match self {
            Block::Heading { .. } => "heading",
            Block::Paragraph { .. } => "paragraph",
            Block::Code { .. } => "code",
            Block::Diagram { .. } => "diagram",
            Block::List { .. } => "list",
            Block::Table { .. } => "table",
            Block::Blockquote { .. } => "blockquote",
            Block::Rule => "rule",
            Block::Image { .. } => "image",
        }
    }

    pub fn is_diagram(&self) -> bool {
        matches!(self, Block::Diagram { .. })
    }
}
