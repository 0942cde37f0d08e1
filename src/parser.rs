use crate::block::{Block, Dialect};

/// Upper bound on lines folded into a single paragraph.
const MAX_PARAGRAPH_LINES: usize = 1000;

/// Parse markdown text into a list of blocks.
///
/// Single forward pass over the lines. Constructs are tried in a fixed
/// order at each line; anything unrecognized becomes paragraph text.
pub fn parse(markdown: &str) -> Vec<Block> {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if line.trim().is_empty() {
            i += 1;
            continue;
        }

        if let Some(block) = heading(line) {
            blocks.push(block);
            i += 1;
        } else if is_rule(line) {
            blocks.push(Block::Rule);
            i += 1;
        } else if is_fence(line) {
            let (block, next) = fenced(&lines, i);
            blocks.push(block);
            i = next;
        } else if is_blockquote(line) {
            let (block, next) = blockquote(&lines, i);
            blocks.push(block);
            i = next;
        } else if let Some(kind) = list_kind(line) {
            let (block, next) = list(&lines, i, kind);
            blocks.push(block);
            i = next;
        } else if starts_table(&lines, i) {
            let (block, next) = table(&lines, i);
            blocks.push(block);
            i = next;
        } else if let Some(block) = image(line) {
            blocks.push(block);
            i += 1;
        } else {
            let (block, next) = paragraph(&lines, i);
            blocks.push(block);
            i = next;
        }
    }

    blocks
}

fn heading(line: &str) -> Option<Block> {
    let level = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &line[level..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let text = rest.trim();
    if text.is_empty() {
        return None;
    }
    Some(Block::Heading {
        level: level as u8,
        text: text.to_string(),
    })
}

fn is_rule(line: &str) -> bool {
    let trimmed = line.trim_end();
    let Some(first) = trimmed.chars().next() else {
        return false;
    };
    matches!(first, '-' | '*' | '_') && trimmed.len() >= 3 && trimmed.chars().all(|c| c == first)
}

fn is_fence(line: &str) -> bool {
    line.starts_with("```")
}

fn is_closing_fence(line: &str) -> bool {
    line.trim().starts_with("```")
}

fn fenced(lines: &[&str], start: usize) -> (Block, usize) {
    let language = lines[start][3..].trim().to_lowercase();
    let mut i = start + 1;
    let mut body = Vec::new();
    while i < lines.len() && !is_closing_fence(lines[i]) {
        body.push(lines[i]);
        i += 1;
    }
    // Skip the closing fence; an unterminated fence runs to end of input.
    let next = (i + 1).min(lines.len());
    let text = body.join("\n");

    let block = if language == "mermaid" {
        Block::Diagram {
            dialect: Dialect::Mermaid,
            source: text,
        }
    } else if language == "plantuml" || language == "uml" || has_uml_envelope(&text) {
        Block::Diagram {
            dialect: Dialect::PlantUml,
            source: text,
        }
    } else {
        Block::Code {
            language: (!language.is_empty()).then_some(language),
            text,
        }
    };
    (block, next)
}

fn has_uml_envelope(text: &str) -> bool {
    match (text.find("@startuml"), text.rfind("@enduml")) {
        (Some(start), Some(end)) => start < end,
        _ => false,
    }
}

fn is_blockquote(line: &str) -> bool {
    line.starts_with('>')
}

fn blockquote(lines: &[&str], start: usize) -> (Block, usize) {
    let mut i = start;
    let mut parts = Vec::new();
    while i < lines.len() && is_blockquote(lines[i]) {
        let rest = &lines[i][1..];
        parts.push(rest.strip_prefix(' ').unwrap_or(rest));
        i += 1;
    }
    let text = parts.join(" ").trim().to_string();
    (Block::Blockquote { text }, i)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Unordered,
    Ordered,
}

fn list_kind(line: &str) -> Option<ListKind> {
    list_item(line).map(|(kind, _)| kind)
}

/// Classify a list line and return the item text after its bullet.
fn list_item(line: &str) -> Option<(ListKind, &str)> {
    let trimmed = line.trim_start();
    let mut chars = trimmed.chars();
    match chars.next()? {
        '-' | '*' | '+' => trimmed[1..]
            .strip_prefix([' ', '\t'])
            .map(|rest| (ListKind::Unordered, rest.trim())),
        '0'..='9' => {
            let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
            trimmed[digits..]
                .strip_prefix('.')?
                .strip_prefix([' ', '\t'])
                .map(|rest| (ListKind::Ordered, rest.trim()))
        }
        _ => None,
    }
}

fn list(lines: &[&str], start: usize, kind: ListKind) -> (Block, usize) {
    let mut i = start;
    let mut items = Vec::new();
    while i < lines.len() {
        match list_item(lines[i]) {
            Some((k, text)) if k == kind => items.push(text.to_string()),
            _ => break,
        }
        i += 1;
    }
    let block = Block::List {
        ordered: kind == ListKind::Ordered,
        items,
    };
    (block, i)
}

fn starts_table(lines: &[&str], i: usize) -> bool {
    lines[i].contains('|') && lines.get(i + 1).is_some_and(|next| is_table_separator(next))
}

/// A separator row holds only `-`, `:`, `|` and whitespace, with every run
/// of dashes at least three long.
fn is_table_separator(line: &str) -> bool {
    if !line.contains('|') || !line.contains('-') {
        return false;
    }
    if !line
        .chars()
        .all(|c| matches!(c, '-' | ':' | '|') || c.is_whitespace())
    {
        return false;
    }
    line.split(|c| c != '-')
        .filter(|run| !run.is_empty())
        .all(|run| run.len() >= 3)
}

fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);
    trimmed.split('|').map(|cell| cell.trim().to_string()).collect()
}

fn table(lines: &[&str], start: usize) -> (Block, usize) {
    let mut rows = vec![split_cells(lines[start])];
    // Header, then the separator row which carries no content.
    let mut i = start + 2;
    while i < lines.len() && lines[i].contains('|') {
        rows.push(split_cells(lines[i]));
        i += 1;
    }
    (Block::Table { rows }, i)
}

fn image(line: &str) -> Option<Block> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix("![")?.strip_suffix(')')?;
    let split = inner.find("](")?;
    let target = &inner[split + 2..];
    // The closing paren must be the one that ends the line
    if target.contains(')') {
        return None;
    }
    Some(Block::Image {
        alt: inner[..split].to_string(),
        target: target.to_string(),
    })
}

/// Whether the line at `i` would open any non-paragraph construct.
fn starts_construct(lines: &[&str], i: usize) -> bool {
    let line = lines[i];
    heading(line).is_some()
        || is_rule(line)
        || is_fence(line)
        || is_blockquote(line)
        || list_kind(line).is_some()
        || starts_table(lines, i)
        || image(line).is_some()
}

fn paragraph(lines: &[&str], start: usize) -> (Block, usize) {
    let mut parts = vec![lines[start]];
    let mut i = start + 1;
    while i < lines.len()
        && parts.len() < MAX_PARAGRAPH_LINES
        && !lines[i].trim().is_empty()
        && !starts_construct(lines, i)
    {
        parts.push(lines[i]);
        i += 1;
    }
    let text = parts.join(" ").trim().to_string();
    (Block::Paragraph { text }, i)
}
