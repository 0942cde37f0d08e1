use serde::Serialize;

/// Inline text spans with formatting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Span {
    Text(String),
    Bold(String),
    Italic(String),
    Code(String),
    Link { text: String, href: String },
}

/// Split a line of text into styled spans.
///
/// Constructs are matched leftmost-first; at a given position bold wins over
/// italic, italic over code, code over links. Matched spans never overlap and
/// everything between them becomes plain text. Always returns at least one
/// span.
pub fn parse(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut plain_start = 0;
    let mut i = 0;

    while i < text.len() {
        if let Some((span, end)) = match_at(text, i) {
            if plain_start < i {
                spans.push(Span::Text(text[plain_start..i].to_string()));
            }
            spans.push(span);
            i = end;
            plain_start = end;
        } else {
            i += text[i..].chars().next().map_or(1, char::len_utf8);
        }
    }

    if plain_start < text.len() {
        spans.push(Span::Text(text[plain_start..].to_string()));
    }
    if spans.is_empty() {
        spans.push(Span::Text(String::new()));
    }
    spans
}

fn match_at(text: &str, at: usize) -> Option<(Span, usize)> {
    bold(text, at)
        .or_else(|| italic(text, at))
        .or_else(|| code(text, at))
        .or_else(|| link(text, at))
}

/// Find `close` in `text[from..]` such that the enclosed content is non-empty
/// and contains no line break. Returns the content end offset.
fn closing(text: &str, from: usize, close: &str) -> Option<usize> {
    let rest = text.get(from..)?;
    let first = rest.chars().next()?;
    if first == '\n' {
        return None;
    }
    // Content must be at least one character long
    let search_from = from + first.len_utf8();
    let offset = text[search_from..].find(close)?;
    let end = search_from + offset;
    if text[from..end].contains('\n') {
        return None;
    }
    Some(end)
}

fn bold(text: &str, at: usize) -> Option<(Span, usize)> {
    let start = at + 2;
    if !text[at..].starts_with("**") {
        return None;
    }
    let end = closing(text, start, "**")?;
    Some((Span::Bold(text[start..end].to_string()), end + 2))
}

fn italic(text: &str, at: usize) -> Option<(Span, usize)> {
    let start = at + 1;
    if !text[at..].starts_with('*') {
        return None;
    }
    let end = closing(text, start, "*")?;
    Some((Span::Italic(text[start..end].to_string()), end + 1))
}

fn code(text: &str, at: usize) -> Option<(Span, usize)> {
    let start = at + 1;
    if !text[at..].starts_with('`') {
        return None;
    }
    let end = closing(text, start, "`")?;
    Some((Span::Code(text[start..end].to_string()), end + 1))
}

fn link(text: &str, at: usize) -> Option<(Span, usize)> {
    if !text[at..].starts_with('[') {
        return None;
    }
    let label_start = at + 1;
    let label_end = closing(text, label_start, "](")?;
    let href_start = label_end + 2;
    let href_end = closing(text, href_start, ")")?;
    Some((
        Span::Link {
            text: text[label_start..label_end].to_string(),
            href: text[href_start..href_end].to_string(),
        },
        href_end + 1,
    ))
}
