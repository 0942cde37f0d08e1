//! Recovers Markdown from the HTML rendition of a generated document.
//!
//! Diagram markers are pulled out first, before any tag stripping or entity
//! decoding touches them, and replaced by placeholders. The rest of the HTML
//! is converted by tag substitution, and the placeholders are finally swapped
//! for fenced blocks.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::marker;

/// Private-use delimiter for placeholders; survives every substitution below.
const PLACEHOLDER: char = '\u{E000}';

static IMG_OR_HIDDEN_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    let wrapper = r"(?:span|em|i|s|del|u|font|small)";
    Regex::new(&format!(
        r"(?is)<img\b[^>]*>|<p\b[^>]*>(?:\s|<{wrapper}\b[^>]*>)*({})(?:\s|</{wrapper}\s*>)*</p>",
        marker::pattern().as_str()
    ))
    .expect("marker extraction regex is valid")
});
static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\b([a-z-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("ATTR regex is valid")
});
static PRE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<pre\b[^>]*>(.*?)</pre>").expect("PRE regex is valid"));
static STRONG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:strong|b)\b[^>]*>(.*?)</(?:strong|b)>").expect("STRONG regex is valid")
});
static EM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:em|i)\b[^>]*>(.*?)</(?:em|i)>").expect("EM regex is valid")
});
static CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<code\b[^>]*>(.*?)</code>").expect("CODE regex is valid"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a>").expect("LINK regex is valid"));
static IMG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b[^>]*>").expect("IMG regex is valid"));
static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]>").expect("HEADING regex is valid")
});
static TABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<table\b[^>]*>(.*?)</table>").expect("TABLE regex is valid")
});
static ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr>").expect("ROW regex is valid"));
static CELL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<t[hd]\b[^>]*>(.*?)</t[hd]>").expect("CELL regex is valid")
});
static LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(ol|ul)\b[^>]*>(.*?)</(?:ol|ul)>").expect("LIST regex is valid")
});
static ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li\b[^>]*>(.*?)</li>").expect("ITEM regex is valid"));
static BLOCKQUOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<blockquote\b[^>]*>(.*?)</blockquote>").expect("BLOCKQUOTE regex is valid")
});
static HR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<hr\b[^>]*>").expect("HR regex is valid"));
static BR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("BR regex is valid"));
static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p>").expect("PARAGRAPH regex is valid"));
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]+>").expect("TAG regex is valid"));
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("BLANK_RUN regex is valid"));
static RESTORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("{PLACEHOLDER}([0-9]+){PLACEHOLDER}")).expect("RESTORE regex is valid")
});

/// Convert document HTML to Markdown.
pub fn to_markdown(html: &str) -> String {
    let mut blocks = Vec::new();
    let html = html.replace('\r', "");
    let html = extract_diagrams(&html, &mut blocks);
    let html = extract_preformatted(&html, &mut blocks);

    let text = convert_inline(&html);
    let text = HEADING.replace_all(&text, |caps: &Captures| {
        let level: usize = caps[1].parse().unwrap_or(1);
        format!("\n\n{} {}\n\n", "#".repeat(level), flatten(&caps[2]))
    });
    let text = TABLE.replace_all(&text, |caps: &Captures| table(&caps[1]));
    let text = LIST.replace_all(&text, |caps: &Captures| list(&caps[1], &caps[2]));
    let text = BLOCKQUOTE.replace_all(&text, |caps: &Captures| blockquote(&caps[1]));
    let text = HR.replace_all(&text, "\n\n---\n\n");
    let text = BR.replace_all(&text, "\n");
    let text = PARAGRAPH.replace_all(&text, "\n\n$1\n\n");
    let text = TAG.replace_all(&text, "");

    let text = decode_entities(&text);
    // Generated list items are paragraphs led by a literal bullet glyph
    let text: String = text
        .lines()
        .map(|line| match line.trim_end().strip_prefix("• ") {
            Some(item) => format!("- {item}"),
            None => line.trim_end().to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n");
    let text = BLANK_RUN.replace_all(&text, "\n\n");

    let text = RESTORE.replace_all(&text, |caps: &Captures| {
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|i| blocks.get(i))
            .cloned()
            .unwrap_or_default()
    });

    let mut markdown = text.trim().to_string();
    markdown.push('\n');
    markdown
}

fn placeholder(blocks: &mut Vec<String>, block: String) -> String {
    let token = format!("\n\n{PLACEHOLDER}{}{PLACEHOLDER}\n\n", blocks.len());
    blocks.push(block);
    token
}

fn fence(language: &str, body: &str) -> String {
    format!("```{language}\n{body}\n```")
}

fn attr(tag: &str, name: &str) -> Option<String> {
    ATTR.captures_iter(tag)
        .find(|caps| caps[1].eq_ignore_ascii_case(name))
        .and_then(|caps| caps.get(2).or_else(|| caps.get(3)))
        .map(|value| value.as_str().to_string())
}

/// Replace marker-carrying images and hidden marker paragraphs with fenced
/// diagram placeholders. A hidden marker directly after an image with the
/// same marker belongs to that image and is dropped.
fn extract_diagrams(html: &str, blocks: &mut Vec<String>) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    let mut pending: Option<String> = None;

    for caps in IMG_OR_HIDDEN_MARKER.captures_iter(html) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let between = &html[last..whole.start()];
        out.push_str(between);
        last = whole.end();

        if let Some(hidden) = caps.get(1) {
            let text = hidden.as_str();
            let adjacent = TAG.replace_all(between, "").trim().is_empty();
            if adjacent && pending.as_deref() == Some(text) {
                pending = None;
                continue;
            }
            pending = None;
            match marker::decode(text) {
                Some(diagram) => out.push_str(&placeholder(
                    blocks,
                    fence(diagram.dialect.as_str(), &diagram.source),
                )),
                None => out.push_str(whole.as_str()),
            }
            continue;
        }

        let alt = attr(whole.as_str(), "alt").map(|alt| decode_entities(&alt));
        match alt.as_deref().and_then(|alt| marker::decode(alt.trim())) {
            Some(diagram) => {
                out.push_str(&placeholder(
                    blocks,
                    fence(diagram.dialect.as_str(), &diagram.source),
                ));
                pending = alt.map(|alt| alt.trim().to_string());
            }
            None => {
                out.push_str(whole.as_str());
                pending = None;
            }
        }
    }
    out.push_str(&html[last..]);
    out
}

fn extract_preformatted(html: &str, blocks: &mut Vec<String>) -> String {
    PRE.replace_all(html, |caps: &Captures| {
        let body = decode_entities(&TAG.replace_all(&caps[1], ""));
        placeholder(blocks, fence("", body.trim_matches('\n')))
    })
    .into_owned()
}

fn convert_inline(html: &str) -> String {
    let text = STRONG.replace_all(html, "**$1**");
    let text = EM.replace_all(&text, "*$1*");
    let text = CODE.replace_all(&text, "`$1`");
    let text = LINK.replace_all(&text, |caps: &Captures| {
        let label = flatten(&caps[2]);
        match attr(&caps[1], "href") {
            Some(href) => format!("[{label}]({href})"),
            None => label,
        }
    });
    let text = IMG.replace_all(&text, |caps: &Captures| {
        let tag = &caps[0];
        let alt = attr(tag, "alt").unwrap_or_default();
        match attr(tag, "src") {
            Some(src) => format!("![{alt}]({src})"),
            None => String::new(),
        }
    });
    text.into_owned()
}

/// Inner HTML reduced to a single line of text.
fn flatten(html: &str) -> String {
    let text = BR.replace_all(html, " ");
    let text = TAG.replace_all(&text, "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn table(inner: &str) -> String {
    let rows: Vec<Vec<String>> = ROW
        .captures_iter(inner)
        .map(|row| {
            CELL.captures_iter(&row[1])
                .map(|cell| flatten(&cell[1]).replace('|', "\\|"))
                .collect()
        })
        .filter(|cells: &Vec<String>| !cells.is_empty())
        .collect();
    let Some(header) = rows.first() else {
        return String::new();
    };

    let mut out = String::from("\n\n");
    for (i, row) in rows.iter().enumerate() {
        out.push_str(&format!("| {} |\n", row.join(" | ")));
        if i == 0 {
            let separator = vec!["---"; header.len()].join(" | ");
            out.push_str(&format!("| {separator} |\n"));
        }
    }
    out.push('\n');
    out
}

fn list(kind: &str, inner: &str) -> String {
    let ordered = kind.eq_ignore_ascii_case("ol");
    let mut out = String::from("\n\n");
    for (n, item) in ITEM.captures_iter(inner).enumerate() {
        let text = flatten(&item[1]);
        if ordered {
            out.push_str(&format!("{}. {text}\n", n + 1));
        } else {
            out.push_str(&format!("- {text}\n"));
        }
    }
    out.push('\n');
    out
}

fn blockquote(inner: &str) -> String {
    let text = PARAGRAPH.replace_all(inner, "$1\n");
    let text = BR.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");
    let quoted: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| format!("> {line}"))
        .collect();
    format!("\n\n{}\n\n", quoted.join("\n"))
}

/// Decode character references; non-breaking spaces become plain spaces.
fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).replace('\u{A0}', " ")
}
