//! HTML pages: the symbol column of every table with a "Symbol" header.
//!
//! Scanning is local to `<table>` blocks and tolerant of omitted `</tr>`,
//! `</td>` and `</th>` end tags, attribute noise and letter case.

use crate::error::ParseError;
use regex::Regex;
use std::sync::OnceLock;

/// Longest link text accepted as a symbol before falling back to the cell text.
const MAX_LINK_SYMBOL_LEN: usize = 6;

macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect(stringify!($name)))
        }
    };
}

cached_regex!(table_re, r"(?is)<table\b[^>]*>(.*?)</table\s*>");
cached_regex!(row_open_re, r"(?i)<tr\b[^>]*>");
cached_regex!(row_close_re, r"(?i)</tr\s*>");
cached_regex!(cell_open_re, r"(?i)<(t[hd])\b[^>]*>");
cached_regex!(cell_close_re, r"(?i)</t[hd]\s*>");
cached_regex!(link_re, r"(?is)<a\b[^>]*>(.*?)</a\s*>");
cached_regex!(sup_re, r"(?is)<sup\b[^>]*>.*?</sup\s*>");
cached_regex!(break_re, r"(?i)<br\s*/?>");
cached_regex!(tag_re, r"(?s)<[^>]*>");
cached_regex!(numeric_entity_re, r"&#(x[0-9a-fA-F]+|[0-9]+);");
cached_regex!(space_re, r"\s+");

#[derive(Debug)]
struct Cell<'a> {
    header: bool,
    html: &'a str,
}

pub(super) fn applies(text: &str) -> bool {
    let head = text.trim_start_matches('\u{feff}').trim_start();
    head.starts_with('<') || text.to_ascii_lowercase().contains("<table")
}

pub(super) fn extract(text: &str) -> Result<Vec<String>, ParseError> {
    let mut found_table = false;
    let mut out = Vec::new();

    for table in table_re().captures_iter(text) {
        let rows: Vec<Vec<Cell>> = segments(&table[1], row_open_re(), row_close_re())
            .into_iter()
            .map(cells)
            .collect();

        let Some((header_row, col)) = symbol_header(&rows) else {
            continue;
        };
        found_table = true;

        for (i, row) in rows.iter().enumerate() {
            if i == header_row || !row.iter().any(|c| !c.header) {
                continue;
            }
            if let Some(cell) = row.get(col) {
                out.push(cell_candidate(cell.html));
            }
        }
    }

    if found_table {
        Ok(out)
    } else {
        Err(ParseError::NoQualifyingTable)
    }
}

/// Row index and column index of the first header cell mentioning "symbol".
fn symbol_header(rows: &[Vec<Cell>]) -> Option<(usize, usize)> {
    rows.iter().enumerate().find_map(|(r, row)| {
        row.iter()
            .position(|c| c.header && text_of(c.html).to_lowercase().contains("symbol"))
            .map(|col| (r, col))
    })
}

/// Link text when it looks like a symbol, else the whole cell text.
fn cell_candidate(html: &str) -> String {
    let html = sup_re().replace_all(html, "");
    if let Some(link) = link_re().captures(&html) {
        let text = text_of(&link[1]);
        let len = text.chars().count();
        if (1..=MAX_LINK_SYMBOL_LEN).contains(&len) {
            return text;
        }
    }
    text_of(&html)
}

fn cells(row: &str) -> Vec<Cell<'_>> {
    let opens: Vec<_> = cell_open_re().captures_iter(row).collect();
    opens
        .iter()
        .enumerate()
        .map(|(i, caps)| {
            let whole = caps.get(0).expect("match");
            let end = opens
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(row.len(), |m| m.start());
            let body = &row[whole.end()..end];
            let body = cell_close_re()
                .find(body)
                .map_or(body, |m| &body[..m.start()]);
            Cell {
                header: caps[1].eq_ignore_ascii_case("th"),
                html: body,
            }
        })
        .collect()
}

/// Split `html` into the bodies following each `open` tag, cut at `close` when present.
fn segments<'a>(html: &'a str, open: &Regex, close: &Regex) -> Vec<&'a str> {
    let opens: Vec<_> = open.find_iter(html).collect();
    opens
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let end = opens.get(i + 1).map_or(html.len(), |next| next.start());
            let body = &html[m.end()..end];
            close.find(body).map_or(body, |c| &body[..c.start()])
        })
        .collect()
}

/// Visible text: footnote superscripts dropped, tags stripped, entities decoded,
/// whitespace collapsed.
fn text_of(html: &str) -> String {
    let s = sup_re().replace_all(html, "");
    let s = break_re().replace_all(&s, " ");
    let s = tag_re().replace_all(&s, "");
    let s = decode_entities(&s);
    space_re().replace_all(s.trim(), " ").into_owned()
}

fn decode_entities(s: &str) -> String {
    let s = numeric_entity_re().replace_all(s, |caps: &regex::Captures| {
        let code = &caps[1];
        let parsed = match code.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        parsed
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });
    s.replace("&nbsp;", "\u{00A0}")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
