// Minimal HTML extraction for the CCA's status pages
//
// The pages are machine-generated tables from an embedded web server.
// We only need table rows, cell text, and bare text nodes, so a handful
// of compiled patterns cover it without a DOM.

use std::sync::LazyLock;

use regex::Regex;

static TABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<table\b([^>]*)>(.*?)</table\s*>").expect("static table pattern")
});

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
        .expect("static class pattern")
});

static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b[^>]*>(.*?)</tr\s*>").expect("static row pattern"));

static CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<t([dh])\b[^>]*>(.*?)</t[dh]\s*>").expect("static cell pattern")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("static tag pattern"));

static TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">([^<]+)<").expect("static text pattern"));

static WS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace pattern"));

/// Data rows of one table. Rows made only of `<th>` cells are dropped.
#[derive(Debug, Clone, Default)]
pub(crate) struct HtmlTable {
    pub rows: Vec<Vec<String>>,
}

/// Find the first `<table>` carrying `class_name` and extract its data rows.
pub(crate) fn find_table(html: &str, class_name: &str) -> Option<HtmlTable> {
    TABLE_RE
        .captures_iter(html)
        .find(|caps| caps.get(1).is_some_and(|attrs| has_class(attrs.as_str(), class_name)))
        .and_then(|caps| caps.get(2))
        .map(|inner| HtmlTable {
            rows: ROW_RE
                .captures_iter(inner.as_str())
                .filter_map(|row| row.get(1))
                .map(|row| data_cells(row.as_str()))
                .filter(|cells| !cells.is_empty())
                .collect(),
        })
}

/// Every non-empty text node in document order, entity-decoded and trimmed.
pub(crate) fn text_nodes(html: &str) -> Vec<String> {
    TEXT_RE
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| normalize(m.as_str()))
        .filter(|s| !s.is_empty())
        .collect()
}

fn has_class(attrs: &str, class_name: &str) -> bool {
    CLASS_RE.captures_iter(attrs).any(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .is_some_and(|v| v.as_str().split_whitespace().any(|c| c == class_name))
    })
}

fn data_cells(row: &str) -> Vec<String> {
    let cells: Vec<(bool, String)> = CELL_RE
        .captures_iter(row)
        .map(|caps| {
            let is_data = caps
                .get(1)
                .is_some_and(|k| k.as_str().eq_ignore_ascii_case("d"));
            let text = caps.get(2).map_or_else(String::new, |m| cell_text(m.as_str()));
            (is_data, text)
        })
        .collect();

    if cells.iter().any(|(is_data, _)| *is_data) {
        cells.into_iter().map(|(_, text)| text).collect()
    } else {
        Vec::new()
    }
}

fn cell_text(inner: &str) -> String {
    normalize(&TAG_RE.replace_all(inner, " "))
}

fn normalize(raw: &str) -> String {
    let decoded = raw
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    WS_RE.replace_all(decoded.trim(), " ").into_owned()
}
