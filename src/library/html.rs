//! Minimal HTML helpers for reading login page metadata.

use std::sync::LazyLock;

use regex::Regex;

/// Compiles a regex at static init; panics on invalid pattern.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static META_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?is)<meta\s+[^>]*>"));
static META_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
});

/// Returns the `content` of the first `<meta name="{name}">` tag.
///
/// Attribute order and quoting style do not matter; the name comparison is
/// case-insensitive. Empty content counts as absent.
#[must_use]
pub(crate) fn extract_meta_content(html: &str, name: &str) -> Option<String> {
    META_TAG_RE.find_iter(html).find_map(|tag| {
        let mut tag_name: Option<String> = None;
        let mut content: Option<String> = None;

        for attr in META_ATTR_RE.captures_iter(tag.as_str()) {
            let key = attr.get(1).map_or("", |m| m.as_str()).to_ascii_lowercase();
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .map_or("", |m| m.as_str())
                .trim();

            match key.as_str() {
                "name" | "property" => tag_name = Some(value.to_string()),
                "content" => content = Some(html_unescape_basic(value)),
                _ => {}
            }
        }

        let matches = tag_name.is_some_and(|n| n.eq_ignore_ascii_case(name));
        content.filter(|c| matches && !c.is_empty())
    })
}

fn html_unescape_basic(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#x2F;", "/")
        .replace("&#43;", "+")
        .replace("&amp;", "&")
}
