//! Comment HTML sanitizer
//!
//! Only `<i>`, `<strong>`, `<code>` and `<a href title>` survive. Everything
//! else is stripped to its text; `<script>`/`<style>` lose their content too.
//! When the cleaned markup is not properly nested the result falls back to
//! plain (escaped) text.

use std::sync::LazyLock;

use regex::{Captures, Regex};

const ALLOWED_TAGS: &[&str] = &["i", "strong", "code", "a"];
const SAFE_SCHEMES: &[&str] = &["http", "https", "mailto"];

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(/?)([a-zA-Z][a-zA-Z0-9]*)([^>]*)>").expect("static regex")
});
static SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("static regex")
});
static STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("static regex")
});
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("static regex"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*("[^"]*"|'[^']*'|[^\s"'>]+)"#)
        .expect("static regex")
});
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z][a-zA-Z0-9]*);").expect("static regex")
});

/// Clean user-supplied comment text down to the allowed inline markup.
pub fn sanitize(text: &str) -> String {
    let without_blocks = COMMENT_RE.replace_all(text, "");
    let without_blocks = SCRIPT_RE.replace_all(&without_blocks, "");
    let without_blocks = STYLE_RE.replace_all(&without_blocks, "");

    let mut out = String::with_capacity(without_blocks.len());
    let mut last = 0;
    for caps in TAG_RE.captures_iter(&without_blocks) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&escape_text(&without_blocks[last..whole.start()]));
        if let Some(tag) = render_allowed_tag(&caps) {
            out.push_str(&tag);
        }
        last = whole.end();
    }
    out.push_str(&escape_text(&without_blocks[last..]));

    if is_valid_xhtml(&out) {
        out
    } else {
        strip_tags(&out)
    }
}

/// Tag balance check: every closing tag must match the innermost open tag
/// and nothing may stay open. Self-closing tags (`<br/>`) are ignored.
pub fn is_valid_xhtml(text: &str) -> bool {
    let mut stack: Vec<String> = Vec::new();
    for caps in TAG_RE.captures_iter(text) {
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let name = caps[2].to_ascii_lowercase();
        let self_closing = caps[3].trim_end().ends_with('/');

        if closing {
            if stack.last() != Some(&name) {
                return false;
            }
            stack.pop();
        } else if !self_closing {
            stack.push(name);
        }
    }
    stack.is_empty()
}

/// Remove every tag, keeping the text between them.
pub fn strip_tags(text: &str) -> String {
    TAG_RE.replace_all(text, "").into_owned()
}

fn render_allowed_tag(caps: &Captures<'_>) -> Option<String> {
    let name = caps[2].to_ascii_lowercase();
    if !ALLOWED_TAGS.contains(&name.as_str()) {
        return None;
    }
    if !caps[1].is_empty() {
        return Some(format!("</{}>", name));
    }

    let raw_attrs = &caps[3];
    let self_closing = raw_attrs.trim_end().ends_with('/');
    let mut tag = format!("<{}", name);
    if name == "a" {
        for attr in ATTR_RE.captures_iter(raw_attrs) {
            let key = attr[1].to_ascii_lowercase();
            let value = unquote(&attr[2]);
            let keep = match key.as_str() {
                "href" => is_safe_href(value),
                "title" => true,
                _ => false,
            };
            if keep {
                tag.push_str(&format!(" {}=\"{}\"", key, escape_attr(value)));
            }
        }
    }
    tag.push_str(if self_closing { "/>" } else { ">" });
    Some(tag)
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value)
}

/// 允许相对链接与 http / https / mailto
fn is_safe_href(href: &str) -> bool {
    let trimmed = href.trim();
    match trimmed.split_once(':') {
        Some((scheme, _)) if !scheme.contains('/') && !scheme.contains('?') => {
            SAFE_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str())
        }
        _ => true,
    }
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

/// 转义文本中的 `& < >`，已是实体的 `&` 保持不变
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (idx, ch) in text.char_indices() {
        match ch {
            '&' if ENTITY_RE.is_match(&text[idx..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
