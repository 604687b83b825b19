//! Tolerant HTML scanning
//!
//! The registry pages are small and hand-written, so instead of building a
//! DOM we scan tags with one regex and match elements by tag name, class and
//! attributes. Tag and attribute names are matched case-insensitively, and
//! elements whose end tag is missing run to the end of the enclosing scope.
//! `td`, `th` and `tr` close implicitly the way browsers close them.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<(/?)([A-Za-z][A-Za-z0-9]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
        .expect("tag pattern is valid")
});

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute pattern is valid")
});

static COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"));

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// One element found by the scanner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    attrs: &'a str,
    /// Content between the start and end tag
    pub inner: &'a str,
    /// Start tag through end tag
    pub outer: &'a str,
}

impl<'a> Element<'a> {
    /// Attribute value with entities decoded; valueless attributes yield ""
    pub fn attr(&self, name: &str) -> Option<String> {
        attribute(self.attrs, name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|value| value.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Text content with tags removed and whitespace collapsed
    pub fn text(&self) -> String {
        text_content(self.inner)
    }

    pub fn find(&self, tag: &str) -> Option<Element<'a>> {
        find_first(self.inner, tag, |_| true)
    }

    pub fn find_by(&self, tag: &str, predicate: impl Fn(&Element<'a>) -> bool) -> Option<Element<'a>> {
        find_first(self.inner, tag, predicate)
    }

    pub fn children(&self, tag: &str) -> Vec<Element<'a>> {
        find_all(self.inner, tag)
    }
}

/// Strip comments so commented-out markup is never matched
pub fn without_comments(html: &str) -> std::borrow::Cow<'_, str> {
    COMMENT_RE.replace_all(html, "")
}

/// First element named `tag` at any depth that satisfies `predicate`
pub fn find_first<'a>(
    html: &'a str,
    tag: &str,
    predicate: impl Fn(&Element<'a>) -> bool,
) -> Option<Element<'a>> {
    Scanner::new(html, tag, true).find(|element| predicate(element))
}

/// All outermost elements named `tag`, in document order
///
/// Elements nested inside a match are not returned separately.
pub fn find_all<'a>(html: &'a str, tag: &str) -> Vec<Element<'a>> {
    Scanner::new(html, tag, false).collect()
}

struct Scanner<'a, 't> {
    html: &'a str,
    tag: &'t str,
    position: usize,
    /// Resume inside each match instead of after it
    nested: bool,
}

impl<'a, 't> Scanner<'a, 't> {
    fn new(html: &'a str, tag: &'t str, nested: bool) -> Self {
        Self {
            html,
            tag,
            position: 0,
            nested,
        }
    }
}

impl<'a> Iterator for Scanner<'a, '_> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Element<'a>> {
        while self.position < self.html.len() {
            let captures = TAG_RE.captures_at(self.html, self.position)?;
            let whole = captures.get(0)?;
            let is_close = !captures[1].is_empty();
            let name = captures.get(2)?.as_str();

            if is_close || !name.eq_ignore_ascii_case(self.tag) {
                self.position = whole.end();
                continue;
            }

            let attrs_match = captures.get(3)?;
            let self_closing = attrs_match.as_str().trim_end().ends_with('/');
            let is_void = VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name));

            let (inner_end, outer_end) = if self_closing || is_void {
                (whole.end(), whole.end())
            } else {
                closing_bounds(self.html, name, whole.end())
            };

            self.position = if self.nested {
                whole.end()
            } else {
                outer_end.max(whole.end())
            };
            return Some(Element {
                attrs: attrs_match.as_str().trim_end_matches('/'),
                inner: &self.html[whole.end()..inner_end],
                outer: &self.html[whole.start()..outer_end],
            });
        }
        None
    }
}

/// Locate the end of an element whose start tag ends at `from`
///
/// Returns (end of content, end of element).
fn closing_bounds(html: &str, tag: &str, from: usize) -> (usize, usize) {
    let implicit_closers: &[&str] = match tag.to_ascii_lowercase().as_str() {
        "td" | "th" => &["td", "th", "tr"],
        "tr" => &["tr"],
        _ => &[],
    };
    let scope_closers: &[&str] = match tag.to_ascii_lowercase().as_str() {
        "td" | "th" => &["tr", "tbody", "thead", "tfoot", "table"],
        "tr" => &["tbody", "thead", "tfoot", "table"],
        _ => &[],
    };

    let mut depth = 1usize;
    for captures in TAG_RE.captures_iter(&html[from..]) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(2)) else {
            continue;
        };
        let start = from + whole.start();
        let end = from + whole.end();
        let name = name.as_str();
        let is_close = !captures[1].is_empty();

        if depth == 1 {
            let implicit = !is_close && implicit_closers.iter().any(|t| t.eq_ignore_ascii_case(name));
            let scope = is_close && scope_closers.iter().any(|t| t.eq_ignore_ascii_case(name));
            if implicit || scope {
                return (start, start);
            }
        }

        if !name.eq_ignore_ascii_case(tag) {
            continue;
        }
        if is_close {
            depth -= 1;
            if depth == 0 {
                return (start, end);
            }
        } else if !captures[3].trim_end().ends_with('/') {
            depth += 1;
        }
    }
    (html.len(), html.len())
}

/// Look up one attribute in a raw attribute string
pub fn attribute(attrs: &str, name: &str) -> Option<String> {
    ATTR_RE.captures_iter(attrs).find_map(|captures| {
        let key = captures.get(1)?.as_str();
        if !key.eq_ignore_ascii_case(name) {
            return None;
        }
        let value = captures
            .get(2)
            .or_else(|| captures.get(3))
            .or_else(|| captures.get(4))
            .map(|m| m.as_str())
            .unwrap_or("");
        Some(decode_entities(value))
    })
}

/// Text of an HTML fragment on one line
pub fn text_content(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(&without_comments(fragment), " ").into_owned();
    let decoded = decode_entities(&stripped);
    WHITESPACE_RE.replace_all(decoded.trim(), " ").into_owned()
}

/// Text of an HTML fragment split at every tag, blank lines dropped
pub fn text_lines(fragment: &str) -> Vec<String> {
    let stripped = TAG_RE.replace_all(&without_comments(fragment), "\n").into_owned();
    decode_entities(&stripped)
        .lines()
        .map(|line| WHITESPACE_RE.replace_all(line.trim(), " ").into_owned())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Decode the character references that appear in practice
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_reference(&candidate[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &candidate[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_reference(reference: &str) -> Option<char> {
    if let Some(numeric) = reference.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    match reference {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}
