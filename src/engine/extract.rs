//! Link extraction from HTML, CSS and markdown documents

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Element/attribute pairs that carry a single URL
const URL_ATTRIBUTES: &[(&str, &str)] = &[
    ("a[href]", "href"),
    ("area[href]", "href"),
    ("link[href]", "href"),
    ("img[src]", "src"),
    ("script[src]", "src"),
    ("iframe[src]", "src"),
    ("frame[src]", "src"),
    ("source[src]", "src"),
    ("audio[src]", "src"),
    ("video[src]", "src"),
    ("video[poster]", "poster"),
    ("track[src]", "src"),
    ("embed[src]", "src"),
    ("input[src]", "src"),
    ("object[data]", "data"),
];

/// Element/attribute pairs that carry a `srcset` candidate list
const SRCSET_ATTRIBUTES: &[(&str, &str)] = &[("img[srcset]", "srcset"), ("source[srcset]", "srcset")];

static URL_SELECTORS: Lazy<Vec<(Selector, &'static str)>> = Lazy::new(|| compile(URL_ATTRIBUTES));
static SRCSET_SELECTORS: Lazy<Vec<(Selector, &'static str)>> =
    Lazy::new(|| compile(SRCSET_ATTRIBUTES));
static BASE_SELECTOR: Lazy<Selector> = Lazy::new(|| parse_selector("base[href]"));
static STYLE_SELECTOR: Lazy<Selector> = Lazy::new(|| parse_selector("style"));
static STYLE_ATTR_SELECTOR: Lazy<Selector> = Lazy::new(|| parse_selector("[style]"));
static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| parse_selector("[id], a[name]"));

static CSS_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"url\(\s*['"]?([^'")\s]+)['"]?\s*\)|@import\s+['"]([^'"]+)['"]"#)
        .expect("CSS url pattern is valid")
});
static MARKDOWN_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"!?\[[^\]]*\]\(\s*<?([^)\s>]+)>?(?:\s+["'(][^)]*)?\)|<(https?://[^>\s]+)>"#)
        .expect("markdown link pattern is valid")
});

fn parse_selector(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector is valid")
}

fn compile(pairs: &[(&str, &'static str)]) -> Vec<(Selector, &'static str)> {
    pairs
        .iter()
        .map(|(selector, attr)| (parse_selector(selector), *attr))
        .collect()
}

/// Document types the checker knows how to scan for links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContentKind {
    Html,
    Css,
    Markdown,
    Other,
}

impl ContentKind {
    /// Classify by `Content-Type` header, falling back to the URL extension
    pub(crate) fn detect(content_type: Option<&str>, url: &Url) -> Self {
        if let Some(ct) = content_type {
            let ct = ct.to_ascii_lowercase();
            if ct.contains("text/html") || ct.contains("application/xhtml") {
                return Self::Html;
            }
            if ct.contains("text/css") {
                return Self::Css;
            }
            if ct.contains("text/markdown") {
                return Self::Markdown;
            }
            // Generic types say nothing; anything else is a non-document
            if !ct.starts_with("text/plain") && !ct.starts_with("application/octet-stream") {
                return Self::Other;
            }
        }
        Self::from_path(url.path())
    }

    pub(crate) fn from_path(path: &str) -> Self {
        let lower = path.to_ascii_lowercase();
        let ext = lower.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        match ext {
            "html" | "htm" | "xhtml" => Self::Html,
            "css" => Self::Css,
            "md" | "markdown" => Self::Markdown,
            _ if lower.ends_with('/') || !lower.rsplit('/').next().unwrap_or("").contains('.') => {
                Self::Html
            }
            _ => Self::Other,
        }
    }
}

fn resolve(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    base.join(raw).ok()
}

/// Extract every URL referenced by an HTML document
pub(crate) fn html_links(body: &str, page: &Url, check_css: bool) -> Vec<Url> {
    let document = Html::parse_document(body);

    let base = document
        .select(&BASE_SELECTOR)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| resolve(page, href))
        .unwrap_or_else(|| page.clone());

    let mut links = Vec::new();

    for (selector, attr) in URL_SELECTORS.iter() {
        for element in document.select(selector) {
            if let Some(value) = element.value().attr(attr)
                && let Some(url) = resolve(&base, value)
            {
                links.push(url);
            }
        }
    }

    for (selector, attr) in SRCSET_SELECTORS.iter() {
        for element in document.select(selector) {
            if let Some(value) = element.value().attr(attr) {
                links.extend(
                    srcset_candidates(value).filter_map(|candidate| resolve(&base, candidate)),
                );
            }
        }
    }

    if check_css {
        for style in document.select(&STYLE_SELECTOR) {
            let css: String = style.text().collect();
            links.extend(css_links(&css, &base));
        }
        for element in document.select(&STYLE_ATTR_SELECTOR) {
            if let Some(css) = element.value().attr("style") {
                links.extend(css_links(css, &base));
            }
        }
    }

    links
}

/// URLs of a `srcset` attribute (`"a.png 1x, b.png 2x"`)
fn srcset_candidates(srcset: &str) -> impl Iterator<Item = &str> {
    srcset
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
}

/// Extract `url(...)` and `@import` targets from a stylesheet
pub(crate) fn css_links(css: &str, base: &Url) -> Vec<Url> {
    CSS_URL
        .captures_iter(css)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .filter_map(|m| resolve(base, m.as_str()))
        .collect()
}

/// Extract inline links, images and autolinks from markdown
pub(crate) fn markdown_links(markdown: &str, base: &Url) -> Vec<Url> {
    MARKDOWN_LINK
        .captures_iter(markdown)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .filter_map(|m| resolve(base, m.as_str()))
        .collect()
}

/// Fragment identifiers an HTML document defines (`id` and `<a name>`)
pub(crate) fn fragment_targets(body: &str) -> HashSet<String> {
    let document = Html::parse_document(body);
    document
        .select(&ANCHOR_SELECTOR)
        .flat_map(|el| {
            let value = el.value();
            [value.attr("id"), value.attr("name")]
        })
        .flatten()
        .map(str::to_string)
        .collect()
}
