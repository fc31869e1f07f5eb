//! Marker-based extractors for the four page shapes.
//!
//! Every extractor comes in two flavours: `try_parse_*` fails with
//! [`Error::UnrecognizedPageShape`](crate::Error::UnrecognizedPageShape) when the
//! outer container is missing, `parse_*` logs that case and returns an empty record.
//! Optional fields never abort a record.

pub mod articles;
pub mod author;
pub mod coauthors;
pub mod profiles;

pub use articles::{
    parse_article_page, parse_articles, try_parse_article_page, try_parse_articles, ArticlePage,
};
pub use author::{parse_author_info, try_parse_author_info};
pub use coauthors::{parse_coauthors, try_parse_coauthors};
pub use profiles::{parse_profile_search, try_parse_profile_search};

use crate::models::Interest;
use scraper::{ElementRef, Selector};
use url::Url;

/// First descendant of `scope` matching `css`
pub(crate) fn find<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    let found = scope.select(&selector).next();
    found
}

/// All descendants of `scope` matching `css`, in document order
pub(crate) fn find_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    Selector::parse(css)
        .map(|selector| scope.select(&selector).collect())
        .unwrap_or_default()
}

/// Whitespace-normalized text content
pub(crate) fn text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text content, `None` when blank
pub(crate) fn non_empty_text(element: ElementRef<'_>) -> Option<String> {
    Some(text(element)).filter(|t| !t.is_empty())
}

pub(crate) fn attr(element: ElementRef<'_>, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// Research interest anchor: the title is required, the link is empty when absent
pub(crate) fn interest(anchor: ElementRef<'_>, base: &Url) -> Option<Interest> {
    Some(Interest {
        title: non_empty_text(anchor)?,
        link: attr(anchor, "href")
            .map(|href| absolutize(base, &href))
            .unwrap_or_default(),
    })
}

/// Resolve a possibly relative link against the site base
pub(crate) fn absolutize(base: &Url, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    base.join(href).map_or_else(
        |_| format!("{}/{}", base.as_str().trim_end_matches('/'), href.trim_start_matches('/')),
        |url| url.to_string(),
    )
}

/// First value of query parameter `key` in `link` (absolute or relative)
#[must_use]
pub fn query_param(link: &str, key: &str) -> Option<String> {
    let url = Url::parse(link).or_else(|_| Url::parse("http://localhost/")?.join(link)).ok()?;
    let value = url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned());
    value
}

/// Count shown as text (`"1,234"`, `"Cited by 57"` after token selection); non-numeric is 0
pub(crate) fn parse_count(raw: &str) -> u64 {
    let digits: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '.' | ' ' | '\u{a0}'))
        .collect();
    digits.parse().unwrap_or(0)
}

/// Metric and column labels: spaces and dashes become `_`, lowercase
pub(crate) fn normalize_label(raw: &str) -> String {
    raw.trim().replace([' ', '-'], "_").to_lowercase()
}

/// Target URL of an inline `window.location='...'` navigation instruction
#[must_use]
pub fn navigation_target(onclick: &str) -> Option<String> {
    let target = onclick
        .trim()
        .trim_start_matches("window.location=")
        .trim()
        .trim_end_matches(';')
        .trim_matches(|c| c == '\'' || c == '"');
    let target = unescape_js(target);
    if target.is_empty() {
        None
    } else {
        Some(target)
    }
}

/// Undo the hex escapes the site uses inside inline navigation strings
#[must_use]
pub fn unescape_js(raw: &str) -> String {
    raw.replace("\\x3d", "=").replace("\\x26", "&")
}
