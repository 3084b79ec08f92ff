//! Structured content extraction from fetched HTML
//!
//! Turns a raw body into a [`Record`]: title, headings, paragraph text,
//! outbound links, image sources. Parsing is synchronous; the parsed DOM
//! never crosses an await point.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// Structured content pulled from one page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    /// Page title, absent when the document has none
    pub title: Option<String>,

    /// h1-h3 text in document order
    pub headings: Vec<String>,

    /// Paragraph text, whitespace-collapsed, empty ones dropped
    pub paragraphs: Vec<String>,

    /// Outbound http(s) links, resolved to absolute URLs
    pub links: Vec<String>,

    /// Image sources, resolved to absolute URLs
    pub images: Vec<String>,
}

impl Record {
    /// Total length of the paragraph text, in characters
    pub fn text_len(&self) -> usize {
        self.paragraphs.iter().map(|p| p.chars().count()).sum()
    }
}

/// Extraction seam, so the pipeline can be driven with canned records
pub trait Extractor: Send + Sync {
    fn extract(&self, html: &str, base_url: &Url) -> Record;
}

/// Production extractor backed by an HTML parser
#[derive(Debug, Default)]
pub struct HtmlExtractor;

impl Extractor for HtmlExtractor {
    fn extract(&self, html: &str, base_url: &Url) -> Record {
        let document = Html::parse_document(html);

        Record {
            title: extract_title(&document),
            headings: extract_text_all(&document, "h1, h2, h3"),
            paragraphs: extract_text_all(&document, "p"),
            links: extract_links(&document, base_url),
            images: extract_images(&document, base_url),
        }
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Collects the text of every element matching `selectors`, in document order
fn extract_text_all(document: &Html, selectors: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selectors) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extracts all valid outbound links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Extracts image sources from the HTML document
fn extract_images(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(selector) = Selector::parse("img[src]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("src"))
        .filter_map(|src| resolve_link(src, base_url))
        .collect()
}

/// Resolves an href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only anchors
/// - Invalid or non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    if href.starts_with('#') {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) => {
            if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
                Some(absolute_url.to_string())
            } else {
                None
            }
        }
        Err(_) => None,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
