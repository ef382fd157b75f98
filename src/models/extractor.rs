//! HTML article extraction.

use chrono::DateTime;
use scraper::{ElementRef, Html};
use std::borrow::Cow;

use super::Extractor;
use crate::types::{Document, Result};

/// Extracts title, site, publication time and body text from article HTML.
///
/// - title: `og:title` meta, else the first `<h1>`
/// - site: `og:site_name` meta
/// - published: `article:published_time` meta, else the first `<time>`, as RFC 3339
/// - text: every outermost `<p>` and `<li>` element, space separated
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for HtmlExtractor {
    fn extract(&self, raw: &[u8]) -> Result<Document> {
        let html = Html::parse_document(&decode_body(raw));

        let mut document = Document::default();
        let mut og_title = false;
        let mut meta_time = false;
        let mut paragraphs: Vec<String> = Vec::new();

        for element in html.root_element().descendent_elements() {
            match element.value().name() {
                "meta" => {
                    let property = element.value().attr("property").unwrap_or_default();
                    let content = element.value().attr("content").unwrap_or_default();
                    match property {
                        "og:title" => {
                            document.title = collapse_whitespace(content);
                            og_title = true;
                        }
                        "og:site_name" => document.site = collapse_whitespace(content),
                        "article:published_time" => {
                            if let Some(time) = parse_time(content) {
                                document.published = time;
                                meta_time = true;
                            }
                        }
                        _ => {}
                    }
                }
                "h1" if !og_title && document.title.is_empty() => {
                    document.title = element_text(&element);
                }
                "time" if !meta_time && document.published == 0 => {
                    let value = element
                        .value()
                        .attr("datetime")
                        .map(str::to_string)
                        .unwrap_or_else(|| element_text(&element));
                    if let Some(time) = parse_time(&value) {
                        document.published = time;
                    }
                }
                "p" | "li" if !inside_block(&element) => {
                    let text = element_text(&element);
                    if !text.is_empty() {
                        paragraphs.push(text);
                    }
                }
                _ => {}
            }
        }

        document.text = paragraphs.join(" ");
        Ok(document)
    }
}

fn decode_body(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

fn parse_time(value: &str) -> Option<u64> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|t| t.timestamp().max(0) as u64)
}

/// Whether an enclosing `<p>` or `<li>` already contributes this element's text.
fn inside_block(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| matches!(ancestor.value().name(), "p" | "li"))
}

/// Visible text of an element, skipping scripts and styles.
fn element_text(element: &ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    collapse_whitespace(&raw)
}

fn collect_text(element: &ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child) = ElementRef::wrap(child) {
            if !matches!(child.value().name(), "script" | "style" | "noscript") {
                collect_text(&child, out);
            }
        }
    }
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}
