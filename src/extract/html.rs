//! HTML helpers for extraction steps
//!
//! # Link Extraction Rules
//!
//! **Include:**
//! - `<a href="...">` tags
//! - `<link rel="canonical" href="...">`
//!
//! **Exclude:**
//! - `<a href="..." download>`
//! - `javascript:`, `mailto:`, `tel:` links
//! - Data URIs
//! - Fragment-only links
//! - Anything that does not resolve to `http` or `https`

use crate::extract::ExtractError;
use scraper::{Html, Selector};
use url::Url;

/// Extracts the page title from the HTML document
pub fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts all followable links as absolute URLs, in document order
pub fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(absolute_url);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(absolute_url);
            }
        }
    }

    links
}

/// Collects the trimmed text of every element matching `selector`
pub fn select_text(document: &Html, selector: &str) -> Result<Vec<String>, ExtractError> {
    let selector =
        Selector::parse(selector).map_err(|e| ExtractError::Selector(format!("{}: {}", selector, e)))?;

    Ok(document
        .select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .collect())
}

/// Resolves a link href to an absolute URL, or `None` if it should be skipped
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/catalog/page").unwrap()
    }

    fn links(html: &str) -> Vec<String> {
        extract_links(&Html::parse_document(html), &base_url())
    }

    #[test]
    fn test_extract_title() {
        let doc = Html::parse_document("<html><head><title>  Test Page  </title></head></html>");
        assert_eq!(extract_title(&doc), Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let doc = Html::parse_document("<html><head></head><body></body></html>");
        assert_eq!(extract_title(&doc), None);
    }

    #[test]
    fn test_relative_links_resolved() {
        let found = links(r#"<a href="/other">A</a><a href="sibling">B</a>"#);
        assert_eq!(
            found,
            vec![
                "https://example.com/other",
                "https://example.com/catalog/sibling"
            ]
        );
    }

    #[test]
    fn test_skipped_links() {
        let html = r##"
            <a href="javascript:void(0)">js</a>
            <a href="mailto:a@example.com">mail</a>
            <a href="tel:+1234">tel</a>
            <a href="data:text/html,x">data</a>
            <a href="#top">anchor</a>
            <a href="/file.pdf" download>file</a>
            <a href="ftp://example.com/x">ftp</a>
            <a href="/kept">kept</a>
        "##;
        assert_eq!(links(html), vec!["https://example.com/kept"]);
    }

    #[test]
    fn test_canonical_link_included() {
        let html = r#"<html><head><link rel="canonical" href="https://example.com/canonical" /></head></html>"#;
        assert_eq!(links(html), vec!["https://example.com/canonical"]);
    }

    #[test]
    fn test_select_text() {
        let doc = Html::parse_document(
            r#"<ul><li class="book"> A </li><li class="book">B</li><li>C</li></ul>"#,
        );
        assert_eq!(select_text(&doc, "li.book").unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn test_invalid_selector() {
        let doc = Html::parse_document("<p>x</p>");
        assert!(matches!(
            select_text(&doc, "p[["),
            Err(ExtractError::Selector(_))
        ));
    }
}
