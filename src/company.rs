//! Display name extraction from matched pages
//!
//! Pulls a human-readable site name out of the HTML that produced a positive
//! verdict, for the report's "Company Name" column. Sources in order of
//! reliability:
//! - OpenGraph og:site_name meta tag
//! - application-name meta tag
//! - Title tag patterns ("Product | Company", "Company: Product")
//!
//! Extraction is best-effort; callers fall back to "N/A" when nothing usable
//! is found.

use scraper::{Html, Selector};
use tracing::debug;

/// Extract a display name from HTML content, best source first.
pub fn extract_display_name(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    if let Some(name) = get_meta_property(&document, "og:site_name") {
        if is_valid_name(&name) {
            debug!("Display name via og:site_name: {}", name);
            return Some(clean_name(&name));
        }
    }

    if let Some(name) = get_meta_name(&document, "application-name") {
        if is_valid_name(&name) {
            debug!("Display name via application-name: {}", name);
            return Some(clean_name(&name));
        }
    }

    extract_from_title(&document)
}

/// Parse the title tag for common "Product | Company" patterns.
fn extract_from_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let title = document.select(&selector).next()?.text().collect::<String>();
    let title = title.trim();

    if title.len() < 3 {
        return None;
    }

    let separators = [" | ", " - ", " – ", " — ", ": ", " :: "];

    for sep in separators {
        if let Some((left, right)) = title.split_once(sep) {
            let (left, right) = (left.trim(), right.trim());

            // Company usually sits on the right of | and -, on the left of :
            let candidate = if sep == ": " || sep == " :: " { left } else { right };
            if is_valid_name(candidate) && !looks_like_page_name(candidate) {
                debug!("Display name via title: {}", candidate);
                return Some(clean_name(candidate));
            }
        }
    }

    // A short separator-free title is often just the site name
    if title.len() < 50 && is_valid_name(title) && !looks_like_page_name(title) {
        return Some(clean_name(title));
    }

    None
}

fn get_meta_property(document: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[property="{}"]"#, property)).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.to_string())
}

fn get_meta_name(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[name="{}"]"#, name)).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.to_string())
}

fn is_valid_name(name: &str) -> bool {
    let name = name.trim();

    if name.len() < 2 || name.len() > 100 {
        return false;
    }
    if !name.chars().next().map(char::is_alphanumeric).unwrap_or(false) {
        return false;
    }
    if name.chars().all(|c| c.is_numeric() || c.is_whitespace()) {
        return false;
    }

    let invalid = [
        "home", "welcome", "about", "contact", "login", "sign in", "404", "error",
        "page not found", "undefined", "null", "none", "n/a",
    ];
    let lowered = name.to_lowercase();
    !invalid.contains(&lowered.as_str())
}

fn looks_like_page_name(name: &str) -> bool {
    let lowered = name.to_lowercase();
    let page_words = ["home", "welcome", "homepage", "index", "login", "untitled"];
    page_words.iter().any(|w| lowered == *w || lowered.starts_with(&format!("{} ", w)))
}

fn clean_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_og_site_name_preferred() {
        let html = r#"<html><head>
            <meta property="og:site_name" content="Acme Corp">
            <meta name="application-name" content="Other Name">
            <title>Products | Ignored</title>
        </head></html>"#;
        assert_eq!(extract_display_name(html), Some("Acme Corp".to_string()));
    }

    #[test]
    fn test_application_name_fallback() {
        let html = r#"<html><head>
            <meta name="application-name" content="Widget Co">
        </head></html>"#;
        assert_eq!(extract_display_name(html), Some("Widget Co".to_string()));
    }

    #[test]
    fn test_title_pipe_pattern() {
        let html = "<html><head><title>Umbraco Login | Northwind Traders</title></head></html>";
        assert_eq!(
            extract_display_name(html),
            Some("Northwind Traders".to_string())
        );
    }

    #[test]
    fn test_title_colon_pattern_uses_left_side() {
        let html = "<html><head><title>Contoso: Content Management</title></head></html>";
        assert_eq!(extract_display_name(html), Some("Contoso".to_string()));
    }

    #[test]
    fn test_short_plain_title() {
        let html = "<html><head><title>Fabrikam</title></head></html>";
        assert_eq!(extract_display_name(html), Some("Fabrikam".to_string()));
    }

    #[test]
    fn test_page_words_rejected() {
        let html = "<html><head><title>Welcome</title></head></html>";
        assert_eq!(extract_display_name(html), None);
    }

    #[test]
    fn test_no_sources_yields_none() {
        assert_eq!(extract_display_name("<html><body>hi</body></html>"), None);
    }

    #[test]
    fn test_whitespace_collapsed() {
        let html = r#"<meta property="og:site_name" content="  Acme   Corp  ">"#;
        assert_eq!(extract_display_name(html), Some("Acme Corp".to_string()));
    }
}
