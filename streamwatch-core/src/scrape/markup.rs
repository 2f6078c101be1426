// File: src/scrape/markup.rs
//
// Ordered-selector scans shared by the scrape strategies. Every helper is
// best-effort: the first non-empty match wins, no match is `None`, and a
// missing field never fails the snapshot it feeds into.

use scraper::{Html, Selector};
use url::Url;

/// First trimmed text among `selectors`, in order, that is non-empty and
/// passes `accept` (used to skip placeholder values like the bare site name
/// in `<title>`).
pub fn first_text_where(
    doc: &Html,
    selectors: &[Selector],
    accept: impl Fn(&str) -> bool,
) -> Option<String> {
    for sel in selectors {
        if let Some(el) = doc.select(sel).next() {
            let text: String = el.text().collect::<String>().trim().to_string();
            if !text.is_empty() && accept(&text) {
                return Some(text);
            }
        }
    }
    None
}

/// First present attribute among `(selector, attribute)` pairs, in order.
pub fn first_attr(doc: &Html, pairs: &[(&Selector, &str)]) -> Option<String> {
    for (sel, attr) in pairs {
        if let Some(el) = doc.select(sel).next() {
            if let Some(v) = el.value().attr(attr) {
                if !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
    }
    None
}

/// Whether any of `selectors` matches at least one element.
pub fn any_match(doc: &Html, selectors: &[Selector]) -> bool {
    selectors.iter().any(|sel| doc.select(sel).next().is_some())
}

/// Lowercased visible text of the whole document.
pub fn page_text(doc: &Html) -> String {
    doc.root_element().text().collect::<String>().to_lowercase()
}

/// First integer in the text of the first matching selector.
pub fn first_count(doc: &Html, selectors: &[Selector]) -> Option<i64> {
    for sel in selectors {
        if let Some(el) = doc.select(sel).next() {
            let text: String = el.text().collect();
            if let Some(n) = leading_int(&text) {
                return Some(n);
            }
        }
    }
    None
}

/// First contiguous digit run in `text`, parsed.
pub fn leading_int(text: &str) -> Option<i64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Resolve a possibly-relative asset reference against the platform origin.
pub fn absolutize(base: &str, src: &str) -> Option<String> {
    if src.starts_with("http") {
        return Some(src.to_string());
    }
    let base = Url::parse(base).ok()?;
    base.join(src).ok().map(|u| u.to_string())
}
