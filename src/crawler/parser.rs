//! Post extraction from rendered HTML
//!
//! This module pulls the fields of a post out of its rendered page:
//! - Title, subtitle and like count
//! - The publication date, normalized to a `YYYYMMDD` key
//! - The HTML of the post body

use crate::state::{DateKey, ExtractedPost};
use crate::ExtractionError;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, Local, NaiveDate};
use scraper::{ElementRef, Html, Selector};

/// Raw date text recorded when no date could be found on the page
pub const DATE_NOT_FOUND: &str = "Date not found";

const MONTHS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

/// Date locations, most specific first
const DATE_SELECTORS: &[&str] = &[
    "div.byline-wrapper div[class*='color-pub-secondary-text'] > div",
    "div[class*='date'][class*='pub-secondary']",
    "time[datetime]",
    "article time[datetime]",
    "div.post-header time[datetime]",
    "span.post-meta-date",
    "div.post-date",
    "div.post-meta time",
    "span[class*='date']",
];

/// Body containers, most specific first
const CONTENT_SELECTORS: &[&str] = &[
    "div.available-content div.body.markup",
    "div.available-content",
    "article",
];

/// Turns a rendered post page into its fields
pub trait Extractor: Send + Sync {
    /// Extracts a post
    ///
    /// # Arguments
    ///
    /// * `url` - URL the page was rendered from, for error reporting
    /// * `html` - Rendered page HTML
    fn extract(&self, url: &str, html: &str) -> Result<ExtractedPost, ExtractionError>;
}

/// Extractor for the publication platform's post markup
#[derive(Debug, Clone, Copy, Default)]
pub struct PostExtractor;

impl Extractor for PostExtractor {
    fn extract(&self, url: &str, html: &str) -> Result<ExtractedPost, ExtractionError> {
        let document = Html::parse_document(html);

        let content = CONTENT_SELECTORS
            .iter()
            .find_map(|css| select_first(&document, css))
            .ok_or_else(|| ExtractionError::MissingContent {
                url: url.to_string(),
            })?;

        let title = select_text(&document, "h1.post-title, h2")
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Untitled".to_string());
        let subtitle = select_text(&document, "h3.subtitle").unwrap_or_default();
        let like_count = select_text(&document, "a.post-ufi-button .label")
            .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()))
            .unwrap_or_else(|| "0".to_string());

        let raw_date = find_date_text(&document);
        let date = raw_date
            .as_deref()
            .and_then(normalize_date)
            .unwrap_or_else(DateKey::sentinel);

        Ok(ExtractedPost {
            title,
            subtitle,
            raw_date: raw_date.unwrap_or_else(|| DATE_NOT_FOUND.to_string()),
            date,
            like_count,
            content_html: content.html(),
        })
    }
}

fn select_first<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).next()
}

fn select_text(document: &Html, css: &str) -> Option<String> {
    select_first(document, css).map(|el| el.text().collect::<String>().trim().to_string())
}

/// True if some whole word of the text is a month name or its abbreviation
fn has_month(text: &str) -> bool {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .any(is_month_word)
}

fn is_month_word(word: &str) -> bool {
    if word.len() < 3 {
        return false;
    }
    let word = word.to_ascii_lowercase();
    MONTHS.iter().any(|name| name.starts_with(&word))
}

/// Finds the first piece of date text on the page
///
/// For each selector hit, a `datetime` attribute wins; otherwise the innermost
/// child `div` that names a month; otherwise the `∙`-separated part of the
/// element text that names a month (or, failing that, has a digit).
fn find_date_text(document: &Html) -> Option<String> {
    DATE_SELECTORS
        .iter()
        .filter_map(|css| select_first(document, css))
        .find_map(date_text_of)
}

fn date_text_of(element: ElementRef<'_>) -> Option<String> {
    if let Some(attr) = element.value().attr("datetime") {
        let attr = attr.trim();
        if !attr.is_empty() {
            return Some(attr.to_string());
        }
    }

    if let Ok(div) = Selector::parse("div") {
        let innermost = element.select(&div).find(|child| {
            child.id() != element.id()
                && has_month(&child.text().collect::<String>())
                && !child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .any(|c| c.value().name() == "div")
        });
        if let Some(child) = innermost {
            return Some(child.text().collect::<String>().trim().to_string());
        }
    }

    let text = element.text().collect::<String>();
    let parts: Vec<&str> = text.split('∙').map(str::trim).collect();
    parts
        .iter()
        .find(|p| has_month(p))
        .or_else(|| parts.iter().find(|p| p.chars().any(|c| c.is_ascii_digit())))
        .map(|p| p.to_string())
}

/// Normalizes free-form date text to a `YYYYMMDD` key
///
/// Best effort: RFC 3339 timestamps, ISO dates, English month-name dates
/// (a missing year means the current year) and a few relative forms such as
/// "yesterday" or "3 days ago". Returns None when nothing matches.
pub fn normalize_date(raw: &str) -> Option<DateKey> {
    normalize_date_at(raw, Local::now().date_naive())
}

/// [`normalize_date`] relative to a fixed `today`
pub fn normalize_date_at(raw: &str, today: NaiveDate) -> Option<DateKey> {
    let text = raw.trim().trim_end_matches('.');
    if text.is_empty() || text == DATE_NOT_FOUND {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(DateKey::from_date(ts.date_naive()));
    }
    if let Some(prefix) = text.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
            return Some(DateKey::from_date(date));
        }
    }

    for format in ["%b %d, %Y", "%B %d, %Y", "%d %b %Y", "%d %B %Y", "%b %d %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(DateKey::from_date(date));
        }
    }

    let with_year = format!("{} {}", text.trim_end_matches(','), today.year());
    for format in ["%b %d %Y", "%B %d %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&with_year, format) {
            return Some(DateKey::from_date(date));
        }
    }

    relative_date(&text.to_lowercase(), today).map(DateKey::from_date)
}

fn relative_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if text == "today" || text == "just now" {
        return Some(today);
    }
    if text == "yesterday" {
        return today.pred_opt();
    }

    let rest = text.strip_suffix(" ago")?;
    let mut words = rest.split_whitespace();
    let count: i64 = words.next()?.parse().ok()?;
    let unit = words.next()?;
    let days = if unit.starts_with('d') {
        count
    } else if unit.starts_with('w') {
        count * 7
    } else if unit.starts_with("mo") {
        count * 30
    } else if unit.starts_with('h') || unit.starts_with('m') || unit.starts_with('s') {
        0
    } else {
        return None;
    };
    today.checked_sub_signed(ChronoDuration::days(days))
}
