//! Listing extraction from the auction page HTML
//!
//! The page has no structured markup per entry. A flat size ("3+1") and the
//! link to the detail document usually sit in blocks *before* the block that
//! carries the auction date, so the extractor walks the blocks in document
//! order and carries the last seen size and link forward:
//!
//! 1. Split the document into text units (outermost block elements)
//! 2. For each unit, update the carried link from its first usable anchor
//! 3. Compute the unit text with anchor labels removed
//! 4. Update the carried size from the first `\d\+\d` token
//! 5. On a `DD.MM.YYYY` date, emit a record if size (and link) are known

use crate::config::SourceConfig;
use crate::listing::ListingRecord;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;
use url::Url;

lazy_static! {
    static ref SIZE_REGEX: Regex = Regex::new(r"\d\+\d").unwrap();
    static ref DATE_REGEX: Regex = Regex::new(r"\d{2}\.\d{2}\.\d{4}").unwrap();
}

/// Elements whose boundaries separate words inside a unit
const SEPARATING_ELEMENTS: [&str; 7] = ["br", "p", "div", "li", "td", "th", "tr"];

/// Errors raised while setting up an `Extractor`
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid unit selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
}

/// Settings controlling how units are formed and when records are emitted
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// CSS selector for the unit elements
    pub unit_selector: String,

    /// Require a carried link before emitting a record
    pub require_link: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            unit_selector: crate::config::DEFAULT_UNIT_SELECTOR.to_string(),
            require_link: true,
        }
    }
}

/// One text-bearing block of the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextUnit {
    /// Unit text without anchor labels, whitespace collapsed
    pub text: String,

    /// First usable anchor target in the unit, already absolute
    pub link: Option<String>,
}

impl TextUnit {
    pub fn new(text: impl Into<String>, link: Option<String>) -> Self {
        Self {
            text: text.into(),
            link,
        }
    }
}

/// Turns listing page HTML into `ListingRecord`s
#[derive(Debug)]
pub struct Extractor {
    base_url: Url,
    units: Selector,
    anchors: Selector,
    require_link: bool,
}

impl Extractor {
    /// Creates an extractor resolving relative links against `base_url`
    pub fn new(base_url: Url, options: &ExtractOptions) -> Result<Self, ExtractError> {
        let units = parse_selector(&options.unit_selector)?;
        let anchors = parse_selector("a[href]")?;

        Ok(Self {
            base_url,
            units,
            anchors,
            require_link: options.require_link,
        })
    }

    /// Creates an extractor from the `[source]` configuration section
    pub fn from_config(source: &SourceConfig) -> Result<Self, ExtractError> {
        let base_url = Url::parse(source.effective_base_url())?;
        let options = ExtractOptions {
            unit_selector: source.unit_selector.clone(),
            require_link: source.require_link,
        };
        Self::new(base_url, &options)
    }

    /// Extracts listing records in document order
    ///
    /// No de-duplication happens here: two units with the same text produce
    /// two equal records.
    pub fn extract(&self, html: &str) -> Vec<ListingRecord> {
        let document = Html::parse_document(html);
        fold_units(self.text_units(&document), self.require_link)
    }

    /// Splits a parsed document into text units
    ///
    /// Only the outermost matching elements become units, so nested blocks
    /// (a `p` inside an `li`) are read once as part of their container.
    pub fn text_units(&self, document: &Html) -> Vec<TextUnit> {
        document
            .select(&self.units)
            .filter(|element| self.is_outermost(*element))
            .map(|element| self.read_unit(element))
            .collect()
    }

    fn is_outermost(&self, element: ElementRef<'_>) -> bool {
        !element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| self.units.matches(&ancestor))
    }

    fn read_unit(&self, element: ElementRef<'_>) -> TextUnit {
        let link = element
            .select(&self.anchors)
            .filter_map(|anchor| anchor.value().attr("href"))
            .find_map(|href| resolve_link(href, &self.base_url));

        TextUnit {
            text: text_without_anchors(element),
            link,
        }
    }
}

/// Runs the carry-over scan over a sequence of units
///
/// # Arguments
///
/// * `units` - Text units in document order
/// * `require_link` - Whether a record needs a carried link
///
/// # Returns
///
/// The emitted records, one per date-bearing unit that qualified
pub fn fold_units<I>(units: I, require_link: bool) -> Vec<ListingRecord>
where
    I: IntoIterator<Item = TextUnit>,
{
    units
        .into_iter()
        .fold(CarryOver::new(require_link), CarryOver::step)
        .records
}

/// Scan state carried from one unit to the next
#[derive(Debug)]
struct CarryOver {
    last_size: Option<String>,
    last_link: Option<String>,
    require_link: bool,
    records: Vec<ListingRecord>,
}

impl CarryOver {
    fn new(require_link: bool) -> Self {
        Self {
            last_size: None,
            last_link: None,
            require_link,
            records: Vec::new(),
        }
    }

    fn step(mut self, unit: TextUnit) -> Self {
        if let Some(link) = unit.link {
            self.last_link = Some(link);
        }

        if let Some(size) = SIZE_REGEX.find(&unit.text) {
            self.last_size = Some(size.as_str().to_string());
        }

        let Some(date) = DATE_REGEX.find(&unit.text) else {
            return self;
        };

        let link_ready = self.last_link.is_some() || !self.require_link;
        match &self.last_size {
            Some(size) if link_ready => {
                self.records.push(ListingRecord {
                    size: size.clone(),
                    description: unit.text.clone(),
                    date: date.as_str().to_string(),
                    link: self.last_link.clone(),
                });
            }
            _ => {
                tracing::trace!("Dropping dated unit without carried size/link: {}", unit.text);
            }
        }

        self
    }
}

/// Collects the text of `unit`, skipping everything inside `<a>` elements
fn text_without_anchors(unit: ElementRef<'_>) -> String {
    let mut raw = String::new();

    for node in unit.descendants() {
        match node.value() {
            Node::Text(text) => {
                let in_anchor = node
                    .ancestors()
                    .take_while(|ancestor| ancestor.id() != unit.id())
                    .filter_map(ElementRef::wrap)
                    .any(|element| element.value().name() == "a");
                if !in_anchor {
                    raw.push_str(text);
                }
            }
            Node::Element(element) if SEPARATING_ELEMENTS.contains(&element.name()) => {
                raw.push(' ');
            }
            _ => {}
        }
    }

    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolves a link href to an absolute URL
///
/// Returns None if the link is not usable as a detail link:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only links
/// - Invalid URLs or non-HTTP(S) URLs after resolution
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

fn parse_selector(selector: &str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> Extractor {
        let base_url = Url::parse("https://www.mesto-bohumin.cz/cz/radnice/licitace-bytu").unwrap();
        Extractor::new(base_url, &ExtractOptions::default()).unwrap()
    }

    fn page(body: &str) -> String {
        format!("<html><head><title>Licitace</title></head><body>{}</body></html>", body)
    }

    #[test]
    fn test_size_without_link_or_date_emits_nothing() {
        let html = page("<p>Byt 3+1, Nová 5, 2. patro</p>");
        assert!(extractor().extract(&html).is_empty());
    }

    #[test]
    fn test_size_carried_to_later_dated_block() {
        let html = page(
            r#"<p>Byt 3+1, Nová 5, 2. patro</p>
               <p><a href="/files/licitace-nova-5.pdf">Podmínky</a> Licitace proběhne 17.02.2025</p>"#,
        );
        let records = extractor().extract(&html);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size, "3+1");
        assert_eq!(records[0].date, "17.02.2025");
        assert_eq!(records[0].description, "Licitace proběhne 17.02.2025");
        assert_eq!(
            records[0].link.as_deref(),
            Some("https://www.mesto-bohumin.cz/files/licitace-nova-5.pdf")
        );
    }

    #[test]
    fn test_date_before_size_is_dropped() {
        let html = page(
            r#"<p>Aktualizováno 01.01.2025</p>
               <p>Byt 1+3 <a href="/byt-1">detail</a></p>
               <p>Licitace 20.01.2025</p>"#,
        );
        let records = extractor().extract(&html);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, "20.01.2025");
        assert_eq!(records[0].size, "1+3");
    }

    #[test]
    fn test_date_without_link_is_dropped_when_link_required() {
        let html = page("<p>Byt 3+1</p><p>Licitace 20.01.2025</p>");
        assert!(extractor().extract(&html).is_empty());
    }

    #[test]
    fn test_link_not_required() {
        let base_url = Url::parse("https://example.com/").unwrap();
        let options = ExtractOptions {
            require_link: false,
            ..ExtractOptions::default()
        };
        let extractor = Extractor::new(base_url, &options).unwrap();

        let records = extractor.extract(&page("<p>Byt 3+1</p><p>Licitace 20.01.2025</p>"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].link, None);
    }

    #[test]
    fn test_anchor_text_is_stripped_from_description() {
        let html = page(
            r#"<p>Byt 2+1 <a href="/old">3+1 z 01.01.2020</a> licitace 05.03.2025</p>"#,
        );
        let records = extractor().extract(&html);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size, "2+1");
        assert_eq!(records[0].date, "05.03.2025");
        assert_eq!(records[0].description, "Byt 2+1 licitace 05.03.2025");
    }

    #[test]
    fn test_first_match_wins_within_unit() {
        let html = page(
            r#"<p><a href="/a">x</a> Byt 4+1 nebo 1+4, 10.04.2025 a 11.04.2025</p>"#,
        );
        let records = extractor().extract(&html);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size, "4+1");
        assert_eq!(records[0].date, "10.04.2025");
    }

    #[test]
    fn test_link_and_size_are_overwritten() {
        let html = page(
            r#"<p>Byt 3+1 <a href="/prvni">detail</a></p>
               <p>Licitace 01.02.2025</p>
               <p>Byt 1+4 <a href="/druhy">detail</a></p>
               <p>Licitace 02.02.2025</p>
               <p>Náhradní termín 03.02.2025</p>"#,
        );
        let records = extractor().extract(&html);

        let summary: Vec<(&str, &str, &str)> = records
            .iter()
            .map(|r| (r.size.as_str(), r.date.as_str(), r.link.as_deref().unwrap()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("3+1", "01.02.2025", "https://www.mesto-bohumin.cz/prvni"),
                ("1+4", "02.02.2025", "https://www.mesto-bohumin.cz/druhy"),
                ("1+4", "03.02.2025", "https://www.mesto-bohumin.cz/druhy"),
            ]
        );
    }

    #[test]
    fn test_repeated_units_are_not_deduplicated() {
        let html = page(
            r#"<p>Byt 3+1 <a href="/a">detail</a></p>
               <p>Licitace 01.02.2025</p>
               <p>Licitace 01.02.2025</p>"#,
        );
        let records = extractor().extract(&html);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], records[1]);
    }

    #[test]
    fn test_nested_blocks_are_read_once() {
        let html = page(
            r#"<ul><li><p>Byt 3+1</p><p><a href="/a">detail</a> Licitace 01.02.2025</p></li></ul>"#,
        );
        let records = extractor().extract(&html);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "Byt 3+1 Licitace 01.02.2025");
    }

    #[test]
    fn test_text_outside_units_is_ignored() {
        let html = page(
            r#"<div>Byt 3+1 <a href="/a">detail</a> 01.02.2025</div><p>Bez údajů</p>"#,
        );
        assert!(extractor().extract(&html).is_empty());
    }

    #[test]
    fn test_table_cells_are_units() {
        let html = page(
            r#"<table><tr><td>Byt 3+1</td><td><a href="/a">detail</a></td><td>Licitace 01.02.2025</td></tr></table>"#,
        );
        let records = extractor().extract(&html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "Licitace 01.02.2025");
    }

    #[test]
    fn test_unusable_links_are_skipped() {
        let html = page(
            r##"<p>Byt 3+1 <a href="javascript:void(0)">tisk</a> <a href="#top">nahoru</a></p>
                <p>Licitace 01.02.2025</p>"##,
        );
        assert!(extractor().extract(&html).is_empty());

        let html = page(
            r##"<p>Byt 3+1 <a href="mailto:byty@example.com">email</a> <a href="detail.pdf">detail</a></p>
                <p>Licitace 01.02.2025</p>"##,
        );
        let records = extractor().extract(&html);
        assert_eq!(
            records[0].link.as_deref(),
            Some("https://www.mesto-bohumin.cz/cz/radnice/detail.pdf")
        );
    }

    #[test]
    fn test_line_breaks_and_whitespace_collapse() {
        let html = page("<p>Byt&nbsp;3+1<br>Licitace\n\n   01.02.2025 <a href=\"/a\">x</a></p>");
        let records = extractor().extract(&html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].description, "Byt 3+1 Licitace 01.02.2025");
    }

    #[test]
    fn test_fold_never_emits_before_size_and_link() {
        let units = vec![
            TextUnit::new("01.01.2025", None),
            TextUnit::new("Byt 3+1 02.01.2025", None),
            TextUnit::new("03.01.2025", Some("https://example.com/a".to_string())),
            TextUnit::new("04.01.2025", None),
        ];
        let records = fold_units(units, true);

        let dates: Vec<&str> = records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["03.01.2025", "04.01.2025"]);
        assert!(records.iter().all(|r| r.link.is_some() && r.size == "3+1"));
    }

    #[test]
    fn test_fold_preserves_unit_order() {
        let link = Some("https://example.com/a".to_string());
        let units = vec![
            TextUnit::new("Byt 1+3", link),
            TextUnit::new("c 30.12.2025", None),
            TextUnit::new("a 01.01.2025", None),
            TextUnit::new("b 15.06.2025", None),
        ];
        let records = fold_units(units, true);

        let dates: Vec<&str> = records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["30.12.2025", "01.01.2025", "15.06.2025"]);
    }

    #[test]
    fn test_invalid_selector() {
        let base_url = Url::parse("https://example.com/").unwrap();
        let options = ExtractOptions {
            unit_selector: "p[".to_string(),
            require_link: true,
        };
        assert!(matches!(
            Extractor::new(base_url, &options),
            Err(ExtractError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_from_config_uses_base_url() {
        let source = SourceConfig {
            url: "https://example.com/sub/page".to_string(),
            base_url: Some("https://files.example.com/".to_string()),
            unit_selector: "p".to_string(),
            require_link: true,
        };
        let extractor = Extractor::from_config(&source).unwrap();
        let records = extractor.extract(&page(
            r#"<p>Byt 3+1 <a href="doc.pdf">x</a> 01.02.2025</p>"#,
        ));
        assert_eq!(
            records[0].link.as_deref(),
            Some("https://files.example.com/doc.pdf")
        );
    }
}
