//! Notification message rendering
//!
//! This module turns a list of new entries into a message with a plain-text
//! table and an HTML table, both with size, description and detail link
//! columns.

use crate::listing::ListingRecord;

/// A rendered notification, independent of transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Renders the message for `entries`
///
/// # Arguments
///
/// * `entries` - The relevant new entries, in page order
/// * `subject` - Subject line from the configuration
///
/// # Returns
///
/// The rendered subject, plain-text body and HTML body
pub fn render_notification(entries: &[ListingRecord], subject: &str) -> Notification {
    Notification {
        subject: subject.to_string(),
        text: format_text_table(entries),
        html: format_html_table(entries),
    }
}

/// Formats entries as an aligned plain-text table
pub fn format_text_table(entries: &[ListingRecord]) -> String {
    let size_width = entries
        .iter()
        .map(|e| e.size.chars().count())
        .max()
        .unwrap_or(0)
        .max("Size".len());
    let date_width = entries
        .iter()
        .map(|e| e.date.chars().count())
        .max()
        .unwrap_or(0)
        .max("Date".len());

    let mut text = String::new();
    text.push_str(&format!("New listings found: {}\n\n", entries.len()));
    text.push_str(&format!(
        "{:<size_width$}  {:<date_width$}  Description\n",
        "Size",
        "Date",
        size_width = size_width,
        date_width = date_width
    ));
    text.push_str(&format!(
        "{}  {}  {}\n",
        "-".repeat(size_width),
        "-".repeat(date_width),
        "-".repeat(11)
    ));

    for entry in entries {
        text.push_str(&format!(
            "{:<size_width$}  {:<date_width$}  {}\n",
            entry.size,
            entry.date,
            entry.description,
            size_width = size_width,
            date_width = date_width
        ));
        if let Some(link) = &entry.link {
            text.push_str(&format!(
                "{:<pad$}  {}\n",
                "",
                link,
                pad = size_width + 2 + date_width
            ));
        }
    }

    text
}

/// Formats entries as an HTML document with one table row per entry
pub fn format_html_table(entries: &[ListingRecord]) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html>\n<body>\n");
    html.push_str(&format!(
        "<p>New listings found: {}</p>\n",
        entries.len()
    ));
    html.push_str("<table border=\"1\" cellpadding=\"4\" cellspacing=\"0\">\n");
    html.push_str("<tr><th>Size</th><th>Date</th><th>Description</th><th>Link</th></tr>\n");

    for entry in entries {
        let link = match &entry.link {
            Some(link) => format!(
                "<a href=\"{}\">Detail</a>",
                escape_html(link)
            ),
            None => String::new(),
        };
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            escape_html(&entry.size),
            escape_html(&entry.date),
            escape_html(&entry.description),
            link
        ));
    }

    html.push_str("</table>\n</body>\n</html>\n");
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
