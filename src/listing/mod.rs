//! Listing records and the change-detection rules applied to them
//!
//! This module defines:
//! - `ListingRecord`, one auction entry extracted from the listing page
//! - `TargetSizes`, the set of flat sizes worth a notification
//! - The diff between the current and the previous snapshot

mod diff;

pub use diff::{compute_relevant_new, new_entries, ColdStart};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

lazy_static! {
    // A whole size token such as "3+1"
    static ref SIZE_TOKEN_REGEX: Regex = Regex::new(r"^\d\+\d$").unwrap();
}

/// Default sizes that trigger a notification
pub const DEFAULT_TARGET_SIZES: [&str; 9] = [
    "0+3", "0+4", "0+5", "1+3", "3+1", "1+4", "4+1", "1+5", "5+1",
];

/// One flat-auction entry from the listing page
///
/// Two records are the same entry only if all four fields are equal. A
/// reworded description therefore makes a record "new" again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingRecord {
    /// Room configuration, e.g. "3+1"
    pub size: String,

    /// Text of the block the date was found in, without link labels
    pub description: String,

    /// Auction date as written on the page (DD.MM.YYYY)
    pub date: String,

    /// Absolute URL of the detail page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl ListingRecord {
    pub fn new(
        size: impl Into<String>,
        description: impl Into<String>,
        date: impl Into<String>,
        link: Option<String>,
    ) -> Self {
        Self {
            size: size.into(),
            description: description.into(),
            date: date.into(),
            link,
        }
    }
}

impl fmt::Display for ListingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.size, self.date, self.description)?;
        if let Some(link) = &self.link {
            write!(f, " <{}>", link)?;
        }
        Ok(())
    }
}

/// Returns true if `token` is exactly one size token such as "3+1"
pub fn is_size_token(token: &str) -> bool {
    SIZE_TOKEN_REGEX.is_match(token)
}

/// Set of flat sizes that are worth a notification
///
/// Matching is exact and case-sensitive: "3+1" matches, "13+1" does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct TargetSizes {
    sizes: BTreeSet<String>,
}

impl TargetSizes {
    pub fn new<I, S>(sizes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sizes: sizes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, size: &str) -> bool {
        self.sizes.contains(size)
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.sizes.iter().map(String::as_str)
    }
}

impl Default for TargetSizes {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_SIZES)
    }
}

impl From<Vec<String>> for TargetSizes {
    fn from(sizes: Vec<String>) -> Self {
        Self::new(sizes)
    }
}

impl From<TargetSizes> for Vec<String> {
    fn from(targets: TargetSizes) -> Self {
        targets.sizes.into_iter().collect()
    }
}
