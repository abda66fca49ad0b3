//! Wire models for Discogs API responses
//!
//! Fixed structs decoded field-by-field. Required fields that are absent
//! fail the decode (surfaced as `InvalidResponse` by the client); optional
//! list fields default to empty rather than failing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An artist credited on a release
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub resource_url: String,
}

/// A label entry with its catalog number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub catno: String,
}

/// Media format (Vinyl, CD, ...) with qualifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Format {
    pub name: String,
    pub qty: String,
    #[serde(default)]
    pub descriptions: Vec<String>,
}

/// A user note attached to a collection instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub field_id: i64,
    pub value: String,
}

/// Core release metadata nested inside each collection entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicInformation {
    pub id: i64,
    pub title: String,
    pub year: i32,
    pub artists: Vec<Artist>,
    pub labels: Vec<Label>,
    pub formats: Vec<Format>,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub thumb: String,
    pub cover_image: String,
}

impl BasicInformation {
    /// Primary artist name, or "Unknown Artist" when the credit list is empty.
    pub fn primary_artist(&self) -> &str {
        self.artists
            .first()
            .map_or("Unknown Artist", |a| a.name.as_str())
    }

    /// Primary label name, or "Unknown Label" when no label is listed.
    pub fn primary_label(&self) -> &str {
        self.labels
            .first()
            .map_or("Unknown Label", |l| l.name.as_str())
    }

    /// Catalog number of the primary label, empty when no label is listed.
    pub fn catalog_number(&self) -> &str {
        self.labels.first().map_or("", |l| l.catno.as_str())
    }

    /// Comma-separated format names.
    pub fn format_description(&self) -> String {
        self.formats
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// One entry in a user's collection
///
/// Identity is the release `id`. Values are immutable once decoded and
/// owned by whatever sequence they were yielded into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub id: i64,
    pub instance_id: i64,
    pub date_added: DateTime<Utc>,
    pub rating: i32,
    pub basic_information: BasicInformation,
    #[serde(default)]
    pub notes: Vec<Note>,
}

impl Release {
    /// Primary artist name (shortcut into `basic_information`).
    pub fn artist(&self) -> &str {
        self.basic_information.primary_artist()
    }

    /// Release title (shortcut into `basic_information`).
    pub fn title(&self) -> &str {
        &self.basic_information.title
    }

    /// Release year (shortcut into `basic_information`).
    pub fn year(&self) -> i32 {
        self.basic_information.year
    }

    /// Full-size cover image URL.
    pub fn cover_url(&self) -> &str {
        &self.basic_information.cover_image
    }

    /// Thumbnail image URL.
    pub fn thumb_url(&self) -> &str {
        &self.basic_information.thumb
    }

    /// Public release page on discogs.com.
    pub fn webpage_url(&self) -> String {
        format!("https://www.discogs.com/release/{}", self.id)
    }

    /// All note values joined with newlines, empty when there are none.
    pub fn notes_joined(&self) -> String {
        self.notes
            .iter()
            .map(|n| n.value.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Pagination envelope carried by every collection page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub pages: u32,
    pub per_page: u32,
    pub items: u64,
}

impl Pagination {
    /// True when pages remain after this one.
    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }

    /// True when this is the final page.
    pub fn is_last(&self) -> bool {
        self.page >= self.pages
    }

    /// Enforce `1 <= page <= pages`. A violating envelope is an API bug,
    /// not something downstream traversal logic should have to reason about.
    pub fn validate(&self) -> Result<()> {
        if self.page < 1 || self.pages < 1 || self.page > self.pages {
            return Err(Error::invalid_response(format!(
                "pagination envelope out of range: page {} of {}",
                self.page, self.pages
            )));
        }
        Ok(())
    }
}

/// A single page of collection releases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionPage {
    pub pagination: Pagination,
    pub releases: Vec<Release>,
}

impl CollectionPage {
    /// Number of releases on this page.
    pub fn release_count(&self) -> usize {
        self.releases.len()
    }
}

/// Collection value statistics
///
/// The API formats these as currency strings ("€1,234.56"), so they stay
/// strings here; parsing money is a consumer concern.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionValue {
    #[serde(default)]
    pub minimum: String,
    #[serde(default)]
    pub median: String,
    #[serde(default)]
    pub maximum: String,
}

impl CollectionValue {
    /// One-line display summary of the value range.
    pub fn summary(&self) -> String {
        format!(
            "Min: {}, Median: {}, Max: {}",
            self.minimum, self.median, self.maximum
        )
    }
}
