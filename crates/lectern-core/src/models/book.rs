//! Book records and related wire types.
//!
//! Field names and enum values mirror the backend's REST payloads; these
//! types are deserialization targets only, the client never invents ids.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Reading status of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    Planned,
    Reading,
    Finished,
    OnHold,
    Dropped,
    Wishlist,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Planned => "planned",
            BookStatus::Reading => "reading",
            BookStatus::Finished => "finished",
            BookStatus::OnHold => "on_hold",
            BookStatus::Dropped => "dropped",
            BookStatus::Wishlist => "wishlist",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "planned" => Some(BookStatus::Planned),
            "reading" => Some(BookStatus::Reading),
            "finished" => Some(BookStatus::Finished),
            "on_hold" => Some(BookStatus::OnHold),
            "dropped" => Some(BookStatus::Dropped),
            "wishlist" => Some(BookStatus::Wishlist),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Physical format of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookFormat {
    Paper,
    Ebook,
    Audiobook,
}

impl BookFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookFormat::Paper => "paper",
            BookFormat::Ebook => "ebook",
            BookFormat::Audiobook => "audiobook",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "paper" => Some(BookFormat::Paper),
            "ebook" => Some(BookFormat::Ebook),
            "audiobook" => Some(BookFormat::Audiobook),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An author record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
}

/// A genre record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// A full book record as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub language: String,
    pub format: BookFormat,
    pub status: BookStatus,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub started_at: Option<NaiveDate>,
    #[serde(default)]
    pub finished_at: Option<NaiveDate>,
    #[serde(default)]
    pub published_year: Option<i32>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    /// Reading progress as a fraction of total pages, computed server-side.
    #[serde(default)]
    pub progress: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One page of a book-list query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookList {
    pub items: Vec<Book>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
}

impl BookList {
    /// An empty result page.
    pub fn empty(page: u32, per_page: u32) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page,
            per_page,
        }
    }
}

/// Metadata returned by an ISBN lookup, used to pre-fill the creation form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub published_year: Option<i32>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
}

/// Cover candidates for an existing book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverCandidates {
    pub covers: Vec<String>,
    #[serde(default)]
    pub current_cover: Option<String>,
}

/// One AI reading recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub author: String,
    pub reason: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Response of the AI recommendations endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub error: Option<String>,
}
