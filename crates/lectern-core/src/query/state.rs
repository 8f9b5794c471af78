//! Canonical query parameters for the book list.

use crate::config::QueryConfig;
use serde::{Deserialize, Serialize};

/// Sort field accepted by the list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Title,
    Author,
    CreatedAt,
    Rating,
    FinishedAt,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::Author => "author",
            SortField::CreatedAt => "created_at",
            SortField::Rating => "rating",
            SortField::FinishedAt => "finished_at",
        }
    }

    /// Direction implied by the field: alphabetic fields read naturally
    /// ascending, temporal and quality fields newest/best first.
    pub fn default_direction(&self) -> SortDirection {
        match self {
            SortField::Title | SortField::Author => SortDirection::Asc,
            SortField::CreatedAt | SortField::Rating | SortField::FinishedAt => {
                SortDirection::Desc
            }
        }
    }
}

impl std::fmt::Display for SortField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Filter dimension the UI exposes as a dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Status,
    Format,
    Genre,
}

/// The canonical, serializable description of the active list view.
///
/// Only [`crate::query::QuerySync`] mutates this; renderers receive clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryState {
    pub search: String,
    pub status: Option<String>,
    pub format: Option<String>,
    pub genre: Option<String>,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub page: u32,
    pub per_page: u32,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: None,
            format: None,
            genre: None,
            sort_field: SortField::CreatedAt,
            sort_direction: SortField::CreatedAt.default_direction(),
            page: 1,
            per_page: QueryConfig::DEFAULT_PAGE_SIZE,
        }
    }
}

impl QueryState {
    /// Serialize to the canonical wire query string.
    ///
    /// Empty and absent filter values are omitted entirely rather than sent
    /// as blank parameters, keeping the server's cache key stable.
    pub fn to_query_string(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if !self.search.trim().is_empty() {
            parts.push(format!("search={}", urlencoding::encode(self.search.trim())));
        }
        if let Some(ref status) = self.status {
            if !status.is_empty() {
                parts.push(format!("status={}", urlencoding::encode(status)));
            }
        }
        if let Some(ref format) = self.format {
            if !format.is_empty() {
                parts.push(format!("format={}", urlencoding::encode(format)));
            }
        }
        if let Some(ref genre) = self.genre {
            if !genre.is_empty() {
                parts.push(format!("genre={}", urlencoding::encode(genre)));
            }
        }
        parts.push(format!("sort_by={}", self.sort_field.as_str()));
        parts.push(format!("sort_order={}", self.sort_direction.as_str()));
        parts.push(format!("page={}", self.page));
        parts.push(format!("per_page={}", self.per_page));

        parts.join("&")
    }

    /// Filter value for a dimension.
    pub fn filter(&self, field: FilterField) -> Option<&str> {
        match field {
            FilterField::Status => self.status.as_deref(),
            FilterField::Format => self.format.as_deref(),
            FilterField::Genre => self.genre.as_deref(),
        }
    }

    pub(crate) fn set_filter(&mut self, field: FilterField, value: Option<String>) {
        let value = value.filter(|v| !v.is_empty());
        match field {
            FilterField::Status => self.status = value,
            FilterField::Format => self.format = value,
            FilterField::Genre => self.genre = value,
        }
    }
}
