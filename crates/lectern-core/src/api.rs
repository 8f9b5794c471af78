//! Typed client for the books REST API.
//!
//! Every call goes through the [`RequestRouter`], so the dual caching
//! policy applies uniformly. Non-2xx responses surface the body's `detail`
//! verbatim when present and fall back to a generic HTTP-status message.

use crate::error::{LecternError, Result};
use crate::models::{
    Book, BookList, BookMetadata, CoverCandidates, RecommendationResponse,
};
use crate::network::{FetchRequest, FetchResponse, RequestRouter};
use crate::query::{ListQuery, QueryState};
use crate::scan::IsbnLookup;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Client for `/api/books` and its sub-resources.
#[derive(Clone)]
pub struct BooksClient {
    router: Arc<RequestRouter>,
}

impl BooksClient {
    pub fn new(router: Arc<RequestRouter>) -> Self {
        Self { router }
    }

    /// Fetch one page of the book list for a query state.
    pub async fn list(&self, query: &QueryState) -> Result<BookList> {
        let path = format!("/api/books?{}", query.to_query_string());
        self.request_json(FetchRequest::get(path)).await
    }

    /// Fetch a single book.
    pub async fn get(&self, id: i64) -> Result<Book> {
        self.request_json(FetchRequest::get(format!("/api/books/{}", id)))
            .await
    }

    /// Create a book. `payload` is the creation form serialized by the
    /// caller; the server assigns the id.
    pub async fn create(&self, payload: &serde_json::Value) -> Result<Book> {
        self.request_json(FetchRequest::post(
            "/api/books",
            Some(payload.to_string()),
        ))
        .await
    }

    /// Patch fields of a book.
    pub async fn update(&self, id: i64, payload: &serde_json::Value) -> Result<Book> {
        self.request_json(FetchRequest::patch(
            format!("/api/books/{}", id),
            payload.to_string(),
        ))
        .await
    }

    /// Delete a book.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let response = self
            .router
            .handle(&FetchRequest::delete(format!("/api/books/{}", id)))
            .await?;
        check_status(&response)?;
        Ok(())
    }

    /// Mark a book as being read.
    pub async fn start_reading(&self, id: i64) -> Result<Book> {
        self.request_json(FetchRequest::post(
            format!("/api/books/{}/start-reading", id),
            None,
        ))
        .await
    }

    /// Mark a book finished, optionally rating it.
    pub async fn finish_reading(&self, id: i64, rating: Option<u8>) -> Result<Book> {
        let path = match rating {
            Some(rating) => format!("/api/books/{}/finish-reading?rating={}", id, rating),
            None => format!("/api/books/{}/finish-reading", id),
        };
        self.request_json(FetchRequest::post(path, None)).await
    }

    /// Update the current page of a book.
    pub async fn update_progress(&self, id: i64, current_page: u32) -> Result<Book> {
        self.request_json(FetchRequest::post(
            format!("/api/books/{}/update-progress?current_page={}", id, current_page),
            None,
        ))
        .await
    }

    /// Search cover candidates by title and author.
    pub async fn search_covers(&self, title: &str, author: Option<&str>) -> Result<Vec<String>> {
        let mut path = format!(
            "/api/books/search/covers?title={}",
            urlencoding::encode(title)
        );
        if let Some(author) = author {
            path.push_str(&format!("&author={}", urlencoding::encode(author)));
        }
        self.request_json(FetchRequest::get(path)).await
    }

    /// Cover candidates for an existing book.
    pub async fn covers_for(&self, id: i64) -> Result<CoverCandidates> {
        self.request_json(FetchRequest::get(format!("/api/books/{}/covers", id)))
            .await
    }

    /// Set a book's cover.
    pub async fn set_cover(&self, id: i64, cover_url: &str) -> Result<()> {
        let payload = serde_json::json!({ "cover_url": cover_url });
        let response = self
            .router
            .handle(&FetchRequest::patch(
                format!("/api/books/{}/cover", id),
                payload.to_string(),
            ))
            .await?;
        check_status(&response)?;
        Ok(())
    }

    /// AI reading recommendations seeded from a book.
    pub async fn recommendations(&self, id: i64) -> Result<RecommendationResponse> {
        self.request_json(FetchRequest::get(format!("/api/ai/recommendations/{}", id)))
            .await
    }

    async fn request_json<T: DeserializeOwned>(&self, request: FetchRequest) -> Result<T> {
        let response = self.router.handle(&request).await?;
        check_status(&response)?;
        serde_json::from_slice(&response.body).map_err(|e| LecternError::Json {
            message: format!("Failed to parse response for {}: {}", request.path, e),
            source: Some(e),
        })
    }
}

/// Map a routed response to the error taxonomy: offline payloads become
/// typed offline errors, other non-2xx statuses carry the body's detail.
fn check_status(response: &FetchResponse) -> Result<()> {
    if response.offline {
        return Err(LecternError::Offline {
            message: extract_detail(response)
                .unwrap_or_else(|| "backend unreachable".to_string()),
        });
    }
    if response.is_success() {
        return Ok(());
    }
    Err(LecternError::Api {
        status: response.status,
        detail: extract_detail(response),
    })
}

fn extract_detail(response: &FetchResponse) -> Option<String> {
    serde_json::from_slice::<serde_json::Value>(&response.body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
}

#[async_trait]
impl ListQuery for BooksClient {
    async fn fetch_page(&self, query: &QueryState) -> Result<BookList> {
        self.list(query).await
    }
}

#[async_trait]
impl IsbnLookup for BooksClient {
    async fn lookup_isbn(&self, code: &str) -> Result<BookMetadata> {
        match self
            .request_json(FetchRequest::get(format!("/api/books/isbn/{}", code)))
            .await
        {
            Err(LecternError::Api { status: 404, .. }) => Err(LecternError::IsbnNotFound {
                code: code.to_string(),
            }),
            other => other,
        }
    }
}
