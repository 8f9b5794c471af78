//! Network plumbing: transport trait, HTTP client, and request routing.
//!
//! This module provides:
//! - The [`Fetch`] trait seam so routing and API logic are testable with
//!   mock transports
//! - A reqwest-backed [`HttpClient`]
//! - The [`RequestRouter`] with its dual caching policy

mod client;
mod router;

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

pub use client::HttpClient;
pub use router::{RequestRouter, RouteClass};

/// HTTP method of an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

/// An outgoing request, addressed by path relative to the app origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub path: String,
    /// JSON body for POST/PATCH requests.
    pub body: Option<String>,
}

impl FetchRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Option<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body,
        }
    }

    pub fn patch(path: impl Into<String>, body: String) -> Self {
        Self {
            method: Method::Patch,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: None,
        }
    }
}

/// A fetched (or synthesized) response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
    /// Served from the offline cache rather than the network.
    pub from_cache: bool,
    /// Synthesized because the backend was unreachable.
    pub offline: bool,
}

impl FetchResponse {
    pub fn new(status: u16, content_type: Option<String>, body: Bytes) -> Self {
        Self {
            status,
            content_type,
            body,
            from_cache: false,
            offline: false,
        }
    }

    /// Whether the status is a success status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport seam for issuing requests.
///
/// Implemented by [`HttpClient`] for production and by in-memory fakes in
/// tests. A transport error (unreachable host, timeout) is an `Err`; an HTTP
/// error status is an `Ok` response with that status.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}
