//! Query state and synchronization for the book list view.
//!
//! [`QueryState`] is the canonical description of what the list shows;
//! [`QuerySync`] is its single mutation entry point and the place where
//! debouncing, page-reset rules and stale-response suppression live.

mod pagination;
mod state;
mod sync;

pub use pagination::{page_items, total_pages, PageItem};
pub use state::{FilterField, QueryState, SortDirection, SortField};
pub use sync::{ListQuery, ListView, QuerySync, ViewStatus};
