//! Lectern Core - Headless client core for the Lectern book catalog.
//!
//! This crate provides the resilience and state-coordination layer of the
//! Lectern single-page app: the offline shell cache, the request router with
//! its dual caching policy, the query synchronization engine behind the book
//! list, and the barcode scan session. It carries no UI bindings and can be
//! embedded in any shell.
//!
//! # Example
//!
//! ```rust,ignore
//! use lectern_library::Lectern;
//!
//! #[tokio::main]
//! async fn main() -> lectern_library::Result<()> {
//!     let app = Lectern::new("http://localhost:8000", "./lectern-data")?;
//!
//!     // Cache the app shell for offline use
//!     app.install_shell().await?;
//!
//!     // Drive the book list
//!     let mut view = app.query().subscribe();
//!     app.query().update_search("dune");
//!     view.changed().await.ok();
//!     println!("{} books", view.borrow().total);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod cancel;
pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod notify;
pub mod prefs;
pub mod query;
pub mod scan;

// Re-export commonly used types
pub use api::BooksClient;
pub use cache::{CacheBackend, CacheStore, CachedAsset, MemoryCache, SqliteCache};
pub use cancel::CancellationToken;
pub use error::{LecternError, Result};
pub use models::{Book, BookList, BookMetadata, BookStatus, BookFormat};
pub use network::{Fetch, FetchRequest, FetchResponse, HttpClient, RequestRouter, RouteClass};
pub use notify::{Notification, NotificationKind, Notifier};
pub use prefs::{Preferences, Theme, ViewDensity};
pub use query::{ListQuery, ListView, PageItem, QueryState, QuerySync, SortField, ViewStatus};
pub use scan::{BarcodeDecoder, Camera, IsbnLookup, ScanEvent, ScanOutcome, ScanSession, ScanState};

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Main entry point wiring the client core together.
///
/// Owns the preferences, the shell cache, the request router and the query
/// engine. Scan sessions are created per opening of the scan UI via
/// [`Lectern::start_scan`], with the books client as the identifier-lookup
/// collaborator.
pub struct Lectern {
    data_dir: PathBuf,
    prefs: RwLock<Preferences>,
    fetch: Arc<dyn Fetch>,
    cache: Arc<CacheStore>,
    books: Arc<BooksClient>,
    query: QuerySync,
    notifier: Notifier,
}

impl Lectern {
    /// File holding the persisted preferences inside the data dir.
    const PREFS_FILE: &'static str = "preferences.json";
    /// SQLite database holding the shell cache inside the data dir.
    const CACHE_FILE: &'static str = "shell-cache.sqlite";

    /// Create the client core against a backend origin, persisting state
    /// under `data_dir`.
    pub fn new(base_url: impl Into<String>, data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        let prefs = Preferences::load(&data_dir.join(Self::PREFS_FILE))?;

        let backend = Arc::new(SqliteCache::new(data_dir.join(Self::CACHE_FILE))?);
        let cache = Arc::new(CacheStore::new(backend));

        let fetch: Arc<dyn Fetch> = Arc::new(HttpClient::new(base_url)?);
        let router = Arc::new(RequestRouter::new(fetch.clone(), cache.clone()));
        let books = Arc::new(BooksClient::new(router));
        let query = QuerySync::new(books.clone());

        Ok(Self {
            data_dir,
            prefs: RwLock::new(prefs),
            fetch,
            cache,
            books,
            query,
            notifier: Notifier::new(),
        })
    }

    /// Fetch and stage the shell manifest, then activate the new generation
    /// and evict prior ones. A failed install leaves the previously-serving
    /// generation current.
    pub async fn install_shell(&self) -> Result<()> {
        self.cache.install(self.fetch.as_ref()).await?;
        self.cache.activate()?;
        Ok(())
    }

    /// The query synchronization engine for the book list.
    pub fn query(&self) -> &QuerySync {
        &self.query
    }

    /// The typed books API client.
    pub fn books(&self) -> &Arc<BooksClient> {
        &self.books
    }

    /// The shell cache store.
    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// The notification channel.
    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Snapshot of the persisted preferences.
    pub fn preferences(&self) -> Preferences {
        self.prefs.read().expect("prefs lock poisoned").clone()
    }

    /// Toggle the theme and persist the choice.
    pub fn toggle_theme(&self, system_prefers_dark: bool) -> Result<Theme> {
        let mut prefs = self.prefs.write().expect("prefs lock poisoned");
        let theme = prefs.toggle_theme(system_prefers_dark);
        prefs.save(&self.data_dir.join(Self::PREFS_FILE))?;
        Ok(theme)
    }

    /// Set the view density and persist the choice.
    pub fn set_density(&self, density: ViewDensity) -> Result<()> {
        let mut prefs = self.prefs.write().expect("prefs lock poisoned");
        prefs.density = density;
        prefs.save(&self.data_dir.join(Self::PREFS_FILE))
    }

    /// Create a book, surface the outcome as a notification, and refresh
    /// the list.
    pub async fn create_book(&self, payload: &serde_json::Value) -> Result<Book> {
        match self.books.create(payload).await {
            Ok(book) => {
                self.notifier
                    .notify(Notification::success(format!("Added \"{}\"", book.title)));
                self.query.refresh();
                Ok(book)
            }
            Err(e) => {
                self.notifier.notify(Notification::error(e.user_message()));
                Err(e)
            }
        }
    }

    /// Delete a book, surface the outcome as a notification, and refresh
    /// the list.
    pub async fn delete_book(&self, id: i64) -> Result<()> {
        match self.books.delete(id).await {
            Ok(()) => {
                self.notifier.notify(Notification::success("Book deleted"));
                self.query.refresh();
                Ok(())
            }
            Err(e) => {
                self.notifier.notify(Notification::error(e.user_message()));
                Err(e)
            }
        }
    }

    /// Create a scan session for the given camera and decoder, with the
    /// books client resolving accepted codes.
    pub fn start_scan(
        &self,
        camera: Arc<dyn Camera>,
        decoder: Arc<dyn BarcodeDecoder>,
    ) -> ScanSession {
        ScanSession::new(camera, decoder, self.books.clone())
    }
}
