//! Data access layer: typed endpoints over a cached library service.
//!
//! Every query declares the cache key it provides and every mutation declares what
//! it invalidates (`Endpoint::provides` / `Endpoint::invalidates`). Views go through
//! `LibraryApi` and never touch the cache directly.

use std::sync::Arc;

use crate::cache::Invalidation;

use super::cache::{LibraryCache, LibraryKey, LibrarySubscription, Tag};
use super::client::LibraryService;
use super::error::ApiError;
use super::types::{Book, BookInput, BookPatch, BorrowRequest, BorrowSummaryEntry};

/// The operations of the library service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
  ListBooks,
  GetBook { id: String },
  CreateBook,
  UpdateBook { id: String },
  DeleteBook { id: String },
  BorrowSummary,
  BorrowBook { book: String },
}

impl Endpoint {
  /// Cache key a query populates (None for mutations)
  pub fn provides(&self) -> Option<LibraryKey> {
    match self {
      Endpoint::ListBooks => Some(LibraryKey::Books),
      Endpoint::GetBook { id } => Some(LibraryKey::Book { id: id.clone() }),
      Endpoint::BorrowSummary => Some(LibraryKey::BorrowSummary),
      Endpoint::CreateBook
      | Endpoint::UpdateBook { .. }
      | Endpoint::DeleteBook { .. }
      | Endpoint::BorrowBook { .. } => None,
    }
  }

  /// What a successful call marks stale. Queries invalidate nothing.
  pub fn invalidates(&self) -> Vec<Invalidation<LibraryKey>> {
    match self {
      Endpoint::ListBooks | Endpoint::GetBook { .. } | Endpoint::BorrowSummary => Vec::new(),
      Endpoint::CreateBook => vec![Invalidation::Tag(Tag::BookData)],
      Endpoint::UpdateBook { id } | Endpoint::DeleteBook { id } => vec![
        Invalidation::Tag(Tag::BookData),
        Invalidation::Key(LibraryKey::Book { id: id.clone() }),
      ],
      Endpoint::BorrowBook { book } => vec![
        Invalidation::Tag(Tag::BorrowSummary),
        Invalidation::Tag(Tag::BookData),
        Invalidation::Key(LibraryKey::Book { id: book.clone() }),
      ],
    }
  }
}

/// Cached, typed access to the library service.
///
/// Cloning shares the service and the cache.
#[derive(Clone)]
pub struct LibraryApi {
  service: Arc<dyn LibraryService>,
  cache: LibraryCache,
}

impl LibraryApi {
  pub fn new(service: Arc<dyn LibraryService>, cache: LibraryCache) -> Self {
    Self { service, cache }
  }

  pub fn cache(&self) -> &LibraryCache {
    &self.cache
  }

  /// Observe a query's key; the subscription reports invalidations.
  pub fn subscribe(&self, endpoint: &Endpoint) -> Option<LibrarySubscription> {
    endpoint.provides().map(|key| self.cache.subscribe(key))
  }

  fn settle<T>(&self, endpoint: Endpoint, result: Result<T, ApiError>) -> Result<T, ApiError> {
    if result.is_ok() {
      self.cache.invalidate(&endpoint.invalidates());
    }
    result
  }

  // --------------------------------------------------------------------------
  // Queries
  // --------------------------------------------------------------------------

  pub async fn list_books(&self) -> Result<Vec<Book>, ApiError> {
    let service = Arc::clone(&self.service);
    self
      .cache
      .fetch(LibraryKey::Books, move || async move {
        service.list_books().await
      })
      .await
  }

  pub async fn get_book(&self, id: &str) -> Result<Book, ApiError> {
    let service = Arc::clone(&self.service);
    let book_id = id.to_string();
    self
      .cache
      .fetch(LibraryKey::Book { id: id.to_string() }, move || async move {
        service.get_book(&book_id).await
      })
      .await
  }

  pub async fn get_borrow_summary(&self) -> Result<Vec<BorrowSummaryEntry>, ApiError> {
    let service = Arc::clone(&self.service);
    self
      .cache
      .fetch(LibraryKey::BorrowSummary, move || async move {
        service.borrow_summary().await
      })
      .await
  }

  // --------------------------------------------------------------------------
  // Mutations
  // --------------------------------------------------------------------------

  pub async fn create_book(&self, input: BookInput) -> Result<Book, ApiError> {
    let result = self.service.create_book(&input).await;
    self.settle(Endpoint::CreateBook, result)
  }

  /// Update a book. A patch that changes `copies` without `available` gets
  /// `available = copies > 0`.
  pub async fn update_book(&self, id: &str, patch: BookPatch) -> Result<Book, ApiError> {
    let patch = patch.with_derived_availability();
    let result = self.service.update_book(id, &patch).await;
    self.settle(Endpoint::UpdateBook { id: id.to_string() }, result)
  }

  pub async fn delete_book(&self, id: &str) -> Result<(), ApiError> {
    let result = self.service.delete_book(id).await;
    self.settle(Endpoint::DeleteBook { id: id.to_string() }, result)
  }

  pub async fn borrow_book(&self, request: BorrowRequest) -> Result<(), ApiError> {
    let result = self.service.borrow_book(&request).await;
    self.settle(
      Endpoint::BorrowBook {
        book: request.book.clone(),
      },
      result,
    )
  }
}
