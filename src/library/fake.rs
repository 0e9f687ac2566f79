//! In-memory library service for tests.
//!
//! Enforces the same business rules as the real service and reports failures
//! through `ApiError::from_response`, so the error classification under test is
//! the one the HTTP client uses.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::client::LibraryService;
use super::error::ApiError;
use super::types::{Book, BookInput, BookPatch, BookRef, BorrowRequest, BorrowSummaryEntry};

#[derive(Default)]
struct FakeState {
  books: BTreeMap<String, Book>,
  borrowed: BTreeMap<String, u64>,
  next_id: u64,
}

pub struct FakeLibrary {
  state: Mutex<FakeState>,
  requests: AtomicUsize,
  read_latency: Duration,
}

impl FakeLibrary {
  pub fn new() -> Self {
    Self {
      state: Mutex::new(FakeState::default()),
      requests: AtomicUsize::new(0),
      read_latency: Duration::ZERO,
    }
  }

  /// Delay read responses. A read answers with the state it saw on arrival,
  /// so writes landing in the meantime are not reflected. Writes apply at once.
  pub fn with_read_latency(mut self, latency: Duration) -> Self {
    self.read_latency = latency;
    self
  }

  /// Number of requests received so far
  pub fn requests(&self) -> usize {
    self.requests.load(Ordering::SeqCst)
  }

  async fn receive(&self) {
    self.requests.fetch_add(1, Ordering::SeqCst);
  }

  async fn respond<T>(&self, response: Result<T, ApiError>) -> Result<T, ApiError> {
    if !self.read_latency.is_zero() {
      tokio::time::sleep(self.read_latency).await;
    }
    response
  }

  fn not_found(id: &str) -> ApiError {
    let resource = format!("book {}", id);
    ApiError::from_response(404, br#"{"message":"Book not found"}"#, &resource)
  }

  fn validate(input: &BookInput) -> Result<(), ApiError> {
    let missing: Vec<&str> = [
      ("title", input.title.as_str()),
      ("author", input.author.as_str()),
      ("isbn", input.isbn.as_str()),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(field, _)| field)
    .collect();

    if missing.is_empty() {
      return Ok(());
    }

    let errors: serde_json::Map<String, serde_json::Value> = missing
      .iter()
      .map(|field| {
        (
          field.to_string(),
          serde_json::json!({ "message": format!("{} is required", field), "kind": "required" }),
        )
      })
      .collect();
    let body = serde_json::json!({
      "message": "Validation failed",
      "success": false,
      "error": { "name": "ValidationError", "errors": errors },
    });
    Err(ApiError::from_response(400, body.to_string().as_bytes(), "books"))
  }
}

#[async_trait]
impl LibraryService for FakeLibrary {
  async fn list_books(&self) -> Result<Vec<Book>, ApiError> {
    self.receive().await;
    let books = self.state.lock().unwrap().books.values().cloned().collect();
    self.respond(Ok(books)).await
  }

  async fn get_book(&self, id: &str) -> Result<Book, ApiError> {
    self.receive().await;
    let book = self.state.lock().unwrap().books.get(id).cloned();
    self.respond(book.ok_or_else(|| Self::not_found(id))).await
  }

  async fn create_book(&self, input: &BookInput) -> Result<Book, ApiError> {
    self.receive().await;
    Self::validate(input)?;
    let mut state = self.state.lock().unwrap();
    state.next_id += 1;
    let book = Book {
      id: format!("book-{}", state.next_id),
      title: input.title.clone(),
      author: input.author.clone(),
      genre: input.genre,
      isbn: input.isbn.clone(),
      description: input.description.clone(),
      copies: input.copies,
      available: input.copies > 0,
      created_at: None,
      updated_at: None,
    };
    state.books.insert(book.id.clone(), book.clone());
    Ok(book)
  }

  async fn update_book(&self, id: &str, patch: &BookPatch) -> Result<Book, ApiError> {
    self.receive().await;
    let mut state = self.state.lock().unwrap();
    let book = state.books.get_mut(id).ok_or_else(|| Self::not_found(id))?;
    if let Some(title) = &patch.title {
      book.title = title.clone();
    }
    if let Some(author) = &patch.author {
      book.author = author.clone();
    }
    if let Some(genre) = patch.genre {
      book.genre = genre;
    }
    if let Some(isbn) = &patch.isbn {
      book.isbn = isbn.clone();
    }
    if let Some(description) = &patch.description {
      book.description = Some(description.clone());
    }
    if let Some(copies) = patch.copies {
      book.copies = copies;
    }
    if let Some(available) = patch.available {
      book.available = available;
    }
    Ok(book.clone())
  }

  async fn delete_book(&self, id: &str) -> Result<(), ApiError> {
    self.receive().await;
    let mut state = self.state.lock().unwrap();
    state
      .books
      .remove(id)
      .map(|_| ())
      .ok_or_else(|| Self::not_found(id))
  }

  async fn borrow_summary(&self) -> Result<Vec<BorrowSummaryEntry>, ApiError> {
    self.receive().await;
    let summary: Vec<BorrowSummaryEntry> = {
      let state = self.state.lock().unwrap();
      state
        .borrowed
        .iter()
        .filter_map(|(id, total)| {
          state.books.get(id).map(|book| BorrowSummaryEntry {
            book: BookRef {
              title: book.title.clone(),
              isbn: book.isbn.clone(),
            },
            total_quantity: *total,
          })
        })
        .collect()
    };
    self.respond(Ok(summary)).await
  }

  async fn borrow_book(&self, request: &BorrowRequest) -> Result<(), ApiError> {
    self.receive().await;
    let mut state = self.state.lock().unwrap();
    let book = state
      .books
      .get_mut(&request.book)
      .ok_or_else(|| Self::not_found(&request.book))?;
    if request.quantity > book.copies {
      let resource = format!("book {}", request.book);
      return Err(ApiError::from_response(
        400,
        br#"{"message":"Not enough Book to borrow.","success":false}"#,
        &resource,
      ));
    }
    book.copies -= request.quantity;
    book.available = book.copies > 0;
    *state.borrowed.entry(request.book.clone()).or_insert(0) += u64::from(request.quantity);
    Ok(())
  }
}
