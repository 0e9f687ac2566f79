//! Cache keys and tags for library queries.

use crate::cache::{QueryCache, QueryKey, Subscription, TypeMismatch};

use super::error::ApiError;

/// Tags that scope invalidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
  /// The full book list
  BookData,
  /// Individual books, addressed by id
  SingleBookData,
  /// The aggregated borrow summary
  BorrowSummary,
}

/// Query keys for library API calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LibraryKey {
  /// All books
  Books,
  /// A single book by id
  Book { id: String },
  /// Borrow totals per book
  BorrowSummary,
}

impl QueryKey for LibraryKey {
  type Tag = Tag;

  fn tag(&self) -> Tag {
    match self {
      Self::Books => Tag::BookData,
      Self::Book { .. } => Tag::SingleBookData,
      Self::BorrowSummary => Tag::BorrowSummary,
    }
  }

  fn description(&self) -> String {
    match self {
      Self::Books => "books".to_string(),
      Self::Book { id } => format!("book {}", id),
      Self::BorrowSummary => "borrow summary".to_string(),
    }
  }
}

pub type LibraryCache = QueryCache<LibraryKey, ApiError>;
pub type LibrarySubscription = Subscription<LibraryKey, ApiError>;

impl From<TypeMismatch> for ApiError {
  fn from(err: TypeMismatch) -> Self {
    ApiError::Decode(format!("cached value for {} has an unexpected type", err.key))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_keys_map_to_tags() {
    assert_eq!(LibraryKey::Books.tag(), Tag::BookData);
    assert_eq!(
      LibraryKey::Book { id: "1".into() }.tag(),
      Tag::SingleBookData
    );
    assert_eq!(LibraryKey::BorrowSummary.tag(), Tag::BorrowSummary);
  }

  #[test]
  fn test_description() {
    assert_eq!(
      LibraryKey::Book { id: "abc".into() }.description(),
      "book abc"
    );
  }
}
