//! Path routing: maps URL-like paths to views.

use std::fmt;

use crate::app::Context;
use crate::ui::view::View;
use crate::ui::views::{BookDetailView, BorrowSummaryView, BorrowView, CatalogView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  /// `/` and `/books`
  Catalog,
  /// `/books/:id`
  BookDetail { id: String },
  /// `/borrow/:bookId`
  Borrow { book_id: String },
  /// `/borrow-summary`
  BorrowSummary,
}

impl Route {
  /// Parse a path such as `/books/42`. Leading/trailing slashes are optional
  /// and a query string or fragment is ignored.
  pub fn parse(path: &str) -> Result<Self, String> {
    let trimmed = path.trim();
    let without_suffix = trimmed
      .split(|c| c == '?' || c == '#')
      .next()
      .unwrap_or_default();
    let segments: Vec<&str> = without_suffix
      .split('/')
      .filter(|s| !s.is_empty())
      .collect();

    match segments.as_slice() {
      [] | ["books"] => Ok(Route::Catalog),
      ["books", id] => Ok(Route::BookDetail { id: id.to_string() }),
      ["borrow", book_id] => Ok(Route::Borrow {
        book_id: book_id.to_string(),
      }),
      ["borrow-summary"] => Ok(Route::BorrowSummary),
      _ => Err(format!("No page at {}", trimmed)),
    }
  }

  pub fn path(&self) -> String {
    match self {
      Route::Catalog => "/books".to_string(),
      Route::BookDetail { id } => format!("/books/{}", id),
      Route::Borrow { book_id } => format!("/borrow/{}", book_id),
      Route::BorrowSummary => "/borrow-summary".to_string(),
    }
  }

  /// Top-level pages start a fresh view stack; the others stack on top
  pub fn is_top_level(&self) -> bool {
    matches!(self, Route::Catalog | Route::BorrowSummary)
  }

  /// Build the view for this route
  pub fn open(&self, ctx: &Context) -> Box<dyn View> {
    match self {
      Route::Catalog => Box::new(CatalogView::new(ctx.clone())),
      Route::BookDetail { id } => Box::new(BookDetailView::new(id.clone(), ctx.clone())),
      Route::Borrow { book_id } => Box::new(BorrowView::new(book_id.clone(), ctx.clone())),
      Route::BorrowSummary => Box::new(BorrowSummaryView::new(ctx.clone())),
    }
  }
}

impl fmt::Display for Route {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.path())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_routes() {
    assert_eq!(Route::parse("/"), Ok(Route::Catalog));
    assert_eq!(Route::parse(""), Ok(Route::Catalog));
    assert_eq!(Route::parse("/books"), Ok(Route::Catalog));
    assert_eq!(
      Route::parse("/books/64f0c2"),
      Ok(Route::BookDetail {
        id: "64f0c2".to_string()
      })
    );
    assert_eq!(
      Route::parse("borrow/64f0c2/"),
      Ok(Route::Borrow {
        book_id: "64f0c2".to_string()
      })
    );
    assert_eq!(Route::parse("/borrow-summary?page=2"), Ok(Route::BorrowSummary));
  }

  #[test]
  fn test_unknown_paths() {
    assert!(Route::parse("/edit-book/1").is_err());
    assert!(Route::parse("/create-book").is_err());
    assert!(Route::parse("/books/1/extra").is_err());
    assert!(Route::parse("/borrow").is_err());
  }

  #[test]
  fn test_path_round_trips_through_parse() {
    for route in [
      Route::Catalog,
      Route::BookDetail { id: "a1".into() },
      Route::Borrow { book_id: "a1".into() },
      Route::BorrowSummary,
    ] {
      assert_eq!(Route::parse(&route.path()), Ok(route));
    }
  }

  #[test]
  fn test_top_level() {
    assert!(Route::Catalog.is_top_level());
    assert!(Route::BorrowSummary.is_top_level());
    assert!(!Route::BookDetail { id: "1".into() }.is_top_level());
  }
}
