use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Book genre as accepted by the library service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Genre {
  Fiction,
  NonFiction,
  Science,
  Biography,
  Fantasy,
}

impl Genre {
  pub const ALL: [Genre; 5] = [
    Genre::Fiction,
    Genre::NonFiction,
    Genre::Science,
    Genre::Biography,
    Genre::Fantasy,
  ];

  /// Wire name (e.g. "NON_FICTION")
  pub fn as_str(&self) -> &'static str {
    match self {
      Genre::Fiction => "FICTION",
      Genre::NonFiction => "NON_FICTION",
      Genre::Science => "SCIENCE",
      Genre::Biography => "BIOGRAPHY",
      Genre::Fantasy => "FANTASY",
    }
  }

  /// Human readable label
  pub fn label(&self) -> &'static str {
    match self {
      Genre::Fiction => "Fiction",
      Genre::NonFiction => "Non Fiction",
      Genre::Science => "Science",
      Genre::Biography => "Biography",
      Genre::Fantasy => "Fantasy",
    }
  }

  pub fn next(self) -> Genre {
    let idx = Self::ALL.iter().position(|g| *g == self).unwrap_or(0);
    Self::ALL[(idx + 1) % Self::ALL.len()]
  }

  pub fn previous(self) -> Genre {
    let idx = Self::ALL.iter().position(|g| *g == self).unwrap_or(0);
    Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
  }
}

impl fmt::Display for Genre {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for Genre {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized = s.trim().to_uppercase().replace([' ', '-'], "_");
    Genre::ALL
      .into_iter()
      .find(|g| g.as_str() == normalized)
      .ok_or_else(|| format!("Unknown genre: {}", s))
  }
}

/// A book in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "BookWire")]
pub struct Book {
  #[serde(rename = "_id")]
  pub id: String,
  pub title: String,
  pub author: String,
  pub genre: Genre,
  pub isbn: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub copies: u32,
  pub available: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

/// Book as the service sends it; `available` may be left out
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookWire {
  #[serde(rename = "_id")]
  id: String,
  title: String,
  author: String,
  genre: Genre,
  isbn: String,
  #[serde(default)]
  description: Option<String>,
  copies: u32,
  #[serde(default)]
  available: Option<bool>,
  #[serde(default)]
  created_at: Option<DateTime<Utc>>,
  #[serde(default)]
  updated_at: Option<DateTime<Utc>>,
}

impl From<BookWire> for Book {
  fn from(wire: BookWire) -> Self {
    Self {
      available: wire.available.unwrap_or(wire.copies > 0),
      id: wire.id,
      title: wire.title,
      author: wire.author,
      genre: wire.genre,
      isbn: wire.isbn,
      description: wire.description,
      copies: wire.copies,
      created_at: wire.created_at,
      updated_at: wire.updated_at,
    }
  }
}

/// Payload for creating a book
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookInput {
  pub title: String,
  pub author: String,
  pub genre: Genre,
  pub isbn: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub copies: u32,
  pub available: bool,
}

impl BookInput {
  pub fn new(
    title: impl Into<String>,
    author: impl Into<String>,
    genre: Genre,
    isbn: impl Into<String>,
    copies: u32,
  ) -> Self {
    Self {
      title: title.into(),
      author: author.into(),
      genre,
      isbn: isbn.into(),
      description: None,
      copies,
      available: copies > 0,
    }
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }
}

/// Partial update for a book. Only fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub author: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub genre: Option<Genre>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub isbn: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub copies: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub available: Option<bool>,
}

impl BookPatch {
  pub fn copies(copies: u32) -> Self {
    Self {
      copies: Some(copies),
      ..Self::default()
    }
  }

  /// Fill `available` from `copies` when the patch changes copies but not availability.
  pub fn with_derived_availability(mut self) -> Self {
    if let (Some(copies), None) = (self.copies, self.available) {
      self.available = Some(copies > 0);
    }
    self
  }
}

/// A full form submission as a patch that sets every field
impl From<BookInput> for BookPatch {
  fn from(input: BookInput) -> Self {
    Self {
      title: Some(input.title),
      author: Some(input.author),
      genre: Some(input.genre),
      isbn: Some(input.isbn),
      description: input.description,
      copies: Some(input.copies),
      available: Some(input.available),
    }
  }
}

/// Request to borrow copies of a book
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
  pub book: String,
  pub quantity: u32,
  pub due_date: DateTime<Utc>,
}

impl BorrowRequest {
  /// Due dates are sent as midnight UTC of the chosen day.
  pub fn new(book: impl Into<String>, quantity: u32, due: NaiveDate) -> Self {
    Self {
      book: book.into(),
      quantity,
      due_date: due.and_time(chrono::NaiveTime::MIN).and_utc(),
    }
  }
}

/// Book reference embedded in a borrow summary row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRef {
  pub title: String,
  pub isbn: String,
}

/// Aggregated borrow total for one book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowSummaryEntry {
  pub book: BookRef,
  pub total_quantity: u64,
}
