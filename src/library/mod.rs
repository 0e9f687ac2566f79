//! Client for the remote library service.

pub mod api;
pub mod api_types;
pub mod cache;
pub mod client;
pub mod error;
#[cfg(test)]
pub mod fake;
pub mod types;

pub use api::{Endpoint, LibraryApi};
pub use cache::{LibraryCache, LibraryKey};
pub use client::{HttpLibraryClient, LibraryService};
pub use error::{ApiError, ErrorCode};
pub use types::{Book, BookInput, BookPatch, BorrowRequest, BorrowSummaryEntry, Genre};
