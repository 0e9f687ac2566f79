mod book_detail;
mod borrow;
mod borrow_summary;
mod catalog;

pub use book_detail::BookDetailView;
pub use borrow::BorrowView;
pub use borrow_summary::BorrowSummaryView;
pub use catalog::CatalogView;
