mod book_form;
mod borrow_form;
mod command_input;
mod confirm;
mod input;
mod key_result;
mod search_input;
mod toast;

pub use book_form::{BookForm, BookFormEvent, BookFormMode};
pub use borrow_form::{BorrowField, BorrowForm, BorrowFormEvent};
pub use command_input::{CommandEvent, CommandInput};
pub use confirm::{ConfirmDialog, ConfirmEvent};
pub use key_result::KeyResult;
pub use search_input::{SearchEvent, SearchInput};
pub use toast::{Notifier, TOAST_TTL};
