use crate::app::Context;
use crate::library::{ApiError, Book, BorrowRequest, Endpoint};
use crate::query::{Mutation, Query, QueryState};
use crate::router::Route;
use crate::ui::components::{BorrowField, BorrowForm, BorrowFormEvent, KeyResult};
use crate::ui::renderfns::{availability_color, availability_label};
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// Borrow form for one book; goes to the borrow summary once it succeeds
pub struct BorrowView {
  ctx: Context,
  book_id: String,
  book: Query<Book>,
  form: BorrowForm,
  borrow: Mutation<()>,
}

impl BorrowView {
  pub fn new(book_id: String, ctx: Context) -> Self {
    let api = ctx.api.clone();
    let id = book_id.clone();
    let mut book = Query::new(move || {
      let api = api.clone();
      let id = id.clone();
      async move { api.get_book(&id).await }
    })
    .watching(ctx.api.subscribe(&Endpoint::GetBook {
      id: book_id.clone(),
    }));
    book.fetch();

    Self {
      ctx,
      book_id,
      book,
      form: BorrowForm::new(),
      borrow: Mutation::new(),
    }
  }

  fn start_borrow(&mut self, quantity: u32, due: chrono::NaiveDate) {
    let api = self.ctx.api.clone();
    let request = BorrowRequest::new(self.book_id.clone(), quantity, due);
    if self.borrow.start(async move { api.borrow_book(request).await }) {
      self.form.set_submitting(true);
    }
  }

  fn render_book(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Borrow Book ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let lines = match self.book.state() {
      QueryState::Success(book) => vec![
        Line::from(vec![
          Span::raw(book.title.as_str()).bold(),
          Span::styled(
            format!(" by {}", book.author),
            Style::default().fg(Color::DarkGray),
          ),
        ]),
        Line::from(vec![
          Span::raw(format!("{} copies  ", book.copies)),
          Span::styled(
            availability_label(book.available),
            Style::default().fg(availability_color(book.available)),
          ),
        ]),
      ],
      QueryState::Error(e) => vec![Line::from(Span::styled(
        format!("Error: {}", e.user_message()),
        Style::default().fg(Color::Red),
      ))],
      QueryState::Idle | QueryState::Loading => vec![Line::from(Span::styled(
        "Loading book...",
        Style::default().fg(Color::DarkGray),
      ))],
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
  }
}

impl View for BorrowView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    let today = chrono::Local::now().date_naive();
    let copies = self.book.data().map(|b| b.copies);
    match self.form.handle_key(key, today, copies) {
      KeyResult::Event(BorrowFormEvent::Submit { quantity, due }) => {
        self.start_borrow(quantity, due);
        ViewAction::None
      }
      KeyResult::Event(BorrowFormEvent::Cancelled) => ViewAction::Pop,
      KeyResult::Handled | KeyResult::NotHandled => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(4), Constraint::Length(7), Constraint::Min(0)])
      .split(area);
    self.render_book(frame, chunks[0]);
    self.form.render(frame, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    match self.book.data() {
      Some(book) => format!("Borrow {}", book.title),
      None => "Borrow".to_string(),
    }
  }

  fn route(&self) -> Route {
    Route::Borrow {
      book_id: self.book_id.clone(),
    }
  }

  /// The form is always focused
  fn captures_input(&self) -> bool {
    true
  }

  fn tick(&mut self) -> ViewAction {
    self.book.poll();

    match self.borrow.poll() {
      Some(Ok(())) => {
        self.ctx.notifier.success("Borrowed successfully!");
        ViewAction::Navigate(Route::BorrowSummary)
      }
      Some(Err(err)) => {
        self.form.set_submitting(false);
        if matches!(err, ApiError::InsufficientCopies(_)) {
          self.form.set_error(BorrowField::Quantity, err.user_message());
        }
        self.ctx.notifier.error(err.user_message());
        ViewAction::None
      }
      None => ViewAction::None,
    }
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("Enter", "borrow").with_priority(10),
      Shortcut::new("Tab", "next field").with_priority(20),
      Shortcut::new("Esc", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::library::{BookInput, Genre, LibraryService};
  use crossterm::event::{KeyCode, KeyModifiers};
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  async fn settle(view: &mut BorrowView) -> Vec<ViewAction> {
    let mut actions = Vec::new();
    for _ in 0..3 {
      tokio::time::sleep(Duration::from_millis(10)).await;
      actions.push(view.tick());
    }
    actions
  }

  fn fill(view: &mut BorrowView, quantity: &str) {
    view.handle_key(key(KeyCode::Backspace));
    for c in quantity.chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Tab));
    let due = (chrono::Local::now().date_naive() + chrono::Days::new(7))
      .format("%Y-%m-%d")
      .to_string();
    for c in due.chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[tokio::test]
  async fn test_successful_borrow_goes_to_summary() {
    let (ctx, fake) = Context::for_tests();
    let book = fake
      .create_book(&BookInput::new("Dune", "Herbert", Genre::Science, "111", 3))
      .await
      .unwrap();
    let notifier = ctx.notifier.clone();
    let mut view = BorrowView::new(book.id.clone(), ctx);
    settle(&mut view).await;

    fill(&mut view, "2");
    view.handle_key(key(KeyCode::Enter));
    let actions = settle(&mut view).await;

    assert!(actions
      .iter()
      .any(|a| matches!(a, ViewAction::Navigate(Route::BorrowSummary))));
    assert_eq!(notifier.visible()[0].message, "Borrowed successfully!");
    assert_eq!(fake.get_book(&book.id).await.unwrap().copies, 1);
  }

  #[tokio::test]
  async fn test_insufficient_copies_stays_on_form() {
    let (ctx, fake) = Context::for_tests();
    let book = fake
      .create_book(&BookInput::new("Dune", "Herbert", Genre::Science, "111", 1))
      .await
      .unwrap();
    let mut view = BorrowView::new(book.id.clone(), ctx);
    // Submit before the book loads, so only the service can refuse
    fill(&mut view, "5");
    view.handle_key(key(KeyCode::Enter));
    let actions = settle(&mut view).await;

    assert!(actions.iter().all(|a| matches!(a, ViewAction::None)));
    assert_eq!(
      view.form.error_for(BorrowField::Quantity),
      Some("Can't borrow more than the available quantity!")
    );
    assert_eq!(fake.get_book(&book.id).await.unwrap().copies, 1);
  }

  #[tokio::test]
  async fn test_escape_goes_back() {
    let (ctx, _fake) = Context::for_tests();
    let mut view = BorrowView::new("b1".to_string(), ctx);
    assert!(matches!(view.handle_key(key(KeyCode::Esc)), ViewAction::Pop));
  }
}
