use crate::app::Context;
use crate::library::{ApiError, Book, Endpoint};
use crate::query::{Query, QueryState};
use crate::router::Route;
use crate::ui::renderfns::{availability_color, availability_label};
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// View for displaying one book
pub struct BookDetailView {
  id: String,
  query: Query<Book>,
}

impl BookDetailView {
  pub fn new(id: String, ctx: Context) -> Self {
    let api = ctx.api.clone();
    let book_id = id.clone();
    let mut query = Query::new(move || {
      let api = api.clone();
      let id = book_id.clone();
      async move { api.get_book(&id).await }
    })
    .watching(ctx.api.subscribe(&Endpoint::GetBook { id: id.clone() }));

    // Start fetching immediately
    query.fetch();

    Self { id, query }
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let title = match self.query.state() {
      QueryState::Success(book) => format!(" {} ", book.title),
      QueryState::Loading => " Book (loading...) ".to_string(),
      _ => " Book ".to_string(),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Show loading or error state
    if self.query.is_loading() {
      let paragraph =
        Paragraph::new("Loading book details...").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }

    if let Some(error) = self.query.error() {
      frame.render_widget(error_pane(error), inner);
      return;
    }

    let book = match self.query.data() {
      Some(book) => book,
      None => return,
    };

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(6), // Fields
        Constraint::Length(1), // Separator
        Constraint::Min(1),    // Description
      ])
      .split(inner);

    frame.render_widget(Paragraph::new(field_lines(book)), chunks[0]);

    let sep = Paragraph::new("─".repeat(chunks[1].width as usize))
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, chunks[1]);

    let desc = book.description.as_deref().unwrap_or("No description");
    let desc_para = Paragraph::new(desc).wrap(Wrap { trim: true });
    frame.render_widget(desc_para, chunks[2]);
  }
}

fn field_lines(book: &Book) -> Vec<Line<'_>> {
  let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
  vec![
    Line::from(vec![label("Title:     "), Span::raw(book.title.as_str()).bold()]),
    Line::from(vec![label("Author:    "), Span::raw(book.author.as_str())]),
    Line::from(vec![
      label("Genre:     "),
      Span::styled(book.genre.label(), Style::default().fg(Color::Magenta)),
    ]),
    Line::from(vec![label("ISBN:      "), Span::raw(book.isbn.as_str())]),
    Line::from(vec![label("Copies:    "), Span::raw(book.copies.to_string())]),
    Line::from(vec![
      label("Status:    "),
      Span::styled(
        availability_label(book.available),
        Style::default()
          .fg(availability_color(book.available))
          .add_modifier(Modifier::BOLD),
      ),
    ]),
  ]
}

/// Full-pane error for a failed load
fn error_pane(error: &ApiError) -> Paragraph<'static> {
  let headline = match error {
    ApiError::NotFound(_) => "This book doesn't exist or was deleted.".to_string(),
    other => format!("Error: {}", other.user_message()),
  };
  Paragraph::new(vec![
    Line::from(Span::styled(headline, Style::default().fg(Color::Red).bold())),
    Line::from(""),
    Line::from(Span::styled(
      "Press 'r' to retry or 'q' to go back.",
      Style::default().fg(Color::DarkGray),
    )),
  ])
  .wrap(Wrap { trim: true })
}

impl View for BookDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.query.refetch();
        ViewAction::None
      }
      KeyCode::Char('b') => match self.query.data() {
        Some(book) if book.available => ViewAction::Navigate(Route::Borrow {
          book_id: self.id.clone(),
        }),
        _ => ViewAction::None,
      },
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.query.data() {
      Some(book) => book.title.clone(),
      None => self.id.clone(),
    }
  }

  fn route(&self) -> Route {
    Route::BookDetail {
      id: self.id.clone(),
    }
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("b", "borrow").with_priority(20),
      Shortcut::new("r", "refresh").with_priority(30),
      Shortcut::new("q", "back").with_priority(90),
    ]
  }
}
