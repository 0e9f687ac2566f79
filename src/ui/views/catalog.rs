use crate::app::Context;
use crate::library::{Book, BookPatch, Endpoint, Genre};
use crate::query::{Mutation, Query, QueryState};
use crate::router::Route;
use crate::ui::components::{
  BookForm, BookFormEvent, BookFormMode, ConfirmDialog, ConfirmEvent, KeyResult, SearchEvent,
  SearchInput,
};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{availability_color, availability_label, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Which genres the catalog shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenreFilter {
  #[default]
  All,
  Only(Genre),
}

impl GenreFilter {
  /// All -> each genre in order -> All
  pub fn next(self) -> Self {
    match self {
      GenreFilter::All => GenreFilter::Only(Genre::ALL[0]),
      GenreFilter::Only(g) if g == Genre::ALL[Genre::ALL.len() - 1] => GenreFilter::All,
      GenreFilter::Only(g) => GenreFilter::Only(g.next()),
    }
  }

  pub fn previous(self) -> Self {
    match self {
      GenreFilter::All => GenreFilter::Only(Genre::ALL[Genre::ALL.len() - 1]),
      GenreFilter::Only(g) if g == Genre::ALL[0] => GenreFilter::All,
      GenreFilter::Only(g) => GenreFilter::Only(g.previous()),
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      GenreFilter::All => "All genres",
      GenreFilter::Only(g) => g.label(),
    }
  }

  pub fn matches(self, book: &Book) -> bool {
    match self {
      GenreFilter::All => true,
      GenreFilter::Only(g) => book.genre == g,
    }
  }
}

/// The book list: browse, filter, and create/edit/delete/borrow from it
pub struct CatalogView {
  ctx: Context,
  query: Query<Vec<Book>>,
  list_state: ListState,
  search: SearchInput,
  genre: GenreFilter,
  form: Option<BookForm>,
  confirm: ConfirmDialog<(String, String)>,
  save: Mutation<Book>,
  saving_new: bool,
  delete: Mutation<()>,
}

impl CatalogView {
  pub fn new(ctx: Context) -> Self {
    let api = ctx.api.clone();
    let mut query = Query::new(move || {
      let api = api.clone();
      async move { api.list_books().await }
    })
    .watching(ctx.api.subscribe(&Endpoint::ListBooks));

    // Start fetching immediately
    query.fetch();

    Self {
      ctx,
      query,
      list_state: ListState::default(),
      search: SearchInput::new(),
      genre: GenreFilter::All,
      form: None,
      confirm: ConfirmDialog::new(),
      save: Mutation::new(),
      saving_new: false,
      delete: Mutation::new(),
    }
  }

  /// Open with the "add book" form showing
  pub fn with_create_form(mut self) -> Self {
    self.form = Some(BookForm::create());
    self
  }

  fn books(&self) -> &[Book] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  /// Books passing the genre filter and the search text
  fn visible_books(&self) -> Vec<&Book> {
    self
      .books()
      .iter()
      .filter(|b| self.genre.matches(b))
      .filter(|b| self.search.matches(&[b.title.as_str(), b.author.as_str(), b.isbn.as_str()]))
      .collect()
  }

  fn selected_book(&self) -> Option<&Book> {
    let idx = self.list_state.selected()?;
    self.visible_books().get(idx).copied()
  }

  fn submit(&mut self, input: crate::library::BookInput) {
    let Some(form) = self.form.as_mut() else {
      return;
    };
    let api = self.ctx.api.clone();
    let started = match form.mode().clone() {
      BookFormMode::Create => {
        self.saving_new = true;
        self
          .save
          .start(async move { api.create_book(input).await })
      }
      BookFormMode::Edit { id } => {
        self.saving_new = false;
        self
          .save
          .start(async move { api.update_book(&id, BookPatch::from(input)).await })
      }
    };
    if started {
      form.set_submitting(true);
    }
  }

  fn start_delete(&mut self, id: String, title: String) {
    let api = self.ctx.api.clone();
    if !self.delete.start(async move { api.delete_book(&id).await }) {
      self
        .ctx
        .notifier
        .error(format!("Still deleting; try \"{}\" again in a moment", title));
    }
  }

  fn poll_mutations(&mut self) {
    if let Some(outcome) = self.save.poll() {
      match outcome {
        Ok(book) => {
          let verb = if self.saving_new { "added" } else { "updated" };
          self
            .ctx
            .notifier
            .success(format!("\"{}\" {}", book.title, verb));
          self.form = None;
        }
        Err(err) => {
          if let Some(form) = self.form.as_mut() {
            form.show_error(&err);
          }
          self.ctx.notifier.error(err.user_message());
        }
      }
    }

    if let Some(outcome) = self.delete.poll() {
      match outcome {
        Ok(()) => self.ctx.notifier.success("Book deleted"),
        Err(err) => self.ctx.notifier.error(err.user_message()),
      }
    }
  }

  fn handle_list_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Char('f') => {
        self.genre = self.genre.next();
        self.list_state.select(Some(0));
      }
      KeyCode::Char('F') => {
        self.genre = self.genre.previous();
        self.list_state.select(Some(0));
      }
      KeyCode::Char('r') => {
        self.query.refetch();
      }
      KeyCode::Char('n') => {
        self.form = Some(BookForm::create());
      }
      KeyCode::Char('e') => {
        if let Some(form) = self.selected_book().map(BookForm::edit) {
          self.form = Some(form);
        }
      }
      KeyCode::Char('d') => {
        if let Some(book) = self.selected_book() {
          let question = format!("Delete \"{}\"? This cannot be undone.", book.title);
          let value = (book.id.clone(), book.title.clone());
          self.confirm.ask(question, value);
        }
      }
      KeyCode::Char('b') => {
        if let Some(book) = self.selected_book() {
          if !book.available {
            let message = format!("\"{}\" has no copies available", book.title);
            self.ctx.notifier.error(message);
          } else {
            return ViewAction::Navigate(Route::Borrow {
              book_id: book.id.clone(),
            });
          }
        }
      }
      KeyCode::Enter => {
        if let Some(book) = self.selected_book() {
          return ViewAction::Navigate(Route::BookDetail {
            id: book.id.clone(),
          });
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let total = self.books().len();
    let visible = self.visible_books().len();
    ensure_valid_selection(&mut self.list_state, visible);

    let filters = if self.search.query().is_empty() {
      self.genre.label().to_string()
    } else {
      format!("{}, \"{}\"", self.genre.label(), self.search.query())
    };
    let title = match self.query.state() {
      QueryState::Loading => " Books (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Books (error: {}) ", e.user_message()),
      _ if self.query.is_fetching() => format!(" Books [{}] ({}/{}) ... ", filters, visible, total),
      _ => format!(" Books [{}] ({}/{}) ", filters, visible, total),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if visible == 0 && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load books. Press 'r' to retry."
      } else if total == 0 {
        "No books yet. Press 'n' to add one."
      } else {
        "No books match the current filter."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .visible_books()
      .into_iter()
      .map(|book| {
        let line = Line::from(vec![
          Span::styled(
            format!("{:<32}", truncate(&book.title, 32)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::raw(format!("{:<22}", truncate(&book.author, 22))),
          Span::raw(" "),
          Span::styled(
            format!("{:<12}", book.genre.label()),
            Style::default().fg(Color::Magenta),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<15}", truncate(&book.isbn, 15)),
            Style::default().fg(Color::DarkGray),
          ),
          Span::raw(format!("{:>4} ", book.copies)),
          Span::styled(
            availability_label(book.available),
            Style::default().fg(availability_color(book.available)),
          ),
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for CatalogView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some(form) = self.form.as_mut() {
      match form.handle_key(key) {
        KeyResult::Event(BookFormEvent::Submit(input)) => self.submit(input),
        KeyResult::Event(BookFormEvent::Cancelled) => self.form = None,
        KeyResult::Handled | KeyResult::NotHandled => {}
      }
      return ViewAction::None;
    }

    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed((id, title))) => {
        self.start_delete(id, title);
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    // Let search component try to handle next
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(_)) => {
        self.list_state.select(Some(0));
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    self.handle_list_key(key)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
    if let Some(form) = &self.form {
      form.render_overlay(frame, area);
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Books".to_string()
  }

  fn route(&self) -> Route {
    Route::Catalog
  }

  fn captures_input(&self) -> bool {
    self.form.is_some() || self.confirm.is_active() || self.search.is_active()
  }

  fn tick(&mut self) -> ViewAction {
    if self.query.poll() {
      let len = self.visible_books().len();
      ensure_valid_selection(&mut self.list_state, len);
    }
    self.poll_mutations();
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("/", "search").with_priority(20),
      Shortcut::new("f", "genre").with_priority(30),
      Shortcut::new("n", "add").with_priority(40),
      Shortcut::new("e", "edit").with_priority(41),
      Shortcut::new("d", "delete").with_priority(42),
      Shortcut::new("b", "borrow").with_priority(43),
      Shortcut::new("r", "refresh").with_priority(50),
    ]
  }
}
