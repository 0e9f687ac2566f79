use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::library::{ApiError, Book, BookInput, Genre};
use crate::ui::renderfns::centered_rect;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
  Title,
  Author,
  Genre,
  Isbn,
  Description,
  Copies,
}

impl Field {
  const ALL: [Field; 6] = [
    Field::Title,
    Field::Author,
    Field::Genre,
    Field::Isbn,
    Field::Description,
    Field::Copies,
  ];

  fn label(self) -> &'static str {
    match self {
      Field::Title => "Title",
      Field::Author => "Author",
      Field::Genre => "Genre",
      Field::Isbn => "ISBN",
      Field::Description => "Description",
      Field::Copies => "Copies",
    }
  }

  /// Field named by a service validation error
  fn from_wire(name: &str) -> Option<Field> {
    match name {
      "title" => Some(Field::Title),
      "author" => Some(Field::Author),
      "genre" => Some(Field::Genre),
      "isbn" => Some(Field::Isbn),
      "description" => Some(Field::Description),
      "copies" => Some(Field::Copies),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookFormMode {
  Create,
  Edit { id: String },
}

/// Events emitted by the book form
#[derive(Debug, Clone, PartialEq)]
pub enum BookFormEvent {
  /// Input passed validation
  Submit(BookInput),
  Cancelled,
}

/// Create/edit form for a book, shown as an overlay
#[derive(Debug, Clone)]
pub struct BookForm {
  mode: BookFormMode,
  title: TextInput,
  author: TextInput,
  genre: Genre,
  isbn: TextInput,
  description: TextInput,
  copies: TextInput,
  focus: usize,
  errors: Vec<(Field, String)>,
  general_error: Option<String>,
  submitting: bool,
}

impl BookForm {
  pub fn create() -> Self {
    Self {
      mode: BookFormMode::Create,
      title: TextInput::new(),
      author: TextInput::new(),
      genre: Genre::Fiction,
      isbn: TextInput::new(),
      description: TextInput::new(),
      copies: TextInput::with_value("1"),
      focus: 0,
      errors: Vec::new(),
      general_error: None,
      submitting: false,
    }
  }

  /// Form pre-filled with the book's current values
  pub fn edit(book: &Book) -> Self {
    Self {
      mode: BookFormMode::Edit {
        id: book.id.clone(),
      },
      title: TextInput::with_value(book.title.clone()),
      author: TextInput::with_value(book.author.clone()),
      genre: book.genre,
      isbn: TextInput::with_value(book.isbn.clone()),
      description: TextInput::with_value(book.description.clone().unwrap_or_default()),
      copies: TextInput::with_value(book.copies.to_string()),
      focus: 0,
      errors: Vec::new(),
      general_error: None,
      submitting: false,
    }
  }

  pub fn mode(&self) -> &BookFormMode {
    &self.mode
  }

  pub fn set_submitting(&mut self, submitting: bool) {
    self.submitting = submitting;
  }

  fn focused(&self) -> Field {
    Field::ALL[self.focus]
  }

  fn input_mut(&mut self, field: Field) -> Option<&mut TextInput> {
    match field {
      Field::Title => Some(&mut self.title),
      Field::Author => Some(&mut self.author),
      Field::Genre => None,
      Field::Isbn => Some(&mut self.isbn),
      Field::Description => Some(&mut self.description),
      Field::Copies => Some(&mut self.copies),
    }
  }

  fn error_for(&self, field: Field) -> Option<&str> {
    self
      .errors
      .iter()
      .find(|(f, _)| *f == field)
      .map(|(_, message)| message.as_str())
  }

  /// Check the form and build the request payload.
  pub fn validate(&self) -> Result<BookInput, Vec<(Field, String)>> {
    let mut errors = Vec::new();

    for (field, input) in [
      (Field::Title, &self.title),
      (Field::Author, &self.author),
      (Field::Isbn, &self.isbn),
    ] {
      if input.value().trim().is_empty() {
        errors.push((field, format!("{} is required", field.label())));
      }
    }

    let copies = match self.copies.value().trim().parse::<u32>() {
      Ok(n) => n,
      Err(_) => {
        errors.push((
          Field::Copies,
          "Copies must be a whole number, 0 or more".to_string(),
        ));
        0
      }
    };

    if !errors.is_empty() {
      return Err(errors);
    }

    let input = BookInput::new(
      self.title.value().trim(),
      self.author.value().trim(),
      self.genre,
      self.isbn.value().trim(),
      copies,
    );
    let description = self.description.value().trim();
    Ok(if description.is_empty() {
      input
    } else {
      input.with_description(description)
    })
  }

  /// Show a failed submission on the form
  pub fn show_error(&mut self, err: &ApiError) {
    self.submitting = false;
    self.errors.clear();
    self.general_error = None;
    if let ApiError::Validation { fields, .. } = err {
      for field_error in fields {
        if let Some(field) = Field::from_wire(&field_error.field) {
          self.errors.push((field, field_error.message.clone()));
        }
      }
    }
    if self.errors.is_empty() {
      self.general_error = Some(err.user_message());
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<BookFormEvent> {
    if self.submitting {
      // Only allow backing out while the request is in flight
      return match key.code {
        KeyCode::Esc => KeyResult::Event(BookFormEvent::Cancelled),
        _ => KeyResult::Handled,
      };
    }

    match key.code {
      KeyCode::Esc => return KeyResult::Event(BookFormEvent::Cancelled),
      KeyCode::Tab | KeyCode::Down => {
        self.focus = (self.focus + 1) % Field::ALL.len();
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = (self.focus + Field::ALL.len() - 1) % Field::ALL.len();
        return KeyResult::Handled;
      }
      KeyCode::Enter => {
        return match self.validate() {
          Ok(input) => {
            self.errors.clear();
            self.general_error = None;
            KeyResult::Event(BookFormEvent::Submit(input))
          }
          Err(errors) => {
            // Jump to the first problem
            if let Some((field, _)) = errors.first() {
              self.focus = Field::ALL.iter().position(|f| f == field).unwrap_or(0);
            }
            self.errors = errors;
            KeyResult::Handled
          }
        };
      }
      _ => {}
    }

    let field = self.focused();
    if field == Field::Genre {
      match key.code {
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => self.genre = self.genre.next(),
        KeyCode::Left | KeyCode::Char('h') => self.genre = self.genre.previous(),
        _ => {}
      }
      return KeyResult::Handled;
    }

    if let Some(input) = self.input_mut(field) {
      input.handle_key(key);
    }
    self.errors.retain(|(f, _)| *f != field);
    KeyResult::Handled
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let height = Field::ALL.len() as u16 * 2 + 5;
    let dialog = centered_rect(64, height, area);
    frame.render_widget(Clear, dialog);

    let title = match self.mode {
      BookFormMode::Create => " Add Book ",
      BookFormMode::Edit { .. } => " Edit Book ",
    };
    let block = Block::default()
      .title(title)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));
    let inner = block.inner(dialog);
    frame.render_widget(block, dialog);

    let mut lines = Vec::new();
    for (i, field) in Field::ALL.into_iter().enumerate() {
      let focused = i == self.focus;
      let label_style = if focused {
        Style::default().fg(Color::Yellow).bold()
      } else {
        Style::default().fg(Color::DarkGray)
      };

      let value = match field {
        Field::Genre => format!("< {} >", self.genre.label()),
        Field::Title => self.title.value().to_string(),
        Field::Author => self.author.value().to_string(),
        Field::Isbn => self.isbn.value().to_string(),
        Field::Description => self.description.value().to_string(),
        Field::Copies => self.copies.value().to_string(),
      };

      let mut spans = vec![
        Span::styled(format!("{:>12}: ", field.label()), label_style),
        Span::raw(value),
      ];
      if focused && field != Field::Genre {
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
      }
      lines.push(Line::from(spans));

      match self.error_for(field) {
        Some(message) => lines.push(Line::from(Span::styled(
          format!("{:>14}{}", "", message),
          Style::default().fg(Color::Red),
        ))),
        None => lines.push(Line::from("")),
      }
    }

    let status = if self.submitting {
      Line::from(Span::styled("Saving...", Style::default().fg(Color::Yellow)))
    } else if let Some(message) = &self.general_error {
      Line::from(Span::styled(message.as_str(), Style::default().fg(Color::Red)))
    } else {
      Line::from(vec![
        Span::styled("<Enter>", Style::default().fg(Color::Cyan)),
        Span::styled(" save  ", Style::default().fg(Color::DarkGray)),
        Span::styled("<Tab>", Style::default().fg(Color::Cyan)),
        Span::styled(" next field  ", Style::default().fg(Color::DarkGray)),
        Span::styled("<Esc>", Style::default().fg(Color::Cyan)),
        Span::styled(" cancel", Style::default().fg(Color::DarkGray)),
      ])
    };
    lines.push(status);

    frame.render_widget(Paragraph::new(lines), inner);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::library::error::FieldError;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_str(form: &mut BookForm, s: &str) {
    for c in s.chars() {
      form.handle_key(key(KeyCode::Char(c)));
    }
  }

  fn book() -> Book {
    Book {
      id: "b1".to_string(),
      title: "Dune".to_string(),
      author: "Herbert".to_string(),
      genre: Genre::Science,
      isbn: "111".to_string(),
      description: Some("Spice".to_string()),
      copies: 3,
      available: true,
      created_at: None,
      updated_at: None,
    }
  }

  #[test]
  fn test_empty_form_reports_required_fields() {
    let form = BookForm::create();
    let errors = form.validate().unwrap_err();
    let fields: Vec<Field> = errors.iter().map(|(f, _)| *f).collect();
    assert_eq!(fields, vec![Field::Title, Field::Author, Field::Isbn]);
  }

  #[test]
  fn test_fill_and_submit() {
    let mut form = BookForm::create();
    type_str(&mut form, "Dune");
    form.handle_key(key(KeyCode::Tab));
    type_str(&mut form, "Herbert");
    form.handle_key(key(KeyCode::Tab));
    // Genre: Fiction -> Non Fiction -> Science
    form.handle_key(key(KeyCode::Right));
    form.handle_key(key(KeyCode::Right));
    form.handle_key(key(KeyCode::Tab));
    type_str(&mut form, "111");

    match form.handle_key(key(KeyCode::Enter)) {
      KeyResult::Event(BookFormEvent::Submit(input)) => {
        assert_eq!(input, BookInput::new("Dune", "Herbert", Genre::Science, "111", 1));
      }
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn test_negative_copies_rejected() {
    let mut form = BookForm::edit(&book());
    form.focus = 5;
    form.handle_key(key(KeyCode::Backspace));
    type_str(&mut form, "-1");
    assert_eq!(form.handle_key(key(KeyCode::Enter)), KeyResult::Handled);
    assert_eq!(form.errors.len(), 1);
    assert_eq!(form.errors[0].0, Field::Copies);
  }

  #[test]
  fn test_edit_prefills_and_derives_availability() {
    let mut form = BookForm::edit(&book());
    assert_eq!(form.mode(), &BookFormMode::Edit { id: "b1".into() });
    form.copies = TextInput::with_value("0");

    let input = form.validate().unwrap();
    assert_eq!(input.title, "Dune");
    assert_eq!(input.description.as_deref(), Some("Spice"));
    assert_eq!(input.copies, 0);
    assert!(!input.available);
  }

  #[test]
  fn test_server_validation_errors_map_to_fields() {
    let mut form = BookForm::create();
    form.set_submitting(true);
    form.show_error(&ApiError::Validation {
      message: "Validation failed".into(),
      fields: vec![FieldError {
        field: "isbn".into(),
        message: "isbn must be unique".into(),
      }],
    });
    assert!(!form.submitting);
    assert_eq!(form.error_for(Field::Isbn), Some("isbn must be unique"));
    assert!(form.general_error.is_none());

    form.show_error(&ApiError::Network("refused".into()));
    assert!(form.errors.is_empty());
    assert!(form.general_error.is_some());
  }

  #[test]
  fn test_keys_ignored_while_submitting() {
    let mut form = BookForm::create();
    form.set_submitting(true);
    type_str(&mut form, "x");
    assert_eq!(form.title.value(), "");
    assert_eq!(
      form.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(BookFormEvent::Cancelled)
    );
  }
}
