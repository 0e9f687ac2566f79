use super::input::TextInput;
use super::KeyResult;
use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowField {
  Quantity,
  DueDate,
}

/// Events emitted by the borrow form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorrowFormEvent {
  Submit { quantity: u32, due: NaiveDate },
  Cancelled,
}

/// Quantity + due date form for borrowing a book
#[derive(Debug, Clone)]
pub struct BorrowForm {
  quantity: TextInput,
  due: TextInput,
  focus: BorrowField,
  errors: Vec<(BorrowField, String)>,
  submitting: bool,
}

impl Default for BorrowForm {
  fn default() -> Self {
    Self {
      quantity: TextInput::with_value("1"),
      due: TextInput::new(),
      focus: BorrowField::Quantity,
      errors: Vec::new(),
      submitting: false,
    }
  }
}

impl BorrowForm {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_submitting(&mut self, submitting: bool) {
    self.submitting = submitting;
  }

  /// Attach an error to one field, replacing what was there
  pub fn set_error(&mut self, field: BorrowField, message: impl Into<String>) {
    self.errors.retain(|(f, _)| *f != field);
    self.errors.push((field, message.into()));
  }

  pub fn error_for(&self, field: BorrowField) -> Option<&str> {
    self
      .errors
      .iter()
      .find(|(f, _)| *f == field)
      .map(|(_, m)| m.as_str())
  }

  /// Validate against `today` and, when known, the copies on hand.
  pub fn validate(
    &self,
    today: NaiveDate,
    copies: Option<u32>,
  ) -> Result<(u32, NaiveDate), Vec<(BorrowField, String)>> {
    let mut errors = Vec::new();

    let quantity = match self.quantity.value().trim().parse::<u32>() {
      Ok(0) | Err(_) => {
        errors.push((
          BorrowField::Quantity,
          "Quantity must be at least 1".to_string(),
        ));
        None
      }
      Ok(n) => match copies {
        Some(copies) if n > copies => {
          errors.push((
            BorrowField::Quantity,
            "Can't borrow more than the available quantity!".to_string(),
          ));
          None
        }
        _ => Some(n),
      },
    };

    let due = match NaiveDate::parse_from_str(self.due.value().trim(), DATE_FORMAT) {
      Ok(date) if date < today => {
        errors.push((
          BorrowField::DueDate,
          "Due date can't be in the past".to_string(),
        ));
        None
      }
      Ok(date) => Some(date),
      Err(_) => {
        errors.push((
          BorrowField::DueDate,
          "Enter a due date as YYYY-MM-DD".to_string(),
        ));
        None
      }
    };

    match (quantity, due) {
      (Some(quantity), Some(due)) if errors.is_empty() => Ok((quantity, due)),
      _ => Err(errors),
    }
  }

  pub fn handle_key(
    &mut self,
    key: KeyEvent,
    today: NaiveDate,
    copies: Option<u32>,
  ) -> KeyResult<BorrowFormEvent> {
    if self.submitting {
      return KeyResult::Handled;
    }

    match key.code {
      KeyCode::Esc => KeyResult::Event(BorrowFormEvent::Cancelled),
      KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
        self.focus = match self.focus {
          BorrowField::Quantity => BorrowField::DueDate,
          BorrowField::DueDate => BorrowField::Quantity,
        };
        KeyResult::Handled
      }
      KeyCode::Enter => match self.validate(today, copies) {
        Ok((quantity, due)) => {
          self.errors.clear();
          KeyResult::Event(BorrowFormEvent::Submit { quantity, due })
        }
        Err(errors) => {
          self.errors = errors;
          KeyResult::Handled
        }
      },
      _ => {
        let input = match self.focus {
          BorrowField::Quantity => &mut self.quantity,
          BorrowField::DueDate => &mut self.due,
        };
        input.handle_key(key);
        let focus = self.focus;
        self.errors.retain(|(f, _)| *f != focus);
        KeyResult::Handled
      }
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Borrow ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow));

    let mut lines = Vec::new();
    for (field, label, input) in [
      (BorrowField::Quantity, "Quantity", &self.quantity),
      (BorrowField::DueDate, "Due date", &self.due),
    ] {
      let focused = field == self.focus;
      let label_style = if focused {
        Style::default().fg(Color::Yellow).bold()
      } else {
        Style::default().fg(Color::DarkGray)
      };
      let mut spans = vec![
        Span::styled(format!("{:>10}: ", label), label_style),
        Span::raw(input.value()),
      ];
      if focused {
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
      }
      if field == BorrowField::DueDate && input.is_empty() && !focused {
        spans.push(Span::styled("YYYY-MM-DD", Style::default().fg(Color::DarkGray)));
      }
      lines.push(Line::from(spans));
      lines.push(match self.error_for(field) {
        Some(message) => Line::from(Span::styled(
          format!("{:>12}{}", "", message),
          Style::default().fg(Color::Red),
        )),
        None => Line::from(""),
      });
    }

    lines.push(if self.submitting {
      Line::from(Span::styled("Borrowing...", Style::default().fg(Color::Yellow)))
    } else {
      Line::from(vec![
        Span::styled("<Enter>", Style::default().fg(Color::Cyan)),
        Span::styled(" borrow  ", Style::default().fg(Color::DarkGray)),
        Span::styled("<Tab>", Style::default().fg(Color::Cyan)),
        Span::styled(" next field  ", Style::default().fg(Color::DarkGray)),
        Span::styled("<Esc>", Style::default().fg(Color::Cyan)),
        Span::styled(" back", Style::default().fg(Color::DarkGray)),
      ])
    });

    frame.render_widget(Paragraph::new(lines).block(block), area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
  }

  fn form(quantity: &str, due: &str) -> BorrowForm {
    BorrowForm {
      quantity: TextInput::with_value(quantity),
      due: TextInput::with_value(due),
      ..BorrowForm::default()
    }
  }

  #[test]
  fn test_valid_submission() {
    assert_eq!(
      form("2", "2024-06-15").validate(today(), Some(3)),
      Ok((2, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()))
    );
    // Due today is fine
    assert!(form("1", "2024-06-01").validate(today(), None).is_ok());
  }

  #[test]
  fn test_quantity_rules() {
    let errors = form("0", "2024-06-15").validate(today(), None).unwrap_err();
    assert_eq!(errors[0].0, BorrowField::Quantity);

    let errors = form("abc", "2024-06-15").validate(today(), None).unwrap_err();
    assert_eq!(errors.len(), 1);

    let errors = form("4", "2024-06-15").validate(today(), Some(3)).unwrap_err();
    assert_eq!(
      errors[0].1,
      "Can't borrow more than the available quantity!"
    );
  }

  #[test]
  fn test_due_date_rules() {
    let errors = form("1", "2024-05-31").validate(today(), None).unwrap_err();
    assert_eq!(errors, vec![(BorrowField::DueDate, "Due date can't be in the past".to_string())]);

    let errors = form("1", "31/12/2024").validate(today(), None).unwrap_err();
    assert_eq!(errors[0].0, BorrowField::DueDate);

    let errors = form("0", "").validate(today(), None).unwrap_err();
    assert_eq!(errors.len(), 2);
  }

  #[test]
  fn test_keyboard_flow() {
    let mut f = BorrowForm::new();
    f.handle_key(key(KeyCode::Backspace), today(), None);
    f.handle_key(key(KeyCode::Char('2')), today(), None);
    f.handle_key(key(KeyCode::Tab), today(), None);
    for c in "2024-07-01".chars() {
      f.handle_key(key(KeyCode::Char(c)), today(), None);
    }
    assert_eq!(
      f.handle_key(key(KeyCode::Enter), today(), Some(5)),
      KeyResult::Event(BorrowFormEvent::Submit {
        quantity: 2,
        due: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
      })
    );
  }

  #[test]
  fn test_set_error_replaces_field_error() {
    let mut f = BorrowForm::new();
    f.set_error(BorrowField::Quantity, "first");
    f.set_error(BorrowField::Quantity, "second");
    assert_eq!(f.error_for(BorrowField::Quantity), Some("second"));
    assert_eq!(f.errors.len(), 1);
  }
}
