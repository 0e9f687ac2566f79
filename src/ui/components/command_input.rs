use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::commands::{self, Command};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

const MAX_SUGGESTIONS: usize = 8;

/// Events emitted by command input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
  /// A command line was entered
  Submitted(String),
  Cancelled,
}

/// The `:` command line with autocomplete
#[derive(Debug, Clone, Default)]
pub struct CommandInput {
  input: TextInput,
  active: bool,
  selected: usize,
}

impl CommandInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn activate(&mut self) {
    self.active = true;
    self.input.clear();
    self.selected = 0;
  }

  fn close(&mut self) {
    self.active = false;
    self.input.clear();
    self.selected = 0;
  }

  /// Commands matching what has been typed so far
  pub fn suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(self.input.value())
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected
  }

  /// The command whose argument is being typed, if any
  fn argument_target(&self) -> Option<&'static Command> {
    let (word, _) = self.input.value().split_once(char::is_whitespace)?;
    commands::find(word).filter(|c| c.argument.is_some())
  }

  fn cycle(&mut self, forward: bool) {
    let count = self.suggestions().len();
    if count == 0 {
      return;
    }
    self.selected = if forward {
      (self.selected + 1) % count
    } else {
      (self.selected + count - 1) % count
    };
  }

  /// Handles activation too, so call it whether or not the line is open.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CommandEvent> {
    if !self.active {
      if key.code == KeyCode::Char(':') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc => {
        self.close();
        KeyResult::Event(CommandEvent::Cancelled)
      }
      KeyCode::Enter => {
        let line = self.resolve_command();
        self.close();
        KeyResult::Event(CommandEvent::Submitted(line))
      }
      KeyCode::Tab => {
        if let Some(cmd) = self.suggestions().get(self.selected) {
          self.input = TextInput::with_value(cmd.completion());
          self.selected = 0;
        }
        KeyResult::Handled
      }
      KeyCode::Down => {
        self.cycle(true);
        KeyResult::Handled
      }
      KeyCode::Up | KeyCode::BackTab => {
        self.cycle(false);
        KeyResult::Handled
      }
      _ => match self.input.handle_key(key) {
        InputResult::Consumed => {
          self.selected = 0;
          KeyResult::Handled
        }
        InputResult::Submitted(_) | InputResult::Cancelled => KeyResult::Handled,
        InputResult::NotHandled => KeyResult::NotHandled,
      },
    }
  }

  /// The selected suggestion wins over a partial word. Once arguments are being
  /// typed the line goes through as is, since paths carry case-sensitive ids.
  fn resolve_command(&self) -> String {
    match self.suggestions().get(self.selected) {
      Some(cmd) => cmd.name.to_string(),
      None => self.input.value().trim().to_string(),
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let suggestions = self.suggestions();
    let hint = self.argument_target();
    let body_rows = match hint {
      Some(_) => 1,
      None => suggestions.len().min(MAX_SUGGESTIONS) as u16,
    };

    let width = (area.width * 60 / 100).clamp(30, 60).min(area.width);
    let height = (3 + body_rows).min(area.height);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, height).intersection(area);

    frame.render_widget(Clear, overlay_area);
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Command ");
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);
    if inner.height == 0 {
      return;
    }

    let [line_area, body_area] =
      Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(inner);

    let prompt = Line::from(vec![
      Span::styled(":", Style::default().fg(Color::Yellow)),
      Span::raw(self.input.value()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(prompt), line_area);

    if body_area.height == 0 {
      return;
    }

    if let Some(cmd) = hint {
      let usage = Line::from(vec![
        Span::styled(
          format!("{} {}  ", cmd.name, cmd.argument.unwrap_or_default()),
          Style::default().fg(Color::Cyan),
        ),
        Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
      ]);
      frame.render_widget(Paragraph::new(usage), body_area);
      return;
    }

    let items: Vec<ListItem> = suggestions
      .iter()
      .take(MAX_SUGGESTIONS)
      .map(|cmd| {
        let name = match cmd.argument {
          Some(arg) => format!("{} {}", cmd.name, arg),
          None => cmd.name.to_string(),
        };
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<14}", name), Style::default().fg(Color::Cyan)),
          Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
    let mut state = ListState::default().with_selected(Some(self.selected));
    frame.render_stateful_widget(list, body_area, &mut state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_str(input: &mut CommandInput, s: &str) {
    for c in s.chars() {
      input.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_activation() {
    let mut input = CommandInput::new();
    assert_eq!(input.handle_key(key(KeyCode::Char('x'))), KeyResult::NotHandled);
    assert_eq!(input.handle_key(key(KeyCode::Char(':'))), KeyResult::Handled);
    assert!(input.is_active());
  }

  #[test]
  fn test_submit_selected_suggestion() {
    let mut input = CommandInput::new();
    input.activate();
    type_str(&mut input, "su");
    assert_eq!(
      input.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Submitted("summary".to_string()))
    );
    assert!(!input.is_active());
  }

  #[test]
  fn test_submit_with_arguments_keeps_case() {
    let mut input = CommandInput::new();
    input.activate();
    type_str(&mut input, "go /books/AbC");
    assert_eq!(input.argument_target().map(|c| c.name), Some("go"));
    assert_eq!(
      input.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Submitted("go /books/AbC".to_string()))
    );
  }

  #[test]
  fn test_tab_completes_command_that_takes_a_path() {
    let mut input = CommandInput::new();
    input.activate();
    type_str(&mut input, "op");
    input.handle_key(key(KeyCode::Tab));
    type_str(&mut input, "/borrow-summary");
    assert_eq!(
      input.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CommandEvent::Submitted("go /borrow-summary".to_string()))
    );
  }

  #[test]
  fn test_arrows_cycle_suggestions() {
    let mut input = CommandInput::new();
    input.activate();
    input.handle_key(key(KeyCode::Down));
    assert_eq!(input.selected_suggestion(), 1);
    input.handle_key(key(KeyCode::Up));
    input.handle_key(key(KeyCode::Up));
    assert_eq!(input.selected_suggestion(), input.suggestions().len() - 1);
  }

  #[test]
  fn test_escape_cancels() {
    let mut input = CommandInput::new();
    input.activate();
    type_str(&mut input, "quit");
    assert_eq!(
      input.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(CommandEvent::Cancelled)
    );
    assert!(!input.is_active());
    assert!(input.suggestions().len() == commands::COMMANDS.len());
  }
}
