use crate::app::Context;
use crate::library::{BorrowSummaryEntry, Endpoint};
use crate::query::{Query, QueryState};
use crate::router::Route;
use crate::ui::clamp_selection;
use crate::ui::renderfns::truncate;
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState};

/// Table of total borrowed quantity per book
pub struct BorrowSummaryView {
  query: Query<Vec<BorrowSummaryEntry>>,
  table_state: TableState,
}

impl BorrowSummaryView {
  pub fn new(ctx: Context) -> Self {
    let api = ctx.api.clone();
    let mut query = Query::new(move || {
      let api = api.clone();
      async move { api.get_borrow_summary().await }
    })
    .watching(ctx.api.subscribe(&Endpoint::BorrowSummary));
    query.fetch();

    Self {
      query,
      table_state: TableState::default(),
    }
  }

  fn entries(&self) -> &[BorrowSummaryEntry] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.entries().len();
    let selected = clamp_selection(self.table_state.selected(), len);
    self.table_state.select(selected);

    let total: u64 = self.entries().iter().map(|e| e.total_quantity).sum();
    let title = match self.query.state() {
      QueryState::Loading => " Borrow Summary (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Borrow Summary (error: {}) ", e.user_message()),
      _ => format!(" Borrow Summary ({} books, {} copies) ", len, total),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load the borrow summary. Press 'r' to retry."
      } else {
        "Nothing has been borrowed yet."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let header = Row::new(vec!["Title", "ISBN", "Total Quantity"])
      .style(Style::default().fg(Color::Yellow).bold());

    let rows: Vec<Row> = self
      .entries()
      .iter()
      .map(|entry| {
        Row::new(vec![
          truncate(&entry.book.title, 40),
          entry.book.isbn.clone(),
          entry.total_quantity.to_string(),
        ])
      })
      .collect();

    let table = Table::new(
      rows,
      [
        Constraint::Percentage(55),
        Constraint::Percentage(25),
        Constraint::Percentage(20),
      ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

impl View for BorrowSummaryView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_table(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Borrow Summary".to_string()
  }

  fn route(&self) -> Route {
    Route::BorrowSummary
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    ViewAction::None
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new(":", "command").with_priority(10),
      Shortcut::new("r", "refresh").with_priority(20),
      Shortcut::new("q", "back").with_priority(90),
    ]
  }
}
