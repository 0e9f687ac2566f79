pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::ListState;

/// Main draw function: header, current view, footer, then overlays on top
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let path = app.current_route().map(|r| r.path()).unwrap_or_default();
  let shortcuts = app
    .current_view_mut()
    .map(|v| v.shortcuts())
    .unwrap_or_default();
  renderfns::draw_header(
    frame,
    chunks[0],
    app.title(),
    app.base_url(),
    &path,
    &shortcuts,
  );

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }

  renderfns::draw_footer(frame, chunks[2], &app.view_breadcrumb(), app.title());

  app.command().render_overlay(frame, chunks[1]);
  app.notifier().render_overlay(frame, chunks[1]);
}

/// Clamp a selection index to a list of `len` items
pub fn clamp_selection(selected: Option<usize>, len: usize) -> Option<usize> {
  match selected {
    _ if len == 0 => None,
    None => Some(0),
    Some(i) if i >= len => Some(len - 1),
    Some(i) => Some(i),
  }
}

/// Keep a list's selection on an existing row after the data changed
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  let selected = clamp_selection(state.selected(), len);
  if selected != state.selected() {
    state.select(selected);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_clamp_selection() {
    assert_eq!(clamp_selection(Some(3), 0), None);
    assert_eq!(clamp_selection(None, 4), Some(0));
    assert_eq!(clamp_selection(Some(9), 4), Some(3));
    assert_eq!(clamp_selection(Some(2), 4), Some(2));
  }

  #[test]
  fn test_ensure_valid_selection() {
    let mut state = ListState::default();
    ensure_valid_selection(&mut state, 2);
    assert_eq!(state.selected(), Some(0));
    state.select(Some(5));
    ensure_valid_selection(&mut state, 2);
    assert_eq!(state.selected(), Some(1));
  }
}
