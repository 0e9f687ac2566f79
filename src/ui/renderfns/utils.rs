use ratatui::prelude::{Color, Rect};

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Badge text for a book's availability
pub fn availability_label(available: bool) -> &'static str {
  if available {
    "Available"
  } else {
    "Not Available"
  }
}

pub fn availability_color(available: bool) -> Color {
  if available {
    Color::Green
  } else {
    Color::Red
  }
}

/// A `width` x `height` rect centered in `area`, shrunk to fit
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
  let width = width.min(area.width);
  let height = height.min(area.height);
  Rect::new(
    area.x + (area.width - width) / 2,
    area.y + (area.height - height) / 2,
    width,
    height,
  )
}
