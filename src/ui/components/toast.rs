use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// How long a toast stays on screen
pub const TOAST_TTL: Duration = Duration::from_secs(4);

const MAX_VISIBLE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
  Success,
  Error,
}

impl ToastKind {
  fn color(self) -> Color {
    match self {
      ToastKind::Success => Color::Green,
      ToastKind::Error => Color::Red,
    }
  }
}

#[derive(Debug, Clone)]
pub struct Toast {
  pub kind: ToastKind,
  pub message: String,
  shown_at: Instant,
}

/// Shared handle views use to post transient notifications.
///
/// Clones post to the same queue; the app expires and renders them.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
  toasts: Arc<Mutex<Vec<Toast>>>,
}

impl Notifier {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn success(&self, message: impl Into<String>) {
    self.push(ToastKind::Success, message.into());
  }

  pub fn error(&self, message: impl Into<String>) {
    self.push(ToastKind::Error, message.into());
  }

  fn push(&self, kind: ToastKind, message: String) {
    let mut toasts = self.toasts.lock().unwrap_or_else(PoisonError::into_inner);
    toasts.push(Toast {
      kind,
      message,
      shown_at: Instant::now(),
    });
    // Oldest go first when they pile up
    let excess = toasts.len().saturating_sub(MAX_VISIBLE);
    toasts.drain(..excess);
  }

  /// Drop toasts older than `ttl`
  pub fn expire(&self, ttl: Duration) {
    let mut toasts = self.toasts.lock().unwrap_or_else(PoisonError::into_inner);
    toasts.retain(|t| t.shown_at.elapsed() < ttl);
  }

  pub fn visible(&self) -> Vec<Toast> {
    self
      .toasts
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  /// Stack toasts in the top-right corner of `area`, newest at the bottom
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let toasts = self.visible();
    if toasts.is_empty() {
      return;
    }

    let width = 44.min(area.width);
    let mut y = area.y;
    for toast in toasts {
      let height = 3;
      if y + height > area.y + area.height {
        break;
      }
      let toast_area = Rect::new(area.x + area.width - width, y, width, height);
      y += height;

      frame.render_widget(Clear, toast_area);
      let color = toast.kind.color();
      let paragraph = Paragraph::new(toast.message.as_str())
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(color))
        .block(
          Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color)),
        );
      frame.render_widget(paragraph, toast_area);
    }
  }
}
