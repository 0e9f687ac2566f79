use chrono::Datelike;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar: route breadcrumb on the left, copyright on the right
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], title: &str) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i == breadcrumb.len() - 1 {
      // Current view - highlighted
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };

    spans.push(Span::styled(part.clone(), style));
  }

  let background = Style::default().bg(Color::Black);
  frame.render_widget(Paragraph::new(Line::from(spans)).style(background), area);

  let notice = Paragraph::new(copyright(title, chrono::Local::now().year()))
    .alignment(Alignment::Right)
    .style(Style::default().fg(Color::DarkGray));
  frame.render_widget(notice, area);
}

fn copyright(title: &str, year: i32) -> String {
  format!("© {} {}™ ", year, title)
}
