use crate::commands::{self, Action};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::library::{HttpLibraryClient, LibraryApi, LibraryCache};
use crate::router::Route;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult, Notifier, TOAST_TTL};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::CatalogView;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::{stdout, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(250);

/// What every view gets: data access and the toast queue
#[derive(Clone)]
pub struct Context {
  pub api: LibraryApi,
  pub notifier: Notifier,
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Command input (after pressing :)
  command: CommandInput,

  ctx: Context,

  /// Header title
  title: String,

  /// Library service base URL, for the header
  base_url: String,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let client = HttpLibraryClient::new(&config.api)?;
    let base_url = client.base_url().to_string();
    let cache = LibraryCache::new(config.cache.keep_unused_for());
    let ctx = Context {
      api: LibraryApi::new(Arc::new(client), cache),
      notifier: Notifier::new(),
    };

    info!(base_url = %base_url, "using library service");
    Ok(Self::with_context(ctx, config.title().to_string(), base_url))
  }

  fn with_context(ctx: Context, title: String, base_url: String) -> Self {
    Self {
      view_stack: vec![Route::Catalog.open(&ctx)],
      command: CommandInput::new(),
      ctx,
      title,
      base_url,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.event_loop(&mut terminal).await;

    // Restore the terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Resize => {}
      Event::Tick => self.tick(),
    }
  }

  fn tick(&mut self) {
    self.ctx.notifier.expire(TOAST_TTL);

    // Every view keeps polling so the ones underneath stay fresh, but only the
    // top view may navigate
    let top = self.view_stack.len().saturating_sub(1);
    let mut top_action = ViewAction::None;
    for (i, view) in self.view_stack.iter_mut().enumerate() {
      let action = view.tick();
      if i == top {
        top_action = action;
      }
    }
    self.apply(top_action);

    let dropped = self.ctx.api.cache().collect_garbage();
    if dropped > 0 {
      debug!(dropped, "collected unused cache entries");
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    if !self.command.is_active() && self.top_captures_input() {
      let action = self.top_view_key(key);
      self.apply(action);
      return;
    }

    match self.command.handle_key(key) {
      KeyResult::Event(CommandEvent::Submitted(line)) => self.execute_command(&line),
      KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => {}
      KeyResult::NotHandled => {
        let action = self.top_view_key(key);
        self.apply(action);
      }
    }
  }

  fn top_captures_input(&self) -> bool {
    self
      .view_stack
      .last()
      .map(|v| v.captures_input())
      .unwrap_or(false)
  }

  fn top_view_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    }
  }

  fn execute_command(&mut self, line: &str) {
    match commands::parse(line) {
      Ok(Action::Books) => self.navigate(Route::Catalog),
      Ok(Action::Summary) => self.navigate(Route::BorrowSummary),
      Ok(Action::Create) => {
        self.view_stack = vec![Box::new(
          CatalogView::new(self.ctx.clone()).with_create_form(),
        )];
      }
      Ok(Action::Go(path)) => match Route::parse(&path) {
        Ok(route) => self.navigate(route),
        Err(message) => self.ctx.notifier.error(message),
      },
      Ok(Action::Quit) => self.should_quit = true,
      Err(message) => self.ctx.notifier.error(message),
    }
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::Navigate(route) => self.navigate(route),
    }
  }

  fn navigate(&mut self, route: Route) {
    debug!(path = %route, "navigate");
    let view = route.open(&self.ctx);
    if route.is_top_level() {
      self.view_stack = vec![view];
    } else {
      self.view_stack.push(view);
    }
  }

  // Accessors for UI rendering
  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn current_route(&self) -> Option<Route> {
    self.view_stack.last().map(|v| v.route())
  }

  pub fn command(&self) -> &CommandInput {
    &self.command
  }

  pub fn notifier(&self) -> &Notifier {
    &self.ctx.notifier
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }
}

#[cfg(test)]
impl Context {
  /// Context backed by an in-memory library
  pub fn for_tests() -> (Self, Arc<crate::library::fake::FakeLibrary>) {
    let fake = Arc::new(crate::library::fake::FakeLibrary::new());
    let api = LibraryApi::new(fake.clone(), LibraryCache::new(Duration::from_secs(60)));
    (
      Self {
        api,
        notifier: Notifier::new(),
      },
      fake,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn app() -> App {
    let (ctx, _) = Context::for_tests();
    App::with_context(ctx, "Favorite Book".into(), "http://localhost:5000/".into())
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_command(app: &mut App, line: &str) {
    app.handle_key(key(KeyCode::Char(':')));
    for c in line.chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
    app.handle_key(key(KeyCode::Enter));
  }

  #[tokio::test]
  async fn test_starts_on_catalog() {
    let app = app();
    assert_eq!(app.current_route(), Some(Route::Catalog));
    assert_eq!(app.view_breadcrumb(), vec!["Books".to_string()]);
  }

  #[tokio::test]
  async fn test_go_stacks_detail_over_catalog() {
    let mut app = app();
    type_command(&mut app, "go /books/b1");
    assert_eq!(app.current_route(), Some(Route::BookDetail { id: "b1".into() }));
    assert_eq!(app.view_stack.len(), 2);

    // Top-level routes reset the stack
    type_command(&mut app, "summary");
    assert_eq!(app.current_route(), Some(Route::BorrowSummary));
    assert_eq!(app.view_stack.len(), 1);
  }

  #[tokio::test]
  async fn test_bad_path_toasts() {
    let mut app = app();
    type_command(&mut app, "go /edit-book/1");
    assert_eq!(app.current_route(), Some(Route::Catalog));
    let toasts = app.notifier().visible();
    assert_eq!(toasts.len(), 1);
    assert!(toasts[0].message.contains("/edit-book/1"));
  }

  #[tokio::test]
  async fn test_create_opens_form_that_captures_keys() {
    let mut app = app();
    type_command(&mut app, "create");
    assert!(app.top_captures_input());

    // ':' goes to the form, not the command line
    app.handle_key(key(KeyCode::Char(':')));
    assert!(!app.command().is_active());
  }

  #[tokio::test]
  async fn test_back_from_root_quits() {
    let mut app = app();
    type_command(&mut app, "go /books/b1");
    app.handle_key(key(KeyCode::Esc));
    assert!(!app.should_quit);
    assert_eq!(app.view_stack.len(), 1);
    app.handle_key(key(KeyCode::Char('q')));
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_ctrl_c_quits_from_anywhere() {
    let mut app = app();
    type_command(&mut app, "create");
    app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit);
  }
}
