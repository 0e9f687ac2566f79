/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  /// Argument placeholder, for commands that take one
  pub argument: Option<&'static str>,
}

impl Command {
  /// What the command line should hold after completing to this command
  pub fn completion(&self) -> String {
    match self.argument {
      Some(_) => format!("{} ", self.name),
      None => self.name.to_string(),
    }
  }
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "books",
    aliases: &["b", "book", "catalog", "home"],
    description: "Browse the catalog",
    argument: None,
  },
  Command {
    name: "summary",
    aliases: &["s", "borrowed", "borrow-summary"],
    description: "Borrow summary",
    argument: None,
  },
  Command {
    name: "create",
    aliases: &["c", "new", "add"],
    description: "Add a book",
    argument: None,
  },
  Command {
    name: "go",
    aliases: &["g", "open"],
    description: "Open a page, e.g. go /books/<id>",
    argument: Some("<path>"),
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit bookshelf",
    argument: None,
  },
];

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  Books,
  Summary,
  Create,
  Go(String),
  Quit,
}

/// Parse a submitted command line like `go /books/42`.
pub fn parse(line: &str) -> Result<Action, String> {
  let line = line.trim();
  let (word, rest) = match line.split_once(char::is_whitespace) {
    Some((word, rest)) => (word, rest.trim()),
    None => (line, ""),
  };
  let word = word.to_lowercase();

  let command = find(&word).ok_or_else(|| format!("Unknown command: {}", word))?;

  match command.name {
    "books" => Ok(Action::Books),
    "summary" => Ok(Action::Summary),
    "create" => Ok(Action::Create),
    "go" if rest.is_empty() => Err("Usage: go <path>".to_string()),
    "go" => Ok(Action::Go(rest.to_string())),
    _ => Ok(Action::Quit),
  }
}

/// Look a command up by name or alias (case-insensitive)
pub fn find(word: &str) -> Option<&'static Command> {
  let word = word.to_lowercase();
  COMMANDS
    .iter()
    .find(|c| c.name == word || c.aliases.contains(&word.as_str()))
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  // Arguments are being typed; the command word is settled
  if input_lower.contains(char::is_whitespace) {
    return Vec::new();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    // Fuzzy match on alias
    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}
