//! Slash command registry for the interactive prompt.
//!
//! Provides structured metadata for all `/command` slash commands,
//! enabling categorized help, alias resolution, and completion.

/// Categories for grouping commands in `/help` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCategory {
    Result,
    Generation,
    Session,
}

impl CommandCategory {
    pub fn label(&self) -> &'static str {
        match self {
            CommandCategory::Result => "Result",
            CommandCategory::Generation => "Generation",
            CommandCategory::Session => "Session",
        }
    }

    pub fn all() -> &'static [CommandCategory] {
        &[
            CommandCategory::Result,
            CommandCategory::Generation,
            CommandCategory::Session,
        ]
    }
}

impl std::fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Metadata describing a slash command.
#[derive(Debug, Clone)]
pub struct CommandInfo {
    /// Primary name including the slash, e.g., "/copy".
    pub name: &'static str,
    /// Alternative aliases, e.g., &["/exit", "/q"] for /quit.
    pub aliases: &'static [&'static str],
    /// One-line description shown in /help.
    pub description: &'static str,
    /// Usage pattern, e.g., "/model [name]".
    pub usage: &'static str,
    pub category: CommandCategory,
}

/// Registry holding all slash commands with their metadata.
pub struct CommandRegistry {
    commands: Vec<CommandInfo>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Create a registry pre-populated with all built-in commands.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_defaults();
        registry
    }

    pub fn register(&mut self, info: CommandInfo) {
        self.commands.push(info);
    }

    fn register_defaults(&mut self) {
        self.register(CommandInfo {
            name: "/copy",
            aliases: &[],
            description: "Copy the last result to the clipboard",
            usage: "/copy",
            category: CommandCategory::Result,
        });
        self.register(CommandInfo {
            name: "/cancel",
            aliases: &[],
            description: "Discard the current result",
            usage: "/cancel",
            category: CommandCategory::Result,
        });
        self.register(CommandInfo {
            name: "/model",
            aliases: &[],
            description: "Show or switch the model",
            usage: "/model [name]",
            category: CommandCategory::Generation,
        });
        self.register(CommandInfo {
            name: "/clear",
            aliases: &[],
            description: "Clear the screen",
            usage: "/clear",
            category: CommandCategory::Session,
        });
        self.register(CommandInfo {
            name: "/help",
            aliases: &["/?"],
            description: "Show available commands",
            usage: "/help",
            category: CommandCategory::Session,
        });
        self.register(CommandInfo {
            name: "/quit",
            aliases: &["/exit", "/q"],
            description: "Exit Polish",
            usage: "/quit",
            category: CommandCategory::Session,
        });
    }

    /// Look up a command by name or alias.
    pub fn lookup(&self, input: &str) -> Option<&CommandInfo> {
        self.commands
            .iter()
            .find(|cmd| cmd.name == input || cmd.aliases.contains(&input))
    }

    /// Generate categorized help text.
    pub fn help_text(&self) -> String {
        let mut output = String::from("\nCommands:\n");

        for category in CommandCategory::all() {
            let cmds: Vec<&CommandInfo> = self
                .commands
                .iter()
                .filter(|c| c.category == *category)
                .collect();
            if cmds.is_empty() {
                continue;
            }

            output.push_str(&format!("\n  {}:\n", category.label()));
            for cmd in cmds {
                let aliases = if cmd.aliases.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", cmd.aliases.join(", "))
                };
                output.push_str(&format!(
                    "    {:<16} {}{}\n",
                    cmd.usage, cmd.description, aliases
                ));
            }
        }

        output.push_str(
            "\nInput:\n  Type the text to polish and press Enter. Esc or Ctrl-C cancels a running generation.\n",
        );
        output
    }

    /// Return command names (and aliases) starting with `prefix`, sorted.
    pub fn completions(&self, prefix: &str) -> Vec<&str> {
        let mut results = Vec::new();
        for cmd in &self.commands {
            if cmd.name.starts_with(prefix) {
                results.push(cmd.name);
            }
            for alias in cmd.aliases {
                if alias.starts_with(prefix) {
                    results.push(alias);
                }
            }
        }
        results.sort();
        results
    }

    #[cfg(test)]
    pub fn all(&self) -> &[CommandInfo] {
        &self.commands
    }

    /// Suggest the closest command for an unknown input using edit distance.
    pub fn suggest(&self, input: &str) -> Option<&str> {
        let mut best: Option<(&str, usize)> = None;
        let candidates = self
            .commands
            .iter()
            .flat_map(|cmd| std::iter::once(&cmd.name).chain(cmd.aliases.iter()));

        for &name in candidates {
            let dist = edit_distance(input, name);
            if dist <= 3 && best.is_none_or(|(_, d)| dist < d) {
                best = Some((name, dist));
            }
        }
        best.map(|(name, _)| name)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Levenshtein distance over chars.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prev = (0..=b.len()).collect::<Vec<_>>();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lookup_by_name_and_alias() {
        let reg = CommandRegistry::with_defaults();
        assert_eq!(reg.lookup("/copy").unwrap().name, "/copy");
        assert_eq!(reg.lookup("/exit").unwrap().name, "/quit");
        assert_eq!(reg.lookup("/q").unwrap().name, "/quit");
        assert_eq!(reg.lookup("/?").unwrap().name, "/help");
        assert!(reg.lookup("/nonexistent").is_none());
    }

    #[test]
    fn test_help_text_lists_every_command() {
        let reg = CommandRegistry::with_defaults();
        let help = reg.help_text();
        for category in CommandCategory::all() {
            assert!(help.contains(category.label()));
        }
        for cmd in reg.all() {
            assert!(help.contains(cmd.usage), "missing {}", cmd.usage);
        }
    }

    #[test]
    fn test_completions_prefix() {
        let reg = CommandRegistry::with_defaults();
        assert_eq!(reg.completions("/c"), vec!["/cancel", "/clear", "/copy"]);
        assert_eq!(reg.completions("/mo"), vec!["/model"]);
        assert!(reg.completions("/zzz").is_empty());
    }

    #[test]
    fn test_completions_slash_only_returns_all() {
        let reg = CommandRegistry::with_defaults();
        let names: usize = reg.all().iter().map(|c| 1 + c.aliases.len()).sum();
        assert_eq!(reg.completions("/").len(), names);
    }

    #[test]
    fn test_no_duplicate_names_or_aliases() {
        let reg = CommandRegistry::with_defaults();
        let mut seen = HashSet::new();
        for cmd in reg.all() {
            assert!(seen.insert(cmd.name), "duplicate: {}", cmd.name);
            for alias in cmd.aliases {
                assert!(seen.insert(*alias), "duplicate alias: {}", alias);
            }
        }
    }

    #[test]
    fn test_suggest_close_match() {
        let reg = CommandRegistry::with_defaults();
        assert_eq!(reg.suggest("/cpy"), Some("/copy"));
        assert_eq!(reg.suggest("/modle"), Some("/model"));
    }

    #[test]
    fn test_suggest_no_match() {
        let reg = CommandRegistry::with_defaults();
        assert_eq!(reg.suggest("/completelyunrelated"), None);
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("copy", "copy"), 0);
        assert_eq!(edit_distance("copy", "cop"), 1);
        assert_eq!(edit_distance("abc", "xyz"), 3);
        assert_eq!(edit_distance("grüß", "gruß"), 1);
    }

    #[test]
    fn test_every_category_has_commands() {
        let reg = CommandRegistry::with_defaults();
        for category in CommandCategory::all() {
            assert!(reg.all().iter().any(|c| c.category == *category));
        }
    }
}
