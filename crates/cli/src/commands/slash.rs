//! Slash commands typed at the chat prompt.

use rand::seq::IndexedRandom;

/// A parsed slash command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    About,
    Help,
    Quit,
    Memory,
    Settings(SettingsAction),
    Character(CharacterAction),
    CreatorSaid,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsAction {
    List,
    Show(String),
    Set { key: String, value: String },
    Del(String),
    Reset,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharacterAction {
    List,
    Switch(String),
    /// A missing description is asked for interactively.
    Add {
        name: String,
        description: Option<String>,
    },
    Del(String),
    Edit {
        name: String,
        description: Option<String>,
    },
    Invalid,
}

pub const HELP: &str = "\
Commands:
  /about                              About MoMo
  /help, /?                           This help
  /quit                               Save everything and leave
  /memory                             What MoMo remembers, most important first
  /settings                           Show all settings
  /settings <name>                    Show one setting
  /settings set <name> <value>        Change base_url, api_key or model
  /settings del <name>                Reset one setting to its default
  /settings reset                     Reset all settings
  /character                          List characters
  /character <name>                   Switch character
  /character add <name> [desc]        Add a character (\\n in desc is a newline)
  /character del <name>               Delete a character
  /character edit <name> [desc]       Change a character's description
  /creatorsaid                        A word from MoMo's creator

Anything else is sent to MoMo.";

/// Parse `line` if it is a slash command.
pub fn parse(line: &str) -> Option<SlashCommand> {
    let body = line.trim().strip_prefix('/')?;
    let mut words = body.split_whitespace();
    let name = words.next().unwrap_or("");
    let args: Vec<&str> = words.collect();

    let command = match name {
        "about" => SlashCommand::About,
        "help" | "?" => SlashCommand::Help,
        "quit" | "exit" => SlashCommand::Quit,
        "memory" => SlashCommand::Memory,
        "settings" => SlashCommand::Settings(parse_settings(&args)),
        "character" => SlashCommand::Character(parse_character(&args)),
        "creatorsaid" => SlashCommand::CreatorSaid,
        other => SlashCommand::Unknown(other.to_string()),
    };
    Some(command)
}

fn parse_settings(args: &[&str]) -> SettingsAction {
    match args {
        [] => SettingsAction::List,
        ["reset"] => SettingsAction::Reset,
        [key] => SettingsAction::Show(key.to_string()),
        ["del", key] => SettingsAction::Del(key.to_string()),
        ["set", key, value @ ..] if !value.is_empty() => SettingsAction::Set {
            key: key.to_string(),
            value: value.join(" "),
        },
        _ => SettingsAction::Invalid,
    }
}

fn parse_character(args: &[&str]) -> CharacterAction {
    let rest = |words: &[&str]| (!words.is_empty()).then(|| words.join(" "));
    match args {
        [] => CharacterAction::List,
        ["add" | "del" | "edit"] => CharacterAction::Invalid,
        [name] => CharacterAction::Switch(name.to_string()),
        ["add", name, desc @ ..] => CharacterAction::Add {
            name: name.to_string(),
            description: rest(desc),
        },
        ["del", name] => CharacterAction::Del(name.to_string()),
        ["edit", name, desc @ ..] => CharacterAction::Edit {
            name: name.to_string(),
            description: rest(desc),
        },
        _ => CharacterAction::Invalid,
    }
}

const CREATOR_SAID: &str = include_str!("../../resources/creatorsaid.txt");

/// A random non-blank line from the creator's notes.
pub fn creator_said<R: rand::Rng + ?Sized>(rng: &mut R) -> &'static str {
    let lines: Vec<&'static str> = CREATOR_SAID
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    lines.choose(rng).copied().unwrap_or("...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse("hello /about"), None);
        assert_eq!(parse("how are you?"), None);
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse("/about"), Some(SlashCommand::About));
        assert_eq!(parse("/?"), Some(SlashCommand::Help));
        assert_eq!(parse("  /quit  "), Some(SlashCommand::Quit));
        assert_eq!(parse("/memory"), Some(SlashCommand::Memory));
        assert_eq!(parse("/dance"), Some(SlashCommand::Unknown("dance".into())));
        assert_eq!(parse("/creatorsaid"), Some(SlashCommand::CreatorSaid));
    }

    #[test]
    fn creator_said_picks_a_listed_line() {
        let mut rng = rand::rng();
        for _ in 0..20 {
            let line = creator_said(&mut rng);
            assert!(!line.is_empty());
            assert!(CREATOR_SAID.lines().any(|l| l.trim() == line), "{line}");
        }
    }

    #[test]
    fn settings_forms() {
        let s = |line| match parse(line) {
            Some(SlashCommand::Settings(a)) => a,
            other => panic!("not settings: {other:?}"),
        };
        assert_eq!(s("/settings"), SettingsAction::List);
        assert_eq!(s("/settings reset"), SettingsAction::Reset);
        assert_eq!(s("/settings model"), SettingsAction::Show("model".into()));
        assert_eq!(s("/settings del api_key"), SettingsAction::Del("api_key".into()));
        assert_eq!(
            s("/settings set model Qwen/Qwen3-32B"),
            SettingsAction::Set {
                key: "model".into(),
                value: "Qwen/Qwen3-32B".into()
            }
        );
        assert_eq!(s("/settings set model"), SettingsAction::Invalid);
        assert_eq!(s("/settings frob a"), SettingsAction::Invalid);
    }

    #[test]
    fn character_forms() {
        let c = |line| match parse(line) {
            Some(SlashCommand::Character(a)) => a,
            other => panic!("not character: {other:?}"),
        };
        assert_eq!(c("/character"), CharacterAction::List);
        assert_eq!(c("/character momo"), CharacterAction::Switch("momo".into()));
        assert_eq!(c("/character add"), CharacterAction::Invalid);
        assert_eq!(
            c("/character add pirate Talks like a pirate"),
            CharacterAction::Add {
                name: "pirate".into(),
                description: Some("Talks like a pirate".into())
            }
        );
        assert_eq!(
            c("/character edit pirate"),
            CharacterAction::Edit {
                name: "pirate".into(),
                description: None
            }
        );
        assert_eq!(c("/character del pirate"), CharacterAction::Del("pirate".into()));
        assert_eq!(c("/character del a b"), CharacterAction::Invalid);
    }
}
