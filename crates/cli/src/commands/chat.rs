//! `momo` / `momo chat`: interactive or single-message chat.

use momo_agent::{AgentLoop, EnvironmentInfo, PromptParts, TurnEvent, TurnFailure};
use momo_config::{
    AppConfig, CharacterBook, CharacterError, CharacterKind, DEFAULT_CHARACTER, SETTABLE_KEYS,
};
use momo_core::clock::SystemClock;
use momo_core::provider::Provider;
use momo_providers::OpenAiCompatProvider;
use std::sync::Arc;
use tracing::{debug, warn};

use super::input::LineReader;
use super::slash::{self, CharacterAction, SettingsAction, SlashCommand};

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = ChatApp::start()?;

    if let Some(msg) = message {
        app.turn(&msg).await;
        app.agent.shutdown()?;
        return Ok(());
    }

    println!();
    println!("  MoMo v{}", env!("CARGO_PKG_VERSION"));
    println!("  Chatting with {} ({})", app.config.character, app.config.model);
    println!("  Type /help for commands.");
    if !app.config.has_api_key() {
        println!();
        println!("  Warning: no API key is set, so requests will probably fail.");
        println!("  Set one with: /settings set api_key <key>");
    }
    println!();

    let mut reader = LineReader::start();
    loop {
        let Some(line) = reader.read_line("> ").await else {
            println!();
            app.quit();
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = slash::parse(line) {
            if app.handle(command, &mut reader).await == Flow::Quit {
                break;
            }
            continue;
        }

        app.turn(line).await;
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Everything one chat session reads and changes.
struct ChatApp {
    config: AppConfig,
    characters: CharacterBook,
    agent: AgentLoop,
}

impl ChatApp {
    fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
        let characters = CharacterBook::load(&AppConfig::characters_path());

        if !characters.contains(&config.character) {
            println!(
                "  Can't find character '{}', MoMo will keep you company instead.",
                config.character
            );
            config.character = DEFAULT_CHARACTER.into();
        }

        let mut agent =
            AgentLoop::from_config(&config, build_provider(&config), Arc::new(SystemClock));
        agent.bootstrap(PromptParts::new(
            characters.persona(&config.character),
            EnvironmentInfo::detect(),
        ));

        Ok(Self {
            config,
            characters,
            agent,
        })
    }

    async fn turn(&mut self, text: &str) {
        let mut print_event = |event: &TurnEvent| match event {
            TurnEvent::Reply {
                message,
                total_tokens,
            } => {
                match total_tokens {
                    Some(tokens) => println!("{message} ({tokens})"),
                    None => println!("{message}"),
                }
                println!();
            }
            TurnEvent::CommandStarted { dir, command } => println!("  {dir}> {command}"),
            TurnEvent::CommandFinished { output } => {
                debug!(bytes = output.len(), "Command output sent to model")
            }
            TurnEvent::MemoryUpdated { added, reinforced } => {
                debug!(added, reinforced, "Memory updated")
            }
        };

        if let Err(failure) = self.agent.process_turn(text, &mut print_event).await {
            report_failure(&failure);
        }
    }

    async fn handle(&mut self, command: SlashCommand, reader: &mut LineReader) -> Flow {
        match command {
            SlashCommand::About => about(),
            SlashCommand::Help => println!("{}", slash::HELP),
            SlashCommand::Quit => {
                self.quit();
                return Flow::Quit;
            }
            SlashCommand::Memory => self.show_memory(),
            SlashCommand::Settings(action) => self.settings(action),
            SlashCommand::Character(action) => self.character(action, reader).await,
            SlashCommand::CreatorSaid => println!("{}", slash::creator_said(&mut rand::rng())),
            SlashCommand::Unknown(name) => {
                println!("Unknown command /{name}. Type /help to see what I can do.")
            }
        }
        Flow::Continue
    }

    fn settings(&mut self, action: SettingsAction) {
        match action {
            SettingsAction::List => {
                println!("Current settings:");
                for (key, value) in self.config.settings_view() {
                    println!("  {key}: {value}");
                }
            }
            SettingsAction::Show(key) => match self.config.setting(&key) {
                Some(value) => println!("{key}: {value}"),
                None => println!("There's no setting called {key}."),
            },
            SettingsAction::Set { key, value } => {
                if let Err(e) = self.config.set_setting(&key, &value) {
                    println!("{e}. Settable: {}", SETTABLE_KEYS.join(", "));
                    return;
                }
                self.settings_changed();
                let shown = self.config.setting(&key).unwrap_or(value);
                println!("Changed {key} to {shown}.");
            }
            SettingsAction::Del(key) => {
                if let Err(e) = self.config.unset_setting(&key) {
                    println!("{e}");
                    return;
                }
                self.settings_changed();
                println!("Reset {key} to its default.");
            }
            SettingsAction::Reset => {
                self.config.reset_settings();
                self.settings_changed();
                println!("All settings are back to their defaults.");
            }
            SettingsAction::Invalid => println!("That's not how /settings works. Try /help."),
        }
    }

    /// Save the config and start a fresh conversation with the new endpoint.
    fn settings_changed(&mut self) {
        self.save_config();
        let session = self.agent.session_mut();
        session.set_provider(build_provider(&self.config));
        session.set_model(self.config.model.clone());
        session.set_sampling(self.config.temperature, self.config.max_tokens);
        if !self.characters.contains(&self.config.character) {
            self.config.character = DEFAULT_CHARACTER.into();
        }
        self.agent
            .set_persona(self.characters.persona(&self.config.character));
    }

    async fn character(&mut self, action: CharacterAction, reader: &mut LineReader) {
        match action {
            CharacterAction::List => {
                println!("Characters:");
                for (i, (name, kind)) in self.characters.list().into_iter().enumerate() {
                    let kind = match kind {
                        CharacterKind::Builtin => "built-in",
                        CharacterKind::Custom => "custom",
                    };
                    println!("  {}. {name} [{kind}]", i + 1);
                }
                println!("You're chatting with {}.", self.config.character);
            }
            CharacterAction::Switch(name) => {
                if !self.characters.contains(&name) {
                    println!("Can't find {name}.");
                    return;
                }
                self.switch_character(&name);
                println!("Switched to {name}.");
            }
            CharacterAction::Add { name, description } => {
                let Some(description) = self.describe(description, reader, None).await else {
                    return;
                };
                match self.characters.add(&name, &description) {
                    Ok(()) => {
                        self.save_characters();
                        if self.config.character == name {
                            self.switch_character(&name);
                        }
                        println!("Added character {name}.");
                    }
                    Err(e) => println!("{e}"),
                }
            }
            CharacterAction::Del(name) => match self.characters.remove(&name) {
                Ok(()) => {
                    self.save_characters();
                    println!("Deleted {name}. Bye bye!");
                    if self.config.character == name {
                        self.switch_character(DEFAULT_CHARACTER);
                        println!("Switched back to {DEFAULT_CHARACTER}.");
                    }
                }
                Err(e) => println!("{e}"),
            },
            CharacterAction::Edit { name, description } => {
                if self.characters.is_builtin(&name) {
                    println!("{}", CharacterError::Protected(name));
                    return;
                }
                if !self.characters.contains(&name) {
                    println!("{}", CharacterError::NotFound(name));
                    return;
                }
                let current = self.characters.get(&name).map(str::to_string);
                let Some(description) = self.describe(description, reader, current).await else {
                    return;
                };
                match self.characters.edit(&name, &description) {
                    Ok(()) => {
                        self.save_characters();
                        if self.config.character == name {
                            self.switch_character(&name);
                        }
                        println!("Updated {name}.");
                    }
                    Err(e) => println!("{e}"),
                }
            }
            CharacterAction::Invalid => println!("That's not how /character works. Try /help."),
        }
    }

    /// Use the given description, or ask for one.
    async fn describe(
        &self,
        given: Option<String>,
        reader: &mut LineReader,
        current: Option<String>,
    ) -> Option<String> {
        if given.is_some() {
            return given;
        }
        if let Some(current) = current {
            println!("Current description: {current}");
        }
        reader.read_line("Description: ").await
    }

    fn switch_character(&mut self, name: &str) {
        self.config.character = name.to_string();
        self.save_config();
        self.agent.set_persona(self.characters.persona(name));
    }

    fn show_memory(&mut self) {
        let k = self.agent.limits().memory_top_k;
        let top = self.agent.memory_mut().top_k(k);
        if top.is_empty() {
            println!("Nothing remembered yet.");
            return;
        }
        for (i, item) in top.iter().enumerate() {
            println!(
                "  [{i}] {:.3}  {}  {}",
                item.current_importance(),
                item.time().format("%Y-%m-%d %H:%M"),
                item.message()
            );
        }
    }

    /// Flush memory, settings and characters.
    fn quit(&mut self) {
        if let Err(e) = self.agent.shutdown() {
            warn!(error = %e, "Failed to save memories on exit");
            println!("Couldn't save memories: {e}");
        }
        self.save_config();
        self.save_characters();
        println!("Bye bye, see you soon!");
    }

    fn save_config(&self) {
        if let Err(e) = self.config.save_to(&AppConfig::config_path()) {
            println!("Couldn't save settings: {e}");
        }
    }

    fn save_characters(&self) {
        if let Err(e) = self.characters.save(&AppConfig::characters_path()) {
            println!("Couldn't save characters: {e}");
        }
    }
}

/// The configured endpoint; without a key it is still built so the
/// failure shows up on the first turn rather than at startup.
fn build_provider(config: &AppConfig) -> Arc<dyn Provider> {
    match OpenAiCompatProvider::from_config(config) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            warn!(error = %e, "Provider is not fully configured");
            Arc::new(OpenAiCompatProvider::new(
                "openai-compat",
                config.effective_base_url(),
                "",
            ))
        }
    }
}

fn about() {
    println!();
    println!("  MoMo v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("  A cat-girl who lives in your terminal, nya~");
    println!("  She remembers what you tell her and can run commands on your computer.");
    println!("  Commands run without a sandbox, so read what she's about to do.");
    println!();
}

fn report_failure(failure: &TurnFailure) {
    println!("Something went wrong, sorry... {}", failure.error);
    if let Some(raw) = &failure.raw {
        println!("Details: {raw}");
    }
    println!("Copy this conversation if you want to report it.");
    println!();
}
