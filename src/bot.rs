use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::commands::Command;
use crate::config::Config;
use crate::lock::{InstanceLock, ProcProbe};
use crate::matcher;
use crate::store::{ChatLog, PhraseStore};
use crate::telegram::{Message, Transport, Update, UpdatePoller};

/// The main loop: holds the instance lock, polls for updates, routes each
/// message through the command handler or the similarity matcher, and sends
/// replies. Mid-loop errors back off and resume; they never kill the process.
pub struct Bot {
    interval: Duration,
    initial_offset: i64,
    lock_path: PathBuf,
    transport: Arc<dyn Transport>,
    store: PhraseStore,
    chatlog: ChatLog,
    rng: StdRng,
}

/// Name a message is filed under in the chat logs: group chats use their
/// title, private chats the sender.
fn display_name(message: &Message) -> String {
    if message.chat.kind.is_group() {
        message
            .chat
            .title
            .clone()
            .unwrap_or_else(|| format!("Chat {}", message.chat.id))
    } else {
        sender_name(message)
    }
}

fn sender_name(message: &Message) -> String {
    let Some(user) = &message.from else {
        return "unknown".to_string();
    };
    let full = format!(
        "{} {}",
        user.first_name.as_deref().unwrap_or_default(),
        user.last_name.as_deref().unwrap_or_default()
    );
    let full = full.trim();
    if full.is_empty() {
        format!("User {}", user.id)
    } else {
        full.to_string()
    }
}

impl Bot {
    pub fn new(config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            interval: Duration::from_secs_f64(config.bot.interval),
            initial_offset: config.bot.offset,
            lock_path: config.lock_path(),
            transport,
            store: PhraseStore::new(config.paths.dict.clone()),
            chatlog: ChatLog::new(config.paths.chatlogs.clone()),
            rng: StdRng::from_entropy(),
        }
    }

    /// Runs until interrupted. Fails fast if another live instance holds the
    /// lock; the lock is released on every way out of this function.
    pub async fn run(mut self) -> Result<()> {
        info!("Starting Telegram bot...");
        let _lock = InstanceLock::acquire(self.lock_path.clone(), &ProcProbe)?;

        let mut poller = UpdatePoller::new(self.transport.clone(), self.initial_offset);

        loop {
            let step = async {
                match self.cycle(&mut poller).await {
                    Ok(()) => sleep(self.interval).await,
                    Err(e) => {
                        error!("Error in main loop: {:#}", e);
                        // Back off at double the normal pace, then resume.
                        sleep(self.interval * 2).await;
                    }
                }
            };

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Bot stopped by user");
                    break;
                }
                _ = step => {}
            }
        }

        info!("Bot stopped");
        Ok(())
    }

    /// One poll/process cycle. Poll failures are transient by contract and
    /// read as an empty batch; errors out of message processing bubble up to
    /// the backoff path.
    async fn cycle(&mut self, poller: &mut UpdatePoller) -> Result<()> {
        let updates = match poller.poll().await {
            Ok(updates) => updates,
            Err(e) => {
                warn!("Error getting updates: {:#}", e);
                return Ok(());
            }
        };

        for update in updates {
            self.process_update(&update).await?;
        }

        Ok(())
    }

    async fn process_update(&mut self, update: &Update) -> Result<()> {
        let Some(message) = &update.message else {
            return Ok(());
        };
        let Some(text) = message.text.clone() else {
            return Ok(());
        };

        let chat_key = message.chat.id.to_string();
        self.chatlog.record(
            &display_name(message),
            &format!("Message from {}: {}", sender_name(message), text),
        );

        if let Some(reply) = self.respond(&text, &chat_key)? {
            // A failed send is logged and dropped, never re-queued.
            if let Err(e) = self.transport.send_reply(message.chat.id, &reply).await {
                warn!("Error sending message: {:#}", e);
            }
        }

        Ok(())
    }

    /// Commands get their fixed reply (after applying any effect); free text
    /// goes to the similarity matcher. `None` means stay silent.
    fn respond(&mut self, text: &str, chat_key: &str) -> Result<Option<String>> {
        if let Some(command) = Command::parse(text) {
            if let Command::Learn(phrase) = &command {
                self.store.learn(chat_key, phrase)?;
            }
            return Ok(command.reply().map(str::to_string));
        }

        let phrases = self.store.load(chat_key);
        Ok(matcher::find_similar(&phrases, text, &mut self.rng).map(str::to_string))
    }
}
