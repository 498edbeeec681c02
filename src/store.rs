use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// Reduces a chat key or display name to a filesystem-safe stem.
/// Keeps alphanumerics, spaces, `-` and `_`; everything else is dropped.
/// An empty result falls back to "unknown".
pub fn sanitize_key(raw: &str) -> String {
    let safe: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let safe = safe.trim_end().to_string();
    if safe.is_empty() {
        "unknown".to_string()
    } else {
        safe
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    writeln!(file, "{}", line).with_context(|| format!("Failed to write {}", path.display()))?;
    // Each line is committed before the next so an abrupt exit cannot leave
    // a half-written record visible to a later load.
    file.flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}

/// Per-chat append-only phrase corpus, one phrase per line under `dict/`.
pub struct PhraseStore {
    dir: PathBuf,
}

impl PhraseStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn corpus_path(&self, chat_key: &str) -> PathBuf {
        self.dir.join(format!("{}_words.dat", sanitize_key(chat_key)))
    }

    /// Appends a phrase to the chat's corpus. Whitespace-only phrases are
    /// dropped silently; duplicates are stored again (no dedup).
    pub fn learn(&self, chat_key: &str, phrase: &str) -> Result<()> {
        let phrase = phrase.trim();
        if phrase.is_empty() {
            return Ok(());
        }

        append_line(&self.corpus_path(chat_key), phrase)?;
        debug!("Learned phrase for chat {}", sanitize_key(chat_key));
        Ok(())
    }

    /// Returns every learned phrase for the chat, in insertion order.
    /// A missing or unreadable corpus reads as empty.
    pub fn load(&self, chat_key: &str) -> Vec<String> {
        match std::fs::read_to_string(self.corpus_path(chat_key)) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Write-only conversation audit trail under `chatlogs/`, one file per
/// display name. Never read back by the bot.
pub struct ChatLog {
    dir: PathBuf,
}

impl ChatLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Appends `<ctime-style timestamp> >> <text>`. Failures are logged and
    /// swallowed; a broken audit log must not take the bot down.
    pub fn record(&self, name: &str, text: &str) {
        let path = self.dir.join(format!("{}_log.txt", sanitize_key(name)));
        let stamp = chrono::Local::now().format("%a %b %e %H:%M:%S %Y");
        if let Err(e) = append_line(&path, &format!("{} >> {}", stamp, text)) {
            warn!("Error writing chat log: {:#}", e);
        }
    }
}
