use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

use super::Tool;

pub const NOTE_SAVED: &str = "saved note";

/// Append-only note file, one note per line.
#[derive(Debug)]
pub struct NoteStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl NoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `note` as a single line, creating the parent directory and the
    /// file when they do not exist yet.
    pub async fn append(&self, note: &str) -> Result<()> {
        let line = single_line(note);
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating note directory {}", parent.display()))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("opening note file {}", self.path.display()))?;
        file.write_all(format!("{line}\n").as_bytes())
            .await
            .with_context(|| format!("writing note file {}", self.path.display()))?;
        file.flush().await?;

        info!(event_name = "notes.saved", path = %self.path.display(), "note appended");
        Ok(())
    }
}

fn single_line(note: &str) -> String {
    note.lines().map(str::trim).filter(|line| !line.is_empty()).collect::<Vec<_>>().join(" ")
}

pub struct NoteTool {
    store: Arc<NoteStore>,
}

impl NoteTool {
    pub fn new(store: Arc<NoteStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for NoteTool {
    fn name(&self) -> &'static str {
        "note_saver"
    }

    fn description(&self) -> &'static str {
        "Save a note for the user in the shop's note file."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "note": { "type": "string", "description": "The note text to save." }
            },
            "required": ["note"]
        })
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let Some(note) = input.get("note").and_then(Value::as_str) else {
            bail!("`note` must be a string");
        };
        self.store.append(note).await?;
        Ok(NOTE_SAVED.to_string())
    }
}
