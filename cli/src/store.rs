//! Files a run leaves behind: room records, the last used credential file
//! and the saved ingest URL.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rand::seq::SliceRandom;
use streamkey_types::StreamRecord;
use tracing::{debug, warn};

/// Pointer to the credential file used by the last `create`.
const LAST_COOKIES_FILE: &str = ".last_cookies";

const RECORD_PREFIX: &str = "stream_";
const RECORD_SUFFIX: &str = ".json";

/// Directory holding room records and the last-used pointer.
#[derive(Debug, Clone)]
pub struct RunStore {
    dir: PathBuf,
}

impl RunStore {
    /// Use `dir` for all run artifacts.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{RECORD_PREFIX}{id}{RECORD_SUFFIX}"))
    }

    /// Save a room record and return its id (the creation second).
    pub fn save_record(&self, record: &StreamRecord) -> Result<String> {
        let id = (record.created_at as u64).to_string();
        let path = self.record_path(&id);
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        debug!(path = %path.display(), "Stream record saved");
        Ok(id)
    }

    /// All readable room records, oldest first.
    pub fn list(&self) -> Result<Vec<(String, StreamRecord)>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("listing {}", self.dir.display())),
        };

        let mut records = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let Some(id) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(RECORD_PREFIX))
                .and_then(|n| n.strip_suffix(RECORD_SUFFIX))
                .filter(|id| is_record_id(id))
                .map(str::to_string)
            else {
                continue;
            };

            match fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|s| Ok(serde_json::from_str::<StreamRecord>(&s)?))
            {
                Ok(record) => records.push((id, record)),
                Err(e) => warn!(path = %path.display(), "Skipping unreadable stream record: {}", e),
            }
        }

        records.sort_by_key(|(id, _)| id.parse::<u64>().unwrap_or(0));
        Ok(records)
    }

    /// Delete a room record. Returns false if there was none.
    pub fn delete(&self, id: &str) -> Result<bool> {
        if !is_record_id(id) {
            bail!("invalid stream id '{id}'");
        }
        match fs::remove_file(self.record_path(id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).context("deleting stream record"),
        }
    }

    /// Remember which credential file was used.
    pub fn save_last_cookies(&self, cookies: &Path) -> Result<()> {
        let path = self.dir.join(LAST_COOKIES_FILE);
        fs::write(&path, cookies.to_string_lossy().as_bytes())
            .with_context(|| format!("writing {}", path.display()))
    }

    /// The credential file used last, if recorded.
    pub fn load_last_cookies(&self) -> Option<PathBuf> {
        let contents = fs::read_to_string(self.dir.join(LAST_COOKIES_FILE)).ok()?;
        let trimmed = contents.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }
}

fn is_record_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Read a saved ingest URL. Missing or empty files give `None`.
pub fn load_url(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            let url = contents.trim();
            Ok((!url.is_empty()).then(|| url.to_string()))
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "URL file not found");
            Ok(None)
        }
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

/// Save an ingest URL for a later run.
pub fn save_url(path: &Path, url: &str) -> Result<()> {
    fs::write(path, url.trim()).with_context(|| format!("writing {}", path.display()))
}

/// Pick a random non-empty line of a title file.
pub fn random_title(path: &Path) -> Result<String> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let titles: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    match titles.choose(&mut rand::thread_rng()) {
        Some(title) => Ok(title.to_string()),
        None => bail!("{} is empty", path.display()),
    }
}
