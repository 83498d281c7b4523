//! Credential (cookie) file loading and discovery.
//!
//! A credential file is a JSON list of cookie records exported from a
//! browser. Each record needs string `name` and `value` fields; any other
//! fields (`domain`, `path`, ...) are ignored except for reporting.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::CredentialError;

/// Cookie name to value, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: IndexMap<String, String>,
}

impl CookieJar {
    /// Load and validate a credential file.
    ///
    /// The whole file is validated before anything is kept, so a single bad
    /// record rejects the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CredentialError::NotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path).map_err(|source| CredentialError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let jar = Self::parse(&contents).map_err(|e| match e {
            ParseFailure::Json(reason) => CredentialError::InvalidJson {
                path: path.to_path_buf(),
                reason,
            },
            ParseFailure::NotAList => CredentialError::NotAList(path.to_path_buf()),
            ParseFailure::Record(err) => err,
        })?;

        debug!(path = %path.display(), cookies = jar.len(), "Loaded credential file");
        Ok(jar)
    }

    /// Build a jar from name/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cookies: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    fn parse(contents: &str) -> Result<Self, ParseFailure> {
        let value: Value =
            serde_json::from_str(contents).map_err(|e| ParseFailure::Json(e.to_string()))?;
        let records = value.as_array().ok_or(ParseFailure::NotAList)?;

        let mut cookies = IndexMap::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let record = record
                .as_object()
                .ok_or(ParseFailure::Record(CredentialError::InvalidRecord { index }))?;
            let field = |field: &'static str| {
                record
                    .get(field)
                    .and_then(Value::as_str)
                    .ok_or(ParseFailure::Record(CredentialError::MissingField {
                        index,
                        field,
                    }))
            };
            let name = field("name")?;
            let value = field("value")?;
            cookies.insert(name.to_string(), value.to_string());
        }

        Ok(Self { cookies })
    }

    /// Number of cookies.
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Returns true if the jar is empty.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Get a cookie value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Value for the `Cookie` request header.
    pub fn header_value(&self) -> String {
        self.cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

enum ParseFailure {
    Json(String),
    NotAList,
    Record(CredentialError),
}

/// List the `*.json` files in a credentials directory, sorted by path.
///
/// A missing directory yields an empty list.
pub fn discover(dir: impl AsRef<Path>) -> std::io::Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        warn!(dir = %dir.display(), "Cookies directory not found");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// The first file in `dir` that passes validation.
pub fn first_valid(dir: impl AsRef<Path>) -> std::io::Result<Option<PathBuf>> {
    Ok(discover(dir)?
        .into_iter()
        .find(|path| CookieJar::load(path).is_ok()))
}

/// What a credential file looks like, for listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieFileSummary {
    /// Path of the file.
    pub path: PathBuf,

    /// File size in bytes.
    pub size: u64,

    /// Contents, as far as they could be read.
    pub status: CookieFileStatus,
}

/// Contents of a credential file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieFileStatus {
    /// A list of records.
    Valid {
        /// Number of records.
        cookie_count: usize,

        /// Distinct `domain` fields, sorted.
        domains: Vec<String>,
    },

    /// Valid JSON but not a list.
    InvalidFormat,

    /// Could not be read or parsed.
    Unreadable(String),
}

impl CookieFileSummary {
    /// Inspect one credential file.
    pub fn inspect(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

        let status = match fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str::<Value>(&s).map_err(|e| e.to_string()))
        {
            Ok(Value::Array(records)) => {
                let domains: BTreeSet<String> = records
                    .iter()
                    .filter_map(|r| r.get("domain").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect();
                CookieFileStatus::Valid {
                    cookie_count: records.len(),
                    domains: domains.into_iter().collect(),
                }
            }
            Ok(_) => CookieFileStatus::InvalidFormat,
            Err(e) => CookieFileStatus::Unreadable(e),
        };

        Self { path, size, status }
    }

    /// File name without directories.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Account label: the file name without the `.json` suffix.
    pub fn account_name(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
