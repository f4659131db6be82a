use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use thiserror::Error;
use tracing::{debug, warn};

// Header injected in front of the file content so the INI engine accepts
// a file that has no sections of its own. Callers never see it.
const SYNTHETIC_SECTION: &str = "DUMMY_SECTION";

/// Broad class of a [`ConfigError`], for callers that only care whether the
/// file could not be read, could not be parsed, or declared a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file could not be opened or read.
    FileAccess,
    /// The content is not a list of `key = value` lines.
    Parse,
    /// The content declares a section header.
    Conflict,
}

/// Error type for loading a flat config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file is missing, unreadable or not UTF-8.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line carries neither `=` nor `:`.
    #[error("line {line}: expected `key = value`, found {text:?}")]
    MissingSeparator { line: usize, text: String },

    /// The INI engine rejected the content.
    #[error("failed to parse config: {0}")]
    Syntax(#[from] ini::ParseError),

    /// Two entries fold to the same lower-cased key.
    #[error("duplicate key {key:?}")]
    DuplicateKey { key: String },

    /// The file declares a `[section]` of its own.
    #[error("flat config must not contain section headers, found [{section}]")]
    SectionConflict { section: String },
}

impl ConfigError {
    /// Which of the three error classes this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::Io { .. } => ErrorKind::FileAccess,
            ConfigError::MissingSeparator { .. }
            | ConfigError::Syntax(_)
            | ConfigError::DuplicateKey { .. } => ErrorKind::Parse,
            ConfigError::SectionConflict { .. } => ErrorKind::Conflict,
        }
    }
}

/// Reader for `KEY = value` files that have no `[section]` headers.
///
/// The content is parsed by the `ini` engine under one hidden section; keys
/// are lower-cased on the way in and on lookup, so `get_value("PORT", ..)`
/// and `get_value("port", ..)` agree. Loading needs `&mut self`; share a
/// reader across threads behind a lock if it has to be reloaded.
#[derive(Debug, Clone)]
pub struct FlatConfigReader {
    ini: Ini,
}

impl Default for FlatConfigReader {
    fn default() -> Self {
        Self::new()
    }
}

impl FlatConfigReader {
    /// Creates a reader with no entries.
    pub fn new() -> Self {
        Self { ini: Ini::new() }
    }

    /// Creates a reader and loads `path` into it.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut reader = Self::new();
        reader.load(path)?;
        Ok(reader)
    }

    /// Reads the whole file at `path` and replaces the current entries with
    /// its contents.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, a
    /// parse-kind error for malformed lines or duplicate keys, and
    /// [`ConfigError::SectionConflict`] when the file has a section header.
    /// On error the previously loaded entries are kept.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&content)?;
        debug!(path = %path.display(), entries = self.len(), "loaded flat config");
        Ok(())
    }

    /// Same as [`load`](Self::load) for text that is already in memory.
    pub fn load_str(&mut self, content: &str) -> Result<(), ConfigError> {
        check_separators(content)?;

        let wrapped = format!("[{}]\n{}", SYNTHETIC_SECTION, content);
        // noescape keeps backslashes in values (Windows paths) as written;
        // only a backslash at the end of a line still continues it
        let parsed = Ini::load_from_str_noescape(&wrapped)?;

        let mut normalized = Ini::new();
        let mut seen = HashSet::new();
        let mut synthetic_count = 0;
        for (section, props) in parsed.iter() {
            match section {
                Some(SYNTHETIC_SECTION) if synthetic_count == 0 => synthetic_count += 1,
                // general section is always present and empty, the header comes first
                None if props.iter().next().is_none() => continue,
                other => {
                    let section = other.unwrap_or_default().to_string();
                    warn!(section = %section, "section header in flat config");
                    return Err(ConfigError::SectionConflict { section });
                }
            }
            for (key, value) in props.iter() {
                let key = normalize_key(key);
                if !seen.insert(key.clone()) {
                    warn!(key = %key, "duplicate key in flat config");
                    return Err(ConfigError::DuplicateKey { key });
                }
                normalized.with_section(Some(SYNTHETIC_SECTION)).set(key, value);
            }
        }

        self.ini = normalized;
        Ok(())
    }

    /// Looks up `key`, ignoring case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.ini.get_from(Some(SYNTHETIC_SECTION), &normalize_key(key))
    }

    /// Looks up `key`, ignoring case, falling back to `default` when absent.
    pub fn get_value<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Whether `key` is present, ignoring case.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// All entries in file order, keys lower-cased. Empty until a load
    /// succeeds.
    pub fn items(&self) -> Vec<(String, String)> {
        self.ini
            .section(Some(SYNTHETIC_SECTION))
            .map(|props| {
                props
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of entries loaded.
    pub fn len(&self) -> usize {
        self.ini
            .section(Some(SYNTHETIC_SECTION))
            .map_or(0, |props| props.iter().count())
    }

    /// True before the first successful load or for a file with no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromStr for FlatConfigReader {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut reader = Self::new();
        reader.load_str(s)?;
        Ok(reader)
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

// The engine would glue a bare token onto the next line's key instead of
// rejecting it, so separator-less lines are caught here with the caller's
// line number. A trailing backslash continues the line in the engine, so
// continued lines are joined the same way before the check. Headers pass
// through and are rejected after parsing.
fn check_separators(content: &str) -> Result<(), ConfigError> {
    let mut logical = String::new();
    let mut start = 0;
    for (idx, line) in content.lines().enumerate() {
        if logical.is_empty() {
            start = idx + 1;
        }
        if let Some(head) = line.strip_suffix('\\') {
            logical.push_str(head);
            continue;
        }
        logical.push_str(line);
        check_logical_line(start, &logical)?;
        logical.clear();
    }
    if !logical.is_empty() {
        check_logical_line(start, &logical)?;
    }
    Ok(())
}

fn check_logical_line(line: usize, text: &str) -> Result<(), ConfigError> {
    let trimmed = text.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('#')
        || trimmed.starts_with(';')
        || trimmed.starts_with('[')
        || trimmed.contains(['=', ':'])
    {
        return Ok(());
    }
    warn!(line, "config line without separator");
    Err(ConfigError::MissingSeparator {
        line,
        text: trimmed.to_string(),
    })
}
