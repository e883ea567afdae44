use std::collections::HashMap;
use std::path::Path;

use anyhow::Context as _;

pub const MAL_CLIENT_ID: &str = "MAL_CLIENT_ID";
pub const ACCESS_TOKEN: &str = "ACCESS_TOKEN";
pub const REFRESH_TOKEN: &str = "REFRESH_TOKEN";
pub const NOTION_API_KEY: &str = "NOTION_API_KEY";
pub const DATABASE_ID: &str = "DATABASE_ID";

/// Values read from a `KEY=value` credential file, optionally overlaid with
/// the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvFile {
    values: HashMap<String, String>,
}

impl EnvFile {
    /// Loads `path`. A missing file yields an empty set of values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "env file not found; using process environment only");
                String::new()
            }
            Err(err) => {
                return Err(err).with_context(|| format!("read env file: {}", path.display()));
            }
        };
        Ok(Self::parse(&contents))
    }

    pub fn parse(contents: &str) -> Self {
        let mut values = HashMap::new();
        for line in contents.lines() {
            let Some((key, value)) = split_assignment(line) else {
                continue;
            };
            values.insert(key.to_owned(), unquote(value.trim()).to_owned());
        }
        Self { values }
    }

    /// Variables already present in `vars` win over the file, matching dotenv.
    pub fn overlay<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            self.values.insert(key, value);
        }
        self
    }

    /// Returns the value for `key`; blank values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Splits a `[export ]KEY=value` line. Blank lines, comments and lines
/// without `=` yield `None`.
fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    (!key.is_empty()).then_some((key, value))
}

fn line_key(line: &str) -> Option<&str> {
    split_assignment(line).map(|(key, _)| key)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Rewrites the file at `path` so each key in `pairs` appears exactly once:
/// every existing line that assigns one of the keys (as [`EnvFile::parse`]
/// reads it) is dropped and the new values are appended.
/// A missing file is treated as empty.
pub async fn replace_keys(path: &Path, pairs: &[(&str, &str)]) -> anyhow::Result<()> {
    let existing = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(err) => {
            return Err(err).with_context(|| format!("read env file: {}", path.display()));
        }
    };

    let contents = replace_keys_in(&existing, pairs);
    crate::fsutil::write_atomic(path, contents.as_bytes())
        .await
        .with_context(|| format!("write env file: {}", path.display()))
}

fn replace_keys_in(existing: &str, pairs: &[(&str, &str)]) -> String {
    let kept = existing
        .split('\n')
        .filter(|line| {
            line_key(line).is_none_or(|key| !pairs.iter().any(|(replaced, _)| *replaced == key))
        })
        .collect::<Vec<_>>()
        .join("\n");
    // Trailing blank lines would otherwise pile up across refreshes.
    let mut out = kept.trim_end().to_owned();
    for (key, value) in pairs {
        out.push_str(&format!("\n{key}={value}"));
    }

    format!("{}\n", out.trim())
}
