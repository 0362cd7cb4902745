//! Core types shared by every stage of datasite reconciliation.

use crate::error::InvalidPath;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

/// Which copy of a datasite a piece of state came from, or which copy wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Local,
    Remote,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Local => Side::Remote,
            Side::Remote => Side::Local,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Local => f.write_str("local"),
            Side::Remote => f.write_str("remote"),
        }
    }
}

/// Root-relative file path with POSIX separators.
///
/// This is the comparison key shared by both sides. Construction normalises the
/// input: backslashes become `/`, the text is put in Unicode NFC form (so macOS
/// and Linux spellings of the same name merge), and empty or `.` segments are
/// dropped. Absolute paths and `..` segments are rejected, so a `RelativePath`
/// can always be joined onto a root safely. The key is not always the on-disk
/// spelling; see [`FileMetadata::local_path`](crate::metadata::FileMetadata::local_path).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, InvalidPath> {
        let raw = raw.as_ref();
        let unified = raw.replace('\\', "/");

        if unified.starts_with('/') {
            return Err(InvalidPath::Absolute(raw.to_string()));
        }

        // `C:` style drive prefixes only show up once separators are unified.
        let first = unified.split('/').find(|s| !s.is_empty() && *s != ".");
        if let Some(first) = first {
            if first.len() == 2 && first.ends_with(':') {
                return Err(InvalidPath::Absolute(raw.to_string()));
            }
        }

        Self::from_segments(raw, unified.split('/'))
    }

    /// Build from a filesystem path that is already relative to a root.
    ///
    /// Components are taken as the platform split them, so names such as `a:`
    /// are kept. A `\` inside a component has no POSIX key and is rejected.
    pub fn from_path(path: &Path) -> Result<Self, InvalidPath> {
        let display = path.display().to_string();
        let mut parts = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(name) => {
                    let name = name
                        .to_str()
                        .ok_or_else(|| InvalidPath::NonUtf8(display.clone()))?;
                    if name.contains('\\') {
                        return Err(InvalidPath::SeparatorInName(display));
                    }
                    parts.push(name);
                }
                Component::CurDir => {}
                Component::ParentDir => return Err(InvalidPath::ParentSegment(display)),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(InvalidPath::Absolute(display))
                }
            }
        }
        Self::from_segments(&display, parts)
    }

    fn from_segments<'a>(
        raw: &str,
        parts: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, InvalidPath> {
        let mut segments = Vec::new();
        for segment in parts {
            match segment {
                "" | "." => continue,
                ".." => return Err(InvalidPath::ParentSegment(raw.to_string())),
                s => segments.push(s.nfc().collect::<String>()),
            }
        }

        if segments.is_empty() {
            return Err(InvalidPath::Empty);
        }

        Ok(RelativePath(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final segment of the path.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Absolute location of this path under `root` on the local filesystem.
    pub fn to_local(&self, root: &Path) -> PathBuf {
        self.segments().fold(root.to_path_buf(), |acc, s| acc.join(s))
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RelativePath {
    type Err = InvalidPath;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RelativePath {
    type Error = InvalidPath;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RelativePath> for String {
    fn from(value: RelativePath) -> Self {
        value.0
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RelativePath {
    fn borrow(&self) -> &str {
        &self.0
    }
}
