//! find: walk a directory tree.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sluice_types::{StageError, StageResult};

use super::glob::glob_match;
use crate::stage::{Outbound, Source, Stage};

/// Depth-first, pre-order walk. Entries within a directory are visited in
/// name order so output is deterministic.
#[derive(Debug, Clone)]
pub struct Find {
    root: PathBuf,
    files_only: bool,
    name: Option<String>,
}

pub fn find(root: impl Into<PathBuf>) -> Find {
    Find {
        root: root.into(),
        files_only: false,
        name: None,
    }
}

impl Find {
    /// Only emit regular files (`-type f`).
    pub fn files_only(mut self) -> Self {
        self.files_only = true;
        self
    }

    /// Only emit entries whose file name matches `pattern` (`-name`).
    pub fn name(mut self, pattern: impl Into<String>) -> Self {
        self.name = Some(pattern.into());
        self
    }

    fn selects(&self, path: &Path, is_file: bool) -> bool {
        if self.files_only && !is_file {
            return false;
        }
        match &self.name {
            Some(pattern) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy())
                    .unwrap_or_else(|| path.to_string_lossy());
                glob_match(pattern, &name)
            }
            None => true,
        }
    }
}

struct Entry {
    path: PathBuf,
    is_dir: bool,
    is_file: bool,
}

async fn children(dir: &Path) -> std::io::Result<Vec<Entry>> {
    let mut entries = Vec::new();
    let mut reader = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = reader.next_entry().await? {
        let file_type = entry.file_type().await?;
        entries.push(Entry {
            path: entry.path(),
            is_dir: file_type.is_dir(),
            is_file: file_type.is_file(),
        });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

#[async_trait]
impl Source for Find {
    async fn produce(&mut self, out: &mut Outbound) -> StageResult {
        let meta = tokio::fs::metadata(&self.root)
            .await
            .map_err(|e| StageError::io(self.root.display().to_string(), &e))?;

        let mut stack = vec![Entry {
            path: self.root.clone(),
            is_dir: meta.is_dir(),
            is_file: meta.is_file(),
        }];

        while let Some(entry) = stack.pop() {
            if out.is_cancelled() {
                break;
            }
            if self.selects(&entry.path, entry.is_file)
                && out.emit_line(entry.path.display().to_string()).await.is_closed()
            {
                break;
            }
            if entry.is_dir {
                match children(&entry.path).await {
                    Ok(found) => stack.extend(found.into_iter().rev()),
                    // Unreadable subdirectories are skipped, like find(1) without -e.
                    Err(e) => tracing::warn!(dir = %entry.path.display(), error = %e, "find: skipping"),
                }
            }
        }
        Ok(())
    }
}

impl From<Find> for Stage {
    fn from(body: Find) -> Self {
        Stage::source("find", body)
    }
}
