//! ls: list directory entries matching a pattern.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sluice_types::{StageError, StageResult};

use super::glob::{contains_glob, glob_match};
use crate::stage::{Outbound, Source, Stage};

/// Lists one directory.
///
/// `ls("logs/*.log")` emits the names (not paths) of the entries of `logs`
/// matching `*.log`, sorted. Without a glob in the final component, a
/// directory lists all its entries and a file lists itself. Hidden entries
/// are skipped unless the pattern starts with `.`.
#[derive(Debug, Clone)]
pub struct Ls {
    pattern: String,
}

pub fn ls(pattern: impl Into<String>) -> Ls {
    Ls {
        pattern: pattern.into(),
    }
}

impl Ls {
    /// Split into the directory to read and the name filter, if any.
    fn split(&self) -> (PathBuf, Option<String>) {
        let path = Path::new(&self.pattern);
        match path.file_name().map(|n| n.to_string_lossy().to_string()) {
            Some(name) if contains_glob(&name) => {
                let dir = match path.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                    _ => PathBuf::from("."),
                };
                (dir, Some(name))
            }
            _ => (path.to_path_buf(), None),
        }
    }

    async fn names(&self) -> Result<Vec<String>, StageError> {
        let (dir, filter) = self.split();
        let display = dir.display().to_string();

        let meta = tokio::fs::metadata(&dir)
            .await
            .map_err(|e| StageError::io(&display, &e))?;
        if !meta.is_dir() {
            return Ok(vec![self.pattern.clone()]);
        }

        let show_hidden = filter.as_deref().is_some_and(|f| f.starts_with('.'));
        let mut names = Vec::new();
        let mut reader = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| StageError::io(&display, &e))?;
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| StageError::io(&display, &e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') && !show_hidden {
                continue;
            }
            if filter.as_deref().is_none_or(|f| glob_match(f, &name)) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

#[async_trait]
impl Source for Ls {
    async fn produce(&mut self, out: &mut Outbound) -> StageResult {
        for name in self.names().await? {
            if out.is_cancelled() || out.emit_line(name).await.is_closed() {
                break;
            }
        }
        Ok(())
    }
}

impl From<Ls> for Stage {
    fn from(body: Ls) -> Self {
        Stage::source("ls", body)
    }
}
