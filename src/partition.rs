//! Verdict persistence.
//!
//! Every verdict becomes one `domain,suffix` line in exactly one of two
//! files. This type is the only writer to either file. Each line goes out
//! in a single write and is flushed before the next verdict is accepted, so
//! an interrupted run leaves only whole lines behind.

use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::classifier::Verdict;
use crate::error::{Error, Result};

/// File name for DoH-capable candidates.
pub const CAPABLE_FILE: &str = "doh_other_suffix.txt";
/// File name for everything else.
pub const INCAPABLE_FILE: &str = "no_other_suffix.txt";

/// Locations of the two output partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPaths {
    pub capable: PathBuf,
    pub incapable: PathBuf,
}

impl PartitionPaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            capable: dir.join(CAPABLE_FILE),
            incapable: dir.join(INCAPABLE_FILE),
        }
    }
}

pub struct Partitioner {
    capable: File,
    incapable: File,
    paths: PartitionPaths,
    capable_lines: u64,
    incapable_lines: u64,
}

impl Partitioner {
    /// Create `dir` if needed and truncate both partition files in it.
    pub async fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).await.map_err(|source| Error::Output {
            path: dir.to_path_buf(),
            source,
        })?;

        Self::with_paths(PartitionPaths::in_dir(dir)).await
    }

    pub async fn with_paths(paths: PartitionPaths) -> Result<Self> {
        let capable = open(&paths.capable).await?;
        let incapable = open(&paths.incapable).await?;

        Ok(Self {
            capable,
            incapable,
            paths,
            capable_lines: 0,
            incapable_lines: 0,
        })
    }

    /// Append the verdict's line to its partition and flush it.
    pub async fn record(&mut self, verdict: &Verdict) -> Result<()> {
        let mut line = verdict.line();
        line.push('\n');

        let (file, path, count) = if verdict.is_doh_capable {
            (&mut self.capable, &self.paths.capable, &mut self.capable_lines)
        } else {
            (&mut self.incapable, &self.paths.incapable, &mut self.incapable_lines)
        };

        let write = async {
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        };
        write.await.map_err(|source| Error::Output {
            path: path.clone(),
            source,
        })?;

        *count += 1;
        Ok(())
    }

    pub fn paths(&self) -> &PartitionPaths {
        &self.paths
    }

    pub fn capable_lines(&self) -> u64 {
        self.capable_lines
    }

    pub fn incapable_lines(&self) -> u64 {
        self.incapable_lines
    }
}

async fn open(path: &Path) -> Result<File> {
    File::create(path).await.map_err(|source| Error::Output {
        path: path.to_path_buf(),
        source,
    })
}
