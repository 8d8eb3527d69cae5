//! Sources the loader can read uploaded programs from

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// An uploaded file whose full contents can be read asynchronously
#[async_trait]
pub trait ProgramSource: Send + Sync {
    /// Human readable name used in logs and errors
    fn name(&self) -> String;

    /// Read the entire contents
    async fn read_all(&self) -> io::Result<Vec<u8>>;
}

#[async_trait]
impl<T: ProgramSource + ?Sized> ProgramSource for Box<T> {
    fn name(&self) -> String {
        (**self).name()
    }

    async fn read_all(&self) -> io::Result<Vec<u8>> {
        (**self).read_all().await
    }
}

/// A program stored on the local filesystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl From<PathBuf> for FileSource {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for FileSource {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

#[async_trait]
impl ProgramSource for FileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    async fn read_all(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// A program already held in memory (e.g. received over the wire)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySource {
    name: String,
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
impl ProgramSource for MemorySource {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn read_all(&self) -> io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}
