//! Addressable sources of schema definition language text.

use std::fmt;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use walkdir::WalkDir;

/// A resource yielding UTF-8 schema definition language text.
///
/// A resource that does not exist, or cannot be read, fails the assembly.
pub trait SchemaResource: fmt::Debug + Send + Sync + 'static {
    /// A human readable description, used in errors and as the source path in diagnostics.
    fn description(&self) -> String;

    /// Whether the resource exists.
    fn exists(&self) -> bool;

    /// Reads the whole resource.
    fn read_to_string(&self) -> io::Result<String>;
}

/// Schema text held in memory.
#[derive(Clone, Debug)]
pub struct InlineResource {
    name: String,
    sdl: Arc<str>,
}

impl InlineResource {
    pub fn new(name: impl Into<String>, sdl: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            sdl: sdl.into(),
        }
    }
}

impl SchemaResource for InlineResource {
    fn description(&self) -> String {
        self.name.clone()
    }

    fn exists(&self) -> bool {
        true
    }

    fn read_to_string(&self) -> io::Result<String> {
        Ok(self.sdl.to_string())
    }
}

/// A schema file.
#[derive(Clone, Debug)]
pub struct FileResource {
    path: PathBuf,
}

impl FileResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SchemaResource for FileResource {
    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn read_to_string(&self) -> io::Result<String> {
        std::fs::read_to_string(&self.path)
    }
}

/// Collects the files under `location` whose name ends with one of `extensions`.
///
/// A file location is returned as is, whatever its extension. Directories are walked
/// recursively without following symbolic links, in file name order, so that assembly does
/// not depend on the order in which the file system lists them.
pub(crate) fn discover(location: &Path, extensions: &[String]) -> io::Result<Vec<FileResource>> {
    if location.is_file() {
        return Ok(vec![FileResource::new(location)]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(location).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| extensions.iter().any(|ext| name.ends_with(ext.as_str())))
        {
            files.push(FileResource::new(entry.into_path()));
        }
    }
    Ok(files)
}
