use crate::{Error, Result};
use std::{
    collections::BTreeSet,
    fs::{metadata, File},
    io::{self, BufReader, Cursor, Read, Seek, SeekFrom},
    path::{Component, Path, PathBuf},
};
use tracing::debug;
use walkdir::WalkDir;
use zip::ZipArchive;

mod central_directory;

/// A flat listing of files, each of which can be opened for reading.
///
/// Paths are relative and `/`-separated. The order of [`Enumerator::paths`] does not matter.
pub trait Enumerator {
    fn paths(&mut self) -> Result<Vec<String>>;

    /// Opens a file previously returned by [`Enumerator::paths`].
    fn open(&mut self, path: &str) -> Result<Box<dyn Read + '_>>;
}

/// Opens `path` as a [`DirTree`] if it is a directory and as a [`ZipTree`] otherwise.
pub fn open_tree(path: impl AsRef<Path>) -> Result<Box<dyn Enumerator>> {
    let path = path.as_ref();
    if stat(path)?.is_dir() {
        Ok(Box::new(DirTree::new(path)?))
    } else {
        Ok(Box::new(ZipTree::open(path)?))
    }
}

fn stat(path: &Path) -> Result<std::fs::Metadata> {
    metadata(path).map_err(|error| {
        if error.kind() == io::ErrorKind::NotFound {
            Error::NotFound(path.to_path_buf())
        } else {
            Error::Io(error)
        }
    })
}

/// The regular files beneath a directory.
#[derive(Debug)]
pub struct DirTree {
    root: PathBuf,
}

impl DirTree {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !stat(&root)?.is_dir() {
            return Err(Error::NotADirectory(root));
        }
        Ok(Self { root })
    }
}

impl Enumerator for DirTree {
    fn paths(&mut self) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        for result in WalkDir::new(&self.root).follow_links(false) {
            let entry = result.map_err(walkdir_error)?;
            if entry.file_type().is_dir() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .map_err(|_| Error::invalid_path(entry.path().to_string_lossy(), "outside root"))?;
            paths.push(slash_path(relative)?);
        }
        debug!(root = %self.root.display(), files = paths.len(), "walked directory");
        Ok(paths)
    }

    fn open(&mut self, path: &str) -> Result<Box<dyn Read + '_>> {
        let file = File::open(self.root.join(path))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

fn walkdir_error(error: walkdir::Error) -> Error {
    error.into_io_error().map_or_else(
        || Error::Io(io::Error::other("filesystem loop detected")),
        Error::Io,
    )
}

// smoelius: Join components with `/` rather than relying on `Path::display`, so that the same tree
// produces the same paths on Windows.
fn slash_path(path: &Path) -> Result<String> {
    let mut segments = Vec::new();
    for component in path.components() {
        let Component::Normal(segment) = component else {
            return Err(Error::invalid_path(
                path.to_string_lossy(),
                "unexpected path component",
            ));
        };
        let segment = segment
            .to_str()
            .ok_or_else(|| Error::invalid_path(path.to_string_lossy(), "path is not UTF-8"))?;
        segments.push(segment);
    }
    Ok(segments.join("/"))
}

/// The file entries of a zip archive.
pub struct ZipTree<R> {
    archive: ZipArchive<R>,
}

impl ZipTree<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|error| {
            if error.kind() == io::ErrorKind::NotFound {
                Error::NotFound(path.to_path_buf())
            } else {
                Error::Io(error)
            }
        })?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read + Seek> ZipTree<R> {
    /// Reads the archive's central directory. Fails if two file entries share a name.
    pub fn new(mut reader: R) -> Result<Self> {
        reject_duplicate_names(&mut reader)?;
        reader.seek(SeekFrom::Start(0))?;
        let archive = ZipArchive::new(reader)?;
        Ok(Self { archive })
    }
}

// smoelius: `ZipArchive` keeps one entry per name, so duplicates must be caught before it is built.
fn reject_duplicate_names<R: Read + Seek>(reader: &mut R) -> Result<()> {
    let mut seen = BTreeSet::new();
    for name in central_directory::entry_names(reader)? {
        if name.ends_with(b"/") {
            continue;
        }
        if seen.contains(&name) {
            return Err(Error::invalid_path(
                String::from_utf8_lossy(&name),
                "duplicate path",
            ));
        }
        seen.insert(name);
    }
    Ok(())
}

impl<R: Read + Seek> Enumerator for ZipTree<R> {
    fn paths(&mut self) -> Result<Vec<String>> {
        let mut paths = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            let file = self.archive.by_index_raw(i)?;
            // smoelius: Directory entries have no counterpart in an extracted tree.
            if file.is_dir() {
                debug!(name = file.name(), "skipping directory entry");
                continue;
            }
            paths.push(file.name().to_owned());
        }
        debug!(files = paths.len(), "read zip central directory");
        Ok(paths)
    }

    fn open(&mut self, path: &str) -> Result<Box<dyn Read + '_>> {
        let file = self.archive.by_name(path)?;
        Ok(Box::new(file))
    }
}

/// Files held in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryTree {
    files: Vec<(String, Vec<u8>)>,
}

impl MemoryTree {
    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.files.push((path.into(), contents.into()));
    }
}

impl<P: Into<String>, C: Into<Vec<u8>>> FromIterator<(P, C)> for MemoryTree {
    fn from_iter<T: IntoIterator<Item = (P, C)>>(iter: T) -> Self {
        let mut tree = Self::default();
        for (path, contents) in iter {
            tree.insert(path, contents);
        }
        tree
    }
}

impl Enumerator for MemoryTree {
    fn paths(&mut self) -> Result<Vec<String>> {
        Ok(self.files.iter().map(|(path, _)| path.clone()).collect())
    }

    fn open(&mut self, path: &str) -> Result<Box<dyn Read + '_>> {
        let (_, contents) = self
            .files
            .iter()
            .find(|(other, _)| other == path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_owned()))?;
        Ok(Box::new(Cursor::new(contents.as_slice())))
    }
}
