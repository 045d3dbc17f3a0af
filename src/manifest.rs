use crate::{Enumerator, Error, Result, Scheme};
use std::collections::{btree_map::Entry, BTreeMap};
use tracing::trace;

/// The canonical text that a tree digest is computed over: one `<hex>  <path>\n` line per file,
/// in byte-wise path order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Manifest(Vec<u8>);

impl Manifest {
    /// Hashes every file `source` lists and lays the results out canonically.
    ///
    /// All paths are checked before any file is opened, so a bad listing fails without reading
    /// file contents. Each file is opened once and read to the end.
    pub fn build(scheme: Scheme, prefix: &str, source: &mut dyn Enumerator) -> Result<Self> {
        let paths = sorted_paths(prefix, source.paths()?)?;

        let mut manifest = Vec::with_capacity(paths.len() * (64 + 2 + 32));
        for (path, source_path) in &paths {
            let mut reader = source.open(source_path)?;
            let hash = hex::encode(scheme.hash_file(&mut reader)?);
            trace!(%path, %hash);
            manifest.extend_from_slice(hash.as_bytes());
            manifest.extend_from_slice(b"  ");
            manifest.extend_from_slice(path.as_bytes());
            manifest.push(b'\n');
        }

        Ok(Self(manifest))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

// smoelius: `String`'s `Ord` compares bytes, so iterating the map yields byte-wise path order.
fn sorted_paths(prefix: &str, paths: Vec<String>) -> Result<BTreeMap<String, String>> {
    let mut sorted = BTreeMap::new();
    for source_path in paths {
        let path = join_prefix(prefix, &source_path);
        validate_path(&path)?;
        match sorted.entry(path) {
            Entry::Vacant(entry) => {
                entry.insert(source_path);
            }
            Entry::Occupied(entry) => {
                return Err(Error::invalid_path(entry.key().clone(), "duplicate path"));
            }
        }
    }
    Ok(sorted)
}

fn join_prefix(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        path.to_owned()
    } else {
        format!("{prefix}/{path}")
    }
}

/// Checks that `path` is a relative, slash-separated path that can appear on a manifest line.
pub fn validate_path(path: &str) -> Result<()> {
    let reason = if path.is_empty() {
        "empty path"
    } else if path.starts_with('/') {
        "absolute path"
    } else if path.contains('\\') {
        "backslash in path"
    } else if path.contains('\n') {
        "newline in path"
    } else if path.split('/').any(|segment| segment == "..") {
        "`..` segment in path"
    } else if path.split('/').any(str::is_empty) {
        "empty segment in path"
    } else {
        return Ok(());
    };
    Err(Error::invalid_path(path, reason))
}
