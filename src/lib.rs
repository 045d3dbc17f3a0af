//! Content digests for module file trees.
//!
//! A digest depends only on the set of (path, contents) pairs in a tree. Permissions, timestamps,
//! enumeration order, and whether the tree is a directory or a zip archive do not affect it.
//!
//! ```no_run
//! # fn main() -> dirhasher::Result<()> {
//! let digest = dirhasher::hash_dir("path/to/module", "", dirhasher::Scheme::Hash1)?;
//! println!("{digest}");
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use tracing::debug;

mod digest;
pub use digest::Digest;

mod enumerate;
pub use enumerate::{open_tree, DirTree, Enumerator, MemoryTree, ZipTree};

mod error;
pub use error::{Error, Result};

mod manifest;
pub use manifest::{validate_path, Manifest};

mod scheme;
pub use scheme::Scheme;

/// Computes the digest of the files `source` lists, each path prefixed by `prefix/` when `prefix`
/// is non-empty.
///
/// Fails if any path is invalid or duplicated, or if any file cannot be read. There is no partial
/// result.
pub fn hash_tree(scheme: Scheme, prefix: &str, source: &mut dyn Enumerator) -> Result<Digest> {
    let manifest = Manifest::build(scheme, prefix, source)?;
    let digest = scheme.hash_manifest(manifest.as_bytes());
    debug!(%digest, manifest_len = manifest.as_bytes().len());
    Ok(digest)
}

/// Computes the digest of the files beneath `root`.
pub fn hash_dir(root: impl AsRef<Path>, prefix: &str, scheme: Scheme) -> Result<Digest> {
    let mut tree = DirTree::new(root.as_ref())?;
    hash_tree(scheme, prefix, &mut tree)
}

/// Computes the digest of the files in the zip archive at `path`.
pub fn hash_zip(path: impl AsRef<Path>, scheme: Scheme) -> Result<Digest> {
    let mut tree = ZipTree::open(path)?;
    hash_tree(scheme, "", &mut tree)
}

#[cfg(test)]
mod test {
    use super::{hash_tree, Error, MemoryTree, Scheme};

    const FOO_BAR: &str = "h1:zNSU/Wy8yQDuLMTXCzfmK7DrPViDHSkkGBbFcIVxJ3A=";
    const EMPTY: &str = "h1:47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=";

    fn digest(prefix: &str, files: &[(&str, &str)]) -> String {
        let mut tree = files.iter().copied().collect::<MemoryTree>();
        hash_tree(Scheme::Hash1, prefix, &mut tree)
            .unwrap()
            .to_string()
    }

    #[test]
    fn foo_bar() {
        assert_eq!(
            digest("", &[("foo", "foo contents"), ("bar", "bar contents")]),
            FOO_BAR
        );
    }

    #[test]
    fn deterministic() {
        let files = [("a/b.txt", "b"), ("a.txt", "a")];
        assert_eq!(digest("", &files), digest("", &files));
        assert_eq!(
            digest("", &files),
            "h1:kvhEbrZO5pI1T4fMk9bOf9tzW3fJHqxm9cqcY3YXewQ="
        );
    }

    #[test]
    fn order_independent() {
        let files = [
            ("foo", "foo contents"),
            ("bar", "bar contents"),
            ("dir/baz", ""),
            ("dir/sub/qux", "qux"),
        ];
        let expected = digest("", &files);
        for rotation in 1..files.len() {
            let mut permuted = files;
            permuted.rotate_left(rotation);
            assert_eq!(digest("", &permuted), expected);
            permuted.reverse();
            assert_eq!(digest("", &permuted), expected);
        }
    }

    #[test]
    fn empty_tree() {
        assert_eq!(digest("", &[]), EMPTY);
        assert_eq!(digest("example.com/m@v1.0.0", &[]), EMPTY);
    }

    #[test]
    fn prefix() {
        assert_eq!(
            digest("m@v1", &[("foo", "foo contents"), ("bar", "bar contents")]),
            "h1:2ThEsEYT7qWq3gx03IhEP9PoBmVgRSkoOaxoXH6dH+s="
        );
    }

    #[test]
    fn sensitive_to_contents() {
        let base = digest("", &[("foo", "foo contents"), ("bar", "bar contents")]);
        assert_ne!(
            digest("", &[("foo", "foo contentz"), ("bar", "bar contents")]),
            base
        );
    }

    #[test]
    fn sensitive_to_names() {
        let base = digest("", &[("foo", "foo contents"), ("bar", "bar contents")]);
        assert_ne!(
            digest("", &[("foo2", "foo contents"), ("bar", "bar contents")]),
            base
        );
    }

    #[test]
    fn sensitive_to_empty_files() {
        let base = digest("", &[("foo", "foo contents"), ("bar", "bar contents")]);
        let with_empty = digest(
            "",
            &[("foo", "foo contents"), ("bar", "bar contents"), ("empty", "")],
        );
        assert_ne!(with_empty, base);
        assert_eq!(with_empty, "h1:UhZDINrWdhLpp6G160QPfhjE5GJ9PHtM8m2HKb9YFxA=");
        assert_eq!(
            digest("", &[("empty", "")]),
            "h1:qeRWy81PSQtvM1POcgo/T5uzgbJ/wGDTruTnDuezfz0="
        );
        assert_ne!(digest("", &[("empty", "")]), EMPTY);
    }

    #[test]
    fn dot_dot_is_invalid() {
        let mut tree = [("ok", ""), ("a/../b", "")]
            .into_iter()
            .collect::<MemoryTree>();
        assert!(matches!(
            hash_tree(Scheme::Hash1, "", &mut tree),
            Err(Error::InvalidPath { path, .. }) if path == "a/../b"
        ));
    }
}
