use crate::{Digest, Error, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest as _, Sha256};
use std::{fmt, io::Read, str::FromStr};

const CHUNK_LEN: usize = 64 * 1024;

/// A versioned hashing scheme.
///
/// The tag is part of every digest the scheme produces. Changing how files are hashed, how the
/// manifest is laid out, or how the final hash is encoded requires a new variant with a new tag,
/// so that digests from different schemes never compare equal.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Scheme {
    /// SHA-256 per file, SHA-256 over the manifest, standard base64.
    #[default]
    Hash1,
}

impl Scheme {
    pub const ALL: &'static [Scheme] = &[Scheme::Hash1];

    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Hash1 => "h1",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|scheme| scheme.tag() == tag)
            .ok_or_else(|| Error::UnknownScheme(tag.to_owned()))
    }

    /// Hashes everything `reader` yields. Read errors are returned as-is.
    pub fn hash_file(self, reader: &mut dyn Read) -> Result<[u8; 32]> {
        match self {
            Self::Hash1 => {
                let mut hasher = Sha256::new();
                let mut buf = vec![0; CHUNK_LEN];
                loop {
                    let n = match reader.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => n,
                        Err(error) if error.kind() == std::io::ErrorKind::Interrupted => continue,
                        Err(error) => return Err(error.into()),
                    };
                    hasher.update(&buf[..n]);
                }
                Ok(hasher.finalize().into())
            }
        }
    }

    /// Folds a manifest into the final digest.
    #[must_use]
    pub fn hash_manifest(self, manifest: &[u8]) -> Digest {
        match self {
            Self::Hash1 => {
                let sum: [u8; 32] = Sha256::digest(manifest).into();
                Digest::new(self, &sum)
            }
        }
    }

    pub(crate) fn encode(self, sum: &[u8; 32]) -> String {
        match self {
            Self::Hash1 => STANDARD.encode(sum),
        }
    }

    pub(crate) fn decode(self, payload: &str) -> Option<[u8; 32]> {
        match self {
            Self::Hash1 => STANDARD
                .decode(payload)
                .ok()
                .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok()),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tag().fmt(f)
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_tag(s)
    }
}

#[cfg(test)]
mod test {
    use super::Scheme;
    use crate::Error;
    use std::io::{self, Cursor, Read};

    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let Some((&first, rest)) = self.0.split_first() else {
                return Ok(0);
            };
            buf[0] = first;
            self.0 = rest;
            Ok(1)
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk on fire"))
        }
    }

    #[test]
    fn empty_file() {
        let sum = Scheme::Hash1.hash_file(&mut Cursor::new(b"")).unwrap();
        assert_eq!(
            hex::encode(sum),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn chunking_is_invisible() {
        let contents = b"foo contents";
        let whole = Scheme::Hash1.hash_file(&mut Cursor::new(contents)).unwrap();
        let trickled = Scheme::Hash1.hash_file(&mut Trickle(contents)).unwrap();
        assert_eq!(whole, trickled);
        assert_eq!(
            hex::encode(whole),
            "5fa3473d182d26c6f26a6cad032ae12092df6e26e12499b4051997b5b723860d"
        );
    }

    #[test]
    fn large_file_spans_chunks() {
        let contents = vec![0xa5u8; super::CHUNK_LEN * 3 + 17];
        let whole = Scheme::Hash1.hash_file(&mut Cursor::new(&contents)).unwrap();
        let mut truncated = contents.clone();
        truncated.pop();
        let other = Scheme::Hash1
            .hash_file(&mut Cursor::new(&truncated))
            .unwrap();
        assert_ne!(whole, other);
    }

    #[test]
    fn read_errors_pass_through() {
        let error = Scheme::Hash1.hash_file(&mut Broken).unwrap_err();
        let Error::Io(error) = error else {
            panic!("unexpected error: {error:?}");
        };
        assert_eq!(error.to_string(), "disk on fire");
    }

    #[test]
    fn empty_manifest() {
        assert_eq!(
            Scheme::Hash1.hash_manifest(b"").to_string(),
            "h1:47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn tags() {
        assert_eq!(Scheme::from_tag("h1").unwrap(), Scheme::Hash1);
        assert!(matches!(
            Scheme::from_tag("h2"),
            Err(Error::UnknownScheme(tag)) if tag == "h2"
        ));
    }
}
