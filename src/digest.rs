use crate::{Error, Result, Scheme};
use std::{fmt, str::FromStr};

/// A versioned content digest, e.g. `h1:zNSU/Wy8yQDuLMTXCzfmK7DrPViDHSkkGBbFcIVxJ3A=`.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Digest {
    scheme: Scheme,
    encoded: String,
}

impl Digest {
    pub(crate) fn new(scheme: Scheme, sum: &[u8; 32]) -> Self {
        Self {
            scheme,
            encoded: format!("{}:{}", scheme.tag(), scheme.encode(sum)),
        }
    }

    #[must_use]
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl FromStr for Digest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (tag, payload) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidDigest(s.to_owned()))?;
        let scheme = Scheme::from_tag(tag)?;
        let sum = scheme
            .decode(payload)
            .ok_or_else(|| Error::InvalidDigest(s.to_owned()))?;
        let digest = Self::new(scheme, &sum);
        // smoelius: Reject non-canonical encodings so that equal digests are equal strings.
        if digest.encoded != s {
            return Err(Error::InvalidDigest(s.to_owned()));
        }
        Ok(digest)
    }
}
