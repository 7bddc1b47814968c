use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Literal scheme prefix of every locator.
pub const LOCATOR_SCHEME: &str = "gridfs";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid file locator: {0}")]
pub struct LocatorError(pub String);

/// Opaque handle to a stored object: `gridfs://<bucket>/<object id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileLocator {
    bucket: String,
    object_id: String,
}

impl FileLocator {
    pub fn new(bucket: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object_id: object_id.into(),
        }
    }

    /// Parse `gridfs://<bucket>/<id>`. The bucket segment stops at the first
    /// `/`; everything after it is the id and must be non-empty.
    pub fn parse(s: &str) -> Result<Self, LocatorError> {
        let rest = s
            .strip_prefix(LOCATOR_SCHEME)
            .and_then(|r| r.strip_prefix("://"))
            .ok_or_else(|| LocatorError(s.to_string()))?;

        match rest.split_once('/') {
            Some((bucket, id)) if !bucket.is_empty() && !id.is_empty() => {
                Ok(Self::new(bucket, id))
            }
            _ => Err(LocatorError(s.to_string())),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }
}

impl fmt::Display for FileLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{LOCATOR_SCHEME}://{}/{}", self.bucket, self.object_id)
    }
}

impl FromStr for FileLocator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_locator() {
        let locator = FileLocator::parse("gridfs://resume-files/507f1f77bcf86cd799439011").unwrap();
        assert_eq!(locator.bucket(), "resume-files");
        assert_eq!(locator.object_id(), "507f1f77bcf86cd799439011");
    }

    #[test]
    fn test_display_reproduces_input() {
        let raw = "gridfs://resume-files/507f1f77bcf86cd799439011";
        assert_eq!(FileLocator::parse(raw).unwrap().to_string(), raw);
        assert_eq!(
            FileLocator::new("resume-files", "abc").to_string(),
            "gridfs://resume-files/abc"
        );
    }

    #[test]
    fn test_id_may_contain_slashes() {
        let locator = FileLocator::parse("gridfs://bucket/a/b").unwrap();
        assert_eq!(locator.bucket(), "bucket");
        assert_eq!(locator.object_id(), "a/b");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for raw in [
            "not-a-locator",
            "",
            "gridfs://",
            "gridfs://resume-files",
            "gridfs://resume-files/",
            "gridfs:///507f1f77bcf86cd799439011",
            "s3://resume-files/507f1f77bcf86cd799439011",
            "gridfs:/resume-files/507f1f77bcf86cd799439011",
        ] {
            assert!(FileLocator::parse(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn test_error_names_input() {
        let err = FileLocator::parse("nope").unwrap_err();
        assert_eq!(err.to_string(), "Invalid file locator: nope");
    }
}
