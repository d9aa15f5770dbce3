//! Primary/fallback path resolution.
//!
//! Every file the tool touches has a system location (under
//! `/etc/wireguard`) and a fallback in the working directory that is used
//! when the system location does not exist or is not accessible.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A primary location and the local fallback used when it is absent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPair {
    pub primary: PathBuf,
    pub fallback: PathBuf,
}

impl PathPair {
    pub fn new(primary: impl Into<PathBuf>, fallback: impl Into<PathBuf>) -> Self {
        PathPair {
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }

    /// Use the same path for both locations
    pub fn single(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        PathPair {
            primary: path.clone(),
            fallback: path,
        }
    }

    /// Return the primary path if it exists, otherwise the fallback.
    ///
    /// The fallback is returned even when it does not exist either; callers
    /// that need the data report the absence themselves.
    pub fn resolve(&self) -> &Path {
        if self.primary.exists() {
            &self.primary
        } else {
            log::debug!("{:?} not accessible, falling back to {:?}", self.primary, self.fallback);
            &self.fallback
        }
    }

    /// Return the first of the two paths that exists
    pub fn existing(&self) -> Option<&Path> {
        [&self.primary, &self.fallback]
            .into_iter()
            .find(|p| p.exists())
            .map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prefers_primary_when_present() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("wg0.conf");
        let fallback = dir.path().join("local.conf");
        std::fs::write(&primary, "").unwrap();
        std::fs::write(&fallback, "").unwrap();

        let pair = PathPair::new(&primary, &fallback);
        assert_eq!(pair.resolve(), primary.as_path());
        assert_eq!(pair.existing(), Some(primary.as_path()));
    }

    #[test]
    fn test_falls_back_when_primary_missing() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("missing").join("wg0.conf");
        let fallback = dir.path().join("wg0.conf");

        let pair = PathPair::new(&primary, &fallback);
        assert_eq!(pair.resolve(), fallback.as_path());
        assert_eq!(pair.existing(), None);

        std::fs::write(&fallback, "").unwrap();
        assert_eq!(pair.existing(), Some(fallback.as_path()));
    }
}
