//! Attribute files: one read-only file per license attribute.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use aegis_license::{LicenseAttribute, LicenseState, render_all};
use anyhow::{Context, Result};
use tempfile::Builder;

#[cfg(unix)]
const ATTRIBUTE_MODE: u32 = 0o444;

/// Prefix of in-flight attribute writes.
const TEMP_PREFIX: &str = ".aegis-attr-";

/// Writes the attribute surface for each published snapshot.
#[derive(Debug)]
pub struct AttributePublisher {
    dir: PathBuf,
    version: &'static str,
}

impl AttributePublisher {
    #[must_use]
    pub fn new(dir: PathBuf, version: &'static str) -> Self {
        Self { dir, version }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `attr`.
    #[must_use]
    pub fn path_of(&self, attr: LicenseAttribute) -> PathBuf {
        self.dir.join(attr.name())
    }

    /// Render every attribute from `state` and replace the files.
    ///
    /// Each file is swapped in by rename, so a reader sees either the old or the new content.
    ///
    /// # Errors
    /// Returns an error if the directory or a file cannot be written.
    pub fn publish(&self, state: &LicenseState) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        for (attr, value) in render_all(state, self.version) {
            let path = self.path_of(attr);
            self.write_atomic(&path, value.as_bytes())
                .with_context(|| format!("failed to publish {}", path.display()))?;
        }

        tracing::debug!(
            dir = %self.dir.display(),
            tier = %state.tier(),
            "license attributes published"
        );
        Ok(())
    }

    /// Remove the attribute files and any interrupted writes.
    ///
    /// The directory itself is removed only if nothing else lives in it.
    ///
    /// # Errors
    /// Returns an error if one of our files exists but cannot be removed.
    pub fn remove(&self) -> Result<()> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.dir.display()));
            }
        };

        for attr in LicenseAttribute::ALL {
            remove_if_present(&self.path_of(attr))?;
        }
        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
                remove_if_present(&entry.path())?;
            }
        }

        match fs::remove_dir(&self.dir) {
            Ok(()) => {
                tracing::debug!(dir = %self.dir.display(), "license attributes removed");
            }
            Err(e) if e.kind() == io::ErrorKind::DirectoryNotEmpty => {
                tracing::debug!(
                    dir = %self.dir.display(),
                    "license attributes removed, directory kept"
                );
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("failed to remove {}", self.dir.display()));
            }
        }
        Ok(())
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut tmp = Builder::new().prefix(TEMP_PREFIX).tempfile_in(&self.dir)?;
        tmp.write_all(contents)?;
        tmp.as_file().sync_all()?;
        set_read_only(tmp.path())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            Err(e).with_context(|| format!("failed to remove {}", path.display()))
        }
        _ => Ok(()),
    }
}

#[cfg(unix)]
fn set_read_only(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(ATTRIBUTE_MODE))
}

#[cfg(not(unix))]
fn set_read_only(path: &Path) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(true);
    fs::set_permissions(path, perms)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use aegis_license::{DeactivationReason, Tier};
    use time::OffsetDateTime;

    #[test]
    fn test_publish_writes_every_attribute() {
        let root = tempfile::tempdir().unwrap();
        let publisher = AttributePublisher::new(root.path().join("aegis"), "1.0.0");
        let state = LicenseState::active(Tier::Gamer, OffsetDateTime::now_utc()).unwrap();

        publisher.publish(&state).unwrap();

        let read = |attr| fs::read_to_string(publisher.path_of(attr)).unwrap();
        assert_eq!(read(LicenseAttribute::Tier), "3\n");
        assert_eq!(read(LicenseAttribute::Status), "gamer\n");
        assert_eq!(read(LicenseAttribute::Version), "1.0.0\n");
        assert!(read(LicenseAttribute::Features).contains("low_latency_mode\n"));
        assert!(read(LicenseAttribute::DisabledFeatures).contains("gpu_acceleration\n"));
    }

    #[test]
    fn test_republish_replaces_read_only_files() {
        let root = tempfile::tempdir().unwrap();
        let publisher = AttributePublisher::new(root.path().join("aegis"), "1.0.0");

        let active = LicenseState::active(Tier::Server, OffsetDateTime::now_utc()).unwrap();
        publisher.publish(&active).unwrap();
        publisher
            .publish(&LicenseState::deactivated(DeactivationReason::Unloaded))
            .unwrap();

        let status = fs::read_to_string(publisher.path_of(LicenseAttribute::Status)).unwrap();
        assert_eq!(status, "unlicensed\n");

        let leftovers = fs::read_dir(publisher.dir()).unwrap().count();
        assert_eq!(leftovers, LicenseAttribute::ALL.len());
    }

    #[cfg(unix)]
    #[test]
    fn test_files_are_read_only() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        let publisher = AttributePublisher::new(root.path().join("aegis"), "1.0.0");
        publisher.publish(&LicenseState::default()).unwrap();

        let mode = fs::metadata(publisher.path_of(LicenseAttribute::Tier))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o444);
    }

    #[test]
    fn test_remove_keeps_files_it_did_not_write() {
        let root = tempfile::tempdir().unwrap();
        let shared = root.path().join("run");
        fs::create_dir_all(&shared).unwrap();
        let neighbour = shared.join("important.db");
        fs::write(&neighbour, "keep me").unwrap();

        let publisher = AttributePublisher::new(shared.clone(), "1.0.0");
        publisher.publish(&LicenseState::default()).unwrap();
        fs::write(shared.join(format!("{TEMP_PREFIX}stale")), "partial").unwrap();

        publisher.remove().unwrap();

        assert_eq!(fs::read_to_string(&neighbour).unwrap(), "keep me");
        let remaining: Vec<_> = fs::read_dir(&shared)
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(remaining, vec![std::ffi::OsString::from("important.db")]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let publisher = AttributePublisher::new(root.path().join("aegis"), "1.0.0");
        publisher.publish(&LicenseState::default()).unwrap();

        publisher.remove().unwrap();
        assert!(!publisher.dir().exists());
        publisher.remove().unwrap();
    }
}
