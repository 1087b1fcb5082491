//! The experience directory as a store with three operations: list active files, archive
//! hand-written files, and back up / restore generated files around a regeneration.
//!
//! All mutations are renames. A crash part-way through a restore can leave a file in either
//! the backup directory or the experience directory, never in both.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::grounding::GeneratedExperience;
use crate::loader::frontmatter::render_frontmatter;
use crate::provenance::variant::{archived_file_name, generated_file_name, Authorship, FileVariant};
use crate::provenance::{Clock, ProvenanceError};

const EXPERIENCE_DIR: &str = "experience";
const BACKUP_PREFIX: &str = "llm_experience_backup_";

/// The single file that represents a logical experience entry in a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveFile {
    pub slug: String,
    pub authorship: Authorship,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ExperienceStore {
    experience_dir: PathBuf,
    backup_root: PathBuf,
}

impl ExperienceStore {
    /// Store over `<data_dir>/experience`, with backups under `<data_dir>/../tmp`.
    pub fn new(data_dir: &Path) -> Self {
        let backup_root = data_dir
            .parent()
            .map(|p| p.join("tmp"))
            .unwrap_or_else(|| data_dir.join("tmp"));
        Self {
            experience_dir: data_dir.join(EXPERIENCE_DIR),
            backup_root,
        }
    }

    pub fn with_backup_root(mut self, backup_root: impl Into<PathBuf>) -> Self {
        self.backup_root = backup_root.into();
        self
    }

    pub fn experience_dir(&self) -> &Path {
        &self.experience_dir
    }

    // ────────────────────────────────────────────────────────────────────────
    // Resolution
    // ────────────────────────────────────────────────────────────────────────

    /// One file per slug, highest priority wins, ordered by slug. A missing directory is empty.
    pub fn active_files(&self) -> Result<Vec<ActiveFile>, ProvenanceError> {
        let mut best: BTreeMap<String, (u8, ActiveFile)> = BTreeMap::new();

        for (path, variant) in self.scan()? {
            let priority = variant.priority();
            let FileVariant::Active { authorship, slug } = variant else {
                continue;
            };
            if let Some((existing, _)) = best.get(&slug) {
                if *existing >= priority {
                    continue;
                }
            }
            best.insert(
                slug.clone(),
                (
                    priority,
                    ActiveFile {
                        slug,
                        authorship,
                        path,
                    },
                ),
            );
        }

        Ok(best.into_values().map(|(_, file)| file).collect())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Archive
    // ────────────────────────────────────────────────────────────────────────

    /// Renames every `user_<slug>.md` to `user_<slug>.<epoch>[_<n>].md`.
    ///
    /// Returns the new archive paths. Archived files are inert for builds.
    pub fn archive_user_experience_files(
        &self,
        clock: &dyn Clock,
    ) -> Result<Vec<PathBuf>, ProvenanceError> {
        let epoch = clock.now_epoch();
        let mut archived = Vec::new();

        for (path, variant) in self.scan()? {
            if !variant.is_authored() {
                continue;
            }
            let FileVariant::Active { slug, .. } = variant else {
                continue;
            };

            let mut dest = self.experience_dir.join(archived_file_name(&slug, epoch, None));
            let mut counter = 1u32;
            while dest.exists() {
                dest = self
                    .experience_dir
                    .join(archived_file_name(&slug, epoch, Some(counter)));
                counter += 1;
            }

            move_file(&path, &dest)?;
            archived.push(dest);
        }

        if !archived.is_empty() {
            info!(count = archived.len(), epoch, "Archived user experience files");
        }
        Ok(archived)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Backup / restore
    // ────────────────────────────────────────────────────────────────────────

    /// Moves every active `llm_<slug>.md` into a fresh backup directory.
    ///
    /// Returns `None` when there is nothing to back up.
    pub fn backup_llm_experience_files(
        &self,
        clock: &dyn Clock,
    ) -> Result<Option<PathBuf>, ProvenanceError> {
        let candidates: Vec<PathBuf> = self
            .scan()?
            .into_iter()
            .filter(|(_, variant)| variant.is_generated())
            .map(|(path, _)| path)
            .collect();
        if candidates.is_empty() {
            return Ok(None);
        }

        let backup_dir = self.fresh_backup_dir(clock.now_epoch())?;
        for path in &candidates {
            let Some(name) = path.file_name() else {
                continue;
            };
            if let Err(e) = move_file(path, &backup_dir.join(name)) {
                // Put back whatever already moved before surfacing the failure.
                if let Err(restore) = self.restore_llm_experience_files(&backup_dir) {
                    return Err(ProvenanceError::RestoreFailed {
                        cause: Box::new(e),
                        restore: Box::new(restore),
                    });
                }
                return Err(e);
            }
        }

        info!(
            count = candidates.len(),
            backup = %backup_dir.display(),
            "Backed up generated experience files"
        );
        Ok(Some(backup_dir))
    }

    /// Moves every backed-up file into the experience directory and removes the backup.
    ///
    /// A missing backup directory is a no-op, so calling this twice is safe.
    pub fn restore_llm_experience_files(&self, backup_dir: &Path) -> Result<(), ProvenanceError> {
        if !backup_dir.exists() {
            return Ok(());
        }
        fs::create_dir_all(&self.experience_dir)
            .map_err(|e| ProvenanceError::io("create", &self.experience_dir, e))?;

        for path in list_files(backup_dir)? {
            let Some(name) = path.file_name() else {
                continue;
            };
            let dest = self.experience_dir.join(name);
            if dest.exists() {
                fs::remove_file(&dest).map_err(|e| ProvenanceError::io("remove", &dest, e))?;
            }
            move_file(&path, &dest)?;
        }

        fs::remove_dir_all(backup_dir)
            .map_err(|e| ProvenanceError::io("remove", backup_dir, e))?;
        info!(backup = %backup_dir.display(), "Restored generated experience files");
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Regeneration
    // ────────────────────────────────────────────────────────────────────────

    /// Runs `write` with the previous generated files moved aside.
    ///
    /// On success the backup is deleted. On failure every generated file the attempt left
    /// behind is removed, the backup is restored, and then the original error is returned.
    pub fn regenerate<T, F>(&self, clock: &dyn Clock, write: F) -> Result<T, ProvenanceError>
    where
        F: FnOnce(&Self) -> Result<T, ProvenanceError>,
    {
        let backup = self.backup_llm_experience_files(clock)?;

        match write(self) {
            Ok(value) => {
                if let Some(dir) = &backup {
                    if let Err(e) = fs::remove_dir_all(dir) {
                        warn!(backup = %dir.display(), "Failed to delete experience backup: {e}");
                    }
                }
                Ok(value)
            }
            Err(cause) => {
                warn!("Experience regeneration failed, restoring previous files: {cause}");
                let rollback = self.remove_generated_files().and_then(|_| match &backup {
                    Some(dir) => self.restore_llm_experience_files(dir),
                    None => Ok(()),
                });
                match rollback {
                    Ok(()) => Err(cause),
                    Err(restore) => Err(ProvenanceError::RestoreFailed {
                        cause: Box::new(cause),
                        restore: Box::new(restore),
                    }),
                }
            }
        }
    }

    /// Replaces the generated experience set with `entries`, all or nothing.
    pub fn replace_generated(
        &self,
        entries: &[GeneratedExperience],
        clock: &dyn Clock,
    ) -> Result<Vec<PathBuf>, ProvenanceError> {
        self.regenerate(clock, |store| store.write_generated(entries))
    }

    /// Writes each entry to `llm_<id>.md`.
    pub fn write_generated(
        &self,
        entries: &[GeneratedExperience],
    ) -> Result<Vec<PathBuf>, ProvenanceError> {
        fs::create_dir_all(&self.experience_dir)
            .map_err(|e| ProvenanceError::io("create", &self.experience_dir, e))?;

        let mut written = Vec::with_capacity(entries.len());
        for generated in entries {
            let id = &generated.entry.id;
            let content =
                render_frontmatter(generated, "").map_err(|e| ProvenanceError::Serialize {
                    id: id.clone(),
                    message: e.to_string(),
                })?;
            let path = self.experience_dir.join(generated_file_name(id));
            fs::write(&path, content).map_err(|e| ProvenanceError::io("write", &path, e))?;
            written.push(path);
        }

        info!(count = written.len(), "Wrote generated experience files");
        Ok(written)
    }

    // ────────────────────────────────────────────────────────────────────────
    // Internals
    // ────────────────────────────────────────────────────────────────────────

    /// Classified files in the experience directory, sorted by name.
    fn scan(&self) -> Result<Vec<(PathBuf, FileVariant)>, ProvenanceError> {
        if !self.experience_dir.is_dir() {
            return Ok(Vec::new());
        }
        Ok(list_files(&self.experience_dir)?
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_string();
                Some((path, FileVariant::classify(&name)))
            })
            .collect())
    }

    fn remove_generated_files(&self) -> Result<(), ProvenanceError> {
        for (path, variant) in self.scan()? {
            if variant.is_generated() {
                fs::remove_file(&path).map_err(|e| ProvenanceError::io("remove", &path, e))?;
            }
        }
        Ok(())
    }

    fn fresh_backup_dir(&self, epoch: u64) -> Result<PathBuf, ProvenanceError> {
        fs::create_dir_all(&self.backup_root)
            .map_err(|e| ProvenanceError::io("create", &self.backup_root, e))?;

        let mut counter = 0u32;
        loop {
            let name = if counter == 0 {
                format!("{BACKUP_PREFIX}{epoch}")
            } else {
                format!("{BACKUP_PREFIX}{epoch}_{counter}")
            };
            let candidate = self.backup_root.join(name);
            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => counter += 1,
                Err(e) => return Err(ProvenanceError::io("create", &candidate, e)),
            }
        }
    }
}

/// Regular files directly under `dir`, sorted.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>, ProvenanceError> {
    let entries = fs::read_dir(dir).map_err(|e| ProvenanceError::io("read", dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ProvenanceError::io("read", dir, e))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Rename, falling back to copy-then-delete across filesystems.
///
/// The fallback is not atomic: a crash between copy and delete leaves the file in both places.
fn move_file(from: &Path, to: &Path) -> Result<(), ProvenanceError> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            fs::copy(from, to).map_err(|e| ProvenanceError::io("copy", from, e))?;
            fs::remove_file(from).map_err(|e| ProvenanceError::io("remove", from, e))
        }
        Err(e) => Err(ProvenanceError::io("move", from, e)),
    }
}
