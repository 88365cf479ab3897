// ============================
// crates/backend-lib/src/storage.rs
// ============================
//! Persistence boundary for user records, with flat-file and in-memory
//! implementations.
use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::debug;
use userauth_common::User;

use crate::error::StoreError;

/// Trait for storage backends.
/// The store hands over the complete record set on every write.
pub trait Persistence {
    /// Read every stored record
    fn load(&self) -> Result<Vec<User>, StoreError>;

    /// Replace the stored records with `users`
    fn store(&mut self, users: &[User]) -> Result<(), StoreError>;
}

/// One JSON object per line, rewritten in full on every store
#[derive(Debug, Clone)]
pub struct FlatFilePersistence {
    path: PathBuf,
}

impl FlatFilePersistence {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for FlatFilePersistence {
    fn load(&self) -> Result<Vec<User>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)?;
        let mut users = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let user = serde_json::from_str(line).map_err(|source| StoreError::Json {
                line: idx + 1,
                source,
            })?;
            users.push(user);
        }

        debug!(path = %self.path.display(), count = users.len(), "loaded user records");
        Ok(users)
    }

    fn store(&mut self, users: &[User]) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        // write next to the target so the final rename stays on one filesystem
        let tmp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            for user in users {
                serde_json::to_writer(&mut writer, user)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        tmp.persist(&self.path)?;

        debug!(path = %self.path.display(), count = users.len(), "rewrote user records");
        Ok(())
    }
}

/// Keeps the last stored snapshot in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    users: Vec<User>,
    writes: usize,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of full rewrites performed so far
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn snapshot(&self) -> &[User] {
        &self.users
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.clone())
    }

    fn store(&mut self, users: &[User]) -> Result<(), StoreError> {
        self.users = users.to_vec();
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let backend = FlatFilePersistence::new(dir.path().join("users.jsonl"));
        assert!(backend.load().unwrap().is_empty());
    }

    #[test]
    fn test_store_rewrites_whole_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("users.jsonl");
        let mut backend = FlatFilePersistence::new(&path);

        let alice = User::new("alice@example.com", "h1");
        let bob = User::new("bob@example.com", "h2");
        backend.store(&[alice.clone(), bob.clone()]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);

        backend.store(&[bob.clone()]).unwrap();
        let loaded = backend.load().unwrap();
        assert_eq!(loaded, vec![bob]);
    }

    #[test]
    fn test_blank_lines_skipped_and_corruption_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.jsonl");
        let user = User::new("carol@example.com", "h");
        let line = serde_json::to_string(&user).unwrap();

        fs::write(&path, format!("\n{line}\n\n")).unwrap();
        let backend = FlatFilePersistence::new(&path);
        assert_eq!(backend.load().unwrap(), vec![user]);

        fs::write(&path, format!("{line}\nnot json\n")).unwrap();
        match backend.load() {
            Err(StoreError::Json { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected corrupt record error, got {other:?}"),
        }
    }

    #[test]
    fn test_memory_backend_counts_writes() {
        let mut backend = MemoryPersistence::new();
        backend.store(&[User::new("d@example.com", "h")]).unwrap();
        backend.store(&[]).unwrap();
        assert_eq!(backend.writes(), 2);
        assert!(backend.load().unwrap().is_empty());
    }
}
