//! Durable cursor state, one record per bot identity.

use std::fs;
use std::path::PathBuf;

use tracing::warn;

use crate::domain::{BotIdentity, Cursor};
use crate::{errors::Error, Result};

/// Durable mapping from bot identity to "next update id to request".
pub trait CursorStore: Send + Sync {
    /// Load the persisted cursor. Fails softly: missing or unreadable state
    /// yields `Cursor(0)` and must never abort startup.
    fn load(&self, bot: &BotIdentity) -> Cursor;

    /// Persist the cursor. Callers log failures and keep the in-memory value
    /// authoritative; an un-persisted advance risks reprocessing after a
    /// crash, which is the accepted trade-off.
    fn save(&self, bot: &BotIdentity, cursor: Cursor) -> Result<()>;
}

/// File-backed store: one decimal value per bot, written via a temp file and
/// rename so a crash mid-write never corrupts the previously committed value.
pub struct FileCursorStore {
    dir: PathBuf,
}

impl FileCursorStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, bot: &BotIdentity) -> PathBuf {
        self.dir.join(format!("bot_offset_{}.txt", bot.as_str()))
    }
}

impl CursorStore for FileCursorStore {
    fn load(&self, bot: &BotIdentity) -> Cursor {
        let path = self.path_for(bot);
        let contents = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Cursor(0),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cursor state unreadable, starting from 0");
                return Cursor(0);
            }
        };

        match contents.trim().parse::<i64>() {
            Ok(v) if v >= 0 => Cursor(v),
            _ => {
                warn!(path = %path.display(), "cursor state corrupt, starting from 0");
                Cursor(0)
            }
        }
    }

    fn save(&self, bot: &BotIdentity, cursor: Cursor) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::Persistence(format!("create {}: {e}", self.dir.display())))?;

        let path = self.path_for(bot);
        let tmp = path.with_extension("txt.tmp");
        fs::write(&tmp, cursor.0.to_string())
            .map_err(|e| Error::Persistence(format!("write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .map_err(|e| Error::Persistence(format!("rename {}: {e}", path.display())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot(id: &str) -> BotIdentity {
        BotIdentity::from_token(&format!("{id}:secret")).unwrap()
    }

    #[test]
    fn missing_state_loads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCursorStore::new(dir.path().to_path_buf());
        assert_eq!(store.load(&bot("111")), Cursor(0));
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCursorStore::new(dir.path().to_path_buf());
        store.save(&bot("111"), Cursor(42)).unwrap();
        assert_eq!(store.load(&bot("111")), Cursor(42));
    }

    #[test]
    fn corrupt_state_loads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCursorStore::new(dir.path().to_path_buf());
        fs::write(dir.path().join("bot_offset_111.txt"), "not a number").unwrap();
        assert_eq!(store.load(&bot("111")), Cursor(0));
    }

    #[test]
    fn negative_state_loads_as_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCursorStore::new(dir.path().to_path_buf());
        fs::write(dir.path().join("bot_offset_111.txt"), "-5").unwrap();
        assert_eq!(store.load(&bot("111")), Cursor(0));
    }

    #[test]
    fn distinct_bots_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCursorStore::new(dir.path().to_path_buf());
        store.save(&bot("111"), Cursor(10)).unwrap();
        store.save(&bot("222"), Cursor(20)).unwrap();
        assert_eq!(store.load(&bot("111")), Cursor(10));
        assert_eq!(store.load(&bot("222")), Cursor(20));
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCursorStore::new(dir.path().to_path_buf());
        store.save(&bot("111"), Cursor(7)).unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
