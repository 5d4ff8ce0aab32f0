use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

const KEY_FILTER_ENABLED: &str = "filter_enabled";
const KEY_VOLUME: &str = "volume";

pub const MAX_VOLUME: u8 = 100;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("volume must be between 0 and {MAX_VOLUME}, got {0}")]
    VolumeOutOfRange(u32),
    #[error("stored value for {key} is not valid: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// What the user picked in the settings surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub filter_enabled: bool,
    /// Percent, 0-100.
    pub volume: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            filter_enabled: true,
            volume: 10,
        }
    }
}

/// Durable key/value settings backed by SQLite.
#[derive(Debug, Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Default, Clone)]
pub struct Options {
    pub path: Option<PathBuf>,
    pub defaults: Settings,
}

impl Store {
    pub fn open(opts: Options) -> Result<(Self, Settings)> {
        let path = if let Some(path) = opts.path {
            path
        } else {
            default_path().context("storage: resolve default path")?
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("storage: create directory {}", parent.display()))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("storage: open database at {}", path.display()))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .context("storage: set busy timeout")?;
        migrate(&conn)?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        let settings = store.load(opts.defaults)?;
        Ok((store, settings))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("storage: open in-memory database")?;
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn close(self) -> Result<()> {
        let conn = Arc::try_unwrap(self.conn)
            .map_err(|_| anyhow!("storage: connection still in use"))?
            .into_inner();
        conn.close()
            .map_err(|(_, err)| err)
            .context("storage: close connection")
    }

    /// Keys that were never written keep their default.
    pub fn load(&self, defaults: Settings) -> Result<Settings> {
        let mut settings = defaults;
        if let Some(value) = self.get(KEY_FILTER_ENABLED)? {
            settings.filter_enabled = match value.as_str() {
                "true" => true,
                "false" => false,
                _ => return Err(invalid(KEY_FILTER_ENABLED, value.clone())),
            };
        }
        if let Some(value) = self.get(KEY_VOLUME)? {
            settings.volume = value
                .parse::<u8>()
                .ok()
                .filter(|volume| *volume <= MAX_VOLUME)
                .ok_or_else(|| invalid(KEY_VOLUME, value.clone()))?;
        }
        Ok(settings)
    }

    pub fn set_filter_enabled(&self, enabled: bool) -> Result<()> {
        self.put(KEY_FILTER_ENABLED, &enabled.to_string())
    }

    pub fn set_volume(&self, volume: u32) -> Result<()> {
        if volume > u32::from(MAX_VOLUME) {
            return Err(SettingsError::VolumeOutOfRange(volume).into());
        }
        self.put(KEY_VOLUME, &volume.to_string())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .with_context(|| format!("storage: query setting {key}"))
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
INSERT INTO settings (key, value, updated_at)
VALUES (?1, ?2, ?3)
ON CONFLICT(key) DO UPDATE SET
  value = excluded.value,
  updated_at = excluded.updated_at
"#,
            params![key, value, Utc::now().timestamp()],
        )
        .with_context(|| format!("storage: write setting {key}"))?;
        Ok(())
    }
}

fn invalid(key: &str, value: String) -> anyhow::Error {
    SettingsError::InvalidValue {
        key: key.to_string(),
        value,
    }
    .into()
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
  version INTEGER PRIMARY KEY,
  applied_at INTEGER NOT NULL
)
"#,
        [],
    )?;

    let current: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    for (idx, sql) in migrations().iter().enumerate() {
        let version = (idx + 1) as i64;
        if version <= current {
            continue;
        }
        conn.execute_batch(sql)
            .with_context(|| format!("storage: apply migration {version}"))?;
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            params![version, Utc::now().timestamp()],
        )?;
    }
    Ok(())
}

fn migrations() -> Vec<&'static str> {
    vec![
        r#"
CREATE TABLE IF NOT EXISTS settings (
  key TEXT PRIMARY KEY,
  value TEXT NOT NULL,
  updated_at INTEGER NOT NULL
);
"#,
    ]
}

fn default_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("betterdc").join("settings.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn fresh_store_returns_defaults() {
        let store = Store::open_in_memory().unwrap();
        let settings = store.load(Settings::default()).unwrap();
        assert!(settings.filter_enabled);
        assert_eq!(settings.volume, 10);
    }

    #[test]
    fn writes_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.db");
        let (store, _) = Store::open(Options {
            path: Some(path.clone()),
            ..Options::default()
        })
        .unwrap();
        store.set_filter_enabled(false).unwrap();
        store.set_volume(35).unwrap();
        store.close().unwrap();

        let (_, settings) = Store::open(Options {
            path: Some(path),
            ..Options::default()
        })
        .unwrap();
        assert_eq!(
            settings,
            Settings {
                filter_enabled: false,
                volume: 35
            }
        );
    }

    #[test]
    fn rejects_volume_above_hundred() {
        let store = Store::open_in_memory().unwrap();
        let err = store.set_volume(101).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SettingsError>(),
            Some(SettingsError::VolumeOutOfRange(101))
        ));
        store.set_volume(100).unwrap();
        assert_eq!(store.load(Settings::default()).unwrap().volume, 100);
    }

    #[test]
    fn corrupt_value_is_reported() {
        let store = Store::open_in_memory().unwrap();
        store.put(KEY_FILTER_ENABLED, "maybe").unwrap();
        assert!(store.load(Settings::default()).is_err());
    }
}
