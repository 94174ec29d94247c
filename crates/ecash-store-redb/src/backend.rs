//! Redb Backend

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use ecash_store::backend::{PersistenceBackend, UpdateFn};
use redb::{Database, ReadableTable, TableDefinition};
use tracing::instrument;

use crate::error::Error;

const CONFIG_TABLE: TableDefinition<&str, &str> = TableDefinition::new("config");
// <Key, JSON document>
const STORE_TABLE: TableDefinition<&str, &str> = TableDefinition::new("wallet_store");

const DATABASE_VERSION: u32 = 1;

/// Redb persistence backend
///
/// Writers are serialised by redb and the database file is locked by the
/// process that opened it, so [`PersistenceBackend::read_modify_write`] runs
/// as a single write transaction.
#[derive(Debug, Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
}

impl RedbBackend {
    /// Create new [`RedbBackend`]
    pub fn new(path: &Path) -> Result<Self, Error> {
        // Check if parent directory exists before attempting to create database
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Parent directory does not exist: {parent:?}"),
                )));
            }
        }

        let db = Database::create(path)?;

        let db_version: Option<String> = {
            // Check database version
            let read_txn = db.begin_read()?;

            match read_txn.open_table(CONFIG_TABLE) {
                Ok(table) => {
                    let version = table.get("db_version")?.map(|v| v.value().to_string());
                    version
                }
                Err(_) => None,
            }
        };

        match db_version {
            Some(db_version) => {
                let current_file_version = u32::from_str(&db_version)?;
                tracing::info!("Current file version {}", current_file_version);

                if current_file_version != DATABASE_VERSION {
                    tracing::warn!(
                        "Database is at version {} expected {}",
                        current_file_version,
                        DATABASE_VERSION
                    );
                    return Err(Error::UnknownDatabaseVersion);
                }
            }
            None => {
                let write_txn = db.begin_write()?;
                {
                    let mut table = write_txn.open_table(CONFIG_TABLE)?;
                    // Open all tables to init a new db
                    let _ = write_txn.open_table(STORE_TABLE)?;
                    table.insert("db_version", DATABASE_VERSION.to_string().as_str())?;
                }

                write_txn.commit()?;
            }
        }

        Ok(Self { db: Arc::new(db) })
    }
}

impl PersistenceBackend for RedbBackend {
    #[instrument(skip(self))]
    fn read(&self, key: &str) -> Result<Option<String>, ecash_store::Error> {
        let read_txn = self.db.begin_read().map_err(Error::from)?;
        let table = read_txn.open_table(STORE_TABLE).map_err(Error::from)?;

        let value = table
            .get(key)
            .map_err(Error::from)?
            .map(|v| v.value().to_string());

        Ok(value)
    }

    #[instrument(skip(self, value))]
    fn write(&self, key: &str, value: &str) -> Result<(), ecash_store::Error> {
        let write_txn = self.db.begin_write().map_err(Error::from)?;
        {
            let mut table = write_txn.open_table(STORE_TABLE).map_err(Error::from)?;
            table.insert(key, value).map_err(Error::from)?;
        }
        write_txn.commit().map_err(Error::from)?;

        Ok(())
    }

    #[instrument(skip(self))]
    fn remove(&self, key: &str) -> Result<(), ecash_store::Error> {
        let write_txn = self.db.begin_write().map_err(Error::from)?;
        {
            let mut table = write_txn.open_table(STORE_TABLE).map_err(Error::from)?;
            table.remove(key).map_err(Error::from)?;
        }
        write_txn.commit().map_err(Error::from)?;

        Ok(())
    }

    #[instrument(skip(self, update))]
    fn read_modify_write(
        &self,
        key: &str,
        update: &mut UpdateFn<'_>,
    ) -> Result<(), ecash_store::Error> {
        let write_txn = self.db.begin_write().map_err(Error::from)?;

        let current = {
            let table = write_txn.open_table(STORE_TABLE).map_err(Error::from)?;
            let value = table
                .get(key)
                .map_err(Error::from)?
                .map(|v| v.value().to_string());
            value
        };

        match update(current) {
            Ok(Some(new_value)) => {
                {
                    let mut table = write_txn.open_table(STORE_TABLE).map_err(Error::from)?;
                    table.insert(key, new_value.as_str()).map_err(Error::from)?;
                }
                write_txn.commit().map_err(Error::from)?;
            }
            Ok(None) => {
                write_txn.abort().map_err(Error::from)?;
            }
            Err(err) => {
                write_txn.abort().map_err(Error::from)?;
                return Err(err);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use ecash_store::backend_test;
    use ecash_store::{Amount, Proof, WalletStore};
    use tempfile::TempDir;

    use super::*;

    /// [`RedbBackend`] whose database file is removed with the backend
    #[derive(Debug)]
    struct TempRedbBackend {
        backend: RedbBackend,
        dir: TempDir,
    }

    impl PersistenceBackend for TempRedbBackend {
        fn read(&self, key: &str) -> Result<Option<String>, ecash_store::Error> {
            self.backend.read(key)
        }

        fn write(&self, key: &str, value: &str) -> Result<(), ecash_store::Error> {
            self.backend.write(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), ecash_store::Error> {
            self.backend.remove(key)
        }

        fn read_modify_write(
            &self,
            key: &str,
            update: &mut UpdateFn<'_>,
        ) -> Result<(), ecash_store::Error> {
            self.backend.read_modify_write(key, update)
        }
    }

    fn provide_backend(test_id: String) -> TempRedbBackend {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(format!("ecash-store-test-{}.redb", test_id));

        TempRedbBackend {
            backend: RedbBackend::new(&path).expect("database"),
            dir,
        }
    }

    backend_test!(provide_backend);

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.redb");

        {
            let wallet = WalletStore::new(RedbBackend::new(&path).unwrap());
            wallet
                .receive(vec![Proof::new(Amount::from(32), "009a1f293253e41e", "a", "02ab")])
                .unwrap();
            assert_eq!(wallet.counters.allocate("009a1f293253e41e", 3).unwrap(), 0..3);
        }

        let wallet = WalletStore::new(RedbBackend::new(&path).unwrap());
        assert_eq!(wallet.balance(), Amount::from(32));
        assert_eq!(wallet.counters.allocate("009a1f293253e41e", 1).unwrap(), 3..4);
    }

    #[test]
    fn test_provided_backend_cleans_up() {
        let backend = provide_backend("cleanup".to_string());
        let dir = backend.dir.path().to_path_buf();
        backend.write("seed", "00").unwrap();
        assert!(dir.exists());

        drop(backend);
        assert!(!dir.exists());
    }

    #[test]
    fn test_missing_parent_directory() {
        let path = PathBuf::from("/nonexistent-ecash-store-dir/wallet.redb");
        assert!(matches!(RedbBackend::new(&path), Err(Error::Io(_))));
    }

    #[test]
    fn test_unknown_database_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.redb");

        {
            let db = Database::create(&path).unwrap();
            let write_txn = db.begin_write().unwrap();
            {
                let mut table = write_txn.open_table(CONFIG_TABLE).unwrap();
                table.insert("db_version", "7").unwrap();
            }
            write_txn.commit().unwrap();
        }

        assert!(matches!(
            RedbBackend::new(&path),
            Err(Error::UnknownDatabaseVersion)
        ));
    }
}
