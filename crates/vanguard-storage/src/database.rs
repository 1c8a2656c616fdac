//! RocksDB database implementation.

use crate::{Storage, StorageError, StorageResult};
use parking_lot::RwLock;
use rocksdb::{ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Column families for organizing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnFamily {
    /// Serialized view-change blocks indexed by hex block hash.
    VcBlocks,
    /// Block-link entries indexed by big-endian u64 position.
    BlockLinks,
    /// Node metadata.
    Metadata,
    /// Default column family (required by RocksDB).
    Default,
}

impl ColumnFamily {
    /// Get the string name of the column family.
    pub fn name(&self) -> &'static str {
        match self {
            ColumnFamily::VcBlocks => "vcblock",
            ColumnFamily::BlockLinks => "blocklink",
            ColumnFamily::Metadata => "metadata",
            ColumnFamily::Default => "default",
        }
    }

    /// Get all column families.
    pub fn all() -> &'static [ColumnFamily] {
        &[
            ColumnFamily::VcBlocks,
            ColumnFamily::BlockLinks,
            ColumnFamily::Metadata,
            ColumnFamily::Default,
        ]
    }
}

/// RocksDB database wrapper.
pub struct Database {
    db: Arc<RwLock<DBWithThreadMode<MultiThreaded>>>,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref();
        info!("Opening database at {:?}", path);

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(256);
        opts.set_keep_log_file_num(1);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ColumnFamily::all()
            .iter()
            .map(|cf| {
                let mut cf_opts = Options::default();
                cf_opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
                ColumnFamilyDescriptor::new(cf.name(), cf_opts)
            })
            .collect();

        let db =
            DBWithThreadMode::<MultiThreaded>::open_cf_descriptors(&opts, path, cf_descriptors)?;

        debug!("Database opened successfully");

        Ok(Self {
            db: Arc::new(RwLock::new(db)),
        })
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> StorageResult<()> {
        let db = self.db.read();
        for cf in ColumnFamily::all() {
            if let Some(handle) = db.cf_handle(cf.name()) {
                db.flush_cf(&handle)?;
            }
        }
        Ok(())
    }
}

impl Storage for Database {
    fn get(&self, cf: ColumnFamily, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let db = self.db.read();
        let handle = db
            .cf_handle(cf.name())
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(cf.name().to_string()))?;

        Ok(db.get_cf(&handle, key)?)
    }

    fn put(&self, cf: ColumnFamily, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let db = self.db.read();
        let handle = db
            .cf_handle(cf.name())
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(cf.name().to_string()))?;

        db.put_cf(&handle, key, value)?;
        Ok(())
    }

    fn iter(
        &self,
        cf: ColumnFamily,
    ) -> StorageResult<Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + '_>> {
        let db = self.db.read();
        let handle = db
            .cf_handle(cf.name())
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(cf.name().to_string()))?;

        let iter = db.iterator_cf(&handle, rocksdb::IteratorMode::Start);
        let collected: Vec<_> = iter
            .filter_map(|r| r.ok())
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
            .collect();

        Ok(Box::new(collected.into_iter()))
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
        }
    }
}
