use crate::storage::{Result, Storage, StorageEntry};
use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};

/// Hint for how many keys each SCAN round trip inspects.
const SCAN_BATCH: usize = 500;

/// A Redis storage backend.
///
/// Every key is stored under a fixed prefix so that the PKI mount does not
/// collide with other data living in the same database.
#[derive(Clone)]
pub struct RedisStorage {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStorage {
    /// Creates a new Redis storage from a connection manager.
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
        }
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

#[async_trait]
impl Storage for RedisStorage {
    async fn get(&self, key: &str) -> Result<Option<StorageEntry>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(self.full_key(key)).await?;
        Ok(value.map(|v| StorageEntry::new(key, v)))
    }

    async fn put(&self, entry: &StorageEntry) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set(self.full_key(&entry.key), entry.value.as_slice())
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(self.full_key(key)).await?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let full_prefix = self.full_key(prefix);
        let pattern = match_pattern(&full_prefix);

        // Cursor based SCAN so the server never walks the keyspace in one call
        let mut keys = Vec::new();
        let mut cursor = 0u64;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(relative_keys(&full_prefix, keys))
    }
}

/// Escapes glob metacharacters so `prefix` only matches itself in `MATCH`.
fn match_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

/// Strips `prefix` from the scanned keys, sorted and without the duplicates
/// SCAN may return while the keyspace is rehashed.
fn relative_keys(prefix: &str, keys: Vec<String>) -> Vec<String> {
    let mut keys: Vec<String> = keys
        .into_iter()
        .filter_map(|k| k.strip_prefix(prefix).map(str::to_string))
        .collect();
    keys.sort();
    keys.dedup();
    keys
}
