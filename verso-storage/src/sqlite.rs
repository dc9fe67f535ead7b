use crate::store::newest_first;
use crate::{StorageError, StorageResult, VersionStore};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;
use verso_model::{ApprovalState, ContentItem, Lineage, NewVersion, Payload, Version, VersionKind};
use verso_types::{ContentId, HybridTimestamp, VersionId};

const VERSION_COLUMNS: &str = "version_id, content_id, lineage, payload, content_hash, author, \
     wall_time, logical, sequence, kind";

/// [`VersionStore`] backed by a SQLite file.
///
/// Blocking database calls run on the tokio blocking pool. The head
/// compare-and-set, including the editable-state check, is a single
/// conditional `UPDATE`, so it stays atomic even when several processes share
/// the file.
pub struct SqliteVersionStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteVersionStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StorageError::LockPoisoned)?;
            f(&mut guard)
        })
        .await?
    }
}

fn init_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS content_items (
            content_id TEXT PRIMARY KEY,
            content_type TEXT NOT NULL,
            head_version_id TEXT,
            approval_state TEXT NOT NULL,
            next_sequence INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS versions (
            version_id TEXT PRIMARY KEY,
            content_id TEXT NOT NULL REFERENCES content_items(content_id),
            lineage TEXT NOT NULL,
            payload TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            author TEXT NOT NULL,
            wall_time INTEGER NOT NULL,
            logical INTEGER NOT NULL,
            sequence INTEGER NOT NULL,
            kind TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_versions_content
            ON versions(content_id, wall_time DESC, logical DESC, sequence DESC);
        ",
    )?;
    Ok(())
}

// ── Row mapping ──────────────────────────────────────────────────

struct ItemRow {
    content_id: String,
    content_type: String,
    head: Option<String>,
    state: String,
}

impl ItemRow {
    fn into_item(self) -> StorageResult<ContentItem> {
        Ok(ContentItem {
            content_id: ContentId::new(self.content_id),
            content_type: self.content_type,
            head_version_id: self.head.as_deref().map(parse_version_id).transpose()?,
            approval_state: self
                .state
                .parse::<ApprovalState>()
                .map_err(|e| StorageError::InvalidData(e.to_string()))?,
        })
    }
}

struct VersionRow {
    version_id: String,
    content_id: String,
    lineage: String,
    payload: String,
    content_hash: String,
    author: String,
    wall_time: i64,
    logical: i64,
    sequence: i64,
    kind: String,
}

impl VersionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            version_id: row.get(0)?,
            content_id: row.get(1)?,
            lineage: row.get(2)?,
            payload: row.get(3)?,
            content_hash: row.get(4)?,
            author: row.get(5)?,
            wall_time: row.get(6)?,
            logical: row.get(7)?,
            sequence: row.get(8)?,
            kind: row.get(9)?,
        })
    }

    fn into_version(self) -> StorageResult<Version> {
        let lineage: Lineage = serde_json::from_str(&self.lineage)?;
        let payload: Payload = serde_json::from_str(&self.payload)?;
        let kind: VersionKind = serde_json::from_str(&self.kind)?;
        Ok(Version {
            version_id: parse_version_id(&self.version_id)?,
            content_id: ContentId::new(self.content_id),
            lineage,
            payload,
            content_hash: self.content_hash,
            author: self.author,
            created_at: HybridTimestamp::new(self.wall_time as u64, self.logical as u32),
            sequence: self.sequence as u64,
            kind,
        })
    }
}

fn parse_version_id(s: &str) -> StorageResult<VersionId> {
    VersionId::parse(s).map_err(|e| StorageError::InvalidData(e.to_string()))
}

fn load_item(conn: &Connection, content_id: &ContentId) -> StorageResult<Option<ContentItem>> {
    conn.query_row(
        "SELECT content_id, content_type, head_version_id, approval_state
         FROM content_items WHERE content_id = ?1",
        params![content_id.as_str()],
        |row| {
            Ok(ItemRow {
                content_id: row.get(0)?,
                content_type: row.get(1)?,
                head: row.get(2)?,
                state: row.get(3)?,
            })
        },
    )
    .optional()?
    .map(ItemRow::into_item)
    .transpose()
}

/// SQL list of the approval states that accept a new head.
fn editable_states() -> String {
    ApprovalState::ALL
        .iter()
        .filter(|state| state.is_editable())
        .map(|state| format!("'{}'", state.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn require_item(conn: &Connection, content_id: &ContentId) -> StorageResult<ContentItem> {
    load_item(conn, content_id)?
        .ok_or_else(|| StorageError::NotFound(format!("content {content_id}")))
}

fn load_version(conn: &Connection, version_id: &VersionId) -> StorageResult<Option<Version>> {
    conn.query_row(
        &format!("SELECT {VERSION_COLUMNS} FROM versions WHERE version_id = ?1"),
        params![version_id.as_str()],
        VersionRow::from_row,
    )
    .optional()?
    .map(VersionRow::into_version)
    .transpose()
}

fn check_parents(tx: &Transaction<'_>, version: &NewVersion) -> StorageResult<()> {
    for parent in version.parents() {
        let owner: Option<String> = tx
            .query_row(
                "SELECT content_id FROM versions WHERE version_id = ?1",
                params![parent.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match owner {
            Some(owner) if owner == version.content_id.as_str() => {}
            Some(_) => {
                return Err(StorageError::InvalidData(format!(
                    "parent {parent} belongs to another content item"
                )));
            }
            None => return Err(StorageError::NotFound(format!("parent version {parent}"))),
        }
    }
    Ok(())
}

/// Stores `version` unless an identical id is already present.
fn insert_version(tx: &Transaction<'_>, version: NewVersion) -> StorageResult<Version> {
    if let Some(existing) = load_version(tx, &version.version_id)? {
        return Ok(existing);
    }
    let sequence: i64 = tx.query_row(
        "SELECT next_sequence FROM content_items WHERE content_id = ?1",
        params![version.content_id.as_str()],
        |row| row.get(0),
    )?;
    let stored = version.into_version(sequence as u64);
    tx.execute(
        &format!("INSERT INTO versions ({VERSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"),
        params![
            stored.version_id.as_str(),
            stored.content_id.as_str(),
            serde_json::to_string(&stored.lineage)?,
            serde_json::to_string(&stored.payload)?,
            stored.content_hash,
            stored.author,
            stored.created_at.wall_time() as i64,
            i64::from(stored.created_at.logical()),
            sequence,
            serde_json::to_string(&stored.kind)?,
        ],
    )?;
    tx.execute(
        "UPDATE content_items SET next_sequence = next_sequence + 1 WHERE content_id = ?1",
        params![stored.content_id.as_str()],
    )?;
    Ok(stored)
}

#[async_trait]
impl VersionStore for SqliteVersionStore {
    async fn create_item(
        &self,
        content_id: &ContentId,
        content_type: &str,
    ) -> StorageResult<ContentItem> {
        let item = ContentItem::new(content_id.clone(), content_type);
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO content_items (content_id, content_type, approval_state)
                 VALUES (?1, ?2, ?3)",
                params![
                    item.content_id.as_str(),
                    item.content_type,
                    item.approval_state.as_str()
                ],
            )?;
            if inserted == 0 {
                return Err(StorageError::AlreadyExists(format!(
                    "content {}",
                    item.content_id
                )));
            }
            Ok(item)
        })
        .await
    }

    async fn item(&self, content_id: &ContentId) -> StorageResult<Option<ContentItem>> {
        let content_id = content_id.clone();
        self.with_conn(move |conn| load_item(conn, &content_id)).await
    }

    async fn set_approval_state(
        &self,
        content_id: &ContentId,
        expected: ApprovalState,
        next: ApprovalState,
    ) -> StorageResult<ContentItem> {
        let content_id = content_id.clone();
        self.with_conn(move |conn| {
            let updated = conn.execute(
                "UPDATE content_items SET approval_state = ?1
                 WHERE content_id = ?2 AND approval_state = ?3",
                params![next.as_str(), content_id.as_str(), expected.as_str()],
            )?;
            let item = require_item(conn, &content_id)?;
            if updated == 0 {
                return Err(StorageError::StateConflict {
                    content_id,
                    expected,
                    actual: item.approval_state,
                });
            }
            Ok(item)
        })
        .await
    }

    async fn put(
        &self,
        version: NewVersion,
        expected_parent: Option<&VersionId>,
    ) -> StorageResult<Version> {
        let expected = expected_parent.cloned();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let moved = tx.execute(
                &format!(
                    "UPDATE content_items SET head_version_id = ?1
                     WHERE content_id = ?2 AND head_version_id IS ?3
                       AND approval_state IN ({})",
                    editable_states()
                ),
                params![
                    version.version_id.as_str(),
                    version.content_id.as_str(),
                    expected.as_ref().map(VersionId::as_str)
                ],
            )?;
            if moved == 0 {
                // Dropping the transaction rolls it back.
                let item = require_item(&tx, &version.content_id)?;
                if !item.approval_state.is_editable() {
                    return Err(StorageError::Locked {
                        content_id: version.content_id.clone(),
                        state: item.approval_state,
                    });
                }
                return Err(StorageError::Conflict {
                    content_id: version.content_id.clone(),
                    expected,
                    actual: item.head_version_id,
                });
            }

            check_parents(&tx, &version)?;
            let stored = insert_version(&tx, version)?;
            tx.commit()?;
            debug!(
                "Moved head of {} to {} (#{})",
                stored.content_id,
                stored.version_id.short(),
                stored.sequence
            );
            Ok(stored)
        })
        .await
    }

    async fn insert_branch(&self, version: NewVersion) -> StorageResult<Version> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            require_item(&tx, &version.content_id)?;
            check_parents(&tx, &version)?;
            let stored = insert_version(&tx, version)?;
            tx.commit()?;
            debug!(
                "Stored branch version {} of {}",
                stored.version_id.short(),
                stored.content_id
            );
            Ok(stored)
        })
        .await
    }

    async fn get(&self, version_id: &VersionId) -> StorageResult<Version> {
        let version_id = version_id.clone();
        self.with_conn(move |conn| {
            load_version(conn, &version_id)?
                .ok_or_else(|| StorageError::NotFound(format!("version {version_id}")))
        })
        .await
    }

    async fn head(&self, content_id: &ContentId) -> StorageResult<Option<Version>> {
        let content_id = content_id.clone();
        self.with_conn(move |conn| {
            let item = require_item(conn, &content_id)?;
            match item.head_version_id {
                Some(id) => load_version(conn, &id),
                None => Ok(None),
            }
        })
        .await
    }

    async fn history(&self, content_id: &ContentId, limit: usize) -> StorageResult<Vec<Version>> {
        let content_id = content_id.clone();
        self.with_conn(move |conn| {
            require_item(conn, &content_id)?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {VERSION_COLUMNS} FROM versions WHERE content_id = ?1
                 ORDER BY wall_time DESC, logical DESC, sequence DESC LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(
                    params![content_id.as_str(), i64::try_from(limit).unwrap_or(i64::MAX)],
                    VersionRow::from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            let mut versions = rows
                .into_iter()
                .map(VersionRow::into_version)
                .collect::<StorageResult<Vec<_>>>()?;
            versions.sort_by(newest_first);
            Ok(versions)
        })
        .await
    }

    async fn delete(&self, version_id: &VersionId) -> StorageResult<()> {
        let version_id = version_id.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let version = load_version(&tx, &version_id)?
                .ok_or_else(|| StorageError::NotFound(format!("version {version_id}")))?;
            let item = require_item(&tx, &version.content_id)?;
            if item.head_version_id.as_ref() == Some(&version_id) {
                return Err(StorageError::HeadProtected(version_id));
            }
            tx.execute(
                "DELETE FROM versions WHERE version_id = ?1",
                params![version_id.as_str()],
            )?;
            tx.commit()?;
            debug!(
                "Deleted version {} of {}",
                version_id.short(),
                version.content_id
            );
            Ok(())
        })
        .await
    }
}
