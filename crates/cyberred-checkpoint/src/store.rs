//! Atomic, signed SQLite checkpoints with scope-change detection.
//!
//! `save` writes to a `.tmp` file, finalizes the schema, zeroes the
//! `metadata.signature` column, hashes the finished file, writes the real
//! signature back into that same zero-length slot, and atomically renames
//! the file into place; any error along the way removes the `.tmp` file.
//! All SQLite I/O runs through `spawn_blocking` — `rusqlite` is
//! synchronous, matching spec.md §5's explicit `run_in_executor` language.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::CheckpointError;
use crate::model::{agent_from_row, finding_from_row, AgentSnapshot, AuditEntry, CheckpointSnapshot};
use crate::schema::{zeroed_signature, CREATE_SCHEMA};

pub struct CheckpointStore {
    base_path: PathBuf,
}

impl CheckpointStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn engagement_dir(&self, engagement_id: &str) -> PathBuf {
        self.base_path.join("engagements").join(engagement_id)
    }

    pub fn checkpoint_path(&self, engagement_id: &str) -> PathBuf {
        self.engagement_dir(engagement_id).join("checkpoint.sqlite")
    }

    fn tmp_path(&self, engagement_id: &str) -> PathBuf {
        self.engagement_dir(engagement_id).join("checkpoint.sqlite.tmp")
    }

    /// Write a full checkpoint for `snapshot.engagement.id`, returning the
    /// finalized path. On any error the `.tmp` file is removed.
    pub async fn save(&self, snapshot: CheckpointSnapshot, now: String) -> Result<PathBuf, CheckpointError> {
        let engagement_id = snapshot.engagement.id.clone();
        let dir = self.engagement_dir(&engagement_id);
        let tmp = self.tmp_path(&engagement_id);
        let finalp = self.checkpoint_path(&engagement_id);

        let result = tokio::task::spawn_blocking({
            let tmp = tmp.clone();
            let finalp = finalp.clone();
            move || write_checkpoint_blocking(&dir, &tmp, &finalp, &snapshot, &now)
        })
        .await
        .map_err(|e| CheckpointError::TaskJoin(e.to_string()))?;

        match result {
            Ok(()) => {
                info!(engagement_id, path = %finalp.display(), "checkpoint saved");
                Ok(finalp)
            }
            Err(err) => {
                let _ = std::fs::remove_file(&tmp);
                Err(err)
            }
        }
    }

    /// Recompute the signature over `path` with `metadata.signature`
    /// zeroed and compare against the stored value.
    pub async fn verify(&self, path: PathBuf) -> Result<bool, CheckpointError> {
        let (stored, computed) = tokio::task::spawn_blocking(move || verify_blocking(&path))
            .await
            .map_err(|e| CheckpointError::TaskJoin(e.to_string()))??;
        Ok(stored == computed)
    }

    /// Load and integrity-check a checkpoint, optionally also verifying
    /// the engagement's scope file still hashes to the stored
    /// `scope_hash` (refuses to load on mismatch unless the caller opts
    /// out via `verify_scope = false`).
    pub async fn load(
        &self,
        path: PathBuf,
        scope_path: Option<PathBuf>,
        verify_scope: bool,
    ) -> Result<CheckpointSnapshot, CheckpointError> {
        let (stored, computed) = tokio::task::spawn_blocking({
            let path = path.clone();
            move || verify_blocking(&path)
        })
        .await
        .map_err(|e| CheckpointError::TaskJoin(e.to_string()))??;
        if stored != computed {
            return Err(CheckpointError::Integrity {
                path: path.display().to_string(),
                expected: stored,
                actual: computed,
            });
        }

        let snapshot = tokio::task::spawn_blocking({
            let path = path.clone();
            move || read_snapshot_blocking(&path)
        })
        .await
        .map_err(|e| CheckpointError::TaskJoin(e.to_string()))??;

        if verify_scope {
            if let Some(scope_path) = scope_path {
                let current = hash_file(&scope_path)?;
                if current != snapshot.engagement.scope_hash {
                    return Err(CheckpointError::ScopeChanged {
                        path: path.display().to_string(),
                        stored: snapshot.engagement.scope_hash.clone(),
                        current,
                    });
                }
            }
        }

        Ok(snapshot)
    }

    /// Idempotent: removing an already-absent checkpoint is not an error.
    pub async fn delete(&self, path: PathBuf) -> Result<(), CheckpointError> {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// List every `checkpoint.sqlite` under `<base>/engagements/*`,
    /// ignoring non-directory entries.
    pub async fn list_checkpoints(&self) -> Result<Vec<PathBuf>, CheckpointError> {
        let root = self.base_path.join("engagements");
        let mut out = Vec::new();
        let mut entries = match tokio::fs::read_dir(&root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if !file_type.is_dir() {
                continue;
            }
            let candidate = entry.path().join("checkpoint.sqlite");
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                out.push(candidate);
            }
        }
        Ok(out)
    }
}

fn write_checkpoint_blocking(
    dir: &Path,
    tmp: &Path,
    finalp: &Path,
    snapshot: &CheckpointSnapshot,
    now: &str,
) -> Result<(), CheckpointError> {
    std::fs::create_dir_all(dir)?;
    let _ = std::fs::remove_file(tmp);

    {
        let conn = Connection::open(tmp)?;
        conn.pragma_update(None, "journal_mode", "DELETE")?;
        conn.execute_batch(CREATE_SCHEMA)?;

        let e = &snapshot.engagement;
        conn.execute(
            "INSERT INTO engagements (id, name, scope_hash, state, created_at, updated_at, config_path, scope_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![e.id, e.name, e.scope_hash, e.state, e.created_at, e.updated_at, e.config_path, e.scope_path],
        )?;

        for agent in &snapshot.agents {
            conn.execute(
                "INSERT INTO agents (id, engagement_id, data) VALUES (?1, ?2, ?3)",
                params![agent.id, agent.engagement_id, serde_json::to_string(agent)?],
            )?;
        }

        for finding in &snapshot.findings {
            conn.execute(
                "INSERT INTO findings (id, engagement_id, data) VALUES (?1, ?2, ?3)",
                params![finding.id, e.id, finding.to_json()?],
            )?;
        }

        for entry in &snapshot.audit {
            let evidence_hex: String = entry.evidence.iter().map(|b| format!("{b:02x}")).collect();
            conn.execute(
                "INSERT INTO audit (id, engagement_id, timestamp, action, triggered_by, details, evidence, signature)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    entry.id,
                    entry.engagement_id,
                    entry.timestamp,
                    entry.action,
                    entry.triggered_by,
                    serde_json::to_string(&entry.details)?,
                    evidence_hex,
                    entry.signature,
                ],
            )?;
        }

        conn.execute(
            "INSERT INTO checkpoints (id, engagement_id, path, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![uuid_v4(), e.id, finalp.display().to_string(), now],
        )?;

        conn.execute(
            "INSERT INTO metadata (id, engagement_id, scope_hash, created_at, format_version, signature)
             VALUES (0, ?1, ?2, ?3, 1, ?4)",
            params![e.id, e.scope_hash, now, zeroed_signature()],
        )?;
    }

    let bytes = std::fs::read(tmp)?;
    let signature = hex_sha256(&bytes);

    {
        let conn = Connection::open(tmp)?;
        conn.execute(
            "UPDATE metadata SET signature = ?1 WHERE id = 0",
            params![signature],
        )?;
    }

    std::fs::rename(tmp, finalp)?;
    Ok(())
}

/// Returns `(stored_signature, recomputed_signature)`; the caller decides
/// whether to treat a mismatch as an error (`load`) or a bool (`verify`).
fn verify_blocking(path: &Path) -> Result<(String, String), CheckpointError> {
    let stored = read_signature_blocking(path)?;
    let tmp = path.with_extension("sqlite.verify.tmp");
    std::fs::copy(path, &tmp)?;
    {
        let conn = Connection::open(&tmp)?;
        conn.execute(
            "UPDATE metadata SET signature = ?1 WHERE id = 0",
            params![zeroed_signature()],
        )?;
    }
    let bytes = std::fs::read(&tmp)?;
    let _ = std::fs::remove_file(&tmp);
    let computed = hex_sha256(&bytes);
    Ok((stored, computed))
}

fn read_signature_blocking(path: &Path) -> Result<String, CheckpointError> {
    let conn = Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    let signature: String = conn.query_row("SELECT signature FROM metadata WHERE id = 0", [], |row| row.get(0))?;
    Ok(signature)
}

fn read_snapshot_blocking(path: &Path) -> Result<CheckpointSnapshot, CheckpointError> {
    let conn = Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let engagement = conn.query_row(
        "SELECT id, name, scope_hash, state, created_at, updated_at, config_path, scope_path FROM engagements LIMIT 1",
        [],
        |row| {
            cyberred_core::Engagement::new(
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
            )
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        },
    )?;

    let mut agents = Vec::new();
    {
        let mut stmt = conn.prepare("SELECT data FROM agents")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let data: String = row.get(0)?;
            agents.push(agent_from_row(&data)?);
        }
    }

    let mut findings = Vec::new();
    {
        let mut stmt = conn.prepare("SELECT data FROM findings")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let data: String = row.get(0)?;
            findings.push(finding_from_row(&data)?);
        }
    }

    let mut audit = Vec::new();
    {
        let mut stmt = conn.prepare(
            "SELECT id, engagement_id, timestamp, action, triggered_by, details, evidence, signature FROM audit",
        )?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let details_raw: String = row.get(5)?;
            let evidence_hex: String = row.get(6)?;
            let evidence = (0..evidence_hex.len())
                .step_by(2)
                .filter_map(|i| u8::from_str_radix(&evidence_hex[i..i + 2], 16).ok())
                .collect();
            audit.push(AuditEntry {
                id: row.get(0)?,
                engagement_id: row.get(1)?,
                timestamp: row.get(2)?,
                action: row.get(3)?,
                triggered_by: row.get(4)?,
                details: serde_json::from_str(&details_raw)?,
                evidence,
                signature: row.get(7)?,
            });
        }
    }

    Ok(CheckpointSnapshot {
        engagement,
        agents,
        findings,
        audit,
    })
}

fn hash_file(path: &Path) -> Result<String, CheckpointError> {
    let bytes = std::fs::read(path)?;
    Ok(hex_sha256(&bytes))
}

fn hex_sha256(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn uuid_v4() -> String {
    uuid::Uuid::new_v4().to_string()
}
