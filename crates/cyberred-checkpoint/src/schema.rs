//! Checkpoint SQLite schema — metadata/engagements/agents/findings/
//! checkpoints/audit tables with indexes, per spec.md §3/§4.I.

pub const CREATE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS metadata (
    id INTEGER PRIMARY KEY CHECK (id = 0),
    engagement_id TEXT NOT NULL,
    scope_hash TEXT NOT NULL,
    created_at TEXT NOT NULL,
    format_version INTEGER NOT NULL,
    signature TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS engagements (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    scope_hash TEXT NOT NULL,
    state TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    config_path TEXT NOT NULL,
    scope_path TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS agents (
    id TEXT PRIMARY KEY,
    engagement_id TEXT NOT NULL REFERENCES engagements(id) ON DELETE CASCADE,
    data TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_agents_engagement ON agents(engagement_id);

CREATE TABLE IF NOT EXISTS findings (
    id TEXT PRIMARY KEY,
    engagement_id TEXT NOT NULL REFERENCES engagements(id) ON DELETE CASCADE,
    data TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_findings_engagement ON findings(engagement_id);

CREATE TABLE IF NOT EXISTS checkpoints (
    id TEXT PRIMARY KEY,
    engagement_id TEXT NOT NULL REFERENCES engagements(id) ON DELETE CASCADE,
    path TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_checkpoints_engagement ON checkpoints(engagement_id);

CREATE TABLE IF NOT EXISTS audit (
    id TEXT PRIMARY KEY,
    engagement_id TEXT NOT NULL REFERENCES engagements(id) ON DELETE CASCADE,
    timestamp TEXT NOT NULL,
    action TEXT NOT NULL,
    triggered_by TEXT NOT NULL,
    details TEXT NOT NULL,
    evidence TEXT NOT NULL,
    signature TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_audit_engagement ON audit(engagement_id);
";

/// Fixed-width placeholder used while hashing — keeping the zeroed value
/// the same length as a real hex-encoded SHA-256 digest (64 chars) means
/// the `UPDATE metadata SET signature = ?` that writes the real signature
/// afterwards cannot change any page's record length.
pub const SIGNATURE_HEX_LEN: usize = 64;

pub fn zeroed_signature() -> String {
    "0".repeat(SIGNATURE_HEX_LEN)
}
