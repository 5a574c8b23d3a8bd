//! Key-naming conventions for the persisted layout. The in-memory store
//! below keys its maps directly on typed identifiers, but these helpers
//! exist so any future durable-store adapter (Redis, Turso, etc.) can
//! reproduce the exact wire keys without reverse-engineering them from call
//! sites.

use fingerprint::Fingerprint;

pub fn cache_key(fingerprint: &Fingerprint) -> String {
    format!("cache:{}", fingerprint.to_hex())
}

pub fn dedup_key(submitter_id: &str, fingerprint: &Fingerprint) -> String {
    format!("dedup:{}:{}", submitter_id, fingerprint.to_hex())
}

pub fn active_key(submitter_id: &str, job_id: &uuid::Uuid) -> String {
    format!("active:{}:{}", submitter_id, job_id)
}
