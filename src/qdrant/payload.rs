//! Helpers for constructing Qdrant points and hashing chunk text.

use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

/// Payload key carrying the caller-assigned record id.
pub(crate) const RECORD_ID_KEY: &str = "chunk_id";

/// Map a caller-assigned id (for example `chunk_3`) onto a stable Qdrant point UUID.
///
/// Qdrant only accepts unsigned integers or UUIDs as point ids; a name-based UUIDv5 keeps the
/// mapping deterministic so repeated upserts overwrite the same point.
pub fn point_uuid(record_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, record_id.as_bytes())
}

/// Serialize a record into the JSON point accepted by `PUT /collections/{name}/points`.
pub(crate) fn build_point(record_id: &str, vector: &[f32], payload: &Map<String, Value>) -> Value {
    let mut payload = payload.clone();
    payload.insert(RECORD_ID_KEY.into(), Value::String(record_id.to_string()));
    json!({
        "id": point_uuid(record_id).to_string(),
        "vector": vector,
        "payload": payload,
    })
}

/// Compute a deterministic SHA-256 hash for the chunk text.
pub fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_hash_is_stable() {
        let h1 = compute_chunk_hash("Hello world");
        let h2 = compute_chunk_hash("Hello world");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn timestamp_is_rfc3339_like() {
        let ts = current_timestamp_rfc3339();
        assert!(ts.contains('T') && ts.ends_with('Z'));
    }

    #[test]
    fn point_uuid_is_deterministic_per_record_id() {
        assert_eq!(point_uuid("chunk_0"), point_uuid("chunk_0"));
        assert_ne!(point_uuid("chunk_0"), point_uuid("chunk_1"));
    }

    #[test]
    fn built_point_carries_record_id_in_payload() {
        let mut payload = Map::new();
        payload.insert("text".into(), Value::String("sample".into()));
        let point = build_point("chunk_7", &[0.5, 0.25], &payload);
        assert_eq!(point["id"], point_uuid("chunk_7").to_string());
        assert_eq!(point["payload"]["chunk_id"], "chunk_7");
        assert_eq!(point["payload"]["text"], "sample");
        assert_eq!(point["vector"][1], 0.25);
    }
}
