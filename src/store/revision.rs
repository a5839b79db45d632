use sha2::{Digest, Sha256};

/// Compute the revision that follows `previous` for a document body.
///
/// Revisions read `<generation>-<digest>`: the generation counts writes and
/// the digest covers the previous revision and the new body, so rewriting an
/// identical body still yields a new revision.
pub fn next_revision(previous: Option<&str>, body: &[u8]) -> String {
    let generation = previous.and_then(generation_of).unwrap_or(0) + 1;

    let mut hasher = Sha256::new();
    if let Some(prev) = previous {
        hasher.update(prev.as_bytes());
    }
    hasher.update(body);
    let digest = hasher.finalize();

    format!("{}-{}", generation, hex::encode(&digest[..16]))
}

/// Generation counter of a revision, if it is well formed.
pub fn generation_of(rev: &str) -> Option<u64> {
    rev.split_once('-')?.0.parse().ok()
}
