//! Order-independent content hashing for model field sets

use sha2::{Digest, Sha256};

use super::snapshot::FieldSnapshot;

/// Compute the checksum of a model's field set.
///
/// Fields are canonicalized by name before hashing, so the supplied order
/// never affects the result. Every attribute that matters for compatibility
/// (name, data type, optionality) is part of the hashed encoding, and each
/// string is length-prefixed so adjacent values cannot run together.
pub fn compute_checksum(fields: &[FieldSnapshot]) -> String {
    let mut canonical: Vec<&FieldSnapshot> = fields.iter().collect();
    canonical.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.data_type.as_str().cmp(b.data_type.as_str()))
            .then_with(|| a.is_optional.cmp(&b.is_optional))
    });

    let mut hasher = Sha256::new();
    hash_usize(&mut hasher, canonical.len());
    for field in canonical {
        hash_str(&mut hasher, &field.name);
        hash_str(&mut hasher, field.data_type.as_str());
        hasher.update([u8::from(field.is_optional)]);
    }
    format!("{:x}", hasher.finalize())
}

fn hash_usize(hasher: &mut Sha256, value: usize) {
    hasher.update((value as u64).to_le_bytes());
}

fn hash_str(hasher: &mut Sha256, value: &str) {
    hash_usize(hasher, value.len());
    hasher.update(value.as_bytes());
}
