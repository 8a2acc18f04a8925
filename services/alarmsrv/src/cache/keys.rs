//! Cache key construction
//!
//! Collection reads are keyed by a stable 64-bit fingerprint of the
//! complete normalized parameter set; single-entity reads by
//! `entity-kind:id`. All alarm collection keys share one prefix so they
//! can be bulk-invalidated with a single pattern delete.

use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Prefix shared by every alarm collection key
pub const ALARM_COLLECTION_PREFIX: &str = "alarmes:q:";

/// Pattern matching every alarm collection key
pub const ALARM_COLLECTION_PATTERN: &str = "alarmes:q:*";

/// Dedicated key for the aggregate stats read
pub const ALARM_STATS_KEY: &str = "alarmes:stats";

/// Key for the full alarm type listing
pub const TYPE_LIST_KEY: &str = "tipo_alarmes:all";

/// Fingerprint a normalized parameter set. Pairs are sorted by name first,
/// so parameter order on the request line does not change the key.
pub fn fingerprint(params: &[(String, String)]) -> u64 {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();

    let mut hasher = FxHasher::default();
    for (name, value) in sorted {
        hasher.write(name.as_bytes());
        hasher.write_u8(b'=');
        hasher.write(value.as_bytes());
        hasher.write_u8(b'\n');
    }
    hasher.finish()
}

/// Collection key for an alarm listing
pub fn alarm_collection(params: &[(String, String)]) -> String {
    format!("{}{:016x}", ALARM_COLLECTION_PREFIX, fingerprint(params))
}

/// Entity key for a single alarm
pub fn alarm_entity(id: i64) -> String {
    format!("alarme:{}", id)
}

/// Entity key for a single alarm type
pub fn type_entity(id: i64) -> String {
    format!("tipo_alarme:{}", id)
}

/// Key for an issued auth token
pub fn auth_token(token: &str) -> String {
    format!("auth:token:{}", token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_fingerprint_is_order_insensitive() {
        let a = params(&[("status", "1"), ("page", "2")]);
        let b = params(&[("page", "2"), ("status", "1")]);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_differs_per_parameter_set() {
        let a = params(&[("status", "1"), ("page", "1")]);
        let b = params(&[("status", "1"), ("page", "2")]);
        let c = params(&[("status", "2"), ("page", "1")]);
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_ne!(fingerprint(&a), fingerprint(&c));
    }

    #[test]
    fn test_collection_keys_share_the_bulk_pattern() {
        let key = alarm_collection(&params(&[("status", "1")]));
        assert!(key.starts_with(ALARM_COLLECTION_PREFIX));
    }

    #[test]
    fn test_entity_keys() {
        assert_eq!(alarm_entity(42), "alarme:42");
        assert_eq!(type_entity(7), "tipo_alarme:7");
    }
}
