// Copyright (c) 2024 Mike Tsao

//! Unique identifiers for module instances, and a factory that keeps the id
//! format in one place.

use crate::{types::Millis, util::Rng};
use serde::{Deserialize, Serialize};
use synonym::Synonym;

/// An identifier for a live module instance, unique for the life of the
/// session. It is built from the creation time plus a random suffix, so the
/// collision probability is negligible even across hot reloads.
#[derive(Synonym, Serialize, Deserialize)]
pub struct InstanceUid(pub String);

const SUFFIX_LEN: usize = 6;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Mints [InstanceUid]s.
#[derive(Debug, Default)]
pub struct InstanceUidFactory;
impl InstanceUidFactory {
    /// Generates an id of the form `m<creation millis>-<random suffix>`.
    pub fn mint(&self, now: Millis, rng: &mut Rng) -> InstanceUid {
        let mut suffix = String::with_capacity(SUFFIX_LEN);
        let mut bits = rng.rand_u64();
        for _ in 0..SUFFIX_LEN {
            suffix.push(BASE36[(bits % 36) as usize] as char);
            bits /= 36;
        }
        InstanceUid(format!("m{}-{}", now.0.max(0.0) as u64, suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn minted_uids_are_unique() {
        let f = InstanceUidFactory;
        let mut rng = Rng::new_with_seed(7);
        let mut seen: HashSet<InstanceUid> = Default::default();
        for _ in 0..256 {
            let uid = f.mint(Millis(1000.0), &mut rng);
            assert!(
                seen.insert(uid.clone()),
                "uids minted at the same instant should still be unique: {uid}"
            );
        }
    }

    #[test]
    fn uid_embeds_creation_time() {
        let f = InstanceUidFactory;
        let mut rng = Rng::new_with_seed(7);
        let uid = f.mint(Millis(123456.0), &mut rng);
        assert!(
            uid.0.starts_with("m123456-"),
            "uid should start with the creation timestamp, got {uid}"
        );
    }
}
