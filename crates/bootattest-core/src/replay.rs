//! Measurement-register replay engine (C2).
//!
//! Reconstructs per-algorithm register banks by iteratively extending each
//! register with the concatenation of its prior value and each event's
//! digest for a supported algorithm: `r <- H(r || d)`.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::tcg::{AlgorithmId, AlgorithmTable, Event, ALG_SHA256, ALG_SHA384, ALG_SHA512};

pub const REGISTER_COUNT: usize = 24;

/// `register_index -> digest bytes`, one bank per supported algorithm.
pub type RegisterBank = Vec<Vec<u8>>;

fn extend(alg: AlgorithmId, prior: &[u8], digest: &[u8]) -> Vec<u8> {
    match alg {
        ALG_SHA256 => {
            let mut h = Sha256::new();
            h.update(prior);
            h.update(digest);
            h.finalize().to_vec()
        }
        ALG_SHA384 => {
            let mut h = Sha384::new();
            h.update(prior);
            h.update(digest);
            h.finalize().to_vec()
        }
        ALG_SHA512 => {
            let mut h = Sha512::new();
            h.update(prior);
            h.update(digest);
            h.finalize().to_vec()
        }
        _ => prior.to_vec(),
    }
}

/// Algorithms the replay engine knows how to hash. SHA-1 and SM3-256 are
/// recognized by the parser (so their digests flow through unmodified) but
/// have no implemented hash function here, so they are silently skipped
/// during replay, exactly as spec.md's "unsupported algorithms are silently
/// skipped" rule requires.
fn is_supported(alg: AlgorithmId) -> bool {
    matches!(alg, ALG_SHA256 | ALG_SHA384 | ALG_SHA512)
}

/// Replay all events into one register bank per known-and-supported
/// algorithm in the table. Algorithms absent from the table contribute no
/// bank, even if individual events happen to carry a digest for them.
pub fn replay(table: &AlgorithmTable, events: &[Event]) -> BTreeMap<AlgorithmId, RegisterBank> {
    let mut banks: BTreeMap<AlgorithmId, RegisterBank> = BTreeMap::new();
    for (&alg, &size) in table {
        if is_supported(alg) {
            banks.insert(alg, vec![vec![0u8; size]; REGISTER_COUNT]);
        }
    }

    for event in events {
        let idx = event.register_index as usize;
        if idx >= REGISTER_COUNT {
            continue;
        }
        for (&alg, digest) in &event.digests {
            if let Some(bank) = banks.get_mut(&alg) {
                bank[idx] = extend(alg, &bank[idx], digest);
            }
        }
    }

    banks
}

/// Project register banks into `algorithm_name -> {register_index -> hex}`,
/// sorted ascending by register index (a `Vec<Vec<u8>>` is already in
/// register-index order, so this is a straight hex-encode).
pub fn banks_to_hex(banks: &BTreeMap<AlgorithmId, RegisterBank>) -> BTreeMap<String, BTreeMap<u32, String>> {
    banks
        .iter()
        .map(|(alg, bank)| {
            let regs = bank
                .iter()
                .enumerate()
                .map(|(i, digest)| (i as u32, hex::encode(digest)))
                .collect();
            (alg.name(), regs)
        })
        .collect()
}
