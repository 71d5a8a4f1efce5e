#![no_main]
use dualroot_core::{Digest, Verifier, VerifierConfig};
use libfuzzer_sys::fuzz_target;

// First byte picks the leaf depth, the next eight the new-balance count;
// the rest is the proof buffer.
fuzz_target!(|data: &[u8]| {
    let Some((&depth, rest)) = data.split_first() else {
        return;
    };
    if rest.len() < 8 {
        return;
    }
    let (count, proof) = rest.split_at(8);
    let mut le = [0u8; 8];
    le.copy_from_slice(count);
    let cfg = VerifierConfig::with_leaf_depth(usize::from(depth % 160) + 1);
    let Ok(v) = Verifier::<dualroot_core::Blake3Hasher>::new(cfg) else {
        return;
    };
    let n = (u64::from_le_bytes(le) % 64) as usize;
    let news = vec![0u64; n];
    let _ = v.verify(&Digest::ZERO, proof, &news);
    let _ = v.decode_leaves(proof);
});
