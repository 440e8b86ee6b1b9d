//! Content fingerprints for the similarity pass.
//!
//! A [`Signature`] is a weighted multiset of line hashes: each line of the
//! (whitespace-normalized) content contributes one entry keyed by a truncated
//! BLAKE3 hash and weighted by its byte length. Two signatures are compared
//! with a size-weighted Dice coefficient, which makes the score insensitive
//! to line reordering and to insertions shifting later content.
//!
//! Content too short to fingerprint reliably falls back to substring
//! containment scoring instead of failing the comparison.

use std::borrow::Cow;
use std::collections::BTreeMap;

/// Content below this many normalized bytes is scored by containment.
pub(crate) const MIN_SIGNATURE_BYTES: usize = 64;

/// How whitespace is treated before fingerprinting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WhitespaceMode {
    /// Drop carriage returns and leading whitespace of each line. Interior
    /// whitespace still counts.
    Smart,
    /// Drop spaces, tabs and carriage returns everywhere.
    IgnoreAll,
    /// Fingerprint bytes exactly as stored.
    Raw,
}

pub(crate) fn normalize(content: &[u8], mode: WhitespaceMode) -> Cow<'_, [u8]> {
    match mode {
        WhitespaceMode::Raw => Cow::Borrowed(content),
        WhitespaceMode::IgnoreAll => Cow::Owned(
            content
                .iter()
                .copied()
                .filter(|byte| !matches!(byte, b' ' | b'\t' | b'\r'))
                .collect(),
        ),
        WhitespaceMode::Smart => {
            let mut out = Vec::with_capacity(content.len());
            let mut line_start = true;
            for &byte in content {
                match byte {
                    b'\r' => {}
                    b' ' | b'\t' if line_start => {}
                    b'\n' => {
                        out.push(byte);
                        line_start = true;
                    }
                    _ => {
                        out.push(byte);
                        line_start = false;
                    }
                }
            }
            Cow::Owned(out)
        }
    }
}

/// Raised when content is too short to build a meaningful signature.
#[derive(Debug)]
pub(crate) struct TooSmall;

/// Weighted line-hash multiset of one buffer.
#[derive(Debug, Clone)]
pub(crate) struct Signature {
    lines: BTreeMap<u64, u64>,
    total: u64,
}

impl Signature {
    /// Build from already-normalized content.
    pub(crate) fn build(normalized: &[u8]) -> Result<Self, TooSmall> {
        if normalized.len() < MIN_SIGNATURE_BYTES {
            return Err(TooSmall);
        }
        let mut lines = BTreeMap::new();
        let mut total = 0u64;
        for line in normalized.split_inclusive(|&byte| byte == b'\n') {
            let key = line_key(line);
            let weight = line.len() as u64;
            *lines.entry(key).or_insert(0) += weight;
            total += weight;
        }
        Ok(Self { lines, total })
    }

    /// Size-weighted Dice coefficient scaled to 0..=100.
    pub(crate) fn score(&self, other: &Signature) -> u16 {
        let total = self.total + other.total;
        if total == 0 {
            return 0;
        }
        let (small, large) = if self.lines.len() <= other.lines.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut shared = 0u64;
        for (key, weight) in &small.lines {
            if let Some(other_weight) = large.lines.get(key) {
                shared += (*weight).min(*other_weight);
            }
        }
        ((200 * shared) / total) as u16
    }
}

fn line_key(line: &[u8]) -> u64 {
    let hash = blake3::hash(line);
    let mut key = [0u8; 8];
    key.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(key)
}

/// Similarity of the shorter buffer to the longer one when at least one of
/// them was too small to fingerprint: full containment scaled by the size
/// ratio, zero otherwise.
fn containment_score(a: &[u8], b: &[u8]) -> u16 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if large.is_empty() {
        return 0;
    }
    let contained = small.is_empty()
        || large
            .windows(small.len())
            .any(|window| window == small);
    if contained {
        ((100 * small.len()) / large.len()) as u16
    } else {
        0
    }
}

/// Score two buffers against each other. Equal content is always 100, even
/// when both are empty.
pub(crate) fn similarity_score(a: &[u8], b: &[u8], mode: WhitespaceMode) -> u16 {
    if a == b {
        return 100;
    }
    let normalized_a = normalize(a, mode);
    let normalized_b = normalize(b, mode);
    if normalized_a == normalized_b {
        return 100;
    }
    match (Signature::build(&normalized_a), Signature::build(&normalized_b)) {
        (Ok(sig_a), Ok(sig_b)) => sig_a.score(&sig_b),
        _ => containment_score(&normalized_a, &normalized_b),
    }
}
