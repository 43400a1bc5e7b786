use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::similarity::{similarity, word_tokens};

const SIMHASH_PREFIX: &str = "simhash:";
const SHA256_PREFIX: &str = "sha256:";

/// What gets persisted for a prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintMethod {
    Raw,
    #[default]
    Simhash,
    Sha256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptFingerprint {
    Text(String),
    SimHash(u64),
    Sha256(String),
}

impl PromptFingerprint {
    pub fn compute(method: FingerprintMethod, text: &str) -> Self {
        match method {
            FingerprintMethod::Raw => PromptFingerprint::Text(text.to_string()),
            FingerprintMethod::Simhash => PromptFingerprint::SimHash(simhash(text)),
            FingerprintMethod::Sha256 => PromptFingerprint::Sha256(sha256_hex(text)),
        }
    }

    /// Reads a stored value. Anything without a known prefix is raw text.
    pub fn decode(stored: &str) -> Self {
        if let Some(hex) = stored.strip_prefix(SIMHASH_PREFIX)
            && let Ok(value) = u64::from_str_radix(hex, 16)
        {
            return PromptFingerprint::SimHash(value);
        }
        if let Some(hex) = stored.strip_prefix(SHA256_PREFIX)
            && hex.len() == 64
            && hex.chars().all(|ch| ch.is_ascii_hexdigit())
        {
            return PromptFingerprint::Sha256(hex.to_string());
        }
        PromptFingerprint::Text(stored.to_string())
    }

    pub fn encode(&self) -> String {
        match self {
            PromptFingerprint::Text(text) => text.clone(),
            PromptFingerprint::SimHash(value) => format!("{SIMHASH_PREFIX}{value:016x}"),
            PromptFingerprint::Sha256(hex) => format!("{SHA256_PREFIX}{hex}"),
        }
    }

    /// Similarity between this stored prompt and fresh text. Hashed forms
    /// compare by fingerprinting the text side first.
    pub fn similarity_to(&self, text: &str) -> f64 {
        match self {
            PromptFingerprint::Text(stored) => similarity(stored, text),
            PromptFingerprint::SimHash(stored) => {
                if text.trim().is_empty() {
                    return 0.0;
                }
                hamming_similarity(*stored, simhash(text))
            }
            PromptFingerprint::Sha256(stored) => {
                if text.trim().is_empty() {
                    return 0.0;
                }
                if *stored == sha256_hex(text) { 1.0 } else { 0.0 }
            }
        }
    }

    /// Similarity between two stored prompts.
    pub fn similarity_between(&self, other: &PromptFingerprint) -> f64 {
        match (self, other) {
            (PromptFingerprint::Text(a), _) => other.similarity_to(a),
            (_, PromptFingerprint::Text(b)) => self.similarity_to(b),
            (PromptFingerprint::SimHash(a), PromptFingerprint::SimHash(b)) => {
                hamming_similarity(*a, *b)
            }
            (PromptFingerprint::Sha256(a), PromptFingerprint::Sha256(b)) => {
                if a == b { 1.0 } else { 0.0 }
            }
            _ => 0.0,
        }
    }
}

/// Independent hashes differ in about half their bits, so 32 differing bits
/// already score 0.
fn hamming_similarity(a: u64, b: u64) -> f64 {
    let distance = (a ^ b).count_ones() as f64;
    (1.0 - 2.0 * distance / 64.0).max(0.0)
}

/// 64-bit SimHash over lower-cased word tokens, each token hashed with SHA-256.
pub fn simhash(text: &str) -> u64 {
    let tokens = word_tokens(text);
    if tokens.is_empty() {
        return 0;
    }
    let mut weights = [0i32; 64];
    for token in tokens {
        let digest = Sha256::digest(token.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let hash = u64::from_be_bytes(prefix);
        for (bit, weight) in weights.iter_mut().enumerate() {
            if (hash >> bit) & 1 == 1 {
                *weight += 1;
            } else {
                *weight -= 1;
            }
        }
    }
    weights
        .iter()
        .enumerate()
        .filter(|(_, weight)| **weight > 0)
        .fold(0u64, |acc, (bit, _)| acc | (1u64 << bit))
}

pub fn sha256_hex(text: &str) -> String {
    let normalized = text.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    digest.iter().map(|byte| format!("{:02x}", byte)).collect()
}
