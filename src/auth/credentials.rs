// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The accepted bearer credentials.
//!
//! Tokens are reduced to SHA-256 digests when the set is built, so every
//! comparison runs over two 32-byte buffers regardless of the length of the
//! presented or the stored token. Membership checks visit every stored
//! digest; nothing returns early on a match or on a differing byte.

use sha2::{Digest, Sha256};

type TokenDigest = [u8; 32];

/// Immutable set of accepted bearer tokens.
#[derive(Clone)]
pub struct CredentialSet {
    digests: Vec<TokenDigest>,
}

impl CredentialSet {
    /// Build a set from raw tokens. Empty strings are ignored and duplicates
    /// collapse.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut digests: Vec<TokenDigest> = tokens
            .into_iter()
            .filter(|t| !t.as_ref().is_empty())
            .map(|t| digest(t.as_ref()))
            .collect();
        digests.sort_unstable();
        digests.dedup();
        Self { digests }
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// Whether `candidate` is one of the accepted tokens.
    pub fn contains(&self, candidate: &str) -> bool {
        let candidate = digest(candidate);
        let mut matched = 0u8;
        for stored in &self.digests {
            matched |= fixed_time_eq(stored, &candidate) as u8;
        }
        matched == 1
    }
}

impl std::fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSet")
            .field("len", &self.digests.len())
            .finish_non_exhaustive()
    }
}

fn digest(token: &str) -> TokenDigest {
    Sha256::digest(token.as_bytes()).into()
}

/// Equality that inspects every byte of both inputs.
///
/// Bytes are XOR-accumulated up to the longer length; a length mismatch is
/// folded in only after the loop.
pub fn fixed_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut diff: u8 = 0;
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= x ^ y;
    }
    diff |= (a.len() != b.len()) as u8;
    diff == 0
}
