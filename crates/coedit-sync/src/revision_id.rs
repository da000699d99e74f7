//! Revision identifiers
//!
//! A revision index is encoded as a base-62 digit string behind a one
//! character length prefix. The prefix grows with the number of digits, so
//! plain lexicographic comparison of two ids agrees with numeric comparison
//! of the indices they encode. Every participant must use the same alphabet
//! and prefix offset or cross-participant ordering silently breaks.

use std::fmt::{self, Display};

use thiserror::Error;

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const RADIX: u64 = ALPHABET.len() as u64;
/// Alphabet index of the prefix is `digit_count + LENGTH_OFFSET`
const LENGTH_OFFSET: usize = 9;
const ZERO_ID: &str = "A0";

/// Errors decoding a revision id
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevisionIdError {
    #[error("Revision id has no digits: {0:?}")]
    Empty(String),

    #[error("Revision id length prefix does not match its length: {0:?}")]
    InvalidPrefix(String),

    #[error("Revision id contains a character outside the alphabet: {0:?}")]
    InvalidDigit(String),

    #[error("Revision id does not fit in 64 bits: {0:?}")]
    Overflow(String),
}

/// Encode a revision index
pub fn encode(index: u64) -> String {
    if index == 0 {
        return ZERO_ID.to_string();
    }

    let mut digits = Vec::new();
    let mut rest = index;
    while rest > 0 {
        digits.push(ALPHABET[(rest % RADIX) as usize]);
        rest /= RADIX;
    }
    let prefix = ALPHABET[digits.len() + LENGTH_OFFSET];

    std::iter::once(prefix)
        .chain(digits.into_iter().rev())
        .map(char::from)
        .collect()
}

/// Decode a revision id produced by [`encode`]
pub fn try_decode(id: &str) -> Result<u64, RevisionIdError> {
    let Some((&prefix, digits)) = id.as_bytes().split_first() else {
        return Err(RevisionIdError::Empty(id.to_string()));
    };
    if digits.is_empty() {
        return Err(RevisionIdError::Empty(id.to_string()));
    }
    if alphabet_index(prefix) != Some(digits.len() + LENGTH_OFFSET) {
        return Err(RevisionIdError::InvalidPrefix(id.to_string()));
    }

    digits.iter().try_fold(0u64, |index, &digit| {
        let value = alphabet_index(digit)
            .ok_or_else(|| RevisionIdError::InvalidDigit(id.to_string()))?;
        index
            .checked_mul(RADIX)
            .and_then(|index| index.checked_add(value as u64))
            .ok_or_else(|| RevisionIdError::Overflow(id.to_string()))
    })
}

/// Decode a revision id that is known to be well formed.
///
/// # Panics
///
/// Panics if the length prefix is inconsistent or the id is otherwise
/// malformed. Untrusted input goes through [`try_decode`] or
/// [`RevisionId::parse`].
pub fn decode(id: &str) -> u64 {
    match try_decode(id) {
        Ok(index) => index,
        Err(e) => panic!("precondition violated: {e}"),
    }
}

fn alphabet_index(symbol: u8) -> Option<usize> {
    match symbol {
        b'0'..=b'9' => Some((symbol - b'0') as usize),
        b'A'..=b'Z' => Some((symbol - b'A') as usize + 10),
        b'a'..=b'z' => Some((symbol - b'a') as usize + 36),
        _ => None,
    }
}

/// A validated revision identifier.
///
/// Ordering of `RevisionId`s is the ordering of the indices they encode.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RevisionId(String);

impl RevisionId {
    /// The id of revision `index`
    pub fn from_index(index: u64) -> Self {
        Self(encode(index))
    }

    /// Validate an id received from the channel
    pub fn parse(id: &str) -> Result<Self, RevisionIdError> {
        try_decode(id)?;
        Ok(Self(id.to_string()))
    }

    /// The revision index this id encodes
    pub fn index(&self) -> u64 {
        decode(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
