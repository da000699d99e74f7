//! Retain / insert / delete operations over plain text
//!
//! Components are kept normalized as they are pushed: adjacent components of
//! the same kind are merged and an insert is always ordered before an
//! adjacent delete. Two operations with the same effect therefore have the
//! same component list, which is what makes derived equality meaningful.
//!
//! Lengths count Unicode scalar values (`char`s).

use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::OtError;
use crate::operation::Operation;

/// One step of a text operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Component {
    /// Keep the next `n` characters
    Retain(usize),
    /// Insert text at the current position
    Insert(String),
    /// Remove the next `n` characters
    Delete(usize),
}

/// A sequence of components transforming a text of `base_len` characters
/// into one of `target_len` characters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextOperation {
    components: Vec<Component>,
    base_len: usize,
    target_len: usize,
}

impl TextOperation {
    /// Create an empty operation (the no-op over the empty text)
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `n` characters
    pub fn retain(mut self, n: usize) -> Self {
        self.push_retain(n);
        self
    }

    /// Insert `text` at the current position
    pub fn insert(mut self, text: &str) -> Self {
        self.push_insert(text);
        self
    }

    /// Remove `n` characters
    pub fn delete(mut self, n: usize) -> Self {
        self.push_delete(n);
        self
    }

    /// The normalized component list
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// True if applying this operation leaves any text unchanged
    pub fn is_noop(&self) -> bool {
        self.components
            .iter()
            .all(|c| matches!(c, Component::Retain(_)))
    }

    /// Apply this operation to `text`.
    ///
    /// # Errors
    ///
    /// Fails with [`OtError::LengthMismatch`] when `text` is not `base_len` long.
    pub fn apply(&self, text: &str) -> Result<String, OtError> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() != self.base_len {
            return Err(OtError::LengthMismatch {
                expected: self.base_len,
                actual: chars.len(),
            });
        }

        let mut out = String::with_capacity(text.len());
        let mut pos = 0;
        for component in &self.components {
            match component {
                Component::Retain(n) => {
                    out.extend(&chars[pos..pos + n]);
                    pos += n;
                }
                Component::Insert(ins) => out.push_str(ins),
                Component::Delete(n) => pos += n,
            }
        }
        Ok(out)
    }

    fn push_retain(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.base_len += n;
        self.target_len += n;

        if let Some(Component::Retain(count)) = self.components.last_mut() {
            *count += n;
        } else {
            self.components.push(Component::Retain(n));
        }
    }

    fn push_insert(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.target_len += text.chars().count();

        match self.components.as_mut_slice() {
            [.., Component::Insert(prev)] | [.., Component::Insert(prev), Component::Delete(_)] => {
                prev.push_str(text);
            }
            [.., last @ Component::Delete(_)] => {
                let del = std::mem::replace(last, Component::Insert(text.to_string()));
                self.components.push(del);
            }
            _ => self.components.push(Component::Insert(text.to_string())),
        }
    }

    fn push_delete(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.base_len += n;

        if let Some(Component::Delete(count)) = self.components.last_mut() {
            *count += n;
        } else {
            self.components.push(Component::Delete(n));
        }
    }

    fn from_wire(wire: Vec<WireComponent>) -> Result<Self, OtError> {
        // Counts come from peers; lengths are checked before any are accumulated
        let mut base_len = 0usize;
        let mut target_len = 0usize;
        let mut op = Self::new();
        for component in wire {
            match component {
                WireComponent::Count(0) => {
                    return Err(OtError::InvalidComponent("zero-length count".to_string()));
                }
                WireComponent::Count(n) => {
                    let count = usize::try_from(n.unsigned_abs()).map_err(|_| length_overflow())?;
                    base_len = base_len.checked_add(count).ok_or_else(length_overflow)?;
                    if n > 0 {
                        target_len = target_len.checked_add(count).ok_or_else(length_overflow)?;
                        op.push_retain(count);
                    } else {
                        op.push_delete(count);
                    }
                }
                WireComponent::Text(text) if text.is_empty() => {
                    return Err(OtError::InvalidComponent("empty insert".to_string()));
                }
                WireComponent::Text(text) => {
                    target_len = target_len
                        .checked_add(text.chars().count())
                        .ok_or_else(length_overflow)?;
                    op.push_insert(&text);
                }
            }
        }
        Ok(op)
    }
}

fn length_overflow() -> OtError {
    OtError::InvalidComponent("length overflow".to_string())
}

impl Operation for TextOperation {
    fn base_len(&self) -> usize {
        self.base_len
    }

    fn target_len(&self) -> usize {
        self.target_len
    }

    fn compose(&self, next: &Self) -> Result<Self, OtError> {
        if self.target_len != next.base_len {
            return Err(OtError::LengthMismatch {
                expected: self.target_len,
                actual: next.base_len,
            });
        }

        let mut out = TextOperation::new();
        let mut first = self.components.iter().cloned();
        let mut second = next.components.iter().cloned();
        let mut a = first.next();
        let mut b = second.next();

        loop {
            match (a.take(), b.take()) {
                (None, None) => break,
                (Some(Component::Delete(n)), rest) => {
                    out.push_delete(n);
                    a = first.next();
                    b = rest;
                }
                (rest, Some(Component::Insert(text))) => {
                    out.push_insert(&text);
                    a = rest;
                    b = second.next();
                }
                (None, Some(_)) => return Err(OtError::Incompatible("first operation is too short")),
                (Some(_), None) => return Err(OtError::Incompatible("first operation is too long")),
                (Some(Component::Retain(n)), Some(Component::Retain(m))) => {
                    let len = n.min(m);
                    out.push_retain(len);
                    a = if n > len { Some(Component::Retain(n - len)) } else { first.next() };
                    b = if m > len { Some(Component::Retain(m - len)) } else { second.next() };
                }
                (Some(Component::Insert(text)), Some(Component::Delete(m))) => {
                    let n = text.chars().count();
                    let len = n.min(m);
                    let (_, tail) = split_chars(&text, len);
                    a = if n > len { Some(Component::Insert(tail.to_string())) } else { first.next() };
                    b = if m > len { Some(Component::Delete(m - len)) } else { second.next() };
                }
                (Some(Component::Insert(text)), Some(Component::Retain(m))) => {
                    let n = text.chars().count();
                    let len = n.min(m);
                    let (head, tail) = split_chars(&text, len);
                    out.push_insert(head);
                    a = if n > len { Some(Component::Insert(tail.to_string())) } else { first.next() };
                    b = if m > len { Some(Component::Retain(m - len)) } else { second.next() };
                }
                (Some(Component::Retain(n)), Some(Component::Delete(m))) => {
                    let len = n.min(m);
                    out.push_delete(len);
                    a = if n > len { Some(Component::Retain(n - len)) } else { first.next() };
                    b = if m > len { Some(Component::Delete(m - len)) } else { second.next() };
                }
            }
        }

        Ok(out)
    }

    fn identity(len: usize) -> Self {
        Self::new().retain(len)
    }
}

/// Split `text` after `n` characters
fn split_chars(text: &str, n: usize) -> (&str, &str) {
    let at = text
        .char_indices()
        .nth(n)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text.split_at(at)
}

// ---------------------------------------------------------------------------
// Wire form: positive integer = retain, negative integer = delete, string = insert
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum WireComponent {
    Count(i64),
    Text(String),
}

impl Serialize for TextOperation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.components.len()))?;
        for component in &self.components {
            match component {
                Component::Retain(n) => seq.serialize_element(&(*n as i64))?,
                Component::Insert(text) => seq.serialize_element(text)?,
                Component::Delete(n) => seq.serialize_element(&-(*n as i64))?,
            }
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for TextOperation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = Vec::<WireComponent>::deserialize(deserializer)?;
        Self::from_wire(wire).map_err(de::Error::custom)
    }
}
