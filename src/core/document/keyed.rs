//! Identity-addressed views over sequences of encoded strings such as volume mounts
//! (`./data:/data`) and environment assignments (`KEY=value`).

use super::{Item, Node, Scalar, Sequence, Trivia};
use crate::core::error::AppError;
use std::fmt;

/// A record that is parsed once from a sequence item and encoded once on write-back.
pub trait KeyedEntry: Sized + PartialEq {
    fn parse(raw: &str) -> Self;

    /// Lookup key. Comparison is literal.
    fn identity(&self) -> &str;

    fn encode(&self) -> String;
}

/// `key<SEP>payload`, split at the first separator. Entries without the separator have an empty
/// identity and keep the whole text as payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Separated<const SEP: char> {
    key: Option<String>,
    payload: String,
}

/// `source:target[:mode]`, identified by the mount source.
pub type VolumeMount = Separated<':'>;
/// `NAME=value`, identified by the variable name.
pub type EnvAssignment = Separated<'='>;
/// `host:container`, identified by the published host port.
pub type PortMapping = Separated<':'>;

impl<const SEP: char> Separated<SEP> {
    pub fn new(key: impl Into<String>, payload: impl Into<String>) -> Self {
        Separated {
            key: Some(key.into()),
            payload: payload.into(),
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Everything after the first separator.
    pub fn payload(&self) -> &str {
        &self.payload
    }
}

impl<const SEP: char> KeyedEntry for Separated<SEP> {
    fn parse(raw: &str) -> Self {
        match raw.split_once(SEP) {
            Some((key, payload)) => Separated::new(key, payload),
            None => Separated {
                key: None,
                payload: raw.to_string(),
            },
        }
    }

    fn identity(&self) -> &str {
        self.key.as_deref().unwrap_or("")
    }

    fn encode(&self) -> String {
        match &self.key {
            Some(key) => format!("{}{}{}", key, SEP, self.payload),
            None => self.payload.clone(),
        }
    }
}

impl<const SEP: char> fmt::Display for Separated<SEP> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Whole-string identity, for `env_file` paths and `depends_on` service names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRef(String);

impl NameRef {
    pub fn new(name: impl Into<String>) -> Self {
        NameRef(name.into())
    }
}

impl KeyedEntry for NameRef {
    fn parse(raw: &str) -> Self {
        NameRef(raw.to_string())
    }

    fn identity(&self) -> &str {
        &self.0
    }

    fn encode(&self) -> String {
        self.0.clone()
    }
}

#[derive(Debug, Clone)]
struct Slot<E> {
    entry: E,
    /// Source scalar, kept while the entry is unchanged.
    original: Option<Scalar>,
    trivia: Trivia,
    gap: Option<String>,
}

/// Ordered entries with first-match lookup by identity.
#[derive(Debug, Clone)]
pub struct KeyedList<E> {
    slots: Vec<Slot<E>>,
    changed: bool,
}

impl<E: KeyedEntry> Default for KeyedList<E> {
    fn default() -> Self {
        KeyedList {
            slots: Vec::new(),
            changed: false,
        }
    }
}

impl<E: KeyedEntry> KeyedList<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every item of `sequence`; fails with `PreconditionFailed` on a non-scalar item.
    pub fn from_sequence(sequence: &Sequence) -> Result<Self, AppError> {
        let mut slots = Vec::with_capacity(sequence.len());
        for (index, item) in sequence.items().iter().enumerate() {
            let Node::Scalar(scalar) = &item.node else {
                return Err(AppError::precondition(format!(
                    "list item {} is not a scalar entry",
                    index
                ))
                .with_context("index", index.to_string()));
            };
            slots.push(Slot {
                entry: E::parse(scalar.as_str()),
                original: Some(scalar.clone()),
                trivia: item.trivia.clone(),
                gap: item.gap.clone(),
            });
        }
        Ok(KeyedList {
            slots,
            changed: false,
        })
    }

    /// Load `sequence`, apply `f` and write the result back. The sequence is left untouched when
    /// `f` fails.
    pub fn edit<F>(sequence: &mut Sequence, f: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut KeyedList<E>) -> Result<(), AppError>,
    {
        let mut list = KeyedList::from_sequence(sequence)?;
        f(&mut list)?;
        list.write_to(sequence);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.slots.iter().map(|slot| &slot.entry)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.entry.identity() == key)
    }

    pub fn get(&self, key: &str) -> Option<&E> {
        self.index_of(key).map(|index| &self.slots[index].entry)
    }

    /// Delete the first entry identified by `key`.
    pub fn remove(&mut self, key: &str, must_exist: bool) -> Result<Option<E>, AppError> {
        match self.index_of(key) {
            Some(index) => {
                self.changed = true;
                Ok(Some(self.slots.remove(index).entry))
            }
            None if must_exist => Err(AppError::key_not_found(key)),
            None => Ok(None),
        }
    }

    /// Overwrite the entry identified by `key` in place. Returns false, changing nothing, when
    /// there is no such entry.
    pub fn replace(&mut self, key: &str, value: E) -> bool {
        let Some(index) = self.index_of(key) else {
            return false;
        };
        let slot = &mut self.slots[index];
        if slot.entry != value {
            slot.entry = value;
            slot.original = None;
            self.changed = true;
        }
        true
    }

    /// Add at the end without checking for an existing identity.
    pub fn append(&mut self, value: E) {
        self.slots.push(Slot {
            entry: value,
            original: None,
            trivia: Trivia::default(),
            gap: None,
        });
        self.changed = true;
    }

    /// Replace each value's identity in place, or append it when absent.
    pub fn upsert<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = E>,
    {
        for value in values {
            let key = value.identity().to_string();
            if let Some(index) = self.index_of(&key) {
                let slot = &mut self.slots[index];
                if slot.entry != value {
                    slot.entry = value;
                    slot.original = None;
                    self.changed = true;
                }
            } else {
                self.append(value);
            }
        }
    }

    /// Replace the items of `sequence`. Unchanged entries keep their source scalar and trivia; a
    /// list that was not changed at all leaves `sequence` as it was.
    pub fn write_to(self, sequence: &mut Sequence) {
        if !self.changed {
            return;
        }
        let items = self
            .slots
            .into_iter()
            .map(|slot| {
                let scalar = slot
                    .original
                    .unwrap_or_else(|| Scalar::string(slot.entry.encode()));
                let mut item = Item::new(scalar);
                item.trivia = slot.trivia;
                item.gap = slot.gap;
                item
            })
            .collect();
        sequence.replace_items(items);
    }
}
