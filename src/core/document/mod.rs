//! Order- and trivia-preserving model of the YAML subset used by compose templates.
//!
//! A [`Document`] is a root [`Mapping`] plus the comment lines that precede it. Mappings are an
//! explicit ordered list of [`Entry`] values (no hashing), sequences an ordered list of [`Item`]
//! values, and leaves are [`Scalar`]s that remember their source spelling. Every entry and item
//! owns its [`Trivia`]: the end-of-line comment on its own line and the comment/blank lines that
//! follow that line in the source. Because trivia travels with the entry, reordering entries
//! moves their comments with them; the trailing blank line separating two blocks is the one piece
//! of trivia that must be re-anchored explicitly, see [`trivia`].
//!
//! Supported syntax: block mappings, block sequences (scalar or mapping items), single-line
//! plain/quoted scalars, flow sequences of scalars, empty flow collections (`[]`, `{}`), full-line
//! and end-of-line comments, blank lines. Anything else is a [`ErrorCategory::ParseError`].
//! Untouched nodes keep their source spacing: the gap after `key:` and `-`, trailing whitespace,
//! and the spelling of flow collections.

mod emitter;
pub mod keyed;
mod parser;
mod scalar;
pub mod trivia;

pub use emitter::serialize;
pub use keyed::{
    EnvAssignment, KeyedEntry, KeyedList, NameRef, PortMapping, Separated, VolumeMount,
};
pub use scalar::{Scalar, ScalarStyle};
pub use trivia::{capture_trailing_blank, restore_trailing_blank, TrailingBlank, TriviaSnapshot};

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;

/// Indentation used for collections that were not read from source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Columns between a mapping key and its nested mapping's keys.
    pub mapping_indent: usize,
    /// Columns between a mapping key and the dashes of its nested sequence.
    pub sequence_offset: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            mapping_indent: 2,
            sequence_offset: 2,
        }
    }
}

/// One comment or blank line, stored verbatim without its line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriviaLine(String);

impl TriviaLine {
    pub fn blank() -> Self {
        TriviaLine(String::new())
    }

    pub(crate) fn raw(line: &str) -> Self {
        TriviaLine(line.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Formatting attached to a single entry or item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trivia {
    /// Rest of the entry's own line after its value: trailing whitespace and any end-of-line
    /// comment, verbatim.
    pub comment: Option<String>,
    /// Comment and blank lines following the entry's own line.
    pub after: Vec<TriviaLine>,
}

impl Trivia {
    pub fn is_empty(&self) -> bool {
        self.comment.is_none() && self.after.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(Scalar),
    Mapping(Mapping),
    Sequence(Sequence),
}

impl Node {
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Node::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Node::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Sequence> {
        match self {
            Node::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }

    /// Decoded string value of a scalar node.
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().map(Scalar::as_str)
    }

    /// Child by mapping key, or by sequence index when the segment is numeric.
    pub fn child(&self, segment: &str) -> Option<&Node> {
        match self {
            Node::Mapping(mapping) => mapping.get(segment),
            Node::Sequence(sequence) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| sequence.get(index)),
            Node::Scalar(_) => None,
        }
    }

    pub fn child_mut(&mut self, segment: &str) -> Option<&mut Node> {
        match self {
            Node::Mapping(mapping) => mapping.get_mut(segment),
            Node::Sequence(sequence) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| sequence.get_mut(index)),
            Node::Scalar(_) => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Node::Scalar(_) => "scalar",
            Node::Mapping(_) => "mapping",
            Node::Sequence(_) => "sequence",
        }
    }
}

impl From<Scalar> for Node {
    fn from(scalar: Scalar) -> Self {
        Node::Scalar(scalar)
    }
}

impl From<Mapping> for Node {
    fn from(mapping: Mapping) -> Self {
        Node::Mapping(mapping)
    }
}

impl From<Sequence> for Node {
    fn from(sequence: Sequence) -> Self {
        Node::Sequence(sequence)
    }
}

/// Mapping key as written in the source plus its decoded name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    raw: String,
    name: String,
}

impl Key {
    pub fn new(name: &str) -> Self {
        let scalar = Scalar::string(name);
        Key {
            raw: scalar.raw().to_string(),
            name: name.to_string(),
        }
    }

    pub(crate) fn from_source(raw: &str, name: String) -> Self {
        Key {
            raw: raw.to_string(),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    key: Key,
    pub node: Node,
    pub trivia: Trivia,
    /// Whitespace between `:` and an inline value as read from source.
    pub(crate) gap: Option<String>,
}

impl Entry {
    pub fn new(key: &str, node: impl Into<Node>) -> Self {
        Entry {
            key: Key::new(key),
            node: node.into(),
            trivia: Trivia::default(),
            gap: None,
        }
    }

    pub(crate) fn parsed(key: Key, node: Node, trivia: Trivia, gap: Option<String>) -> Self {
        Entry {
            key,
            node,
            trivia,
            gap,
        }
    }

    pub fn key(&self) -> &str {
        self.key.name()
    }

    pub(crate) fn key_raw(&self) -> &str {
        self.key.raw()
    }
}

/// Ordered mapping with unique keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<Entry>,
    /// Columns from the parent key to this mapping's keys, when read from source.
    pub(crate) indent: Option<usize>,
    /// Source spelling of an empty flow mapping such as `{ }`.
    pub(crate) raw: Option<String>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(Entry::key)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.entries.iter_mut()
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key() == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|entry| entry.key() == key)
            .map(|entry| &entry.node)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|entry| entry.key() == key)
            .map(|entry| &mut entry.node)
    }

    /// Replace the value of `key` in place (keeping position and trivia) or append a new entry.
    /// Returns the previous value.
    pub fn insert(&mut self, key: &str, node: impl Into<Node>) -> Option<Node> {
        let node = node.into();
        match self.position(key) {
            Some(index) => Some(std::mem::replace(&mut self.entries[index].node, node)),
            None => {
                self.entries.push(Entry::new(key, node));
                None
            }
        }
    }

    /// Remove `key` together with its trivia.
    pub fn remove(&mut self, key: &str) -> Option<Node> {
        self.remove_entry(key).map(|entry| entry.node)
    }

    pub fn remove_entry(&mut self, key: &str) -> Option<Entry> {
        self.position(key).map(|index| self.entries.remove(index))
    }

    /// Append an entry built elsewhere; an existing entry with the same key is replaced in place.
    pub fn push_entry(&mut self, entry: Entry) {
        match self.position(entry.key()) {
            Some(index) => self.entries[index] = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn last_entry(&self) -> Option<&Entry> {
        self.entries.last()
    }

    pub fn last_entry_mut(&mut self) -> Option<&mut Entry> {
        self.entries.last_mut()
    }

    /// Stable reorder of the entries by a key derived from each entry's name.
    pub fn sort_entries_by_key<K, F>(&mut self, mut f: F)
    where
        K: Ord,
        F: FnMut(&str) -> K,
    {
        self.entries.sort_by_key(|entry| f(entry.key()));
    }

    pub fn mapping(&self, key: &str) -> Option<&Mapping> {
        self.get(key).and_then(Node::as_mapping)
    }

    pub fn mapping_mut(&mut self, key: &str) -> Option<&mut Mapping> {
        self.get_mut(key).and_then(Node::as_mapping_mut)
    }

    pub fn sequence_mut(&mut self, key: &str) -> Option<&mut Sequence> {
        self.get_mut(key).and_then(Node::as_sequence_mut)
    }

    /// Nested mapping at `key`, failing with `PathNotFound` when absent or not a mapping.
    pub fn require_mapping_mut(&mut self, key: &str) -> Result<&mut Mapping, AppError> {
        match self.get_mut(key) {
            Some(Node::Mapping(mapping)) => Ok(mapping),
            Some(other) => Err(wrong_kind(key, "mapping", other)),
            None => Err(AppError::path_not_found(key)),
        }
    }

    /// Nested block sequence at `key`, created empty when the key is absent or null.
    pub fn sequence_entry(&mut self, key: &str) -> Result<&mut Sequence, AppError> {
        let needs_init = match self.get(key) {
            None => true,
            Some(Node::Scalar(scalar)) if scalar.is_null() => true,
            Some(Node::Sequence(_)) => false,
            Some(other) => return Err(wrong_kind(key, "sequence", other)),
        };
        if needs_init {
            self.insert(key, Sequence::new());
        }
        self.sequence_mut(key)
            .ok_or_else(|| AppError::path_not_found(key))
    }
}

/// Sequence item with its trivia.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub node: Node,
    pub trivia: Trivia,
    /// Whitespace after the item's `-` as read from source.
    pub(crate) gap: Option<String>,
}

impl Item {
    pub fn new(node: impl Into<Node>) -> Self {
        Item {
            node: node.into(),
            trivia: Trivia::default(),
            gap: None,
        }
    }

    pub(crate) fn parsed(node: Node, trivia: Trivia, gap: String) -> Self {
        Item {
            node,
            trivia,
            gap: Some(gap),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceStyle {
    #[default]
    Block,
    /// `[a, b]` on the key's line.
    Flow,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequence {
    items: Vec<Item>,
    style: SequenceStyle,
    /// Columns from the parent key to this sequence's dashes, when read from source.
    pub(crate) indent: Option<usize>,
    /// Source spelling of a flow sequence, dropped on the first change to its items.
    pub(crate) raw: Option<String>,
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flow(items: Vec<Item>) -> Self {
        Sequence {
            items,
            style: SequenceStyle::Flow,
            indent: None,
            raw: None,
        }
    }

    pub fn style(&self) -> SequenceStyle {
        self.style
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.items.iter().map(|item| &item.node)
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.items.get(index).map(|item| &item.node)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.raw = None;
        self.items.get_mut(index).map(|item| &mut item.node)
    }

    pub fn push(&mut self, node: impl Into<Node>) {
        self.push_item(Item::new(node));
    }

    pub fn push_item(&mut self, item: Item) {
        self.raw = None;
        self.items.push(item);
    }

    pub fn remove(&mut self, index: usize) -> Option<Item> {
        if index >= self.items.len() {
            return None;
        }
        self.raw = None;
        Some(self.items.remove(index))
    }

    /// Remove every item for which `keep` returns false.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Node) -> bool,
    {
        let before = self.items.len();
        self.items.retain(|item| keep(&item.node));
        if self.items.len() != before {
            self.raw = None;
        }
    }

    pub fn last_item_mut(&mut self) -> Option<&mut Item> {
        self.raw = None;
        self.items.last_mut()
    }

    pub(crate) fn items_mut(&mut self) -> impl Iterator<Item = &mut Item> {
        self.raw = None;
        self.items.iter_mut()
    }

    pub(crate) fn replace_items(&mut self, items: Vec<Item>) {
        self.raw = None;
        self.items = items;
    }

}

/// A loaded template document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    head: Vec<TriviaLine>,
    root: Mapping,
    layout: Layout,
    final_newline: bool,
}

impl Document {
    /// Parse document text; fails with `ParseError` on malformed or unsupported input.
    pub fn load(source: &str) -> Result<Document, AppError> {
        parser::parse(source)
    }

    pub fn new(root: Mapping) -> Self {
        Document {
            head: Vec::new(),
            root,
            layout: Layout::default(),
            final_newline: true,
        }
    }

    pub(crate) fn from_parts(
        head: Vec<TriviaLine>,
        root: Mapping,
        layout: Layout,
        final_newline: bool,
    ) -> Self {
        Document {
            head,
            root,
            layout,
            final_newline,
        }
    }

    /// Serialize with the layout detected at load time.
    pub fn serialize(&self) -> String {
        emitter::serialize(self, &self.layout)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Comment and blank lines before the first entry.
    pub fn head(&self) -> &[TriviaLine] {
        &self.head
    }

    pub(crate) fn ends_with_newline(&self) -> bool {
        self.final_newline
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Mapping {
        &mut self.root
    }

    /// Navigate mapping keys and sequence indices from the root.
    pub fn get(&self, path: &[&str]) -> Result<&Node, AppError> {
        let (first, rest) = path
            .split_first()
            .ok_or_else(|| AppError::path_not_found(""))?;
        let mut node = self
            .root
            .get(first)
            .ok_or_else(|| AppError::path_not_found(first))?;
        for (depth, segment) in rest.iter().enumerate() {
            node = node
                .child(segment)
                .ok_or_else(|| AppError::path_not_found(&path[..depth + 2].join(".")))?;
        }
        Ok(node)
    }

    pub fn get_mut(&mut self, path: &[&str]) -> Result<&mut Node, AppError> {
        let (first, rest) = path
            .split_first()
            .ok_or_else(|| AppError::path_not_found(""))?;
        let mut node = self
            .root
            .get_mut(first)
            .ok_or_else(|| AppError::path_not_found(first))?;
        for (depth, segment) in rest.iter().enumerate() {
            node = node
                .child_mut(segment)
                .ok_or_else(|| AppError::path_not_found(&path[..depth + 2].join(".")))?;
        }
        Ok(node)
    }

    /// Mapping at `path`, failing with `PathNotFound` if absent or `PreconditionFailed` if the
    /// node there has another shape.
    pub fn mapping_mut(&mut self, path: &[&str]) -> Result<&mut Mapping, AppError> {
        let joined = path.join(".");
        match self.get_mut(path)? {
            Node::Mapping(mapping) => Ok(mapping),
            other => Err(wrong_kind(&joined, "mapping", other)),
        }
    }
}

fn wrong_kind(path: &str, expected: &str, found: &Node) -> AppError {
    AppError::new(
        ErrorCategory::PreconditionFailed,
        format!("'{}' must be a {}, found a {}", path, expected, found.kind()),
    )
    .with_context("path", path)
}
