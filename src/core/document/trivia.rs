//! Re-anchoring of the separator that closes a block.
//!
//! The blank line separating two service blocks (and any comment introducing the next block) is
//! stored as trailing trivia of whatever line was textually last in the first block, often a
//! nested entry (`- ./data:/data`). When a transform appends after that line, removes it, or the
//! canonicalizer reorders keys, the separator would end up in the middle of the block. Callers
//! capture it before mutating and restore it afterwards onto the block's new tail.

use super::{Item, Mapping, Node, SequenceStyle, Trivia, TriviaLine};

/// Trivia detached from the end of a mapping: a run of lines starting with a blank line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailingBlank {
    lines: Vec<TriviaLine>,
}

impl TrailingBlank {
    /// Number of blank lines recorded.
    pub fn count(&self) -> usize {
        self.lines.iter().filter(|line| line.is_blank()).count()
    }

    pub fn lines(&self) -> &[TriviaLine] {
        &self.lines
    }
}

/// Detach the trivia of `mapping`'s textual tail from its first blank line on. Comments directly
/// below the tail line stay attached to it.
pub fn capture_trailing_blank(mapping: &mut Mapping) -> Option<TrailingBlank> {
    let trivia = tail_mut(mapping)?;
    let start = trivia.after.iter().position(TriviaLine::is_blank)?;
    Some(TrailingBlank {
        lines: trivia.after.split_off(start),
    })
}

/// Attach `marker` after the trivia of the current textual tail of `mapping`. Blank lines the
/// tail already owns stay in place. An empty mapping drops the marker.
pub fn restore_trailing_blank(mapping: &mut Mapping, marker: TrailingBlank) {
    if let Some(trivia) = tail_mut(mapping) {
        trivia.after.extend(marker.lines);
    }
}

/// Trivia emitted last when `mapping` is serialized.
fn tail_mut(mapping: &mut Mapping) -> Option<&mut Trivia> {
    let entry = mapping.last_entry_mut()?;
    match &mut entry.node {
        Node::Mapping(child) if !child.is_empty() => tail_mut(child),
        Node::Sequence(sequence)
            if sequence.style() == SequenceStyle::Block && !sequence.is_empty() =>
        {
            sequence.last_item_mut().and_then(item_tail_mut)
        }
        _ => Some(&mut entry.trivia),
    }
}

fn item_tail_mut(item: &mut Item) -> Option<&mut Trivia> {
    if item.trivia.after.is_empty() {
        if let Node::Mapping(mapping) = &mut item.node {
            if !mapping.is_empty() {
                return tail_mut(mapping);
            }
        }
    }
    Some(&mut item.trivia)
}

/// Trailing blanks of every child mapping of a parent, keyed by child name.
#[derive(Debug, Default)]
pub struct TriviaSnapshot {
    markers: Vec<(String, TrailingBlank)>,
}

impl TriviaSnapshot {
    pub fn capture_children(parent: &mut Mapping) -> Self {
        let mut markers = Vec::new();
        for entry in parent.entries_mut() {
            let name = entry.key().to_string();
            if let Node::Mapping(child) = &mut entry.node {
                if let Some(marker) = capture_trailing_blank(child) {
                    markers.push((name, marker));
                }
            }
        }
        TriviaSnapshot { markers }
    }

    /// Children that no longer exist lose their marker.
    pub fn restore_children(self, parent: &mut Mapping) {
        for (name, marker) in self.markers {
            if let Some(child) = parent.mapping_mut(&name) {
                restore_trailing_blank(child, marker);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}
