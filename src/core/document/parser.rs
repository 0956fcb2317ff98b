//! Template loading on top of `yaml_rust2` marked events.
//!
//! The event stream gives the structure, each scalar's decoded value and its style. Everything
//! the events drop (exact scalar spelling, the gap after `key:` and `-`, trailing whitespace,
//! comments and blank lines) is sliced out of the source at the event markers. A second pass walks
//! the finished tree in document order and hands every comment or blank line to the node whose
//! line precedes it.

use super::{
    Document, Entry, Item, Key, Layout, Mapping, Node, Scalar, ScalarStyle, Sequence,
    SequenceStyle, Trivia, TriviaLine,
};
use crate::core::error::AppError;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

pub(crate) fn parse(source: &str) -> Result<Document, AppError> {
    let text = Source::new(source)?;
    let final_newline = source.is_empty() || source.ends_with('\n');
    if text.lines.iter().all(|line| is_trivia(line) || is_marker(line)) {
        let head = text.lines.iter().map(|line| TriviaLine::raw(line)).collect();
        return Ok(Document::from_parts(
            head,
            Mapping::new(),
            Layout::default(),
            final_newline,
        ));
    }

    let mut builder = TreeBuilder::new(&text);
    let mut parser = Parser::new_from_str(source);
    let loaded = parser.load(&mut builder, true);
    if let Some(error) = builder.error.take() {
        return Err(error);
    }
    loaded.map_err(|err| AppError::parse(text.line_of(err.marker()) + 1, err.info()))?;

    let mut root = builder
        .root
        .take()
        .ok_or_else(|| AppError::parse(1, "document root must be a mapping"))?;
    let mut walker = TriviaWalker {
        lines: &text.lines,
        owners: &builder.owners,
        next: 0,
        mapping_indent: None,
        sequence_offset: None,
    };
    let head = walker.head()?;
    walker.mapping(&mut root)?;
    let layout = Layout {
        mapping_indent: walker.mapping_indent.unwrap_or(2),
        sequence_offset: walker.sequence_offset.unwrap_or(2),
    };
    Ok(Document::from_parts(head, root, layout, final_newline))
}

/// Source split into lines, with marker positions translated to line and byte column.
struct Source<'a> {
    text: &'a str,
    lines: Vec<&'a str>,
    line_starts: Vec<usize>,
    /// Byte offset of every char plus the end of input. Markers count chars.
    char_offsets: Vec<usize>,
}

impl<'a> Source<'a> {
    fn new(text: &'a str) -> Result<Self, AppError> {
        let body = text.strip_suffix('\n').unwrap_or(text);
        let mut lines = Vec::new();
        let mut line_starts = Vec::new();
        if !text.is_empty() {
            let mut start = 0;
            for (index, line) in body.split('\n').enumerate() {
                if line.ends_with('\r') {
                    return Err(AppError::parse(index + 1, "CRLF line endings are not supported"));
                }
                if line.trim_start_matches(' ').starts_with('\t') && !is_trivia(line) {
                    return Err(AppError::parse(index + 1, "tabs are not allowed in indentation"));
                }
                lines.push(line);
                line_starts.push(start);
                start += line.len() + 1;
            }
        }
        let char_offsets = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();
        Ok(Source {
            text,
            lines,
            line_starts,
            char_offsets,
        })
    }

    /// Zero-based line and byte column of a marker.
    fn locate(&self, marker: &Marker) -> (usize, usize) {
        let offset = self
            .char_offsets
            .get(marker.index())
            .copied()
            .unwrap_or(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        };
        let start = self.line_starts.get(line).copied().unwrap_or(0);
        (line, offset - start)
    }

    fn line_of(&self, marker: &Marker) -> usize {
        self.locate(marker).0
    }
}

fn is_trivia(line: &str) -> bool {
    let text = line.trim();
    text.is_empty() || text.starts_with('#')
}

fn is_marker(line: &str) -> bool {
    line.trim_end() == "---"
}

/// A mapping key whose value has not been read yet.
struct PendingKey {
    key: Key,
    line: usize,
    column: usize,
    /// Byte column where an inline value starts, with the whitespace before it.
    inline: Option<(usize, String)>,
    /// Rest of the key line when the value is not inline.
    rest: String,
}

/// Position of a flow collection on its line.
struct FlowSpan {
    line: usize,
    open: usize,
    /// End of the last item read.
    cursor: usize,
}

enum Frame {
    Mapping {
        mapping: Mapping,
        pending: Option<PendingKey>,
        /// Column of the keys, set by the first one.
        column: Option<usize>,
        flow: Option<FlowSpan>,
        /// Dash column and the whitespace after it when this mapping is a sequence item.
        dash: Option<(usize, String)>,
    },
    Sequence {
        sequence: Sequence,
        /// Column of the dashes, set by the first item.
        column: Option<usize>,
        flow: Option<FlowSpan>,
    },
}

/// What the receiving frame needs to know about a finished node.
enum Finished {
    Scalar { remainder: String },
    Flow { remainder: String },
    BlockMapping { column: usize, dash: Option<(usize, String)> },
    BlockSequence { column: usize },
}

struct TreeBuilder<'s, 'a> {
    source: &'s Source<'a>,
    stack: Vec<Frame>,
    root: Option<Mapping>,
    /// Lines owned by an entry or item, in document order.
    owners: Vec<usize>,
    documents: usize,
    error: Option<AppError>,
}

impl MarkedEventReceiver for TreeBuilder<'_, '_> {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        if self.error.is_some() {
            return;
        }
        if let Err(error) = self.handle(ev, &marker) {
            self.error = Some(error);
        }
    }
}

impl<'s, 'a> TreeBuilder<'s, 'a> {
    fn new(source: &'s Source<'a>) -> Self {
        TreeBuilder {
            source,
            stack: Vec::new(),
            root: None,
            owners: Vec::new(),
            documents: 0,
            error: None,
        }
    }

    fn fail(&self, marker: &Marker, message: impl Into<String>) -> AppError {
        AppError::parse(self.source.line_of(marker) + 1, message)
    }

    fn handle(&mut self, ev: Event, marker: &Marker) -> Result<(), AppError> {
        match ev {
            Event::Nothing | Event::StreamStart | Event::StreamEnd | Event::DocumentEnd => Ok(()),
            Event::DocumentStart => {
                self.documents += 1;
                if self.documents > 1 {
                    return Err(self.fail(marker, "multiple documents are not supported"));
                }
                Ok(())
            }
            Event::Alias(_) => Err(self.fail(marker, "aliases are not supported")),
            Event::Scalar(value, style, anchor, tag) => {
                if anchor != 0 {
                    return Err(self.fail(marker, "anchors are not supported"));
                }
                if tag.is_some() {
                    return Err(self.fail(marker, "tags are not supported"));
                }
                let style = match style {
                    TScalarStyle::Plain => ScalarStyle::Plain,
                    TScalarStyle::SingleQuoted => ScalarStyle::SingleQuoted,
                    TScalarStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
                    _ => return Err(self.fail(marker, "block scalars are not supported")),
                };
                self.scalar(value, style, marker)
            }
            Event::SequenceStart(anchor, tag) | Event::MappingStart(anchor, tag)
                if anchor != 0 || tag.is_some() =>
            {
                Err(self.fail(marker, "anchors and tags are not supported"))
            }
            Event::SequenceStart(..) => self.start_sequence(marker),
            Event::MappingStart(..) => self.start_mapping(marker),
            Event::SequenceEnd | Event::MappingEnd => self.end_collection(marker),
        }
    }

    fn scalar(&mut self, value: String, style: ScalarStyle, marker: &Marker) -> Result<(), AppError> {
        let (line, column) = self.source.locate(marker);
        let depth = self.stack.len();
        match self.stack.last_mut() {
            None => Err(self.fail(marker, "document root must be a mapping")),
            Some(Frame::Mapping { flow: Some(_), .. }) => {
                Err(self.fail(marker, "flow mappings are not supported"))
            }
            Some(Frame::Mapping { pending: None, .. }) => {
                self.key(value, style, line, column, depth)
            }
            Some(Frame::Mapping {
                pending: Some(pending),
                ..
            }) => {
                let Some((start, _)) = pending.inline else {
                    // `key:` with nothing after it; the parser reports an implicit null.
                    if style == ScalarStyle::Plain && (value == "~" || value.is_empty()) {
                        let remainder = String::new();
                        return self.finish(Node::Scalar(Scalar::null()), Finished::Scalar { remainder });
                    }
                    return Err(self.fail(marker, "values must start on the key line"));
                };
                if (line, column) != (pending.line, start) {
                    return Err(self.fail(marker, "unsupported value"));
                }
                let (scalar, remainder) = self.spelled(value, style, line, column)?;
                self.finish(Node::Scalar(scalar), Finished::Scalar { remainder })
            }
            Some(Frame::Sequence {
                sequence,
                flow: Some(span),
                ..
            }) => {
                if line != span.line || column < span.cursor {
                    return Err(AppError::parse(line + 1, "flow collections must fit on one line"));
                }
                let text = &self.source.lines[line][column..];
                let raw = spelling(text, &value, style).ok_or_else(|| {
                    AppError::parse(line + 1, "multi-line scalars are not supported")
                })?;
                span.cursor = column + raw.len();
                sequence.push_item(Item::new(Scalar::parsed(raw, value, style)));
                Ok(())
            }
            Some(Frame::Sequence { .. }) => {
                let (dash_column, gap) = self.dash_gap(line, column).ok_or_else(|| {
                    AppError::parse(line + 1, "sequence items must start on the dash line")
                })?;
                let (scalar, remainder) = self.spelled(value, style, line, column)?;
                self.owners.push(line);
                let trivia = Trivia {
                    comment: non_empty(remainder),
                    after: Vec::new(),
                };
                if let Some(Frame::Sequence {
                    sequence, column, ..
                }) = self.stack.last_mut()
                {
                    column.get_or_insert(dash_column);
                    sequence.push_item(Item::parsed(Node::Scalar(scalar), trivia, gap));
                }
                Ok(())
            }
        }
    }

    /// A mapping key at `line`/`column`. `depth` is the stack size, 1 for the root mapping.
    fn key(
        &mut self,
        value: String,
        style: ScalarStyle,
        line: usize,
        column: usize,
        depth: usize,
    ) -> Result<(), AppError> {
        let number = line + 1;
        let text = self.source.lines[line];
        let is_item = depth > 1
            && matches!(self.stack.get(depth - 2), Some(Frame::Sequence { flow: None, .. }));
        let first = matches!(
            self.stack.last(),
            Some(Frame::Mapping { mapping, .. }) if mapping.is_empty()
        );

        let dash = if is_item && first {
            Some(self.dash_gap(line, column).ok_or_else(|| {
                AppError::parse(number, "sequence items must start on the dash line")
            })?)
        } else if text[..column].trim_start_matches(' ').is_empty() {
            None
        } else {
            return Err(AppError::parse(number, "unsupported mapping key"));
        };
        if depth == 1 && column != 0 {
            return Err(AppError::parse(number, "document root must start at column 0"));
        }
        if value.is_empty() && style == ScalarStyle::Plain {
            return Err(AppError::parse(number, "empty mapping key"));
        }

        let raw = spelling(&text[column..], &value, style)
            .ok_or_else(|| AppError::parse(number, "multi-line keys are not supported"))?;
        let after_key = &text[column + raw.len()..];
        let spaces = after_key.len() - after_key.trim_start_matches(' ').len();
        if !after_key[spaces..].starts_with(':') {
            return Err(AppError::parse(number, "expected ':' after mapping key"));
        }
        let key_end = column + raw.len() + spaces;
        let rest = &text[key_end + 1..];
        let value_text = rest.trim_start();
        let inline = if value_text.is_empty() || value_text.starts_with('#') {
            None
        } else {
            let gap = &rest[..rest.len() - value_text.len()];
            Some((key_end + 1 + gap.len(), gap.to_string()))
        };

        let Some(Frame::Mapping {
            mapping,
            pending,
            column: key_column,
            dash: item_dash,
            ..
        }) = self.stack.last_mut()
        else {
            return Err(AppError::parse(number, "mapping key outside a mapping"));
        };
        if mapping.contains_key(&value) {
            return Err(AppError::parse(number, format!("duplicate key '{}'", value)));
        }
        key_column.get_or_insert(column);
        if dash.is_some() {
            *item_dash = dash;
        }
        *pending = Some(PendingKey {
            key: Key::from_source(&text[column..key_end], value),
            line,
            column,
            rest: if inline.is_none() { rest.to_string() } else { String::new() },
            inline,
        });
        self.owners.push(line);
        Ok(())
    }

    /// Scalar spelled at `line`/`column` and the rest of that line.
    fn spelled(
        &self,
        value: String,
        style: ScalarStyle,
        line: usize,
        column: usize,
    ) -> Result<(Scalar, String), AppError> {
        let text = &self.source.lines[line][column..];
        let raw = spelling(text, &value, style)
            .ok_or_else(|| AppError::parse(line + 1, "multi-line scalars are not supported"))?;
        let remainder = &text[raw.len()..];
        check_remainder(remainder, line)?;
        Ok((Scalar::parsed(raw, value, style), remainder.to_string()))
    }

    /// Dash column and gap when `line` reads `<spaces>-<whitespace>` up to `column`.
    fn dash_gap(&self, line: usize, column: usize) -> Option<(usize, String)> {
        let prefix = &self.source.lines[line][..column];
        let dash_column = prefix.len() - prefix.trim_start_matches(' ').len();
        let gap = prefix[dash_column..].strip_prefix('-')?;
        (!gap.is_empty() && gap.trim().is_empty()).then(|| (dash_column, gap.to_string()))
    }

    /// Span of the pending key's value when it is an inline flow collection opened by `open`,
    /// `None` when the value is a block collection on the following lines.
    fn pending_flow(&self, marker: &Marker, open: char) -> Result<Option<FlowSpan>, AppError> {
        let Some(Frame::Mapping {
            pending: Some(pending),
            ..
        }) = self.stack.last()
        else {
            return Err(self.fail(marker, "complex mapping keys are not supported"));
        };
        match pending.inline {
            None => Ok(None),
            Some((start, _)) if self.source.lines[pending.line][start..].starts_with(open) => {
                Ok(Some(FlowSpan {
                    line: pending.line,
                    open: start,
                    cursor: start + 1,
                }))
            }
            Some(_) => Err(AppError::parse(pending.line + 1, "unsupported value")),
        }
    }

    fn start_sequence(&mut self, marker: &Marker) -> Result<(), AppError> {
        let flow = match self.stack.last() {
            None => return Err(self.fail(marker, "document root must be a mapping")),
            Some(Frame::Sequence { .. }) => {
                return Err(self.fail(marker, "nested sequences are not supported"))
            }
            Some(Frame::Mapping { .. }) => self.pending_flow(marker, '[')?,
        };
        self.stack.push(Frame::Sequence {
            sequence: Sequence::new(),
            column: None,
            flow,
        });
        Ok(())
    }

    fn start_mapping(&mut self, marker: &Marker) -> Result<(), AppError> {
        let flow = match self.stack.last() {
            None => None,
            Some(Frame::Sequence { flow: Some(_), .. }) => {
                return Err(self.fail(marker, "flow mappings are not supported"))
            }
            Some(Frame::Sequence { .. }) => None,
            Some(Frame::Mapping { .. }) => self.pending_flow(marker, '{')?,
        };
        self.stack.push(Frame::Mapping {
            mapping: Mapping::new(),
            pending: None,
            column: None,
            flow,
            dash: None,
        });
        Ok(())
    }

    fn end_collection(&mut self, marker: &Marker) -> Result<(), AppError> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| self.fail(marker, "unbalanced collection"))?;
        match frame {
            Frame::Mapping {
                mut mapping,
                flow: Some(span),
                ..
            } => {
                let (raw, remainder) = self.close_flow(&span, '}')?;
                mapping.raw = Some(raw);
                self.finish(Node::Mapping(mapping), Finished::Flow { remainder })
            }
            Frame::Mapping {
                pending: Some(pending),
                ..
            } => Err(AppError::parse(
                pending.line + 1,
                format!("missing value for key '{}'", pending.key.name()),
            )),
            Frame::Mapping {
                mapping,
                column,
                dash,
                ..
            } => {
                let column = column
                    .ok_or_else(|| self.fail(marker, "empty mappings must be written as 'key: {}'"))?;
                self.finish(Node::Mapping(mapping), Finished::BlockMapping { column, dash })
            }
            Frame::Sequence {
                mut sequence,
                flow: Some(span),
                ..
            } => {
                let (raw, remainder) = self.close_flow(&span, ']')?;
                sequence.style = SequenceStyle::Flow;
                sequence.raw = Some(raw);
                self.finish(Node::Sequence(sequence), Finished::Flow { remainder })
            }
            Frame::Sequence {
                sequence, column, ..
            } => {
                let column = column.ok_or_else(|| self.fail(marker, "empty block sequence"))?;
                self.finish(Node::Sequence(sequence), Finished::BlockSequence { column })
            }
        }
    }

    /// Source spelling of a single-line flow collection and the rest of its line.
    fn close_flow(&self, span: &FlowSpan, close: char) -> Result<(String, String), AppError> {
        let text = self.source.lines[span.line];
        let tail = text[span.cursor..].trim_start();
        let tail = tail.strip_prefix(',').map(str::trim_start).unwrap_or(tail);
        if !tail.starts_with(close) {
            return Err(AppError::parse(
                span.line + 1,
                "flow collections must fit on one line",
            ));
        }
        let end = text.len() - tail.len() + close.len_utf8();
        let remainder = &text[end..];
        check_remainder(remainder, span.line)?;
        Ok((text[span.open..end].to_string(), remainder.to_string()))
    }

    /// Hand a finished node to the frame below it.
    fn finish(&mut self, mut node: Node, finished: Finished) -> Result<(), AppError> {
        match self.stack.last_mut() {
            None => match node {
                Node::Mapping(mapping) => {
                    self.root = Some(mapping);
                    Ok(())
                }
                _ => Err(AppError::parse(1, "document root must be a mapping")),
            },
            Some(Frame::Mapping {
                mapping, pending, ..
            }) => {
                let Some(pending) = pending.take() else {
                    return Err(AppError::parse(1, "complex mapping keys are not supported"));
                };
                let remainder = match finished {
                    Finished::Scalar { remainder } | Finished::Flow { remainder }
                        if pending.inline.is_some() =>
                    {
                        remainder
                    }
                    Finished::BlockMapping { column, .. } => {
                        if let Node::Mapping(child) = &mut node {
                            child.indent = Some(column.saturating_sub(pending.column));
                        }
                        pending.rest
                    }
                    Finished::BlockSequence { column } => {
                        if let Node::Sequence(child) = &mut node {
                            child.indent = Some(column.saturating_sub(pending.column));
                        }
                        pending.rest
                    }
                    _ => pending.rest,
                };
                let trivia = Trivia {
                    comment: non_empty(remainder),
                    after: Vec::new(),
                };
                let gap = pending.inline.map(|(_, gap)| gap);
                mapping.push_entry(Entry::parsed(pending.key, node, trivia, gap));
                Ok(())
            }
            Some(Frame::Sequence {
                sequence, column, ..
            }) => match finished {
                Finished::BlockMapping {
                    dash: Some((dash_column, gap)),
                    ..
                } => {
                    column.get_or_insert(dash_column);
                    sequence.push_item(Item::parsed(node, Trivia::default(), gap));
                    Ok(())
                }
                _ => Err(AppError::parse(1, "unsupported sequence item")),
            },
        }
    }
}

/// Exact source spelling of a single-line scalar at the start of `text`.
fn spelling<'t>(text: &'t str, value: &str, style: ScalarStyle) -> Option<&'t str> {
    match style {
        ScalarStyle::Plain => text.starts_with(value).then(|| &text[..value.len()]),
        ScalarStyle::SingleQuoted => {
            let raw = format!("'{}'", value.replace('\'', "''"));
            text.starts_with(&raw).then(|| &text[..raw.len()])
        }
        ScalarStyle::DoubleQuoted => {
            let mut escaped = false;
            for (index, ch) in text.char_indices().skip(1) {
                match ch {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => return Some(&text[..=index]),
                    _ => {}
                }
            }
            None
        }
    }
}

/// Whatever follows a value on its line must be whitespace or a comment.
fn check_remainder(remainder: &str, line: usize) -> Result<(), AppError> {
    let rest = remainder.trim_start();
    if rest.is_empty() || (rest.starts_with('#') && rest.len() < remainder.len()) {
        Ok(())
    } else {
        Err(AppError::parse(line + 1, format!("unexpected content '{}'", rest)))
    }
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}

/// Assigns comment and blank lines to their owners and records the nesting layout.
struct TriviaWalker<'w, 'a> {
    lines: &'w [&'a str],
    owners: &'w [usize],
    next: usize,
    mapping_indent: Option<usize>,
    sequence_offset: Option<usize>,
}

impl TriviaWalker<'_, '_> {
    fn head(&self) -> Result<Vec<TriviaLine>, AppError> {
        let end = self.owners.first().copied().unwrap_or(self.lines.len());
        self.lines[..end]
            .iter()
            .enumerate()
            .map(|(index, line)| {
                if is_trivia(line) || is_marker(line) {
                    Ok(TriviaLine::raw(line))
                } else {
                    Err(unexpected(index, line))
                }
            })
            .collect()
    }

    /// Lines between the next owner and the one after it.
    fn take(&mut self) -> Result<Vec<TriviaLine>, AppError> {
        let start = self.owners.get(self.next).map_or(self.lines.len(), |line| line + 1);
        self.next += 1;
        let end = self.owners.get(self.next).copied().unwrap_or(self.lines.len());
        let mut after = Vec::new();
        for index in start..end.max(start) {
            let line = self.lines[index];
            if !is_trivia(line) {
                return Err(unexpected(index, line));
            }
            after.push(TriviaLine::raw(line));
        }
        Ok(after)
    }

    fn mapping(&mut self, mapping: &mut Mapping) -> Result<(), AppError> {
        for entry in mapping.entries_mut() {
            entry.trivia.after = self.take()?;
            match &mut entry.node {
                Node::Mapping(child) if !child.is_empty() => {
                    if let Some(indent) = child.indent {
                        self.mapping_indent.get_or_insert(indent);
                    }
                    self.mapping(child)?;
                }
                Node::Sequence(sequence) if sequence.style() == SequenceStyle::Block => {
                    if let Some(offset) = sequence.indent {
                        self.sequence_offset.get_or_insert(offset);
                    }
                    self.sequence(sequence)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn sequence(&mut self, sequence: &mut Sequence) -> Result<(), AppError> {
        for item in sequence.items_mut() {
            match &mut item.node {
                Node::Mapping(mapping) => self.mapping(mapping)?,
                _ => item.trivia.after = self.take()?,
            }
        }
        Ok(())
    }
}

fn unexpected(index: usize, line: &str) -> AppError {
    AppError::parse(index + 1, format!("unexpected content '{}'", line.trim()))
}
