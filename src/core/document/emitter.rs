use super::{Document, Item, Layout, Mapping, Node, SequenceStyle, Sequence, Trivia};

/// Render a document. Collections read from source keep their own indentation; collections
/// created by transforms use `layout`.
pub fn serialize(doc: &Document, layout: &Layout) -> String {
    let mut out = String::new();
    for line in doc.head() {
        out.push_str(line.as_str());
        out.push('\n');
    }
    let emitter = Emitter { layout };
    emitter.mapping(&mut out, doc.root(), 0, false);
    if !doc.ends_with_newline() && out.ends_with('\n') {
        out.pop();
    }
    out
}

struct Emitter<'a> {
    layout: &'a Layout,
}

impl Emitter<'_> {
    /// With `inline_first` the first key continues a `- ` already written by the caller.
    fn mapping(&self, out: &mut String, mapping: &Mapping, column: usize, inline_first: bool) {
        for (index, entry) in mapping.entries().iter().enumerate() {
            if index > 0 || !inline_first {
                indent(out, column);
            }
            out.push_str(entry.key_raw());
            out.push(':');
            let gap = entry.gap.as_deref().unwrap_or(" ");
            match &entry.node {
                Node::Scalar(scalar) => {
                    if !scalar.raw().is_empty() {
                        out.push_str(gap);
                        out.push_str(scalar.raw());
                    }
                    end_line(out, &entry.trivia);
                }
                Node::Mapping(child) if child.is_empty() => {
                    out.push_str(gap);
                    out.push_str(child.raw.as_deref().unwrap_or("{}"));
                    end_line(out, &entry.trivia);
                }
                Node::Mapping(child) => {
                    end_line(out, &entry.trivia);
                    let step = child.indent.unwrap_or(self.layout.mapping_indent);
                    self.mapping(out, child, column + step, false);
                }
                Node::Sequence(sequence)
                    if sequence.is_empty() || sequence.style() == SequenceStyle::Flow =>
                {
                    out.push_str(gap);
                    flow_sequence(out, sequence);
                    end_line(out, &entry.trivia);
                }
                Node::Sequence(sequence) => {
                    end_line(out, &entry.trivia);
                    let step = sequence.indent.unwrap_or(self.layout.sequence_offset);
                    self.sequence(out, sequence, column + step);
                }
            }
        }
    }

    fn sequence(&self, out: &mut String, sequence: &Sequence, column: usize) {
        for item in sequence.items() {
            indent(out, column);
            let gap = item.gap.as_deref().unwrap_or(" ");
            out.push('-');
            out.push_str(gap);
            self.item(out, item, column + 1 + gap.len());
        }
    }

    /// `content` is the column right after the item's dash and gap.
    fn item(&self, out: &mut String, item: &Item, content: usize) {
        match &item.node {
            Node::Mapping(mapping) if !mapping.is_empty() => {
                self.mapping(out, mapping, content, true);
                for line in &item.trivia.after {
                    out.push_str(line.as_str());
                    out.push('\n');
                }
            }
            node => {
                flow_node(out, node);
                end_line(out, &item.trivia);
            }
        }
    }
}

fn indent(out: &mut String, column: usize) {
    out.extend(std::iter::repeat(' ').take(column));
}

fn end_line(out: &mut String, trivia: &Trivia) {
    if let Some(comment) = &trivia.comment {
        out.push_str(comment);
    }
    out.push('\n');
    for line in &trivia.after {
        out.push_str(line.as_str());
        out.push('\n');
    }
}

/// Single-line rendering, used for flow collections and values nested too deep for block form.
fn flow_node(out: &mut String, node: &Node) {
    match node {
        Node::Scalar(scalar) if scalar.raw().is_empty() => out.push('~'),
        Node::Scalar(scalar) => out.push_str(scalar.raw()),
        Node::Sequence(sequence) => flow_sequence(out, sequence),
        Node::Mapping(mapping) if mapping.is_empty() => {
            out.push_str(mapping.raw.as_deref().unwrap_or("{}"))
        }
        Node::Mapping(mapping) => {
            out.push('{');
            for (index, entry) in mapping.entries().iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                out.push_str(entry.key_raw());
                out.push_str(": ");
                flow_node(out, &entry.node);
            }
            out.push('}');
        }
    }
}

/// Source spelling while unchanged, `[a, b]` otherwise.
fn flow_sequence(out: &mut String, sequence: &Sequence) {
    if let Some(raw) = &sequence.raw {
        out.push_str(raw);
        return;
    }
    out.push('[');
    for (index, node) in sequence.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        flow_node(out, node);
    }
    out.push(']');
}
