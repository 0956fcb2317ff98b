use std::fmt::Write as _;
use yaml_rust2::Yaml;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
}

/// Leaf value that keeps its source spelling so untouched scalars serialize byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    raw: String,
    text: String,
    style: ScalarStyle,
}

impl Scalar {
    pub fn null() -> Self {
        Scalar {
            raw: String::new(),
            text: String::new(),
            style: ScalarStyle::Plain,
        }
    }

    /// String scalar, plain when that reads back as the same string, quoted otherwise.
    pub fn string(value: impl Into<String>) -> Self {
        let value = value.into();
        if is_plain_safe(&value) {
            Scalar {
                raw: value.clone(),
                text: value,
                style: ScalarStyle::Plain,
            }
        } else if value.chars().any(char::is_control) {
            Scalar::double_quoted(value)
        } else {
            Scalar::single_quoted(value)
        }
    }

    pub fn single_quoted(value: impl Into<String>) -> Self {
        let value = value.into();
        Scalar {
            raw: format!("'{}'", value.replace('\'', "''")),
            text: value,
            style: ScalarStyle::SingleQuoted,
        }
    }

    pub fn double_quoted(value: impl Into<String>) -> Self {
        let value = value.into();
        let mut raw = String::with_capacity(value.len() + 2);
        raw.push('"');
        for ch in value.chars() {
            match ch {
                '"' => raw.push_str("\\\""),
                '\\' => raw.push_str("\\\\"),
                '\n' => raw.push_str("\\n"),
                '\t' => raw.push_str("\\t"),
                '\r' => raw.push_str("\\r"),
                c if c.is_control() => {
                    let _ = write!(raw, "\\u{:04X}", c as u32);
                }
                c => raw.push(c),
            }
        }
        raw.push('"');
        Scalar {
            raw,
            text: value,
            style: ScalarStyle::DoubleQuoted,
        }
    }

    pub fn int(value: i64) -> Self {
        let raw = value.to_string();
        Scalar {
            text: raw.clone(),
            raw,
            style: ScalarStyle::Plain,
        }
    }

    pub fn bool(value: bool) -> Self {
        let raw = value.to_string();
        Scalar {
            text: raw.clone(),
            raw,
            style: ScalarStyle::Plain,
        }
    }

    /// Scalar read by the parser: `text` is the decoded value, `raw` its exact source spelling.
    pub(crate) fn parsed(raw: &str, text: String, style: ScalarStyle) -> Self {
        Scalar {
            raw: raw.to_string(),
            text,
            style,
        }
    }

    /// Source spelling, including quotes.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Decoded string content.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> ScalarStyle {
        self.style
    }

    pub fn is_null(&self) -> bool {
        self.style == ScalarStyle::Plain && is_null_spelling(&self.text)
    }
}

fn is_null_spelling(text: &str) -> bool {
    matches!(text, "" | "~" | "null" | "Null" | "NULL")
}

/// Whether `value` written plain reads back as the same string under the core schema.
fn is_plain_safe(value: &str) -> bool {
    let Some(first) = value.chars().next() else {
        return false;
    };
    if value.trim() != value || value.chars().any(char::is_control) {
        return false;
    }
    let second = value.chars().nth(1);
    match first {
        '-' | '?' | ':' => {
            if second.is_none() || second == Some(' ') {
                return false;
            }
        }
        ',' | '[' | ']' | '{' | '}' | '#' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%'
        | '@' | '`' => return false,
        _ => {}
    }
    if value.contains(": ") || value.contains(" #") || value.ends_with(':') {
        return false;
    }
    if is_null_spelling(value)
        || matches!(value, "True" | "TRUE" | "False" | "FALSE")
        || matches!(value, ".Inf" | ".INF" | "+.Inf" | "+.INF" | "-.Inf" | "-.INF" | ".NaN" | ".NAN")
    {
        return false;
    }
    matches!(Yaml::from_str(value), Yaml::String(_))
}
