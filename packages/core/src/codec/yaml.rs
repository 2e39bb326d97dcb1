//! Authorable-dialect emitter
//!
//! Writes a document object as block-style YAML with fixed formatting:
//! two-space indentation, double-quoted strings, literal block scalars for
//! multi-line mapping values, no anchors or aliases, and long strings folded
//! at single spaces to stay within the configured line width.
//!
//! Parsing goes through `serde_yaml`, which resolves any anchors/aliases in
//! the input to inline copies; this emitter never produces them. Output does
//! not use `serde_yaml::to_string` because it has no knobs for quoting style
//! or line width.

use serde_json::{Map, Value};

const INDENT: usize = 2;

/// Keys that a YAML 1.1 reader would resolve to something other than a string
const RESERVED_WORDS: &[&str] = &["true", "false", "yes", "no", "on", "off", "null", "y", "n"];

pub(crate) fn emit(value: &Value, line_width: usize) -> String {
    let mut emitter = YamlEmitter {
        out: String::new(),
        line_width,
    };

    match value {
        Value::Object(map) if !map.is_empty() => emitter.write_mapping(map, 0, false),
        Value::Array(items) if !items.is_empty() => emitter.write_sequence(items, 0, false),
        other => {
            let text = emitter.inline_value(other, 0, INDENT);
            emitter.out.push_str(&text);
            emitter.out.push('\n');
        }
    }

    emitter.out
}

struct YamlEmitter {
    out: String,
    line_width: usize,
}

impl YamlEmitter {
    /// Write a non-empty mapping whose keys start at column `indent`.
    /// With `inline_first`, the first key continues a line already started
    /// by a sequence dash.
    fn write_mapping(&mut self, map: &Map<String, Value>, indent: usize, inline_first: bool) {
        for (i, (key, value)) in map.iter().enumerate() {
            if i > 0 || !inline_first {
                self.pad(indent);
            }
            let key_text = format_key(key);
            self.out.push_str(&key_text);
            self.out.push(':');

            match value {
                Value::Object(child) if !child.is_empty() => {
                    self.out.push('\n');
                    self.write_mapping(child, indent + INDENT, false);
                }
                Value::Array(items) if !items.is_empty() => {
                    self.out.push('\n');
                    self.write_sequence(items, indent + INDENT, false);
                }
                Value::String(s) if is_block_candidate(s) => {
                    self.write_literal_block(s, indent + INDENT);
                }
                other => {
                    let column = indent + key_text.chars().count() + 2;
                    let text = self.inline_value(other, column, indent + INDENT);
                    self.out.push(' ');
                    self.out.push_str(&text);
                    self.out.push('\n');
                }
            }
        }
    }

    fn write_sequence(&mut self, items: &[Value], indent: usize, inline_first: bool) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 || !inline_first {
                self.pad(indent);
            }
            self.out.push_str("- ");

            match item {
                Value::Object(child) if !child.is_empty() => {
                    self.write_mapping(child, indent + INDENT, true);
                }
                Value::Array(nested) if !nested.is_empty() => {
                    self.write_sequence(nested, indent + INDENT, true);
                }
                other => {
                    let text = self.inline_value(other, indent + INDENT, indent + INDENT);
                    self.out.push_str(&text);
                    self.out.push('\n');
                }
            }
        }
    }

    /// `|`, `|-` or `|+` literal block; chomping mirrors the trailing newlines
    fn write_literal_block(&mut self, s: &str, indent: usize) {
        let body = s.trim_end_matches('\n');
        let trailing = s.len() - body.len();
        let indicator = match trailing {
            0 => "|-",
            1 => "|",
            _ => "|+",
        };

        self.out.push(' ');
        self.out.push_str(indicator);
        self.out.push('\n');
        for line in body.split('\n') {
            if !line.is_empty() {
                self.pad(indent);
                self.out.push_str(line);
            }
            self.out.push('\n');
        }
        for _ in 1..trailing {
            self.out.push('\n');
        }
    }

    /// Render a value that fits on the current line (scalars, `{}`, `[]`).
    /// `column` is where the text starts; continuation lines of a folded
    /// string are indented to `continuation`.
    fn inline_value(&self, value: &Value, column: usize, continuation: usize) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => self.double_quoted(s, column, continuation),
            Value::Array(_) => "[]".to_string(),
            Value::Object(_) => "{}".to_string(),
        }
    }

    fn double_quoted(&self, s: &str, column: usize, continuation: usize) -> String {
        let words = escaped_words(s);
        let total: usize = words.iter().map(|w| w.chars().count() + 1).sum::<usize>() + 1;
        if column + total <= self.line_width || words.len() < 2 {
            return format!("\"{}\"", words.join(" "));
        }

        // Greedy fill. Each break replaces exactly one space between two
        // non-space characters, which a YAML reader folds back into a space.
        let mut lines: Vec<String> = Vec::new();
        let mut line = String::new();
        let mut width = column + 1;
        for word in words {
            let len = word.chars().count();
            // one column stays reserved for the closing quote
            if !line.is_empty() && width + 1 + len + 1 > self.line_width {
                lines.push(std::mem::take(&mut line));
                width = continuation;
            } else if !line.is_empty() {
                line.push(' ');
                width += 1;
            }
            line.push_str(&word);
            width += len;
        }
        lines.push(line);

        let separator = format!("\n{}", " ".repeat(continuation));
        format!("\"{}\"", lines.join(&separator))
    }

    fn pad(&mut self, indent: usize) {
        self.out.extend(std::iter::repeat(' ').take(indent));
    }
}

/// Split a string into escaped chunks separated by foldable single spaces
fn escaped_words(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        let foldable = c == ' '
            && i > 0
            && i + 1 < chars.len()
            && !is_blank(chars[i - 1])
            && !is_blank(chars[i + 1]);
        if foldable {
            words.push(std::mem::take(&mut current));
        } else {
            escape_into(c, &mut current);
        }
    }
    words.push(current);
    words
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn escape_into(c: char, out: &mut String) {
    match c {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        '\0' => out.push_str("\\0"),
        '\u{85}' => out.push_str("\\N"),
        '\u{2028}' => out.push_str("\\L"),
        '\u{2029}' => out.push_str("\\P"),
        '\u{feff}' => out.push_str("\\uFEFF"),
        c if (c as u32) < 0x20 || c as u32 == 0x7f => {
            out.push_str(&format!("\\x{:02X}", c as u32));
        }
        c => out.push(c),
    }
}

/// Multi-line strings that round-trip exactly through a literal block
fn is_block_candidate(s: &str) -> bool {
    if !s.contains('\n') {
        return false;
    }
    let starts_cleanly = !matches!(s.chars().next(), Some(' ' | '\t' | '\n'));
    starts_cleanly
        && s.chars().all(|c| {
            c == '\n'
                || c == '\t'
                || !(c.is_control() || matches!(c, '\u{2028}' | '\u{2029}' | '\u{feff}'))
        })
}

fn format_key(key: &str) -> String {
    let plain = key
        .chars()
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && !RESERVED_WORDS.contains(&key.to_ascii_lowercase().as_str());

    if plain {
        key.to_string()
    } else {
        let mut quoted = String::with_capacity(key.len() + 2);
        quoted.push('"');
        for c in key.chars() {
            escape_into(c, &mut quoted);
        }
        quoted.push('"');
        quoted
    }
}
