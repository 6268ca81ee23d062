//! Line preprocessing.
//!
//! Each source line is lower-cased, stripped of its `;` comment, and
//! classified as blank, a label definition, or code. A label may share a line
//! with the instruction it names (`loop: addi x1, x1, 1`).

/// Classification of one preprocessed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    /// Empty or comment-only.
    Blank,
    /// `name:` on its own.
    Label {
        /// Label name.
        name: String,
    },
    /// An instruction, optionally preceded by a label on the same line.
    Code {
        /// Label defined on this line, if any.
        label: Option<String>,
        /// Normalized instruction text.
        text: String,
    },
}

/// A source line after preprocessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// 1-based line number in the input.
    pub number: usize,
    /// The line as written, for error fragments and listings.
    pub original: String,
    /// Classification.
    pub kind: LineKind,
}

impl SourceLine {
    /// Returns `true` when the line will be encoded into a word.
    #[must_use]
    pub const fn is_code(&self) -> bool {
        matches!(self.kind, LineKind::Code { .. })
    }
}

/// Preprocesses every input line in order.
#[must_use]
pub fn preprocess<S: AsRef<str>>(lines: &[S]) -> Vec<SourceLine> {
    lines
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let original = line.as_ref();
            SourceLine {
                number: idx + 1,
                original: original.to_string(),
                kind: classify_line(original),
            }
        })
        .collect()
}

/// Splits multi-line source text into lines.
#[must_use]
pub fn split_source(source: &str) -> Vec<&str> {
    source.lines().collect()
}

fn classify_line(line: &str) -> LineKind {
    let lowered = strip_comment(line).to_ascii_lowercase();
    let trimmed = lowered.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }

    match split_label(trimmed) {
        Some((name, "")) => LineKind::Label { name },
        Some((name, rest)) => LineKind::Code {
            label: Some(name),
            text: rest.to_string(),
        },
        None => LineKind::Code {
            label: None,
            text: trimmed.to_string(),
        },
    }
}

fn strip_comment(line: &str) -> &str {
    line.find(';').map_or(line, |pos| &line[..pos])
}

fn split_label(text: &str) -> Option<(String, &str)> {
    let colon_pos = text.find(':')?;
    let label = text[..colon_pos].trim();
    is_valid_label(label).then(|| (label.to_string(), text[colon_pos + 1..].trim()))
}

/// Returns `true` for names matching `[a-z_][a-z0-9_]*`.
#[must_use]
pub fn is_valid_label(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_lowercase() && first != '_' {
        return false;
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{is_valid_label, preprocess, LineKind};

    fn kinds(lines: &[&str]) -> Vec<LineKind> {
        preprocess(lines).into_iter().map(|line| line.kind).collect()
    }

    #[test]
    fn classifies_blank_comment_label_and_code() {
        assert_eq!(
            kinds(&["", "   ; just a comment", "Loop:", "  ADDI x1, x1, 1 ; bump"]),
            vec![
                LineKind::Blank,
                LineKind::Blank,
                LineKind::Label {
                    name: "loop".into()
                },
                LineKind::Code {
                    label: None,
                    text: "addi x1, x1, 1".into()
                },
            ]
        );
    }

    #[test]
    fn label_and_instruction_may_share_a_line() {
        assert_eq!(
            kinds(&["start: jal x0, start"]),
            vec![LineKind::Code {
                label: Some("start".into()),
                text: "jal x0, start".into()
            }]
        );
    }

    #[test]
    fn keeps_original_text_and_one_based_numbers() {
        let lines = preprocess(&["", "  Add x1, x2, x3"]);
        assert_eq!(lines[1].number, 2);
        assert_eq!(lines[1].original, "  Add x1, x2, x3");
        assert!(lines[1].is_code());
        assert!(!lines[0].is_code());
    }

    #[test]
    fn malformed_label_prefix_is_left_as_code() {
        assert_eq!(
            kinds(&["9lives:"]),
            vec![LineKind::Code {
                label: None,
                text: "9lives:".into()
            }]
        );
    }

    #[rstest]
    #[case("loop", true)]
    #[case("_start", true)]
    #[case("end_2", true)]
    #[case("", false)]
    #[case("2nd", false)]
    #[case("has space", false)]
    #[case("dash-ed", false)]
    fn label_grammar(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(is_valid_label(name), valid);
    }
}
