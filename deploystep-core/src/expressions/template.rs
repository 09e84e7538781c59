use std::sync::LazyLock;

use regex::Regex;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_\.\-]*$").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Variable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }
}

/// Split `input` into literal text and `${name}` placeholders.
pub fn parse_template(input: &str) -> Result<Template, TemplateError> {
    let mut segments = Vec::new();
    let mut buf = String::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            buf.push(ch);
            continue;
        }
        chars.next();

        let mut inner = String::new();
        let mut found = false;
        for n in chars.by_ref() {
            if n == '}' {
                found = true;
                break;
            }
            inner.push(n);
        }
        if !found {
            return Err(TemplateError::Unclosed);
        }

        let name = inner.trim();
        if !NAME_RE.is_match(name) {
            return Err(TemplateError::InvalidName(name.to_string()));
        }
        if !buf.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut buf)));
        }
        segments.push(Segment::Variable(name.to_string()));
    }

    if !buf.is_empty() {
        segments.push(Segment::Literal(buf));
    }

    Ok(Template { segments })
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unclosed placeholder (missing '}}')")]
    Unclosed,
    #[error("invalid placeholder name: '{0}'")]
    InvalidName(String),
}
