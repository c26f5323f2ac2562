//! Directive-level view of a merged profile.
//!
//! Profiles are line oriented: one directive per line, `#`/`;` comments, and
//! `<tag>`…`</tag>` inline blocks holding embedded file content.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::error::MergeError;
use crate::limits::MergeLimits;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Directive {
    pub name: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: unterminated quoted string")]
    UnterminatedQuote { line: usize },
    #[error("line {line}: inline block <{tag}> is never closed")]
    UnterminatedInline { line: usize, tag: String },
    #[error("line {line}: unexpected </{tag}>")]
    UnexpectedClose { line: usize, tag: String },
    #[error(transparent)]
    Limit(#[from] MergeError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionList {
    directives: Vec<Directive>,
}

impl OptionList {
    /// Strictly parses `content`, charging every directive against `limits`.
    pub fn parse(content: &str, limits: &MergeLimits) -> Result<Self, ParseError> {
        limits.check_profile_size(content.len())?;
        let mut budget = limits.budget();
        let mut directives = Vec::new();
        let mut lines = content.lines().enumerate().map(|(idx, line)| (idx + 1, line));

        while let Some((line_no, raw)) = lines.next() {
            limits.check_line("profile", line_no, raw)?;
            let trimmed = raw.trim();
            if trimmed.is_empty() || is_comment(trimmed) {
                continue;
            }
            if let Some(tag) = closing_tag(trimmed) {
                return Err(ParseError::UnexpectedClose {
                    line: line_no,
                    tag: tag.to_string(),
                });
            }
            if let Some(tag) = opening_tag(trimmed) {
                let mut body = String::new();
                let mut closed = false;
                for (inner_no, inner) in lines.by_ref() {
                    limits.check_line("profile", inner_no, inner)?;
                    if closing_tag(inner.trim()) == Some(tag) {
                        closed = true;
                        break;
                    }
                    body.push_str(inner);
                    body.push('\n');
                }
                if !closed {
                    return Err(ParseError::UnterminatedInline {
                        line: line_no,
                        tag: tag.to_string(),
                    });
                }
                budget.add_directive(tag, [body.as_str()])?;
                directives.push(Directive {
                    name: tag.to_string(),
                    args: Vec::new(),
                    inline: Some(body),
                    line: line_no,
                });
                continue;
            }

            let mut terms = tokenize(trimmed, line_no, true)?;
            if terms.is_empty() {
                continue;
            }
            let name = terms.remove(0);
            budget.add_directive(&name, terms.iter().map(String::as_str))?;
            directives.push(Directive {
                name,
                args: terms,
                inline: None,
                line: line_no,
            });
        }

        Ok(Self { directives })
    }

    #[must_use]
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Directive> {
        self.directives.iter().find(|d| d.name == name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Groups directives by name in profile order; inline blocks become
    /// strings, plain directives argument arrays.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut grouped: IndexMap<&str, Vec<Value>> = IndexMap::new();
        for directive in &self.directives {
            let value = match &directive.inline {
                Some(body) => Value::String(body.clone()),
                None => Value::Array(
                    directive
                        .args
                        .iter()
                        .map(|arg| Value::String(arg.clone()))
                        .collect(),
                ),
            };
            grouped.entry(directive.name.as_str()).or_default().push(value);
        }
        serde_json::to_value(grouped).unwrap_or(Value::Null)
    }
}

/// Splits a directive line into terms, closing any dangling quote at the end
/// of the line instead of failing.
#[must_use]
pub fn split_terms_lenient(line: &str) -> Vec<String> {
    tokenize(line, 0, false).unwrap_or_default()
}

#[must_use]
pub fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with('#') || trimmed.starts_with(';')
}

/// Returns the tag of an inline block opener such as `<ca>`.
#[must_use]
pub fn opening_tag(trimmed: &str) -> Option<&str> {
    let tag = trimmed.strip_prefix('<')?.strip_suffix('>')?;
    if tag.is_empty() || tag.starts_with('/') || tag.contains(char::is_whitespace) {
        return None;
    }
    Some(tag)
}

#[must_use]
pub fn closing_tag(trimmed: &str) -> Option<&str> {
    let tag = trimmed.strip_prefix("</")?.strip_suffix('>')?;
    if tag.is_empty() || tag.contains(char::is_whitespace) {
        return None;
    }
    Some(tag)
}

fn tokenize(line: &str, line_no: usize, strict: bool) -> Result<Vec<String>, ParseError> {
    let mut terms = Vec::new();
    let mut current = String::new();
    let mut in_term = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some('"') => match c {
                '"' => quote = None,
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                _ => current.push(c),
            },
            Some(_) => {
                if c == '\'' {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    in_term = true;
                }
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                        in_term = true;
                    }
                }
                c if c.is_whitespace() => {
                    if in_term {
                        terms.push(std::mem::take(&mut current));
                        in_term = false;
                    }
                }
                _ => {
                    current.push(c);
                    in_term = true;
                }
            },
        }
    }

    if quote.is_some() && strict {
        return Err(ParseError::UnterminatedQuote { line: line_no });
    }
    if in_term {
        terms.push(current);
    }
    Ok(terms)
}
