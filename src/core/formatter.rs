//! Message template rendering
//!
//! Templates use named placeholders such as `"user {user} logged in"`.
//! `{{` and `}}` produce literal braces. Rendering is all-or-nothing: a
//! template that references a missing key, or that is malformed, fails
//! with [`EmitterError::Format`] and yields no partial output.

use super::attributes::Attributes;
use super::error::{EmitterError, Result};

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Brace(char),
    Placeholder(&'a str),
}

fn parse(template: &str) -> Result<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        if pos > 0 {
            segments.push(Segment::Literal(&rest[..pos]));
        }
        let tail = &rest[pos..];

        if let Some(after) = tail.strip_prefix("{{") {
            segments.push(Segment::Brace('{'));
            rest = after;
        } else if let Some(after) = tail.strip_prefix("}}") {
            segments.push(Segment::Brace('}'));
            rest = after;
        } else if tail.starts_with('}') {
            return Err(EmitterError::format(
                template,
                format!("single '}}' encountered at offset {}", template.len() - tail.len()),
            ));
        } else {
            let close = tail
                .find('}')
                .ok_or_else(|| EmitterError::format(template, "unclosed '{' in template"))?;
            let name = &tail[1..close];
            if name.is_empty() {
                return Err(EmitterError::format(
                    template,
                    "positional placeholder '{}' is not supported",
                ));
            }
            if name.contains(['{', '!', ':']) {
                return Err(EmitterError::format(
                    template,
                    format!("unsupported placeholder '{{{}}}'", name),
                ));
            }
            segments.push(Segment::Placeholder(name));
            rest = &tail[close + 1..];
        }
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    Ok(segments)
}

/// Render `template` against `attributes`.
///
/// # Errors
///
/// Returns [`EmitterError::Format`] when a placeholder names a key absent
/// from `attributes`, or when the template has unbalanced braces.
///
/// # Example
///
/// ```
/// use otlp_log_emitter::core::{format_message, Attributes};
///
/// let attrs = Attributes::new().with("name", "world");
/// assert_eq!(format_message("hello {name}", &attrs).unwrap(), "hello world");
/// assert!(format_message("hello {missing}", &attrs).is_err());
/// ```
pub fn format_message(template: &str, attributes: &Attributes) -> Result<String> {
    let segments = parse(template)?;
    let mut out = String::with_capacity(template.len());

    for segment in segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Brace(c) => out.push(c),
            Segment::Placeholder(name) => {
                let value = attributes.get(name).ok_or_else(|| {
                    EmitterError::format(template, format!("missing key '{}'", name))
                })?;
                out.push_str(&value.to_string());
            }
        }
    }

    Ok(out)
}

/// Names referenced by `template`, in order of appearance
pub fn placeholders(template: &str) -> Result<Vec<String>> {
    Ok(parse(template)?
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.to_string()),
            _ => None,
        })
        .collect())
}
