//! `{key}` placeholder scanning
//!
//! A placeholder starts at `{` and ends at the first following `}`. Placeholders do not nest:
//! `{a{b}` names the key `a{b`. An empty `{}` is not a placeholder and is kept as is.
use regex::Regex;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([^}]+)\}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'t> {
    Literal(&'t str),
    Placeholder(&'t str),
}

/// Split `raw` into literal text and placeholder keys, in order
pub fn segments(raw: &str) -> Vec<Segment<'_>> {
    let mut segments = vec![];
    let mut last = 0;

    for captures in PLACEHOLDER.captures_iter(raw) {
        let (Some(span), Some(key)) = (captures.get(0), captures.get(1)) else {
            continue;
        };

        if span.start() > last {
            segments.push(Segment::Literal(&raw[last..span.start()]));
        }
        segments.push(Segment::Placeholder(key.as_str()));
        last = span.end();
    }

    if last < raw.len() {
        segments.push(Segment::Literal(&raw[last..]));
    }

    segments
}

/// Replace every placeholder with the result of `substitute`
///
/// The substituted text is not scanned again; `substitute` is expected to return fully expanded
/// values. The first error aborts the substitution.
pub fn substitute<E>(
    raw: &str,
    mut substitute: impl FnMut(&str) -> Result<String, E>,
) -> Result<String, E> {
    let mut output = String::with_capacity(raw.len());

    for segment in segments(raw) {
        match segment {
            Segment::Literal(literal) => output.push_str(literal),
            Segment::Placeholder(key) => output.push_str(&substitute(key)?),
        }
    }

    Ok(output)
}
