use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::Narration;
use super::templates::NarrationTemplates;

static SLIDE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:第\s*(\d+)\s*页|(?i:slide)\s*(\d+))").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMethod {
    /// The response held a JSON array
    Json,
    /// JSON failed, sections were split on slide markers
    Markers,
    /// Nothing usable, every slide got a placeholder
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct BatchParse {
    pub method: ParseMethod,
    pub narrations: Vec<Narration>,
}

/// Find a JSON array in `text`, tolerating code fences and prose around it.
///
/// Prose may carry brackets of its own (`see [1]`), so every `[` is tried as
/// the start of a value and the first array holding an object wins.
fn extract_json_array(text: &str) -> Option<Vec<Value>> {
    let trimmed = text.trim();
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
        return Some(items);
    }

    trimmed
        .match_indices('[')
        .filter_map(|(start, _)| {
            serde_json::Deserializer::from_str(&trimmed[start..])
                .into_iter::<Value>()
                .next()?
                .ok()
        })
        .find_map(|value| match value {
            Value::Array(items) if items.iter().any(Value::is_object) => Some(items),
            _ => None,
        })
}

fn transcript_of(item: &Value) -> Option<String> {
    let object = item.as_object()?;
    if !object.contains_key("slide_number") {
        return None;
    }
    match object.get("transcript")? {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Turn a batch response for slides `first..first + count` into exactly
/// `count` narrations numbered from `first`.
///
/// Items are taken in array order; the model's own `slide_number` values
/// are not trusted for placement.
pub fn parse_batch_response(
    text: &str,
    first: usize,
    count: usize,
    templates: &NarrationTemplates,
) -> BatchParse {
    if let Some(items) = extract_json_array(text) {
        let mut narrations: Vec<Narration> = items
            .iter()
            .filter_map(transcript_of)
            .take(count)
            .enumerate()
            .map(|(i, transcript)| Narration {
                slide_number: first + i,
                transcript,
            })
            .collect();

        while narrations.len() < count {
            let slide_number = first + narrations.len();
            narrations.push(Narration {
                slide_number,
                transcript: templates.missing(slide_number),
            });
        }

        return BatchParse {
            method: ParseMethod::Json,
            narrations,
        };
    }

    split_on_markers(text, first, count, templates)
}

struct Marker {
    number: usize,
    start: usize,
    end: usize,
}

fn find_markers(text: &str) -> Vec<Marker> {
    SLIDE_MARKER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let digits = caps.get(1).or_else(|| caps.get(2))?;
            Some(Marker {
                number: digits.as_str().parse().ok()?,
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

fn clean_section(section: &str) -> String {
    section
        .trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, ']' | '】' | '[' | '【' | ':' | '：' | '*' | '#' | '-' | '"')
        })
        .to_string()
}

fn split_on_markers(
    text: &str,
    first: usize,
    count: usize,
    templates: &NarrationTemplates,
) -> BatchParse {
    let markers = find_markers(text);
    let wanted = first..first + count;

    // Models sometimes restart numbering at 1 for every batch
    let offset = if markers.iter().any(|m| wanted.contains(&m.number)) {
        0
    } else if first > 1 && markers.iter().any(|m| (1..=count).contains(&m.number)) {
        first - 1
    } else {
        return BatchParse {
            method: ParseMethod::Placeholder,
            narrations: wanted
                .map(|slide_number| Narration {
                    slide_number,
                    transcript: templates.batch_failed(slide_number),
                })
                .collect(),
        };
    };

    let narrations = wanted
        .map(|slide_number| {
            let target = slide_number - offset;
            let section = markers
                .iter()
                .position(|m| m.number == target)
                .map(|i| {
                    let end = markers.get(i + 1).map(|next| next.start).unwrap_or(text.len());
                    clean_section(&text[markers[i].end..end])
                })
                .filter(|s| !s.is_empty());

            Narration {
                slide_number,
                transcript: section.unwrap_or_else(|| templates.unparsed(slide_number)),
            }
        })
        .collect();

    BatchParse {
        method: ParseMethod::Markers,
        narrations,
    }
}
