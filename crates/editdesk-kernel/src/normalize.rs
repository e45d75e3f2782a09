use editdesk_contracts::EditResult;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResult {
    pub raw: String,
    pub json: Option<Value>,
}

impl From<NormalizedResult> for EditResult {
    fn from(n: NormalizedResult) -> Self {
        EditResult {
            raw: n.raw,
            json: n.json,
        }
    }
}

/// Wraps the assistant reply. A reply that is not clean JSON is a normal
/// outcome: `json` is `None` and `raw` keeps the full text.
pub fn normalize(raw: &str) -> NormalizedResult {
    NormalizedResult {
        raw: raw.to_string(),
        json: parse_from_first_brace(raw),
    }
}

/// Parses the text from the first `{` to the end as exactly one JSON value.
///
/// Deliberately bounded: a single start position and no bracket matching.
/// Anything after the value, including trailing whitespace or prose, loses
/// the parse.
pub fn parse_from_first_brace(raw: &str) -> Option<Value> {
    let start = raw.find('{')?;
    let candidate = &raw[start..];
    let mut stream = serde_json::Deserializer::from_str(candidate).into_iter::<Value>();
    let value = stream.next()?.ok()?;
    if stream.byte_offset() != candidate.len() {
        return None;
    }
    Some(value)
}
