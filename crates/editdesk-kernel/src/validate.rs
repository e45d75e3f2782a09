use editdesk_contracts::{EditRequestBody, Language};
use serde_json::{Map, Value};

use crate::registry::ActionTemplate;

pub const TEXT_REQUIRED: &str = "text is required and should be non-empty for this action";

/// Fallbacks applied where the inbound body leaves a field out. Unknown
/// actions are resolved by the registry, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDefaults {
    /// Requested action when the body carries none.
    pub action: String,
    pub language: Language,
    pub tone: String,
    pub min_text_chars: usize,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            action: "rewrite".to_string(),
            language: Language::Ar,
            tone: "formal".to_string(),
            min_text_chars: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditRequest {
    pub action: String,
    pub language: Language,
    pub tone: String,
    pub text: String,
    pub metadata: Map<String, Value>,
}

impl EditRequest {
    pub fn from_body(body: EditRequestBody, defaults: &RequestDefaults) -> Self {
        Self {
            action: body.action.unwrap_or_else(|| defaults.action.clone()),
            // Unrecognised codes resolve to the default, the same as an absent one.
            language: body
                .language
                .as_deref()
                .and_then(Language::from_code)
                .unwrap_or(defaults.language),
            tone: body
                .tone
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| defaults.tone.clone()),
            text: body.text.unwrap_or_default(),
            metadata: body.metadata.unwrap_or_default(),
        }
    }
}

/// Checks the minimum input a template needs. Only text-bearing templates are
/// checked; the request is never modified.
pub fn validate(
    request: &EditRequest,
    template: &ActionTemplate,
    min_text_chars: usize,
) -> Result<(), String> {
    if !template.requires_text {
        return Ok(());
    }
    if request.text.trim().chars().count() < min_text_chars {
        return Err(TEXT_REQUIRED.to_string());
    }
    Ok(())
}
