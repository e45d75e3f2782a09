use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::registry::{ActionTemplate, RenderOptions};
use crate::validate::EditRequest;

pub const NO_TEXT_PLACEHOLDER: &str = "(none)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptPayload {
    pub system_instruction: String,
    pub user_message: String,
}

impl PromptPayload {
    /// sha256 of the canonical (JCS) JSON form. Stable across processes.
    pub fn fingerprint(&self) -> Result<String, String> {
        let canonical = serde_jcs::to_string(self)
            .map_err(|err| format!("failed to canonicalize prompt payload: {err}"))?;
        let digest = Sha256::digest(canonical.as_bytes());
        Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
    }
}

/// Builds the system/user pair for one upstream call. Output depends only on
/// the inputs.
pub fn build(template: &ActionTemplate, request: &EditRequest) -> PromptPayload {
    let options = RenderOptions {
        tone: request.tone.clone(),
        target_length: target_length(&request.metadata),
    };
    let system_instruction = template.render(request.language, &options);

    let text = if request.text.is_empty() {
        NO_TEXT_PLACEHOLDER
    } else {
        request.text.as_str()
    };
    let parts = [
        format!("Action: {}", template.id),
        format!("Language: {}", request.language),
        format!("Tone: {}", request.tone),
        format!("Metadata: {}", canonical_metadata(&request.metadata)),
        "OriginalText:".to_string(),
        text.to_string(),
    ];

    PromptPayload {
        system_instruction,
        user_message: parts.join("\n\n"),
    }
}

fn target_length(metadata: &Map<String, Value>) -> Option<String> {
    match metadata.get("targetWords")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Sorted keys at every depth so the message is byte-stable.
fn canonical_metadata(metadata: &Map<String, Value>) -> String {
    serde_jcs::to_string(metadata).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ActionRegistry;
    use crate::validate::RequestDefaults;
    use editdesk_contracts::{EditRequestBody, Language};
    use serde_json::json;

    fn request(body: Value) -> EditRequest {
        let body: EditRequestBody = serde_json::from_value(body).unwrap();
        EditRequest::from_body(body, &RequestDefaults::default())
    }

    #[test]
    fn user_message_has_fixed_layout() {
        let registry = ActionRegistry::builtin();
        let req = request(json!({
            "action": "rewrite",
            "language": "en",
            "tone": "formal",
            "text": "I want to study abroad.",
            "metadata": {"country": "DE", "b": 1}
        }));
        let payload = build(registry.lookup(&req.action), &req);
        assert_eq!(
            payload.user_message,
            "Action: rewrite\n\nLanguage: en\n\nTone: formal\n\nMetadata: {\"b\":1,\"country\":\"DE\"}\n\nOriginalText:\n\nI want to study abroad."
        );
        assert!(payload
            .system_instruction
            .starts_with("You are an expert admissions editor."));
    }

    #[test]
    fn resolved_id_is_used_for_unknown_actions() {
        let registry = ActionRegistry::builtin();
        let req = request(json!({"action": "mystery"}));
        let payload = build(registry.lookup(&req.action), &req);
        assert!(payload.user_message.starts_with("Action: generic\n\n"));
        assert!(payload.user_message.ends_with("OriginalText:\n\n(none)"));
        assert!(payload.user_message.contains("Metadata: {}"));
    }

    #[test]
    fn identical_inputs_give_identical_payloads() {
        let registry = ActionRegistry::builtin();
        let body = json!({
            "action": "shorten",
            "language": "ar",
            "text": "نص طويل بما يكفي للاختصار",
            "metadata": {"z": {"y": 2, "x": 1}, "targetWords": 120, "a": [3, 2]}
        });
        let first = build(registry.lookup("shorten"), &request(body.clone()));
        let second = build(registry.lookup("shorten"), &request(body));
        assert_eq!(first, second);
        assert_eq!(first.fingerprint().unwrap(), second.fingerprint().unwrap());
        assert_eq!(first.fingerprint().unwrap().len(), 64);
        assert!(first.user_message.contains(r#"{"a":[3,2],"targetWords":120,"z":{"x":1,"y":2}}"#));
    }

    #[test]
    fn target_words_reaches_shorten_template() {
        let registry = ActionRegistry::builtin();
        let req = request(json!({
            "action": "shorten",
            "language": "en",
            "text": "some long text to shorten",
            "metadata": {"targetWords": "150 words"}
        }));
        let payload = build(registry.lookup("shorten"), &req);
        assert!(payload.system_instruction.contains("Target length: 150 words"));

        let req = request(json!({
            "action": "shorten",
            "language": "en",
            "text": "some long text to shorten",
            "metadata": {"targetWords": null}
        }));
        let payload = build(registry.lookup("shorten"), &req);
        assert!(payload
            .system_instruction
            .contains("Target length: about 300 words"));
    }

    #[test]
    fn tone_reaches_rewrite_template() {
        let registry = ActionRegistry::builtin();
        let req = request(json!({
            "action": "rewrite",
            "tone": "concise",
            "text": "some long text to rewrite"
        }));
        assert_eq!(req.language, Language::Ar);
        let payload = build(registry.lookup("rewrite"), &req);
        assert!(payload.system_instruction.contains("النبرة: concise."));
        assert!(payload.user_message.contains("Tone: concise"));
    }

    #[test]
    fn different_payloads_have_different_fingerprints() {
        let a = PromptPayload {
            system_instruction: "s".to_string(),
            user_message: "u1".to_string(),
        };
        let b = PromptPayload {
            system_instruction: "s".to_string(),
            user_message: "u2".to_string(),
        };
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }
}
