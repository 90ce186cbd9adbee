//! Prompt construction and response extraction for chat-completion providers

use super::{EnhancementRequest, EnhancementResponse};
use crate::ProviderError;

/// Instructions sent as the system message
pub(crate) const SYSTEM_PROMPT: &str = "\
You improve tool metadata for AI agents that call HTTP APIs.
You receive a JSON object {\"capabilities\": [...]}; each entry has an id, a snake_case name, \
a description, its current safety tier and its parameters.
For each capability you can improve, return an entry with the same id and any of:
  name         - a clearer snake_case verb_noun identifier
  description  - one or two sentences saying what the tool does and when to use it
  parameterDocs - an object mapping parameter name to a short description
  safetyHint   - one of \"read\", \"write\", \"destructive\" if you believe the tier is wrong
Omit capabilities you would not change. Never invent ids.
Respond with a single JSON object {\"capabilities\": [...]} and nothing else.";

/// User message carrying the batch
pub(crate) fn user_prompt(request: &EnhancementRequest) -> Result<String, ProviderError> {
    serde_json::to_string_pretty(request)
        .map_err(|e| ProviderError::MalformedResponse(format!("cannot encode request: {e}")))
}

/// Parse a model reply, tolerating markdown fences or prose around the JSON object
pub(crate) fn parse_response(content: &str) -> Result<EnhancementResponse, ProviderError> {
    let start = content
        .find('{')
        .ok_or_else(|| ProviderError::MalformedResponse("no JSON object in reply".to_string()))?;
    let end = content
        .rfind('}')
        .map(|i| i + 1)
        .filter(|end| *end > start)
        .ok_or_else(|| ProviderError::MalformedResponse("unterminated JSON object".to_string()))?;

    serde_json::from_str(&content[start..end])
        .map_err(|e| ProviderError::MalformedResponse(format!("unexpected reply shape: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_reply() {
        let reply = "Here you go:\n```json\n{\"capabilities\": [{\"id\": \"cap_1\", \"name\": \"find_pets\"}]}\n```";
        let response = parse_response(reply).unwrap();
        assert_eq!(response.capabilities.len(), 1);
        assert_eq!(response.capabilities[0].name.as_deref(), Some("find_pets"));
    }

    #[test]
    fn accepts_camel_and_snake_case_fields() {
        let camel = parse_response(
            r#"{"capabilities": [{"id": "a", "parameterDocs": {"q": "Query"}, "safetyHint": "write"}]}"#,
        )
        .unwrap();
        let snake = parse_response(
            r#"{"capabilities": [{"id": "a", "parameter_docs": {"q": "Query"}, "safety_hint": "write"}]}"#,
        )
        .unwrap();
        assert_eq!(camel, snake);
    }

    #[test]
    fn rejects_prose() {
        assert!(matches!(
            parse_response("I cannot help with that."),
            Err(ProviderError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_response(r#"{"tools": []}"#),
            Err(ProviderError::MalformedResponse(_))
        ));
    }
}
