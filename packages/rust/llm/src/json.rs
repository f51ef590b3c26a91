//! Helpers for model replies that are supposed to be JSON.

use serde::de::DeserializeOwned;
use tracing::debug;

/// Strip an optional Markdown code fence (```` ```json ... ``` ````) around a reply.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (e.g. `json`) on the opening line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse a model reply into `T`, returning `None` on any parse or shape mismatch.
pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Option<T> {
    let body = strip_code_fence(text);
    match serde_json::from_str(body) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, "model reply is not the expected JSON shape");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Services {
        services: Vec<String>,
    }

    #[test]
    fn strips_fenced_json() {
        let reply = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(reply), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fence() {
        let reply = "  ```\n[1,2]\n```  ";
        assert_eq!(strip_code_fence(reply), "[1,2]");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(strip_code_fence("  hello  "), "hello");
    }

    #[test]
    fn parses_expected_shape() {
        let parsed: Option<Services> =
            parse_json_reply("```json\n{\"services\": [\"Botox\", \"Fillers\"]}\n```");
        assert_eq!(parsed.unwrap().services, vec!["Botox", "Fillers"]);
    }

    #[test]
    fn wrong_shape_is_none() {
        let parsed: Option<Services> = parse_json_reply(r#"{"services": "Botox"}"#);
        assert!(parsed.is_none());

        let parsed: Option<Services> = parse_json_reply("Sure! Here are the services: Botox");
        assert!(parsed.is_none());
    }
}
