//! Rendering chat sessions as a plain-text transcript.

use std::fmt::Write;

use aldous_core::Document;
use serde_json::Value;

/// Speaker label for a message role, or `None` for roles left out of the
/// transcript (system prompts, tool calls).
fn speaker(role: &str) -> Option<&'static str> {
    match role {
        "user" => Some("User"),
        "assistant" | "agent" => Some("Agent"),
        _ => None,
    }
}

/// Text form of a timestamp stored either as a string, an extended-JSON
/// date or a number.
fn render_time(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(date) => match date.get("$date")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(inner) => inner.get("$numberLong")?.as_str().map(str::to_string),
            _ => None,
        },
        _ => None,
    }
}

/// Render every user and agent message of `sessions`, in the order given,
/// one line per message: `"{timestamp}: User: {content}"` or
/// `"{timestamp}: Agent: {content}"`.
///
/// A message without its own timestamp uses its session's `sessionDate`.
#[must_use]
pub fn format_transcript(sessions: &[Document]) -> String {
    let mut transcript = String::new();
    for session in sessions {
        let session_time = render_time(session.get("sessionDate"));
        let Some(Value::Array(messages)) = session.get("messages") else {
            continue;
        };
        for message in messages {
            let Some(label) = message.get("role").and_then(Value::as_str).and_then(speaker)
            else {
                continue;
            };
            let time = render_time(message.get("timestamp"))
                .or_else(|| session_time.clone())
                .unwrap_or_default();
            let content = match message.get("content") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            // Writing to a String cannot fail.
            let _ = writeln!(transcript, "{time}: {label}: {content}");
        }
    }
    transcript
}

/// Total number of messages across `sessions`.
#[must_use]
pub fn message_count(sessions: &[Document]) -> usize {
    sessions
        .iter()
        .filter_map(|s| s.get("messages").and_then(Value::as_array))
        .map(Vec::len)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn renders_user_and_agent_lines() {
        let sessions = [session(json!({
            "sessionDate": "2025-05-29T10:00:00Z",
            "messages": [
                {"role": "user", "content": "hello", "timestamp": "2025-05-29T10:00:01Z"},
                {"role": "assistant", "content": "hi there", "timestamp": "2025-05-29T10:00:02Z"},
                {"role": "system", "content": "hidden", "timestamp": "2025-05-29T10:00:03Z"},
                {"role": "agent", "content": "still here", "timestamp": "2025-05-29T10:00:04Z"}
            ]
        }))];
        assert_eq!(
            format_transcript(&sessions),
            "2025-05-29T10:00:01Z: User: hello\n\
             2025-05-29T10:00:02Z: Agent: hi there\n\
             2025-05-29T10:00:04Z: Agent: still here\n"
        );
    }

    #[test]
    fn sessions_rendered_in_given_order() {
        let sessions = [
            session(json!({
                "messages": [{"role": "user", "content": "first", "timestamp": "t1"}]
            })),
            session(json!({
                "messages": [{"role": "user", "content": "second", "timestamp": "t2"}]
            })),
        ];
        assert_eq!(format_transcript(&sessions), "t1: User: first\nt2: User: second\n");
    }

    #[test]
    fn missing_timestamp_uses_session_date() {
        let sessions = [session(json!({
            "sessionDate": {"$date": "2025-05-29T10:00:00.000Z"},
            "messages": [{"role": "user", "content": "hello"}]
        }))];
        assert_eq!(
            format_transcript(&sessions),
            "2025-05-29T10:00:00.000Z: User: hello\n"
        );
    }

    #[test]
    fn sessions_without_messages_contribute_nothing() {
        let sessions = [session(json!({"sessionDate": "d"})), session(json!({"messages": []}))];
        assert_eq!(format_transcript(&sessions), "");
        assert_eq!(message_count(&sessions), 0);
    }
}
