//! Webhook payload shape. Every level is optional: absent or `null` fields
//! deserialize to their empty value instead of failing the request.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::platform::Mention;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct WebhookEnvelope {
    #[serde(deserialize_with = "null_as_default")]
    pub entry: Vec<Entry>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Entry {
    #[serde(deserialize_with = "null_as_default")]
    pub changes: Vec<Change>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Change {
    #[serde(deserialize_with = "null_as_default")]
    pub value: ChangeValue,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ChangeValue {
    pub message: Option<WebhookMessage>,
    /// ISO-8601 string or Unix seconds, kept as text
    #[serde(deserialize_with = "string_or_number")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct WebhookMessage {
    #[serde(deserialize_with = "null_as_default")]
    pub from: Sender,
    #[serde(deserialize_with = "null_as_default")]
    pub text: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Sender {
    #[serde(deserialize_with = "string_or_number")]
    pub id: Option<String>,
}

impl WebhookEnvelope {
    /// Walk entries → changes → value → message, yielding one mention per
    /// message present.
    pub fn mentions(&self) -> Vec<Mention> {
        self.entry
            .iter()
            .flat_map(|entry| entry.changes.iter())
            .filter_map(|change| {
                let value = &change.value;
                value.message.as_ref().map(|message| {
                    Mention::new(
                        message.from.id.clone(),
                        message.text.clone(),
                        value.timestamp.clone().unwrap_or_default(),
                    )
                })
            })
            .collect()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::invalid_type(
            de::Unexpected::Other(&other.to_string()),
            &"a string or a number",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> WebhookEnvelope {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_full_envelope_yields_mention() {
        let envelope = parse(json!({
            "object": "instagram",
            "entry": [{
                "id": "1784",
                "changes": [{
                    "field": "mentions",
                    "value": {
                        "message": {"from": {"id": "42"}, "text": "cupom SAVE20"},
                        "timestamp": "2024-01-15T10:30:00Z"
                    }
                }]
            }]
        }));

        assert_eq!(
            envelope.mentions(),
            vec![Mention::new(
                Some("42".to_string()),
                "cupom SAVE20",
                "2024-01-15T10:30:00Z"
            )]
        );
    }

    #[test]
    fn test_absent_levels_are_empty() {
        assert!(parse(json!({})).mentions().is_empty());
        assert!(parse(json!({"entry": [{}]})).mentions().is_empty());
        assert!(parse(json!({"entry": [{"changes": [{}]}]})).mentions().is_empty());
        assert!(parse(json!({"entry": [{"changes": [{"value": {}}]}]}))
            .mentions()
            .is_empty());
    }

    #[test]
    fn test_nulls_are_empty() {
        assert!(parse(json!({"entry": null})).mentions().is_empty());
        assert!(parse(json!({"entry": [{"changes": null}]})).mentions().is_empty());
        assert!(parse(json!({"entry": [{"changes": [{"value": null}]}]}))
            .mentions()
            .is_empty());
    }

    #[test]
    fn test_message_without_sender_or_timestamp() {
        let envelope = parse(json!({
            "entry": [{"changes": [{"value": {"message": {"text": "code ABCD", "from": null}}}]}]
        }));
        assert_eq!(
            envelope.mentions(),
            vec![Mention::new(None, "code ABCD", "")]
        );
    }

    #[test]
    fn test_numeric_timestamp_and_sender_id() {
        let envelope = parse(json!({
            "entry": [{"changes": [{"value": {
                "message": {"from": {"id": 17841400}, "text": "oi"},
                "timestamp": 1705314600
            }}]}]
        }));
        let mentions = envelope.mentions();
        assert_eq!(mentions[0].sender_id.as_deref(), Some("17841400"));
        assert_eq!(mentions[0].timestamp, "1705314600");
    }

    #[test]
    fn test_walks_every_entry_and_change() {
        let envelope = parse(json!({
            "entry": [
                {"changes": [
                    {"value": {"message": {"text": "a"}}},
                    {"value": {"timestamp": "t"}},
                    {"value": {"message": {"text": "b"}}}
                ]},
                {"changes": [{"value": {"message": {"text": "c"}}}]}
            ]
        }));
        let texts: Vec<String> = envelope.mentions().into_iter().map(|m| m.text).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_wrong_shape_is_an_error() {
        assert!(serde_json::from_value::<WebhookEnvelope>(json!({"entry": "nope"})).is_err());
        assert!(serde_json::from_value::<WebhookEnvelope>(json!([1, 2])).is_err());
        assert!(serde_json::from_value::<WebhookEnvelope>(json!({
            "entry": [{"changes": [{"value": {"timestamp": {"a": 1}}}]}]
        }))
        .is_err());
    }
}
