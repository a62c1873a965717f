use serde::{Deserialize, Deserializer};

/// A conversation as returned by `conversations.list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,

    /// Creation time, epoch seconds.
    #[serde(default)]
    pub created: i64,

    /// Id of the user who created the channel.
    #[serde(rename = "creator", default)]
    pub creator_id: String,

    #[serde(default, deserialize_with = "text_value")]
    pub topic: String,

    #[serde(default, deserialize_with = "text_value")]
    pub purpose: String,
}

/// A workspace member as returned by `users.list`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

#[derive(Deserialize)]
struct TextValue {
    #[serde(default)]
    value: String,
}

/// Flattens Slack's `{"value": "...", "creator": ..., "last_set": ...}`
/// objects down to the text. A `null` becomes the empty string.
fn text_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let text = Option::<TextValue>::deserialize(deserializer)?;
    Ok(text.map(|t| t.value).unwrap_or_default())
}
