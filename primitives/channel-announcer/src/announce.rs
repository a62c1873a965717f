//! Announcement text for a newly seen channel.

use slack_common::{Channel, User};

/// Finds the user with the given id.
pub fn find_user<'a>(users: &'a [User], user_id: &str) -> Option<&'a User> {
    users.iter().find(|user| user.id == user_id)
}

/// Renders the announcement for `channel` using Slack's `<#id|name>` and
/// `<@id|name>` link syntax.
///
/// The purpose and topic lines are only present when non-empty. Lines are
/// joined with `\n` and there is no trailing newline.
pub fn format_announcement(channel: &Channel, creator_name: &str) -> String {
    let mut lines = vec![
        format!("Channel: <#{}|{}>", channel.id, channel.name),
        format!("Creator: <@{}|{}>", channel.creator_id, creator_name),
    ];

    if !channel.purpose.is_empty() {
        lines.push(format!("Purpose: {}", channel.purpose));
    }
    if !channel.topic.is_empty() {
        lines.push(format!("Topic: {}", channel.topic));
    }

    lines.join("\n")
}
