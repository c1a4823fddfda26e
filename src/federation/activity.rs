//! ActivityStreams documents for outgoing activities

use serde_json::Value;

pub const PUBLIC_AUDIENCE: &str = "https://www.w3.org/ns/activitystreams#Public";

/// Addressing for a status of the given visibility
///
/// # Returns
/// `(to, cc)` recipient lists
pub fn audience_for_visibility(actor_uri: &str, visibility: &str) -> (Vec<String>, Vec<String>) {
    let public_audience = PUBLIC_AUDIENCE.to_string();
    let followers_audience = format!("{}/followers", actor_uri);

    match visibility {
        "public" => (vec![public_audience], vec![followers_audience]),
        "unlisted" => (vec![followers_audience], vec![public_audience]),
        "private" => (vec![followers_audience], Vec::new()),
        "direct" => (Vec::new(), Vec::new()),
        _ => (vec![public_audience], vec![followers_audience]),
    }
}

/// Build ActivityPub activity JSON
pub mod builder {
    use super::Value;

    /// Build a Follow activity
    ///
    /// # Arguments
    /// * `id` - Follow URI as stored on the edge
    /// * `actor` - Actor URI (follower)
    /// * `object` - Object URI (followee)
    pub fn follow(id: &str, actor: &str, object: &str) -> Value {
        serde_json::json!({
            "type": "Follow",
            "id": id,
            "actor": actor,
            "object": object
        })
    }

    /// Reference to an Announce being undone
    pub fn announce_reference(id: &str, actor: &str) -> Value {
        serde_json::json!({
            "type": "Announce",
            "id": id,
            "actor": actor
        })
    }

    /// Build a Delete activity
    ///
    /// # Arguments
    /// * `id` - Activity ID (unique URI)
    /// * `actor` - Actor URI (deleter)
    /// * `object` - URI of the deleted object; the actor itself for account deletion
    pub fn delete(id: &str, actor: &str, object: &str, to: &[String], cc: &[String]) -> Value {
        serde_json::json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "type": "Delete",
            "id": id,
            "actor": actor,
            "object": {
                "type": "Tombstone",
                "id": object
            },
            "to": to,
            "cc": cc,
            "published": chrono::Utc::now().to_rfc3339()
        })
    }

    /// Build an Undo activity
    ///
    /// # Arguments
    /// * `id` - Activity ID (unique URI)
    /// * `actor` - Actor URI (undoer)
    /// * `object` - Original activity being undone
    pub fn undo(id: &str, actor: &str, object: Value, to: &[String]) -> Value {
        serde_json::json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "type": "Undo",
            "id": id,
            "actor": actor,
            "object": object,
            "to": to
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audience_for_private_status_is_followers_only() {
        let (to, cc) = audience_for_visibility("https://local.example/users/alice", "private");

        assert_eq!(to, vec!["https://local.example/users/alice/followers".to_string()]);
        assert!(cc.is_empty());
    }

    #[test]
    fn audience_for_unknown_visibility_falls_back_to_public() {
        let (to, _) = audience_for_visibility("https://local.example/users/alice", "weird");
        assert_eq!(to, vec![PUBLIC_AUDIENCE.to_string()]);
    }

    #[test]
    fn delete_wraps_object_in_tombstone() {
        let activity = builder::delete(
            "https://local.example/activities/1",
            "https://local.example/users/alice",
            "https://local.example/users/alice/statuses/1",
            &[PUBLIC_AUDIENCE.to_string()],
            &[],
        );

        assert_eq!(activity["type"], "Delete");
        assert_eq!(activity["object"]["type"], "Tombstone");
        assert_eq!(
            activity["object"]["id"],
            "https://local.example/users/alice/statuses/1"
        );
    }

    #[test]
    fn undo_embeds_follow() {
        let follow = builder::follow(
            "https://local.example/follows/1",
            "https://local.example/users/alice",
            "https://remote.example/users/bob",
        );
        let activity = builder::undo(
            "https://local.example/activities/2",
            "https://local.example/users/alice",
            follow,
            &["https://remote.example/users/bob".to_string()],
        );

        assert_eq!(activity["type"], "Undo");
        assert_eq!(activity["object"]["type"], "Follow");
        assert_eq!(activity["object"]["object"], "https://remote.example/users/bob");
    }
}
