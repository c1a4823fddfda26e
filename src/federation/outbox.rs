//! Federation outbox
//!
//! Activities for local actors are written to the `federation_outbox` table,
//! where the delivery transport picks them up. Nothing is sent from here.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::types::Json;
use std::sync::Arc;

use super::activity::{audience_for_visibility, builder, PUBLIC_AUDIENCE};
use crate::data::{Database, EntityId, OutboxActivity};
use crate::error::{AppError, Result};
use crate::workers::{ApActivityType, ApObjectType, ClientApiMessage, Payload};

/// Hands client API side effects to other servers
#[async_trait]
pub trait Federator: Send + Sync {
    async fn federate(&self, message: &ClientApiMessage) -> Result<()>;
}

/// `Federator` that persists activities for later delivery
pub struct OutboxFederator {
    db: Arc<Database>,
}

impl OutboxFederator {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    fn activity_id(actor_uri: &str) -> String {
        format!("{}/activities/{}", actor_uri, EntityId::new().0)
    }

    /// Build the activity document and its target, if any
    fn build(message: &ClientApiMessage) -> Result<Option<(Value, Option<String>)>> {
        let actor = message.origin_account.uri.as_str();
        let id = Self::activity_id(actor);
        let target_uri = message.target_account.as_ref().map(|a| a.uri.clone());

        let built = match (message.object_type, message.activity_type, &message.payload) {
            (ApObjectType::Person, ApActivityType::Delete, Payload::Account(account)) => {
                let followers = format!("{}/followers", account.uri);
                let activity = builder::delete(
                    &id,
                    actor,
                    &account.uri,
                    &[PUBLIC_AUDIENCE.to_string()],
                    &[followers],
                );
                (activity, None)
            }
            (ApObjectType::Note, ApActivityType::Delete, Payload::Status(status)) => {
                let (to, cc) = audience_for_visibility(actor, &status.visibility);
                (builder::delete(&id, actor, &status.uri, &to, &cc), None)
            }
            (ApObjectType::Follow, ApActivityType::Undo, Payload::Follow(follow)) => {
                let Some(target_uri) = target_uri else {
                    return Err(AppError::Internal(anyhow::anyhow!(
                        "undo follow {} has no target account",
                        follow.id
                    )));
                };
                let object = builder::follow(&follow.uri, actor, &target_uri);
                let activity = builder::undo(&id, actor, object, &[target_uri.clone()]);
                (activity, Some(target_uri))
            }
            (ApObjectType::Announce, ApActivityType::Undo, Payload::Status(boost)) => {
                let object = builder::announce_reference(&boost.uri, actor);
                let followers = format!("{}/followers", actor);
                let mut to = vec![PUBLIC_AUDIENCE.to_string(), followers];
                to.extend(target_uri.clone());
                (builder::undo(&id, actor, object, &to), target_uri)
            }
            (object_type, activity_type, _) => {
                tracing::debug!(
                    object_type = object_type.as_str(),
                    activity_type = activity_type.as_str(),
                    "no outgoing activity for message"
                );
                return Ok(None);
            }
        };

        Ok(Some(built))
    }
}

#[async_trait]
impl Federator for OutboxFederator {
    async fn federate(&self, message: &ClientApiMessage) -> Result<()> {
        use crate::metrics::OUTBOX_ACTIVITIES_TOTAL;

        if !message.origin_account.is_local() {
            tracing::trace!(
                actor = %message.origin_account.uri,
                "not federating on behalf of a remote actor"
            );
            return Ok(());
        }

        let Some((payload, target_uri)) = Self::build(message)? else {
            return Ok(());
        };

        let activity = OutboxActivity {
            id: EntityId::new().0,
            activity_type: message.activity_type.as_str().to_string(),
            object_type: message.object_type.as_str().to_string(),
            actor_uri: message.origin_account.uri.clone(),
            target_uri,
            payload: Json(payload),
            created_at: Utc::now(),
        };

        self.db.insert_outbox_activity(&activity).await?;

        OUTBOX_ACTIVITIES_TOTAL
            .with_label_values(&[&activity.activity_type])
            .inc();
        tracing::debug!(
            activity_type = %activity.activity_type,
            object_type = %activity.object_type,
            actor = %activity.actor_uri,
            "activity written to outbox"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{
        boost_of, create_test_db, follow, local_account, remote_account, status_by,
    };

    #[tokio::test]
    async fn test_undo_follow_for_local_actor_is_persisted() {
        let (db, _temp_dir) = create_test_db().await;
        let db = Arc::new(db);
        let federator = OutboxFederator::new(db.clone());

        let alice = local_account("alice");
        let bob = remote_account("bob", "remote.example");
        let edge = follow(&alice, &bob);

        federator
            .federate(&ClientApiMessage::undo_follow(edge.clone(), alice.clone(), bob.clone()))
            .await
            .unwrap();

        let activities = db.get_outbox_activities().await.unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].activity_type, "Undo");
        assert_eq!(activities[0].object_type, "Follow");
        assert_eq!(activities[0].target_uri.as_deref(), Some(bob.uri.as_str()));
        assert_eq!(activities[0].payload.0["object"]["id"], edge.uri);
    }

    #[tokio::test]
    async fn test_remote_actor_is_not_federated() {
        let (db, _temp_dir) = create_test_db().await;
        let db = Arc::new(db);
        let federator = OutboxFederator::new(db.clone());

        let alice = local_account("alice");
        let bob = remote_account("bob", "remote.example");
        let boost = boost_of(&bob, &status_by(&alice));

        federator
            .federate(&ClientApiMessage::undo_announce(boost, bob, alice))
            .await
            .unwrap();

        assert!(db.get_outbox_activities().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_person_targets_the_actor() {
        let (db, _temp_dir) = create_test_db().await;
        let db = Arc::new(db);
        let federator = OutboxFederator::new(db.clone());

        let alice = local_account("alice");
        federator
            .federate(&ClientApiMessage::delete_person(alice.clone()))
            .await
            .unwrap();

        let activities = db.get_outbox_activities().await.unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].payload.0["object"]["id"], alice.uri);
        assert!(activities[0].target_uri.is_none());
    }
}
