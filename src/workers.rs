//! Client API event dispatch
//!
//! Side effects of client actions (federation, content removal) run off the
//! request path. Producers hand a batch of messages to `Workers`; a single
//! consumer task drains the channel in order.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::data::{Account, Follow, Status};

/// ActivityStreams object type of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApObjectType {
    Person,
    Note,
    Follow,
    Announce,
}

impl ApObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Note => "Note",
            Self::Follow => "Follow",
            Self::Announce => "Announce",
        }
    }
}

/// ActivityStreams activity type of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApActivityType {
    Delete,
    Undo,
}

impl ApActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "Delete",
            Self::Undo => "Undo",
        }
    }
}

/// Entity a message is about
#[derive(Debug, Clone)]
pub enum Payload {
    Account(Account),
    Status(Status),
    Follow(Follow),
}

/// One side effect requested by a client action
#[derive(Debug, Clone)]
pub struct ClientApiMessage {
    pub object_type: ApObjectType,
    pub activity_type: ApActivityType,
    pub payload: Payload,
    /// Account on whose behalf the activity happens
    pub origin_account: Account,
    pub target_account: Option<Account>,
}

impl ClientApiMessage {
    /// Undo of a follow, sent by the follower to the followed account
    pub fn undo_follow(follow: Follow, origin: Account, target: Account) -> Self {
        Self {
            object_type: ApObjectType::Follow,
            activity_type: ApActivityType::Undo,
            payload: Payload::Follow(follow),
            origin_account: origin,
            target_account: Some(target),
        }
    }

    /// Deletion of a status by its author
    pub fn delete_note(status: Status, account: Account) -> Self {
        Self {
            object_type: ApObjectType::Note,
            activity_type: ApActivityType::Delete,
            payload: Payload::Status(status),
            origin_account: account.clone(),
            target_account: Some(account),
        }
    }

    /// Undo of a reblog, sent by the booster
    pub fn undo_announce(boost: Status, booster: Account, target: Account) -> Self {
        Self {
            object_type: ApObjectType::Announce,
            activity_type: ApActivityType::Undo,
            payload: Payload::Status(boost),
            origin_account: booster,
            target_account: Some(target),
        }
    }

    /// Deletion of an actor by itself
    pub fn delete_person(account: Account) -> Self {
        Self {
            object_type: ApObjectType::Person,
            activity_type: ApActivityType::Delete,
            payload: Payload::Account(account.clone()),
            origin_account: account.clone(),
            target_account: Some(account),
        }
    }
}

/// Receiving half of the client API queue
pub type ClientApiReceiver = mpsc::UnboundedReceiver<Vec<ClientApiMessage>>;

/// Intake side of the event dispatcher
///
/// Unbounded, since the cascade enqueues from the consumer task itself.
#[derive(Clone)]
pub struct Workers {
    client_api: mpsc::UnboundedSender<Vec<ClientApiMessage>>,
    cancel: CancellationToken,
}

impl Workers {
    /// Create the dispatcher and the receiver its consumer drains
    ///
    /// Intake stops once `cancel` is cancelled.
    pub fn new(cancel: CancellationToken) -> (Self, ClientApiReceiver) {
        let (client_api, receiver) = mpsc::unbounded_channel();
        (Self { client_api, cancel }, receiver)
    }

    /// Hand a batch to the client API consumer
    ///
    /// Never waits. Messages in a batch are processed in order. Empty
    /// batches are dropped; after shutdown, batches are dropped with a
    /// warning.
    pub fn enqueue_client_api(&self, messages: Vec<ClientApiMessage>) {
        use crate::metrics::{EVENTS_ENQUEUED_TOTAL, EVENTS_REJECTED_TOTAL};

        if messages.is_empty() {
            return;
        }

        let count = messages.len();

        if self.cancel.is_cancelled() {
            EVENTS_REJECTED_TOTAL.inc();
            tracing::warn!(count, "dispatcher shut down, dropping batch");
            return;
        }

        let labels: Vec<_> = messages
            .iter()
            .map(|m| (m.object_type.as_str(), m.activity_type.as_str()))
            .collect();

        if self.client_api.send(messages).is_err() {
            EVENTS_REJECTED_TOTAL.inc();
            tracing::warn!(count, "client API consumer is gone, dropping batch");
            return;
        }

        for (object_type, activity_type) in labels {
            EVENTS_ENQUEUED_TOTAL
                .with_label_values(&[object_type, activity_type])
                .inc();
        }
        tracing::debug!(count, "queued client API batch");
    }

    /// Stop accepting new batches
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{local_account, status_by};

    #[tokio::test]
    async fn test_batch_is_one_queue_item_in_order() {
        let (workers, mut receiver) = Workers::new(CancellationToken::new());
        let alice = local_account("alice");
        let first = status_by(&alice);
        let second = status_by(&alice);

        workers.enqueue_client_api(vec![
            ClientApiMessage::delete_note(first.clone(), alice.clone()),
            ClientApiMessage::delete_note(second.clone(), alice.clone()),
        ]);

        let batch = receiver.recv().await.unwrap();
        let ids: Vec<_> = batch
            .iter()
            .map(|m| match &m.payload {
                Payload::Status(status) => status.id.clone(),
                other => panic!("unexpected payload {other:?}"),
            })
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_empty_batch_is_dropped() {
        let (workers, mut receiver) = Workers::new(CancellationToken::new());

        workers.enqueue_client_api(Vec::new());
        drop(workers);

        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_batches_but_keeps_queued_ones() {
        let (workers, mut receiver) = Workers::new(CancellationToken::new());
        let alice = local_account("alice");

        workers.enqueue_client_api(vec![ClientApiMessage::delete_person(alice.clone())]);
        workers.shutdown();
        workers.enqueue_client_api(vec![ClientApiMessage::delete_person(alice)]);
        drop(workers);

        assert_eq!(receiver.recv().await.map(|b| b.len()), Some(1));
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_enqueue_never_waits_on_backlog() {
        let (workers, mut receiver) = Workers::new(CancellationToken::new());
        let alice = local_account("alice");

        for _ in 0..1000 {
            workers.enqueue_client_api(vec![ClientApiMessage::delete_person(alice.clone())]);
        }
        drop(workers);

        let mut queued = 0;
        while receiver.recv().await.is_some() {
            queued += 1;
        }
        assert_eq!(queued, 1000);
    }
}
