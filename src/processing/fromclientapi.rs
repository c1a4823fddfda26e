//! Client API event consumer
//!
//! Drains the client API queue and turns each message into local side
//! effects plus an outgoing activity. Failures are logged per message and
//! never stop the loop.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::account::AccountProcessor;
use crate::data::{Database, MediaRepository, Status};
use crate::error::{AppError, Result};
use crate::federation::Federator;
use crate::storage::MediaStorage;
use crate::workers::{ApActivityType, ApObjectType, ClientApiMessage, ClientApiReceiver, Payload};

/// Processes messages queued through `Workers::enqueue_client_api`
#[derive(Clone)]
pub struct ClientApiProcessor {
    db: Arc<Database>,
    media: MediaRepository,
    storage: Arc<MediaStorage>,
    accounts: AccountProcessor,
    federator: Arc<dyn Federator>,
}

impl ClientApiProcessor {
    pub fn new(
        db: Arc<Database>,
        media: MediaRepository,
        storage: Arc<MediaStorage>,
        accounts: AccountProcessor,
        federator: Arc<dyn Federator>,
    ) -> Self {
        Self {
            db,
            media,
            storage,
            accounts,
            federator,
        }
    }

    /// Consume batches until cancelled
    ///
    /// On cancellation the queue is closed and batches already accepted
    /// are still processed before returning.
    pub async fn run(self, mut receiver: ClientApiReceiver, cancel: CancellationToken) {
        tracing::info!("client API worker started");

        loop {
            tokio::select! {
                batch = receiver.recv() => match batch {
                    Some(batch) => self.process_batch(batch).await,
                    None => break,
                },
                _ = cancel.cancelled() => {
                    receiver.close();
                    while let Some(batch) = receiver.recv().await {
                        self.process_batch(batch).await;
                    }
                    break;
                }
            }
        }

        tracing::info!("client API worker stopped");
    }

    /// Process a batch in order
    pub async fn process_batch(&self, batch: Vec<ClientApiMessage>) {
        for message in batch {
            let object_type = message.object_type.as_str();
            let activity_type = message.activity_type.as_str();

            if let Err(error) = self.process(message).await {
                tracing::error!(
                    object_type,
                    activity_type,
                    %error,
                    "error processing client API message"
                );
            }
        }
    }

    pub async fn process(&self, message: ClientApiMessage) -> Result<()> {
        match (message.activity_type, message.object_type) {
            (ApActivityType::Delete, ApObjectType::Person) => self.delete_account(message).await,
            (ApActivityType::Delete, ApObjectType::Note) => self.delete_status(message).await,
            (ApActivityType::Undo, ApObjectType::Follow | ApObjectType::Announce) => {
                self.federator.federate(&message).await
            }
            (activity_type, object_type) => {
                tracing::debug!(
                    object_type = object_type.as_str(),
                    activity_type = activity_type.as_str(),
                    "no handler for client API message"
                );
                Ok(())
            }
        }
    }

    /// Federate the Delete, then run the cascade
    async fn delete_account(&self, message: ClientApiMessage) -> Result<()> {
        let Payload::Account(account) = &message.payload else {
            return Err(unexpected_payload(&message));
        };

        self.federator.federate(&message).await?;

        let origin = message.origin_account.id.clone();
        self.accounts.delete(account.clone(), &origin).await
    }

    /// Remove a status with its attachments and reblogs, then federate
    async fn delete_status(&self, message: ClientApiMessage) -> Result<()> {
        let Payload::Status(status) = &message.payload else {
            return Err(unexpected_payload(&message));
        };

        self.delete_status_attachments(status).await?;

        for reblog in self.db.get_status_reblogs(&status.id).await? {
            self.db.delete_status_by_id(&reblog.id).await?;
        }

        self.db.delete_status_by_id(&status.id).await?;

        self.federator.federate(&message).await
    }

    async fn delete_status_attachments(&self, status: &Status) -> Result<()> {
        for media in self.media.get_attachments_by_status(&status.id).await? {
            for key in [media.file_path.as_deref(), media.thumbnail_path.as_deref()]
                .into_iter()
                .flatten()
            {
                if let Err(error) = self.storage.delete(key).await {
                    tracing::warn!(media_id = %media.id, key, %error, "failed to remove media blob");
                }
            }

            self.media.delete_attachment(&media.id).await?;
        }

        Ok(())
    }
}

fn unexpected_payload(message: &ClientApiMessage) -> AppError {
    AppError::Internal(anyhow::anyhow!(
        "unexpected payload for {} {}",
        message.activity_type.as_str(),
        message.object_type.as_str()
    ))
}
