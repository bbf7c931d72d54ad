use super::{CallbackAck, CallbackEvent, CallbackRejection};
use crate::storage::FileStorage;
use std::sync::Arc;
use std::time::Duration;

/// Applies document server callbacks to the storage root.
///
/// Holds no per-document state; every callback is decided on its own. Retries
/// belong to the document server, which resends on an error ack.
pub struct CallbackSynchronizer {
    storage: Arc<FileStorage>,
    client: reqwest::Client,
}

impl CallbackSynchronizer {
    pub fn new(storage: Arc<FileStorage>, fetch_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(fetch_timeout).build()?;
        Ok(Self { storage, client })
    }

    /// Handle a raw callback body addressed to `filename`.
    pub async fn handle(&self, filename: &str, body: &[u8]) -> CallbackAck {
        let outcome = match CallbackEvent::from_json(body) {
            Ok(event) => self.apply(filename, event).await,
            Err(rejection) => Err(rejection),
        };

        if let Err(rejection) = &outcome {
            tracing::warn!(file = %filename, error = %rejection, "Callback rejected");
        }
        outcome.into()
    }

    pub async fn apply(&self, filename: &str, event: CallbackEvent) -> Result<(), CallbackRejection> {
        self.storage.resolve(filename)?;
        tracing::info!(
            file = %filename,
            key = %event.key(),
            status = event.status(),
            "Document server callback received"
        );

        match event {
            CallbackEvent::Editing { users, actions, .. } => {
                if users.is_empty() {
                    tracing::info!(file = %filename, actions, "Document is being edited");
                } else {
                    tracing::info!(
                        file = %filename,
                        users = %users.join(", "),
                        actions,
                        "Document is being edited"
                    );
                }
                Ok(())
            }
            CallbackEvent::ReadyForSave { url, filetype, .. } => {
                let size = self.fetch_and_persist(filename, &url).await?;
                tracing::info!(
                    file = %filename,
                    bytes = size,
                    filetype = ?filetype,
                    "Document saved after editor closed with changes"
                );
                Ok(())
            }
            CallbackEvent::ForceSave {
                url,
                force_save_type,
                ..
            } => {
                let size = self.fetch_and_persist(filename, &url).await?;
                tracing::info!(
                    file = %filename,
                    bytes = size,
                    force_save_type = ?force_save_type,
                    "Document force-saved"
                );
                Ok(())
            }
            CallbackEvent::ClosedUnchanged { .. } => {
                tracing::info!(file = %filename, "Document closed without changes");
                Ok(())
            }
            CallbackEvent::SaveFailed { .. } => {
                tracing::error!(file = %filename, "Document server reported a save error");
                Err(CallbackRejection::EditorSaveError)
            }
            CallbackEvent::ForceSaveFailed { .. } => {
                tracing::error!(file = %filename, "Document server reported a force save error");
                Err(CallbackRejection::EditorForceSaveError)
            }
        }
    }

    /// Download `url` and atomically make it the content of `filename`.
    /// Returns the number of bytes stored.
    async fn fetch_and_persist(&self, filename: &str, url: &str) -> Result<u64, CallbackRejection> {
        tracing::debug!(file = %filename, url = %url, "Downloading edited document");
        let mut response = self.client.get(url).send().await?.error_for_status()?;

        let mut staged = self.storage.stage()?;
        while let Some(chunk) = response.chunk().await? {
            staged.write_chunk(&chunk).await?;
        }

        let size = staged.len();
        self.storage.replace(staged, filename).await?;
        Ok(size)
    }
}
