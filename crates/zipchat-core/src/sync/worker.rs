//! Worker thread owning every asynchronous service interaction.
//!
//! Commands arrive over a channel from the UI side; change deliveries,
//! auth transitions and resolution completions flow back over the data
//! channel. The worker runs its own tokio runtime so the UI thread never
//! blocks on the network.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing::{debug, error, warn};

use crate::config::CoreConfig;
use crate::constants::{MESSAGES_PARTITION, PROFILE_PLACEHOLDER_URL, PUSH_SENDER_ID};
use crate::error::ChatError;
use crate::models::{MessageRecord, UserInfo};
use crate::services::{ChangeRecord, Services};
use crate::stats::SharedSessionStats;
use crate::store::{ImageSlot, NodeKey};

use super::auth::IdentityGate;
use super::feeds::{FeedSubscriptions, Partition};
use super::resolver;
use super::upload::{validate_media_type, ImageFile, UploadCoordinator};

pub enum ClientCommand {
    SignIn,
    SignOut,
    SendText {
        text: String,
    },
    SendImage {
        file: ImageFile,
        caption: Option<String>,
    },
    /// Resolve an indirect locator for a node slot. Sent by the runtime
    /// after the reconciler queues the request.
    Resolve {
        target: NodeKey,
        slot: ImageSlot,
        locator: String,
    },
    /// Internal: forwarded from the identity watch task.
    AuthChanged(Option<UserInfo>),
    Shutdown,
}

#[derive(Debug)]
pub enum DataChange {
    AuthState(Option<UserInfo>),
    Message(ChangeRecord),
    Contact(ChangeRecord),
    Resolved {
        target: NodeKey,
        slot: ImageSlot,
        url: String,
    },
    /// A write was rejected before reaching the store; surfaced as a
    /// transient notice.
    Rejected(ChatError),
    TextSendAcked,
}

pub struct SyncWorker {
    services: Services,
    config: CoreConfig,
    gate: IdentityGate,
    data_tx: Sender<DataChange>,
    command_rx: Receiver<ClientCommand>,
    self_tx: Sender<ClientCommand>,
    stats: SharedSessionStats,
}

impl SyncWorker {
    pub fn new(
        services: Services,
        config: CoreConfig,
        data_tx: Sender<DataChange>,
        command_rx: Receiver<ClientCommand>,
        self_tx: Sender<ClientCommand>,
        stats: SharedSessionStats,
    ) -> Self {
        let gate = IdentityGate::new(services.identity.clone());
        Self {
            services,
            config,
            gate,
            data_tx,
            command_rx,
            self_tx,
            stats,
        }
    }

    pub fn run(self) {
        let rt = match Runtime::new() {
            Ok(rt) => rt,
            Err(error) => {
                error!(%error, "failed to start sync worker runtime");
                return;
            }
        };
        debug!("sync worker started");

        // Forward identity transitions into the command loop, starting
        // with the current state.
        let mut auth_rx = self.gate.watch();
        let self_tx = self.self_tx.clone();
        rt.spawn(async move {
            let initial = auth_rx.borrow_and_update().clone();
            if self_tx.send(ClientCommand::AuthChanged(initial)).is_err() {
                return;
            }
            while auth_rx.changed().await.is_ok() {
                let user = auth_rx.borrow_and_update().clone();
                if self_tx.send(ClientCommand::AuthChanged(user)).is_err() {
                    break;
                }
            }
        });

        // Background push-messaging bootstrap; carries no message content.
        let push = self.services.push.clone();
        rt.spawn(async move {
            match push.register(PUSH_SENDER_ID).await {
                Ok(()) => debug!("push messaging registered"),
                Err(error) => warn!(%error, "push messaging registration failed"),
            }
        });

        let mut feeds =
            FeedSubscriptions::new(self.services.store.clone(), self.data_tx.clone());
        let uploads = Arc::new(UploadCoordinator::new(
            self.services.store.clone(),
            self.services.blobs.clone(),
            self.config.upload.clone(),
        ));

        loop {
            let Ok(command) = self.command_rx.recv() else {
                break;
            };
            match command {
                ClientCommand::AuthChanged(user) => {
                    let signed_in = user.is_some();
                    let _ = self.data_tx.send(DataChange::AuthState(user));
                    // Sign-in (re)opens both partitions. Sign-out leaves
                    // the subscriptions inert rather than tearing down.
                    if signed_in {
                        if let Err(error) = rt.block_on(self.open_feeds(&mut feeds)) {
                            error!(%error, "failed to open feeds");
                        }
                    }
                }
                ClientCommand::SignIn => {
                    if let Err(error) = rt.block_on(self.gate.sign_in()) {
                        warn!(%error, "interactive sign-in failed");
                    }
                }
                ClientCommand::SignOut => {
                    if let Err(error) = rt.block_on(self.gate.sign_out()) {
                        warn!(%error, "sign-out failed");
                    }
                }
                ClientCommand::SendText { text } => self.handle_send_text(&rt, text),
                ClientCommand::SendImage { file, caption } => {
                    self.handle_send_image(&rt, uploads.clone(), file, caption);
                }
                ClientCommand::Resolve {
                    target,
                    slot,
                    locator,
                } => self.handle_resolve(&rt, target, slot, locator),
                ClientCommand::Shutdown => break,
            }
        }
        debug!("sync worker stopped");
    }

    async fn open_feeds(&self, feeds: &mut FeedSubscriptions) -> Result<(), ChatError> {
        feeds
            .subscribe(
                Partition::Messages,
                &self.config.locality,
                self.config.messages_limit,
            )
            .await?;
        feeds
            .subscribe(
                Partition::Contacts,
                &self.config.locality,
                self.config.contacts_limit,
            )
            .await
    }

    fn reject(&self, error: ChatError) {
        let _ = self.data_tx.send(DataChange::Rejected(error));
    }

    fn handle_send_text(&self, rt: &Runtime, text: String) {
        if text.is_empty() {
            return;
        }
        let user = match self.gate.require_user() {
            Ok(user) => user,
            Err(error) => return self.reject(error),
        };

        let record = MessageRecord {
            name: user.display_name,
            text: Some(text),
            photo_url: user
                .photo_url
                .unwrap_or_else(|| PROFILE_PLACEHOLDER_URL.to_string()),
            image_url: None,
            postal_code: self.config.locality.as_str().to_string(),
            time: Some(chrono::Utc::now().timestamp_millis()),
        };
        let value = match serde_json::to_value(&record) {
            Ok(value) => value,
            Err(error) => {
                error!(%error, "failed to encode message record");
                return;
            }
        };
        match rt.block_on(self.services.store.push(MESSAGES_PARTITION, value)) {
            Ok(_) => {
                self.stats.record(|s| s.texts_sent += 1);
                let _ = self.data_tx.send(DataChange::TextSendAcked);
            }
            // Write failures are logged only; the UI keeps its last state.
            Err(error) => error!(%error, "error writing new message"),
        }
    }

    fn handle_send_image(
        &self,
        rt: &Runtime,
        uploads: Arc<UploadCoordinator>,
        file: ImageFile,
        caption: Option<String>,
    ) {
        // Media-type gate first; an unsupported file never reaches the
        // identity check.
        if let Err(error) = validate_media_type(&file.content_type) {
            return self.reject(error);
        }
        let user = match self.gate.require_user() {
            Ok(user) => user,
            Err(error) => return self.reject(error),
        };

        let pending =
            match rt.block_on(uploads.begin(&user, &self.config.locality, &file, caption)) {
                Ok(pending) => pending,
                Err(error) => {
                    error!(%error, "failed to create placeholder message");
                    return;
                }
            };
        self.stats.record(|s| s.images_sent += 1);

        let stats = self.stats.clone();
        rt.spawn(async move {
            if let Err(error) = uploads.finish(&pending, &file.bytes).await {
                stats.record(|s| s.uploads_failed += 1);
                // Accepted gap: no retraction, no user notice; the
                // placeholder keeps showing the loading sentinel.
                error!(%error, key = %pending.message_key, "error uploading image");
            }
        });
    }

    fn handle_resolve(&self, rt: &Runtime, target: NodeKey, slot: ImageSlot, locator: String) {
        let blobs = self.services.blobs.clone();
        let data_tx = self.data_tx.clone();
        let stats = self.stats.clone();
        rt.spawn(async move {
            match resolver::fetch_download_url(blobs.as_ref(), &locator).await {
                Ok(url) => {
                    stats.record(|s| s.locators_resolved += 1);
                    let _ = data_tx.send(DataChange::Resolved { target, slot, url });
                }
                // No retry: the sentinel stays displayed.
                Err(error) => warn!(%error, %locator, "metadata fetch failed"),
            }
        });
    }
}
