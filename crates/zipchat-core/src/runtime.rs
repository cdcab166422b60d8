//! UI-side runtime: owns the view state, drains change deliveries from
//! the worker, and hands commands the other way.
//!
//! All reconciliation happens on whichever thread calls the processing
//! methods; the view state is never touched from anywhere else.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::warn;

use crate::config::CoreConfig;
use crate::error::ChatError;
use crate::events::UiEvent;
use crate::models::{Contact, Message};
use crate::services::Services;
use crate::stats::SharedSessionStats;
use crate::store::{Reconciler, ViewState};
use crate::sync::worker::{ClientCommand, DataChange, SyncWorker};

#[derive(Clone)]
pub struct ClientHandle {
    command_tx: Sender<ClientCommand>,
}

impl ClientHandle {
    pub fn send(&self, command: ClientCommand) -> Result<(), mpsc::SendError<ClientCommand>> {
        self.command_tx.send(command)
    }
}

pub struct ClientRuntime {
    reconciler: Reconciler,
    data_rx: Receiver<DataChange>,
    handle: ClientHandle,
    worker_handle: Option<JoinHandle<()>>,
    stats: SharedSessionStats,
}

impl ClientRuntime {
    /// Wires the worker to the injected service handles and starts it.
    /// Fails fast with `ChatError::Setup` when a handle is misconfigured;
    /// the embedding surface turns that into a blocking notice.
    pub fn new(config: CoreConfig, services: Services) -> Result<Self, ChatError> {
        services.check_setup()?;

        let (command_tx, command_rx) = mpsc::channel();
        let (data_tx, data_rx) = mpsc::channel();
        let stats = SharedSessionStats::new();

        let worker = SyncWorker::new(
            services,
            config,
            data_tx,
            command_rx,
            command_tx.clone(),
            stats.clone(),
        );
        let worker_handle = std::thread::spawn(move || worker.run());

        Ok(Self {
            reconciler: Reconciler::new(),
            data_rx,
            handle: ClientHandle { command_tx },
            worker_handle: Some(worker_handle),
            stats,
        })
    }

    pub fn handle(&self) -> ClientHandle {
        self.handle.clone()
    }

    pub fn view(&self) -> &ViewState {
        self.reconciler.view()
    }

    pub fn stats(&self) -> SharedSessionStats {
        self.stats.clone()
    }

    /// Drains every pending delivery without blocking.
    pub fn process_pending(&mut self) -> Vec<UiEvent> {
        let mut events = Vec::new();
        while let Ok(change) = self.data_rx.try_recv() {
            self.apply(change, &mut events);
        }
        self.dispatch_resolutions();
        events
    }

    /// Blocks up to `timeout` for the first delivery, then drains the
    /// rest without blocking.
    pub fn wait_and_process(&mut self, timeout: Duration) -> Vec<UiEvent> {
        let mut events = Vec::new();
        if let Ok(change) = self.data_rx.recv_timeout(timeout) {
            self.apply(change, &mut events);
            while let Ok(change) = self.data_rx.try_recv() {
                self.apply(change, &mut events);
            }
        }
        self.dispatch_resolutions();
        events
    }

    /// Hands indirect locators the reconciler discovered to the worker.
    fn dispatch_resolutions(&mut self) {
        for request in self.reconciler.drain_pending_resolutions() {
            let _ = self.handle.send(ClientCommand::Resolve {
                target: request.target,
                slot: request.slot,
                locator: request.locator,
            });
        }
    }

    fn apply(&mut self, change: DataChange, events: &mut Vec<UiEvent>) {
        match change {
            DataChange::AuthState(user) => self.reconciler.apply_auth_state(user.as_ref()),
            DataChange::Message(record) => {
                match Message::from_change(&record.key, &record.value) {
                    Some(message) => {
                        self.stats.record(|s| s.messages_delivered += 1);
                        self.reconciler.apply_message_change(&message, events);
                    }
                    None => warn!(key = %record.key, "undecodable message record skipped"),
                }
            }
            DataChange::Contact(record) => {
                match Contact::from_change(&record.key, &record.value) {
                    Some(contact) => {
                        self.stats.record(|s| s.contacts_delivered += 1);
                        self.reconciler.apply_contact_change(&contact);
                    }
                    None => warn!(key = %record.key, "undecodable contact record skipped"),
                }
            }
            DataChange::Resolved { target, slot, url } => {
                self.reconciler.apply_resolution(&target, slot, &url, events);
            }
            DataChange::Rejected(error) => {
                warn!(%error, "write rejected");
                if let Some(notice) = UiEvent::for_rejection(&error) {
                    events.push(notice);
                }
            }
            DataChange::TextSendAcked => events.push(UiEvent::ClearCompose),
        }
    }

    pub fn shutdown(&mut self) {
        let _ = self.handle.send(ClientCommand::Shutdown);
        if let Some(worker_handle) = self.worker_handle.take() {
            let _ = worker_handle.join();
        }
    }
}

impl Drop for ClientRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}
