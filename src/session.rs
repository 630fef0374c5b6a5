//! The command loop.
//!
//! Every external event becomes one [`Command`] on an mpsc queue. A single
//! task drains the queue, so pipeline runs never overlap; each command gets
//! exactly one [`SessionEvent`] back on its oneshot responder.

use crate::config::ResolverConfig;
use crate::dex::Dex;
use crate::errors::SessionError;
use crate::payload::BattlePayload;
use crate::pipeline::{process_message, MessageOutcome, PipelineInputs, SkipReason};
use crate::reconcile::Reconciler;
use crate::settings::PartialSettings;
use crate::storage::{plan_transfer, TransferKind, TransferSelection};
use crate::store::{StateStore, StoreClient, StorePatch, StoreSnapshot};
use crate::summary::TeamSummary;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub enum Command {
    MessageReceived {
        message_id: u64,
        text: String,
        respond: oneshot::Sender<SessionEvent>,
    },
    SetLeader {
        slot: u8,
        respond: oneshot::Sender<SessionEvent>,
    },
    UpdateSettings {
        flags: PartialSettings,
        respond: oneshot::Sender<SessionEvent>,
    },
    TransferStorage {
        selection: TransferSelection,
        respond: oneshot::Sender<SessionEvent>,
    },
    Refresh {
        respond: oneshot::Sender<SessionEvent>,
    },
    /// The conversation changed; forget handled messages and cooldowns.
    Reset {
        respond: oneshot::Sender<SessionEvent>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipCause {
    NoDeclaration,
    AlreadyRendered,
    AlreadyHandled,
    CoolingDown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    PayloadReady {
        message_id: u64,
        message: String,
        payload: Box<BattlePayload>,
    },
    Skipped(SkipCause),
    /// Refused before any store mutation.
    Rejected(String),
    Updated {
        paths: usize,
    },
    Transferred {
        kind: TransferKind,
        uploaded: Vec<String>,
        downloaded: Vec<String>,
    },
    StateBroadcast {
        document: Value,
        summary: String,
    },
    Cleared,
}

/// Released by elapsed time, not by completion of the guarded work.
#[derive(Debug)]
struct Cooldown {
    period: Duration,
    until: Option<Instant>,
}

impl Cooldown {
    fn new(period: Duration) -> Self {
        Self {
            period,
            until: None,
        }
    }

    fn try_acquire(&mut self) -> bool {
        let now = Instant::now();
        if self.until.is_some_and(|until| now < until) {
            return false;
        }
        self.until = Some(now + self.period);
        true
    }

    fn clear(&mut self) {
        self.until = None;
    }
}

/// Cloneable sender side of the session.
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<Command>,
}

impl SessionHandle {
    async fn request<F>(&self, build: F) -> Result<SessionEvent, SessionError>
    where
        F: FnOnce(oneshot::Sender<SessionEvent>) -> Command,
    {
        let (respond, response) = oneshot::channel();
        self.sender
            .send(build(respond))
            .await
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)
    }

    pub async fn message_received(
        &self,
        message_id: u64,
        text: impl Into<String>,
    ) -> Result<SessionEvent, SessionError> {
        let text = text.into();
        self.request(|respond| Command::MessageReceived {
            message_id,
            text,
            respond,
        })
        .await
    }

    pub async fn set_leader(&self, slot: u8) -> Result<SessionEvent, SessionError> {
        self.request(|respond| Command::SetLeader { slot, respond }).await
    }

    pub async fn update_settings(&self, flags: PartialSettings) -> Result<SessionEvent, SessionError> {
        self.request(|respond| Command::UpdateSettings { flags, respond })
            .await
    }

    pub async fn transfer_storage(
        &self,
        selection: TransferSelection,
    ) -> Result<SessionEvent, SessionError> {
        self.request(|respond| Command::TransferStorage { selection, respond })
            .await
    }

    pub async fn refresh(&self) -> Result<SessionEvent, SessionError> {
        self.request(|respond| Command::Refresh { respond }).await
    }

    pub async fn reset(&self) -> Result<SessionEvent, SessionError> {
        self.request(|respond| Command::Reset { respond }).await
    }
}

pub struct Session {
    dex: &'static Dex,
    config: Arc<ResolverConfig>,
    store: StoreClient,
    rng: StdRng,
    last_handled: Option<u64>,
    leader_cooldown: Cooldown,
    settings_cooldown: Cooldown,
}

impl Session {
    pub fn new(config: Arc<ResolverConfig>, store: Arc<dyn StateStore>, rng: StdRng) -> Self {
        Self {
            dex: Dex::compiled(),
            store: StoreClient::new(store, &config.store),
            leader_cooldown: Cooldown::new(config.session.leader_cooldown()),
            settings_cooldown: Cooldown::new(config.session.settings_cooldown()),
            config,
            rng,
            last_handled: None,
        }
    }

    /// Starts the loop on its own task. The loop ends when every handle is
    /// dropped.
    pub fn spawn(
        config: Arc<ResolverConfig>,
        store: Arc<dyn StateStore>,
        seed: Option<u64>,
    ) -> (SessionHandle, JoinHandle<()>) {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let (sender, receiver) = mpsc::channel(config.session.queue_depth.max(1));
        let session = Session::new(config, store, rng);
        let task = tokio::spawn(session.run(receiver));
        (SessionHandle { sender }, task)
    }

    pub async fn run(mut self, mut receiver: mpsc::Receiver<Command>) {
        info!("session started");
        while let Some(command) = receiver.recv().await {
            let (event, respond) = match command {
                Command::MessageReceived {
                    message_id,
                    text,
                    respond,
                } => (self.on_message(message_id, &text).await, respond),
                Command::SetLeader { slot, respond } => (self.on_set_leader(slot).await, respond),
                Command::UpdateSettings { flags, respond } => {
                    (self.on_update_settings(&flags).await, respond)
                }
                Command::TransferStorage { selection, respond } => {
                    (self.on_transfer(&selection).await, respond)
                }
                Command::Refresh { respond } => (self.on_refresh().await, respond),
                Command::Reset { respond } => (self.on_reset(), respond),
            };
            if respond.send(event).is_err() {
                debug!("command sender went away before the response");
            }
        }
        info!("session stopped");
    }

    /// Reads the store and folds pending deltas in memory. Nothing is written;
    /// the returned snapshot already reflects the returned patch.
    async fn reconciled_snapshot(&mut self) -> Option<(StoreSnapshot, StorePatch)> {
        let mut snapshot = self.store.read().await?;
        let mut player = snapshot.player();
        let patch = Reconciler::new(&self.config.reconcile).reconcile(&mut player, &mut self.rng);
        snapshot.apply(&patch);
        Some((snapshot, patch))
    }

    /// Resolves against the reconciled snapshot. The reconciliation patch is
    /// written in the background only once a payload was rendered.
    async fn on_message(&mut self, message_id: u64, text: &str) -> SessionEvent {
        if self.last_handled == Some(message_id) {
            debug!(message_id, "message already handled");
            return SessionEvent::Skipped(SkipCause::AlreadyHandled);
        }

        let (snapshot, patch) = self
            .reconciled_snapshot()
            .await
            .unwrap_or_else(|| (StoreSnapshot::default(), StorePatch::new()));
        let stored = snapshot.player();
        let inputs = PipelineInputs {
            dex: self.dex,
            config: &self.config,
            stored: &stored,
            world_state: snapshot.world_state(),
        };

        match process_message(text, inputs, &mut self.rng) {
            Ok(MessageOutcome::Rendered { message, payload }) => {
                self.last_handled = Some(message_id);
                drop(self.store.write(patch, snapshot.layout()));
                info!(message_id, "battle payload ready");
                SessionEvent::PayloadReady {
                    message_id,
                    message,
                    payload,
                }
            }
            Ok(MessageOutcome::Skipped(reason)) => SessionEvent::Skipped(match reason {
                SkipReason::NoDeclaration => SkipCause::NoDeclaration,
                SkipReason::AlreadyRendered => SkipCause::AlreadyRendered,
            }),
            Err(e) => {
                warn!(message_id, error = %e, "battle declaration discarded");
                SessionEvent::Rejected(e.to_string())
            }
        }
    }

    async fn on_set_leader(&mut self, slot: u8) -> SessionEvent {
        if !self.leader_cooldown.try_acquire() {
            return SessionEvent::Skipped(SkipCause::CoolingDown);
        }
        let Some(snapshot) = self.store.read().await else {
            return SessionEvent::Rejected("store unavailable".to_string());
        };
        let player = snapshot.player();
        if !player.party.iter().any(|e| e.slot == Some(slot)) {
            return SessionEvent::Rejected(format!("slot{} is empty", slot));
        }

        let mut patch = StorePatch::new();
        for entry in &player.party {
            if let Some(path) = entry.store_path() {
                patch.set(format!("{}.isLead", path), entry.slot == Some(slot));
            }
        }
        info!(slot, "leader changed");
        self.write_and_wait(patch, &snapshot).await
    }

    async fn on_update_settings(&mut self, flags: &PartialSettings) -> SessionEvent {
        if !self.settings_cooldown.try_acquire() {
            return SessionEvent::Skipped(SkipCause::CoolingDown);
        }
        if flags.is_empty() {
            return SessionEvent::Rejected("no recognised settings".to_string());
        }
        let Some(snapshot) = self.store.read().await else {
            return SessionEvent::Rejected("store unavailable".to_string());
        };
        let mut patch = StorePatch::new();
        for (flag, enabled) in &flags.0 {
            let name: &str = flag.as_ref();
            patch.set(format!("settings.{}", name), *enabled);
        }
        self.write_and_wait(patch, &snapshot).await
    }

    async fn on_transfer(&mut self, selection: &TransferSelection) -> SessionEvent {
        let Some(snapshot) = self.store.read().await else {
            return SessionEvent::Rejected("store unavailable".to_string());
        };
        let plan = match plan_transfer(snapshot.document(), selection) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "storage transfer rejected");
                return SessionEvent::Rejected(e.to_string());
            }
        };
        match self.write_and_wait(plan.patch, &snapshot).await {
            SessionEvent::Updated { .. } => SessionEvent::Transferred {
                kind: plan.kind,
                uploaded: plan.uploaded,
                downloaded: plan.downloaded,
            },
            other => other,
        }
    }

    async fn on_refresh(&mut self) -> SessionEvent {
        let Some((snapshot, patch)) = self.reconciled_snapshot().await else {
            return SessionEvent::Rejected("store unavailable".to_string());
        };
        if let Ok(Err(e)) = self.store.write(patch, snapshot.layout()).await {
            warn!(error = %e, "reconciliation write failed");
        }
        let player = snapshot.player();
        let summary = TeamSummary::new(&player, &self.config.tags.declaration).to_string();
        SessionEvent::StateBroadcast {
            document: snapshot.document().clone(),
            summary,
        }
    }

    fn on_reset(&mut self) -> SessionEvent {
        self.last_handled = None;
        self.leader_cooldown.clear();
        self.settings_cooldown.clear();
        info!("session state cleared");
        SessionEvent::Cleared
    }

    async fn write_and_wait(&self, patch: StorePatch, snapshot: &StoreSnapshot) -> SessionEvent {
        let paths = patch.len();
        match self.store.write(patch, snapshot.layout()).await {
            Ok(Ok(())) => SessionEvent::Updated { paths },
            Ok(Err(e)) => SessionEvent::Rejected(e.to_string()),
            Err(e) => SessionEvent::Rejected(format!("store write task failed: {}", e)),
        }
    }
}
