use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{error, warn};
use uuid::Uuid;

use crate::duel::{GeneratedDuel, Resolution};
use crate::EngineError;

/// Something players should hear about once it has been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DuelEvent {
    Created {
        match_id: Uuid,
        duel_id: Uuid,
        challenger_id: Uuid,
        rival_id: Uuid,
        rating_diff: String,
        at: DateTime<Utc>,
    },
    Resolved {
        match_id: Uuid,
        resolution: Resolution,
        at: DateTime<Utc>,
    },
}

impl DuelEvent {
    pub fn created(generated: &GeneratedDuel) -> Self {
        DuelEvent::Created {
            match_id: generated.duel.match_id,
            duel_id: generated.duel.duel_id,
            challenger_id: generated.duel.challenger_id,
            rival_id: generated.duel.rival_id,
            rating_diff: generated.details.rating_diff.clone(),
            at: Utc::now(),
        }
    }

    pub fn resolved(match_id: Uuid, resolution: Resolution) -> Self {
        DuelEvent::Resolved {
            match_id,
            resolution,
            at: Utc::now(),
        }
    }

    /// The JSON body handed to the push dispatcher.
    pub fn payload(&self) -> Result<serde_json::Value, EngineError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Sends duel events to a dispatcher without ever waiting on it.
#[derive(Debug, Clone)]
pub struct DuelNotifier {
    sender: UnboundedSender<DuelEvent>,
}

impl DuelNotifier {
    pub fn new(sender: UnboundedSender<DuelEvent>) -> Self {
        Self { sender }
    }

    /// Queues an event. A closed dispatcher is logged and otherwise ignored.
    pub fn emit(&self, event: DuelEvent) {
        if let Err(e) = self.sender.send(event) {
            warn!("Duel event dropped, the dispatcher is gone: {:?}", e.0);
        }
    }
}

/// Creates a notifier and the receiving end for a custom consumer.
pub fn channel() -> (DuelNotifier, UnboundedReceiver<DuelEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (DuelNotifier::new(sender), receiver)
}

/// Spawns a task that feeds every emitted event to `handler`.
///
/// Handler failures are logged and never reach the code that emitted the event.
/// The task ends once every notifier has been dropped.
pub fn spawn_dispatcher<F, Fut>(handler: F) -> (DuelNotifier, JoinHandle<()>)
where
    F: Fn(DuelEvent) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), EngineError>> + Send + 'static,
{
    let (notifier, mut receiver) = channel();
    let handle = tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            if let Err(e) = handler(event).await {
                error!("Error dispatching duel event: {:#}", e);
            }
        }
    });
    (notifier, handle)
}
