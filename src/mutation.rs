//! Mutation-style adapter for reactive front ends.
//!
//! [`ConvertMutation`] runs conversions through a [`ConvertClient`] and
//! publishes an idle / pending / success / error lifecycle on a watch
//! channel, so a UI can render from the latest state without polling.
//! It adds no retries, caching, or validation of its own; cache scoping is
//! left to the consumer via [`crate::keys::ConvertKeys`].

use anyhow::Result;
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::api::{ApiError, ConversionRequest, ConversionResponse, ConvertClient};

/// Parameters of one conversion, shaped like [`ConversionRequest`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConvertParams {
    pub original: String,
    pub filename: Option<String>,
    pub quality: Option<u8>,
    pub transparent_bg: Option<bool>,
}

impl From<ConversionRequest> for ConvertParams {
    fn from(request: ConversionRequest) -> Self {
        Self {
            original: request.original,
            filename: request.filename,
            quality: request.quality,
            transparent_bg: request.transparent_bg,
        }
    }
}

/// Snapshot of a failed mutation, cheap to clone into every observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationError {
    pub message: String,
    /// Set when the failure was an API error rather than a transport fault.
    pub api: Option<ApiError>,
}

impl MutationError {
    fn from_error(err: &anyhow::Error) -> Self {
        Self {
            message: format!("{:#}", err),
            api: err.downcast_ref::<ApiError>().cloned(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.api.as_ref().map(|api| api.status)
    }
}

impl std::fmt::Display for MutationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    Idle,
    Pending,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MutationState {
    #[default]
    Idle,
    Pending,
    Success(ConversionResponse),
    Error(MutationError),
}

impl MutationState {
    pub fn status(&self) -> MutationStatus {
        match self {
            MutationState::Idle => MutationStatus::Idle,
            MutationState::Pending => MutationStatus::Pending,
            MutationState::Success(_) => MutationStatus::Success,
            MutationState::Error(_) => MutationStatus::Error,
        }
    }

    pub fn data(&self) -> Option<&ConversionResponse> {
        match self {
            MutationState::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&MutationError> {
        match self {
            MutationState::Error(err) => Some(err),
            _ => None,
        }
    }
}

/// Conversion mutation bound to one client.
///
/// Clones share state. When calls overlap, the most recently started one
/// owns the published state; an older call still returns its own outcome
/// to its caller.
#[derive(Clone)]
pub struct ConvertMutation {
    client: ConvertClient,
    sender: Arc<watch::Sender<MutationState>>,
    generation: Arc<AtomicU64>,
}

impl ConvertMutation {
    pub fn new(client: ConvertClient) -> Self {
        let (sender, _) = watch::channel(MutationState::Idle);
        Self {
            client,
            sender: Arc::new(sender),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Runs a conversion, publishing its lifecycle, and returns the outcome.
    #[tracing::instrument(skip(self, params), fields(filename = ?params.filename))]
    pub async fn mutate_async(&self, params: ConvertParams) -> Result<ConversionResponse> {
        let generation = self.begin(MutationState::Pending);

        let ConvertParams {
            original,
            filename,
            quality,
            transparent_bg,
        } = params;
        let result = self
            .client
            .convert_with(original, filename, quality, transparent_bg)
            .await;

        let settled = match &result {
            Ok(response) => MutationState::Success(response.clone()),
            Err(err) => MutationState::Error(MutationError::from_error(err)),
        };
        self.publish(generation, settled);

        result
    }

    /// Fire-and-forget trigger. The outcome lands in the published state;
    /// the handle can still be awaited for it.
    pub fn mutate(&self, params: ConvertParams) -> JoinHandle<Result<ConversionResponse>> {
        let mutation = self.clone();
        tokio::spawn(async move { mutation.mutate_async(params).await })
    }

    /// Returns to idle. A call still in flight will not publish its outcome.
    pub fn reset(&self) {
        self.begin(MutationState::Idle);
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationState> {
        self.sender.subscribe()
    }

    pub fn state(&self) -> MutationState {
        self.sender.borrow().clone()
    }

    pub fn status(&self) -> MutationStatus {
        self.sender.borrow().status()
    }

    pub fn is_idle(&self) -> bool {
        self.status() == MutationStatus::Idle
    }

    pub fn is_pending(&self) -> bool {
        self.status() == MutationStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status() == MutationStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status() == MutationStatus::Error
    }

    pub fn data(&self) -> Option<ConversionResponse> {
        self.sender.borrow().data().cloned()
    }

    pub fn error(&self) -> Option<MutationError> {
        self.sender.borrow().error().cloned()
    }

    /// Takes a new generation and writes `state` in one step under the
    /// channel lock, so a stale writer can never land after a newer one.
    fn begin(&self, state: MutationState) -> u64 {
        let mut generation = 0;
        self.sender.send_modify(|current| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *current = state;
        });
        generation
    }

    fn publish(&self, generation: u64, state: MutationState) {
        // Generations only change inside `begin`, which holds the same lock.
        let published = self.sender.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *current = state;
            true
        });
        if !published {
            debug!("Conversion {} superseded, not publishing", generation);
        }
    }
}
