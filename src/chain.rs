//! Chain access: typed mint-event queries over JSON-RPC

use {
    crate::events::{MintEvent, MintExecuted},
    alloy::{
        primitives::Address,
        providers::{DynProvider, Provider, ProviderBuilder},
        rpc::types::{Filter, Log},
        sol_types::SolEvent,
        transports::TransportError,
    },
    async_trait::async_trait,
    std::sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
    thiserror::Error,
};

/// Chain query failure; the engine skips the current cycle on these and
/// retries on the next scheduled poll.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("rpc error: {0}")]
    Rpc(#[from] TransportError),
}

/// Source of mint events and chain height.
///
/// `events` returns the inclusive range fully decoded and in canonical
/// order: ascending block, then ascending log index.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn latest_block(&self) -> Result<u64, SourceError>;
    async fn events(&self, from_block: u64, to_block: u64)
        -> Result<Vec<MintEvent>, SourceError>;
}

/// JSON-RPC source filtering on the tracked contract.
pub struct RpcEventSource {
    provider: DynProvider,
    contract: Address,
}

impl RpcEventSource {
    pub async fn connect(rpc_url: &str, contract: Address) -> Result<Self, SourceError> {
        let provider = ProviderBuilder::new().connect(rpc_url).await?.erased();
        Ok(Self { provider, contract })
    }
}

#[async_trait]
impl EventSource for RpcEventSource {
    async fn latest_block(&self) -> Result<u64, SourceError> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<MintEvent>, SourceError> {
        let filter = Filter::new()
            .select(from_block..=to_block)
            .address(self.contract)
            .event_signature(MintExecuted::SIGNATURE_HASH);
        let logs = self.provider.get_logs(&filter).await?;
        Ok(decode_logs(&logs))
    }
}

/// Decode a batch of raw logs into typed events. A log that does not form a
/// complete event is skipped with a diagnostic; one bad log never takes the
/// batch down with it.
fn decode_logs(logs: &[Log]) -> Vec<MintEvent> {
    let mut events = Vec::with_capacity(logs.len());
    for log in logs {
        match MintEvent::from_log(log) {
            Ok(event) => events.push(event),
            Err(e) => {
                log::warn!(
                    "⚠️ Skipping undecodable log in block {:?}: {}",
                    log.block_number,
                    e
                );
            }
        }
    }
    // Providers are expected to return canonical order already; sort so
    // downstream ordering never depends on provider behavior.
    events.sort_by_key(|event| (event.block_number, event.log_index));
    events
}

/// Fixed in-memory source. Backs the test suites and offline runs where no
/// RPC endpoint is available; blocks and events are scripted by the caller.
#[derive(Debug, Default)]
pub struct StaticEventSource {
    head: AtomicU64,
    events: Mutex<Vec<MintEvent>>,
}

impl StaticEventSource {
    pub fn new(head: u64) -> Self {
        Self {
            head: AtomicU64::new(head),
            ..Self::default()
        }
    }

    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    pub fn push_event(&self, event: MintEvent) {
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push(event);
    }
}

#[async_trait]
impl EventSource for StaticEventSource {
    async fn latest_block(&self) -> Result<u64, SourceError> {
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn events(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<MintEvent>, SourceError> {
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let mut matching: Vec<MintEvent> = events
            .iter()
            .filter(|event| event.block_number >= from_block && event.block_number <= to_block)
            .cloned()
            .collect();
        matching.sort_by_key(|event| (event.block_number, event.log_index));
        Ok(matching)
    }
}
