//! Typed mint events extracted from contract logs

use {
    alloy::{
        primitives::{Address, B256, U256},
        rpc::types::Log,
        sol,
    },
    thiserror::Error,
};

sol! {
    /// Emitted by the tracked contract once per executed mint.
    #[derive(Debug)]
    event MintExecuted(address indexed user, uint256 amount, uint32 indexed cycleId);
}

/// A fully decoded mint event together with its on-chain position.
///
/// Every field is validated at the decode boundary; a log that cannot
/// produce all of them is rejected instead of carried around half-typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintEvent {
    pub user: Address,
    pub amount: U256,
    pub cycle_id: u32,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

/// Why a raw log could not become a [`MintEvent`].
#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("log does not decode as MintExecuted: {0}")]
    Abi(#[from] alloy::sol_types::Error),
    #[error("log missing {0}")]
    MissingField(&'static str),
}

impl MintEvent {
    /// Decode a raw RPC log, requiring the positional fields that make up
    /// the dedup identity. Pending logs lack them, and the engine only ever
    /// queries mined ranges, so a miss here is a malformed response.
    pub fn from_log(log: &Log) -> Result<Self, EventDecodeError> {
        let decoded = log.log_decode::<MintExecuted>()?;

        let tx_hash = log
            .transaction_hash
            .ok_or(EventDecodeError::MissingField("transactionHash"))?;
        let log_index = log
            .log_index
            .ok_or(EventDecodeError::MissingField("logIndex"))?;
        let block_number = log
            .block_number
            .ok_or(EventDecodeError::MissingField("blockNumber"))?;

        let event = decoded.inner.data;
        Ok(Self {
            user: event.user,
            amount: event.amount,
            cycle_id: event.cycleId,
            block_number,
            tx_hash,
            log_index,
        })
    }

    /// Dedup ledger identity: `"<transactionHash>-<logIndex>"`.
    pub fn event_id(&self) -> String {
        format!("{}-{}", self.tx_hash, self.log_index)
    }
}
