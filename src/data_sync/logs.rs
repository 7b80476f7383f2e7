use crate::data_sync::codec::ISmardexPair;
use alloy_primitives::{Address, B256, Bytes};
use alloy_sol_types::SolEvent;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Raw log as delivered by the log feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub block_number: u64,
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

impl LogEntry {
    pub fn new(block_number: u64, address: Address, topics: Vec<B256>, data: Bytes) -> Self {
        Self { block_number, address, topics, data }
    }

    pub fn topic0(&self) -> Option<&B256> {
        self.topics.first()
    }

    /// Decodes the payload as event `E`.
    pub fn decode<E: SolEvent>(&self) -> Result<E, alloy_sol_types::Error> {
        E::decode_raw_log(self.topics.iter().copied(), &self.data)
    }
}

/// Events a venue reacts to, resolved once from the signature topic.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, Hash, EnumIter)]
pub enum EventKind {
    /// Carries real and fictive reserves and the price averages.
    Sync,
    /// Carries the new fee schedule only.
    FeesChanged,
}

impl EventKind {
    pub fn from_topic(topic: &B256) -> Option<Self> {
        if *topic == ISmardexPair::Sync::SIGNATURE_HASH {
            Some(EventKind::Sync)
        } else if *topic == ISmardexPair::FeesChanged::SIGNATURE_HASH {
            Some(EventKind::FeesChanged)
        } else {
            None
        }
    }

    pub fn from_log(log: &LogEntry) -> Option<Self> {
        log.topic0().and_then(Self::from_topic)
    }

    pub fn signature_hash(&self) -> B256 {
        match self {
            EventKind::Sync => ISmardexPair::Sync::SIGNATURE_HASH,
            EventKind::FeesChanged => ISmardexPair::FeesChanged::SIGNATURE_HASH,
        }
    }

    /// Whether the payload alone describes the reserves, as opposed to patching a few fields.
    pub fn is_self_sufficient(&self) -> bool {
        match self {
            EventKind::Sync => true,
            EventKind::FeesChanged => false,
        }
    }
}
