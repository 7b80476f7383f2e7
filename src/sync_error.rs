use eyre::Report;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    // Remote reads
    #[error("transport error: {0}")]
    Transport(Report),
    #[error("aggregate returned {got} results for {expected} calls")]
    ResultCountMismatch { expected: usize, got: usize },
    #[error("aggregate answered at block {got}, requested block {expected}")]
    BlockMismatch { expected: u64, got: u64 },

    // Codec
    #[error("abi decode error: {0}")]
    Decode(#[from] alloy_sol_types::Error),
    #[error("value out of range: {0}")]
    OutOfRange(String),
}

impl From<Report> for SyncError {
    fn from(error: Report) -> Self {
        Self::Transport(error)
    }
}

impl SyncError {
    /// Transport level failures are worth retrying at a higher layer, the rest are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::ResultCountMismatch { .. } | Self::BlockMismatch { .. })
    }
}
