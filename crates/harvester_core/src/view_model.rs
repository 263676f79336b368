use crate::{Phase, RowIdentity};

/// Progress figures for logging and status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarvestView {
    pub phase: Phase,
    pub records: usize,
    pub skipped: usize,
    pub iterations: u32,
    pub consecutive_stalls: u32,
    pub highest_identity: Option<RowIdentity>,
}
