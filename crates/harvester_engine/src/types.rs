use std::fmt;

use harvester_core::{DoneReason, ErrorKind, HarvestState, HarvestedRecord, Phase, RowIdentity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestEvent {
    PhaseChanged(Phase),
    RecordHarvested {
        identity: RowIdentity,
    },
    RowSkipped {
        identity: Option<RowIdentity>,
        reason: String,
    },
    Stalled {
        awaited: RowIdentity,
        consecutive: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Done(DoneReason),
    Failed {
        kind: ErrorKind,
        detail: Option<String>,
    },
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Done(reason) => write!(f, "{}", reason.as_str()),
            Completion::Failed {
                kind,
                detail: Some(detail),
            } => write!(f, "{kind}: {detail}"),
            Completion::Failed { kind, detail: None } => write!(f, "{kind}"),
        }
    }
}

/// What a harvest hands back: every record collected, in discovery order,
/// plus why the run stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestOutcome {
    pub records: Vec<HarvestedRecord>,
    pub completion: Completion,
    pub iterations: u32,
    pub skipped_rows: usize,
}

impl HarvestOutcome {
    /// `None` only for a run that confirmed the end of the list.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.completion {
            Completion::Done(DoneReason::StallExceeded) => Some(ErrorKind::StallExceeded),
            Completion::Done(_) => None,
            Completion::Failed { kind, .. } => Some(*kind),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.error_kind().is_none()
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.completion, Completion::Failed { .. })
    }
}

impl From<HarvestState> for HarvestOutcome {
    fn from(state: HarvestState) -> Self {
        let completion = match state.phase() {
            Phase::Done(reason) => Completion::Done(reason),
            Phase::Failed(kind) => Completion::Failed {
                kind,
                detail: state.fault().map(str::to_string),
            },
            phase => Completion::Failed {
                kind: ErrorKind::AdapterFault,
                detail: Some(format!("harvest stopped in phase {phase:?}")),
            },
        };
        let iterations = state.iterations();
        let skipped_rows = state.skipped_rows();

        Self {
            records: state.into_records(),
            completion,
            iterations,
            skipped_rows,
        }
    }
}
