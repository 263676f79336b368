use std::fmt;

use crate::view_model::HarvestView;
use crate::{GeometrySnapshot, HarvestPolicy, HarvestedRecord, ResultSet, RowIdentity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    LocateContainer,
    ProbeGeometry,
    Extract,
    Advance,
    AwaitGrowth,
    Done(DoneReason),
    Failed(ErrorKind),
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done(_) | Phase::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    /// The viewport reached the bottom of the scroll track.
    EndOfList,
    /// The scroll track got shorter; treated as the end of the list.
    TrackShrank,
    /// Too many consecutive growth-waits timed out; the result may be incomplete.
    StallExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ContainerNotFound,
    GeometryUnavailable,
    RowExtractionError,
    StallExceeded,
    Cancelled,
    AdapterFault,
}

impl DoneReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoneReason::EndOfList => "end_of_list",
            DoneReason::TrackShrank => "track_shrank",
            DoneReason::StallExceeded => "stall_exceeded",
        }
    }
}

impl ErrorKind {
    /// Stable snake_case name for machine consumers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ContainerNotFound => "container_not_found",
            ErrorKind::GeometryUnavailable => "geometry_unavailable",
            ErrorKind::RowExtractionError => "row_extraction_error",
            ErrorKind::StallExceeded => "stall_exceeded",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::AdapterFault => "adapter_fault",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::ContainerNotFound => write!(f, "list container not found"),
            ErrorKind::GeometryUnavailable => write!(f, "list geometry unavailable"),
            ErrorKind::RowExtractionError => write!(f, "row extraction failed"),
            ErrorKind::StallExceeded => write!(f, "stall limit exceeded"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
            ErrorKind::AdapterFault => write!(f, "render surface fault"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HarvestState {
    policy: HarvestPolicy,
    phase: Phase,
    results: ResultSet,
    geometry: Option<GeometrySnapshot>,
    track_shrank: bool,
    last_step: f64,
    iterations: u32,
    consecutive_stalls: u32,
    total_stalls: u32,
    unidentified_rows: u32,
    fault: Option<String>,
}

impl Default for HarvestState {
    fn default() -> Self {
        Self::new(HarvestPolicy::default())
    }
}

impl HarvestState {
    pub fn new(policy: HarvestPolicy) -> Self {
        Self {
            policy,
            phase: Phase::Init,
            results: ResultSet::new(),
            geometry: None,
            track_shrank: false,
            last_step: 0.0,
            iterations: 0,
            consecutive_stalls: 0,
            total_stalls: 0,
            unidentified_rows: 0,
            fault: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn policy(&self) -> &HarvestPolicy {
        &self.policy
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn records(&self) -> &[HarvestedRecord] {
        self.results.records()
    }

    pub fn into_records(self) -> Vec<HarvestedRecord> {
        self.results.into_records()
    }

    /// Membership test done before a row is extracted.
    pub fn should_extract(&self, identity: RowIdentity) -> bool {
        self.results.is_unseen(identity)
    }

    pub fn geometry(&self) -> Option<&GeometrySnapshot> {
        self.geometry.as_ref()
    }

    /// Identity whose materialization proves that a scroll step surfaced new rows.
    pub fn expected_identity(&self) -> RowIdentity {
        self.results.highest().map_or(0, |h| h.saturating_add(1))
    }

    pub fn last_step(&self) -> f64 {
        self.last_step
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn consecutive_stalls(&self) -> u32 {
        self.consecutive_stalls
    }

    pub fn total_stalls(&self) -> u32 {
        self.total_stalls
    }

    /// Rows skipped because extraction failed, with or without a usable identity.
    pub fn skipped_rows(&self) -> usize {
        self.results.skipped_count() + self.unidentified_rows as usize
    }

    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Machine-readable reason for an incomplete run; `None` when the list was
    /// confirmed complete or the run is still going.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self.phase {
            Phase::Done(DoneReason::StallExceeded) => Some(ErrorKind::StallExceeded),
            Phase::Failed(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn view(&self) -> HarvestView {
        HarvestView {
            phase: self.phase,
            records: self.results.len(),
            skipped: self.skipped_rows(),
            iterations: self.iterations,
            consecutive_stalls: self.consecutive_stalls,
            highest_identity: self.results.highest(),
        }
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub(crate) fn fail(&mut self, kind: ErrorKind, detail: Option<String>) {
        self.phase = Phase::Failed(kind);
        self.fault = detail;
    }

    pub(crate) fn results_mut(&mut self) -> &mut ResultSet {
        &mut self.results
    }

    /// Stores a fresh snapshot, remembering whether the track shrank since the last one.
    pub(crate) fn record_geometry(&mut self, snapshot: GeometrySnapshot) {
        if let Some(previous) = self.geometry.as_ref() {
            if snapshot.shrank_since(previous) {
                self.track_shrank = true;
            }
        }
        self.geometry = Some(snapshot);
    }

    pub(crate) fn track_shrank(&self) -> bool {
        self.track_shrank
    }

    pub(crate) fn begin_step(&mut self, step: f64) {
        self.last_step = step;
        self.iterations += 1;
    }

    pub(crate) fn count_unidentified_row(&mut self) {
        self.unidentified_rows += 1;
    }

    /// Returns the consecutive stall count after this stall.
    pub(crate) fn register_stall(&mut self) -> u32 {
        self.consecutive_stalls += 1;
        self.total_stalls += 1;
        self.consecutive_stalls
    }

    pub(crate) fn clear_stalls(&mut self) {
        self.consecutive_stalls = 0;
    }
}
