use crate::{GeometrySnapshot, HarvestedRecord, RowIdentity};

/// Observations reported by the engine after executing an effect.
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Begin a harvest on an already loaded page.
    Start,
    /// The scrollable list container was found.
    ContainerLocated,
    /// The container lookup timed out.
    ContainerMissing,
    /// Fresh layout figures.
    GeometryProbed(GeometrySnapshot),
    /// The first row or a layout figure could not be read.
    GeometryUnavailable,
    /// A row was extracted into a record.
    RowHarvested(HarvestedRecord),
    /// A row could not be extracted; `None` when it had no usable identity.
    RowSkipped { identity: Option<RowIdentity> },
    /// All rows of the current window were visited.
    BatchExtracted { rows: usize },
    /// A scroll-by command completed.
    Scrolled,
    /// The expected next row materialized before the timeout.
    GrowthObserved,
    /// The growth-wait timed out.
    GrowthTimedOut,
    /// External cancellation.
    Cancel,
    /// Navigation, script, or driver failure below the harvester.
    SurfaceFault(String),
}
