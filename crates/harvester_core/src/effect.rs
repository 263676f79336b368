use crate::RowIdentity;

/// Commands for the engine to run against the render surface, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LocateContainer,
    ProbeGeometry,
    /// Visit every materialized row and report each unseen one.
    ExtractBatch,
    ScrollBy { px: f64 },
    /// Wait for a row carrying `identity` to materialize.
    AwaitRow { identity: RowIdentity },
}
