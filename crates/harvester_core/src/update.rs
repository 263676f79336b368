use crate::{DoneReason, Effect, ErrorKind, HarvestState, Msg, Phase};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not fit the current phase are ignored, and a finished
/// harvest ignores everything.
pub fn update(mut state: HarvestState, msg: Msg) -> (HarvestState, Vec<Effect>) {
    if state.is_finished() {
        return (state, Vec::new());
    }

    let effects = match (state.phase(), msg) {
        (_, Msg::Cancel) => {
            state.fail(ErrorKind::Cancelled, None);
            Vec::new()
        }
        (_, Msg::SurfaceFault(detail)) => {
            state.fail(ErrorKind::AdapterFault, Some(detail));
            Vec::new()
        }
        (Phase::Init, Msg::Start) => {
            state.set_phase(Phase::LocateContainer);
            vec![Effect::LocateContainer]
        }
        (Phase::LocateContainer, Msg::ContainerLocated) => {
            state.set_phase(Phase::ProbeGeometry);
            vec![Effect::ProbeGeometry]
        }
        (Phase::LocateContainer, Msg::ContainerMissing) => {
            state.fail(ErrorKind::ContainerNotFound, None);
            Vec::new()
        }
        (Phase::ProbeGeometry, Msg::GeometryProbed(snapshot)) => {
            state.record_geometry(snapshot);
            state.set_phase(Phase::Extract);
            vec![Effect::ExtractBatch]
        }
        (Phase::ProbeGeometry, Msg::GeometryUnavailable) => {
            state.fail(ErrorKind::GeometryUnavailable, None);
            Vec::new()
        }
        (Phase::Extract, Msg::RowHarvested(record)) => {
            state.results_mut().insert(record);
            Vec::new()
        }
        (Phase::Extract, Msg::RowSkipped { identity }) => {
            match identity {
                Some(identity) => {
                    state.results_mut().mark_skipped(identity);
                }
                None => state.count_unidentified_row(),
            }
            Vec::new()
        }
        (Phase::Extract, Msg::BatchExtracted { rows }) => finish_batch(&mut state, rows),
        (Phase::Advance, Msg::Scrolled) => {
            state.set_phase(Phase::AwaitGrowth);
            vec![Effect::AwaitRow {
                identity: state.expected_identity(),
            }]
        }
        (Phase::AwaitGrowth, Msg::GrowthObserved) => {
            state.clear_stalls();
            state.set_phase(Phase::ProbeGeometry);
            vec![Effect::ProbeGeometry]
        }
        (Phase::AwaitGrowth, Msg::GrowthTimedOut) => {
            let stalls = state.register_stall();
            if stalls >= state.policy().max_stall_retries {
                state.set_phase(Phase::Done(DoneReason::StallExceeded));
                Vec::new()
            } else {
                state.set_phase(Phase::ProbeGeometry);
                vec![
                    Effect::ScrollBy {
                        px: state.last_step() / 2.0,
                    },
                    Effect::ProbeGeometry,
                ]
            }
        }
        _ => Vec::new(),
    };

    (state, effects)
}

/// Decides, after a window was extracted, whether to stop or scroll further.
fn finish_batch(state: &mut HarvestState, rows: usize) -> Vec<Effect> {
    if state.track_shrank() {
        state.set_phase(Phase::Done(DoneReason::TrackShrank));
        return Vec::new();
    }

    let Some(geometry) = state.geometry().copied() else {
        state.fail(ErrorKind::GeometryUnavailable, None);
        return Vec::new();
    };

    if !geometry.has_more() {
        state.set_phase(Phase::Done(DoneReason::EndOfList));
        return Vec::new();
    }

    let step = state.policy().scroll_step(geometry.row_height, rows);
    state.begin_step(step);
    state.set_phase(Phase::Advance);
    vec![Effect::ScrollBy { px: step }]
}
