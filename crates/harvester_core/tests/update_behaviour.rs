use std::sync::Once;

use harvester_core::{
    update, DoneReason, Effect, ErrorKind, GeometrySnapshot, HarvestPolicy, HarvestState,
    HarvestedRecord, Msg, Phase,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn geometry(scroll_offset: f64, document_height: f64) -> GeometrySnapshot {
    GeometrySnapshot {
        row_height: 50.0,
        viewport_height: 100.0,
        document_height,
        scroll_offset,
    }
}

fn record(identity: u64) -> HarvestedRecord {
    HarvestedRecord {
        identity,
        link: format!("https://jobs.example.com/offer/{identity}"),
        title: format!("Position {identity}"),
        organization: "Acme".to_string(),
    }
}

fn apply(state: HarvestState, msgs: Vec<Msg>) -> (HarvestState, Vec<Effect>) {
    let mut state = state;
    let mut last = Vec::new();
    for msg in msgs {
        let (next, effects) = update(state, msg);
        state = next;
        last = effects;
    }
    (state, last)
}

/// Drives a fresh state up to the first extraction with the given snapshot.
fn extracting(policy: HarvestPolicy, snapshot: GeometrySnapshot) -> HarvestState {
    let (state, effects) = apply(
        HarvestState::new(policy),
        vec![
            Msg::Start,
            Msg::ContainerLocated,
            Msg::GeometryProbed(snapshot),
        ],
    );
    assert_eq!(effects, vec![Effect::ExtractBatch]);
    assert_eq!(state.phase(), Phase::Extract);
    state
}

fn harvest_batch(state: HarvestState, identities: &[u64]) -> (HarvestState, Vec<Effect>) {
    let mut msgs: Vec<Msg> = identities.iter().map(|id| Msg::RowHarvested(record(*id))).collect();
    msgs.push(Msg::BatchExtracted {
        rows: identities.len(),
    });
    apply(state, msgs)
}

#[test]
fn start_locates_container_then_probes_geometry() {
    init_logging();
    let (state, effects) = update(HarvestState::default(), Msg::Start);
    assert_eq!(state.phase(), Phase::LocateContainer);
    assert_eq!(effects, vec![Effect::LocateContainer]);

    let (state, effects) = update(state, Msg::ContainerLocated);
    assert_eq!(state.phase(), Phase::ProbeGeometry);
    assert_eq!(effects, vec![Effect::ProbeGeometry]);
}

#[test]
fn missing_container_is_fatal() {
    init_logging();
    let (state, effects) = apply(
        HarvestState::default(),
        vec![Msg::Start, Msg::ContainerMissing],
    );
    assert_eq!(state.phase(), Phase::Failed(ErrorKind::ContainerNotFound));
    assert_eq!(state.error_kind(), Some(ErrorKind::ContainerNotFound));
    assert!(state.records().is_empty());
    assert!(effects.is_empty());
}

#[test]
fn unavailable_geometry_is_fatal() {
    init_logging();
    let (state, _) = apply(
        HarvestState::default(),
        vec![Msg::Start, Msg::ContainerLocated, Msg::GeometryUnavailable],
    );
    assert_eq!(state.phase(), Phase::Failed(ErrorKind::GeometryUnavailable));
}

#[test]
fn same_identity_twice_yields_one_record() {
    init_logging();
    let state = extracting(HarvestPolicy::default(), geometry(0.0, 300.0));
    let mut duplicate = record(4);
    duplicate.title = "Changed".to_string();

    let (state, _) = apply(
        state,
        vec![
            Msg::RowHarvested(record(4)),
            Msg::RowHarvested(duplicate),
            Msg::RowHarvested(record(4)),
        ],
    );

    assert_eq!(state.records(), &[record(4)]);
    assert!(!state.should_extract(4));
}

#[test]
fn increasing_identities_keep_discovery_order() {
    init_logging();
    let state = extracting(HarvestPolicy::default(), geometry(0.0, 300.0));
    let (state, _) = apply(
        state,
        (0..6).map(|id| Msg::RowHarvested(record(id))).collect(),
    );

    let ids: Vec<_> = state.records().iter().map(|r| r.identity).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn first_probe_at_end_finishes_without_scrolling() {
    init_logging();
    let state = extracting(HarvestPolicy::default(), geometry(0.0, 100.0));
    let (state, effects) = harvest_batch(state, &[0, 1]);

    assert_eq!(state.phase(), Phase::Done(DoneReason::EndOfList));
    assert_eq!(state.iterations(), 0);
    assert_eq!(state.error_kind(), None);
    assert_eq!(state.records().len(), 2);
    assert!(effects.is_empty());
}

#[test]
fn batch_scrolls_by_measured_height_times_rows() {
    init_logging();
    let state = extracting(HarvestPolicy::default(), geometry(0.0, 300.0));
    let (state, effects) = harvest_batch(state, &[0, 1, 2]);

    assert_eq!(state.phase(), Phase::Advance);
    assert_eq!(effects, vec![Effect::ScrollBy { px: 150.0 }]);

    let (state, effects) = update(state, Msg::Scrolled);
    assert_eq!(state.phase(), Phase::AwaitGrowth);
    assert_eq!(effects, vec![Effect::AwaitRow { identity: 3 }]);

    let (state, effects) = update(state, Msg::GrowthObserved);
    assert_eq!(state.phase(), Phase::ProbeGeometry);
    assert_eq!(effects, vec![Effect::ProbeGeometry]);

    let (state, _) = update(state, Msg::GeometryProbed(geometry(150.0, 300.0)));
    let (state, effects) = harvest_batch(state, &[2, 3, 4, 5]);
    assert_eq!(effects, vec![Effect::ScrollBy { px: 200.0 }]);

    let (state, _) = apply(
        state,
        vec![
            Msg::Scrolled,
            Msg::GrowthObserved,
            Msg::GeometryProbed(geometry(200.0, 300.0)),
        ],
    );
    let (state, effects) = harvest_batch(state, &[4, 5]);

    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Done(DoneReason::EndOfList));
    let ids: Vec<_> = state.records().iter().map(|r| r.identity).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(state.iterations(), 2);
}

#[test]
fn loop_guard_uses_the_latest_track_height() {
    init_logging();
    let state = extracting(HarvestPolicy::default(), geometry(0.0, 300.0));
    let (state, _) = harvest_batch(state, &[0, 1]);
    let (awaiting, _) = apply(state, vec![Msg::Scrolled, Msg::GrowthObserved]);
    assert_eq!(awaiting.phase(), Phase::ProbeGeometry);

    // Same offset: a fixed track is exhausted, a grown one is not.
    let (fixed, _) = update(awaiting.clone(), Msg::GeometryProbed(geometry(200.0, 300.0)));
    let (fixed, effects) = harvest_batch(fixed, &[2, 3]);
    assert!(effects.is_empty());
    assert_eq!(fixed.phase(), Phase::Done(DoneReason::EndOfList));

    let (grown, _) = update(awaiting, Msg::GeometryProbed(geometry(200.0, 500.0)));
    let (grown, effects) = harvest_batch(grown, &[2, 3]);
    assert_eq!(grown.phase(), Phase::Advance);
    assert_eq!(effects, vec![Effect::ScrollBy { px: 100.0 }]);
    assert_eq!(grown.iterations(), 2);
}

#[test]
fn unmeasurable_row_height_falls_back_to_configured_constant() {
    init_logging();
    let policy = HarvestPolicy {
        row_height_fallback_px: 80.0,
        ..HarvestPolicy::default()
    };
    let snapshot = GeometrySnapshot {
        row_height: 0.0,
        ..geometry(0.0, 1_000.0)
    };
    let state = extracting(policy, snapshot);
    let (_, effects) = harvest_batch(state, &[0, 1, 2, 3]);

    assert_eq!(effects, vec![Effect::ScrollBy { px: 320.0 }]);
}

#[test]
fn timeout_issues_half_step_correction_and_reprobes() {
    init_logging();
    let state = extracting(HarvestPolicy::default(), geometry(0.0, 300.0));
    let (state, _) = harvest_batch(state, &[0, 1, 2]);
    let (state, effects) = apply(state, vec![Msg::Scrolled, Msg::GrowthTimedOut]);

    assert_eq!(state.phase(), Phase::ProbeGeometry);
    assert_eq!(state.consecutive_stalls(), 1);
    assert_eq!(
        effects,
        vec![Effect::ScrollBy { px: 75.0 }, Effect::ProbeGeometry]
    );

    // The acknowledgement of the corrective scroll must not disturb probing.
    let (state, effects) = update(state, Msg::Scrolled);
    assert_eq!(state.phase(), Phase::ProbeGeometry);
    assert!(effects.is_empty());
}

#[test]
fn two_consecutive_stalls_hit_a_cap_of_two() {
    init_logging();
    let policy = HarvestPolicy {
        max_stall_retries: 2,
        ..HarvestPolicy::default()
    };
    let state = extracting(policy, geometry(0.0, 1_000.0));
    let (state, _) = harvest_batch(state, &[0, 1]);
    let (state, _) = apply(
        state,
        vec![
            Msg::Scrolled,
            Msg::GrowthTimedOut,
            Msg::GeometryProbed(geometry(100.0, 1_000.0)),
        ],
    );
    let (state, _) = harvest_batch(state, &[]);
    let (state, effects) = apply(state, vec![Msg::Scrolled, Msg::GrowthTimedOut]);

    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Done(DoneReason::StallExceeded));
    assert_eq!(state.error_kind(), Some(ErrorKind::StallExceeded));
    assert_eq!(state.total_stalls(), 2);
    assert_eq!(state.records().len(), 2);
}

#[test]
fn observed_growth_resets_consecutive_stalls() {
    init_logging();
    let policy = HarvestPolicy {
        max_stall_retries: 2,
        ..HarvestPolicy::default()
    };
    let state = extracting(policy, geometry(0.0, 1_000.0));
    let (state, _) = harvest_batch(state, &[0, 1]);
    let (state, _) = apply(
        state,
        vec![
            Msg::Scrolled,
            Msg::GrowthTimedOut,
            Msg::GeometryProbed(geometry(100.0, 1_000.0)),
        ],
    );
    let (state, _) = harvest_batch(state, &[2]);
    let (state, _) = apply(state, vec![Msg::Scrolled, Msg::GrowthObserved]);
    assert_eq!(state.consecutive_stalls(), 0);

    let (state, _) = apply(state, vec![Msg::GeometryProbed(geometry(150.0, 1_000.0))]);
    let (state, _) = harvest_batch(state, &[3]);
    let (state, _) = apply(state, vec![Msg::Scrolled, Msg::GrowthTimedOut]);

    assert_eq!(state.phase(), Phase::ProbeGeometry);
    assert_eq!(state.total_stalls(), 2);
}

#[test]
fn shrinking_track_ends_after_extracting_current_window() {
    init_logging();
    let state = extracting(HarvestPolicy::default(), geometry(0.0, 600.0));
    let (state, _) = harvest_batch(state, &[0, 1, 2]);
    let (state, effects) = apply(
        state,
        vec![
            Msg::Scrolled,
            Msg::GrowthObserved,
            Msg::GeometryProbed(geometry(150.0, 400.0)),
        ],
    );
    assert_eq!(effects, vec![Effect::ExtractBatch]);

    let (state, effects) = harvest_batch(state, &[3, 4]);
    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Done(DoneReason::TrackShrank));
    assert_eq!(state.records().len(), 5);
    assert_eq!(state.error_kind(), None);
}

#[test]
fn skipped_identity_is_not_retried_and_still_advances_expectation() {
    init_logging();
    let state = extracting(HarvestPolicy::default(), geometry(0.0, 300.0));
    let (state, _) = apply(
        state,
        vec![
            Msg::RowHarvested(record(0)),
            Msg::RowSkipped { identity: Some(1) },
            Msg::RowSkipped { identity: None },
            Msg::RowHarvested(record(1)),
        ],
    );

    assert!(!state.should_extract(1));
    assert_eq!(state.records(), &[record(0)]);
    assert_eq!(state.skipped_rows(), 2);
    assert_eq!(state.expected_identity(), 2);
}

#[test]
fn cancel_keeps_partial_results() {
    init_logging();
    let state = extracting(HarvestPolicy::default(), geometry(0.0, 300.0));
    let (state, _) = harvest_batch(state, &[0, 1, 2]);
    let (state, effects) = update(state, Msg::Cancel);

    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Failed(ErrorKind::Cancelled));
    assert_eq!(state.records().len(), 3);
}

#[test]
fn surface_fault_keeps_detail() {
    init_logging();
    let (state, _) = apply(
        HarvestState::default(),
        vec![Msg::Start, Msg::SurfaceFault("session deleted".to_string())],
    );

    assert_eq!(state.phase(), Phase::Failed(ErrorKind::AdapterFault));
    assert_eq!(state.fault(), Some("session deleted"));
}

#[test]
fn finished_state_ignores_further_messages() {
    init_logging();
    let (state, _) = apply(
        HarvestState::default(),
        vec![Msg::Start, Msg::ContainerMissing],
    );
    let (next, effects) = apply(state.clone(), vec![Msg::Cancel, Msg::ContainerLocated]);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn view_reports_progress() {
    init_logging();
    let state = extracting(HarvestPolicy::default(), geometry(0.0, 300.0));
    let (state, _) = harvest_batch(state, &[0, 1, 2]);
    let view = state.view();

    assert_eq!(view.phase, Phase::Advance);
    assert_eq!(view.records, 3);
    assert_eq!(view.iterations, 1);
    assert_eq!(view.highest_identity, Some(2));
}
