use std::collections::{HashSet, VecDeque};

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use harvester_core::{update, DoneReason, Effect, HarvestState, Msg, Phase, RowIdentity};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::probe::{probe, scroll_by_script, ProbeError, READY_STATE_SCRIPT};
use crate::surface::wait_until;
use crate::{HarvestConfig, HarvestEvent, HarvestOutcome, RenderSurface, RowExtractor};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: HarvestEvent);
}

/// Forwards progress to the log at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgressSink;

impl ProgressSink for LogProgressSink {
    fn emit(&self, event: HarvestEvent) {
        match event {
            HarvestEvent::PhaseChanged(phase) => engine_debug!("phase -> {:?}", phase),
            HarvestEvent::RecordHarvested { identity } => {
                engine_debug!("harvested row {}", identity)
            }
            HarvestEvent::RowSkipped { identity, reason } => {
                engine_debug!("skipped row {:?}: {}", identity, reason)
            }
            HarvestEvent::Stalled {
                awaited,
                consecutive,
            } => engine_debug!("stall #{} waiting for row {}", consecutive, awaited),
        }
    }
}

enum OpenError {
    Cancelled,
    Fault(String),
}

/// Drives the harvest state machine against a render surface.
///
/// The harvester executes one effect at a time and feeds the resulting
/// observations back into [`harvester_core::update`].
pub struct Harvester<S: RenderSurface> {
    surface: S,
    config: HarvestConfig,
    extractor: RowExtractor,
}

impl<S: RenderSurface> Harvester<S> {
    pub fn new(surface: S, config: HarvestConfig) -> Self {
        let extractor = RowExtractor::new(&config);
        Self {
            surface,
            config,
            extractor,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Opens `url` and harvests its virtualized list.
    ///
    /// Never panics on page faults: the outcome always carries the records
    /// collected so far and the reason the run stopped.
    pub async fn harvest(
        &self,
        url: &str,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> HarvestOutcome {
        engine_info!("Harvesting virtualized list at {}", url);
        let first = match self.open_page(url, cancel).await {
            Ok(()) => Msg::Start,
            Err(OpenError::Cancelled) => Msg::Cancel,
            Err(OpenError::Fault(detail)) => Msg::SurfaceFault(detail),
        };

        let state = self.run(url, first, cancel, sink).await;
        log_completion(&state);
        HarvestOutcome::from(state)
    }

    async fn run(
        &self,
        page_url: &str,
        first: Msg,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> HarvestState {
        let mut state = HarvestState::new(self.config.policy());
        let mut effects: VecDeque<Effect> = VecDeque::new();
        let mut inbox: VecDeque<Msg> = VecDeque::from([first]);
        let mut container: Option<S::Handle> = None;

        loop {
            while let Some(msg) = inbox.pop_front() {
                state = apply(state, msg, &mut effects, sink);
            }
            if state.is_finished() {
                return state;
            }

            let Some(effect) = effects.pop_front() else {
                inbox.push_back(Msg::SurfaceFault(format!(
                    "no pending work in phase {:?}",
                    state.phase()
                )));
                continue;
            };
            if cancel.is_cancelled() {
                engine_info!("Cancellation requested");
                inbox.push_back(Msg::Cancel);
                continue;
            }

            let observed = match effect {
                Effect::LocateContainer => vec![self.locate_container(&mut container, cancel).await],
                Effect::ProbeGeometry => {
                    vec![self.probe_geometry(container.as_ref(), cancel).await]
                }
                Effect::ExtractBatch => match container.as_ref() {
                    Some(handle) => self.extract_batch(handle, &state, page_url, sink).await,
                    None => vec![Msg::SurfaceFault("list container handle lost".to_string())],
                },
                Effect::ScrollBy { px } => vec![self.scroll_by(px).await],
                Effect::AwaitRow { identity } => {
                    vec![self.await_row(container.as_ref(), identity, cancel).await]
                }
            };
            inbox.extend(observed);
        }
    }

    async fn open_page(&self, url: &str, cancel: &CancellationToken) -> Result<(), OpenError> {
        Url::parse(url).map_err(|err| OpenError::Fault(format!("invalid url {url}: {err}")))?;

        tokio::select! {
            _ = cancel.cancelled() => return Err(OpenError::Cancelled),
            navigated = self.surface.navigate(url) => {
                navigated.map_err(|err| OpenError::Fault(err.to_string()))?
            }
        }

        let surface = &self.surface;
        let ready = tokio::select! {
            _ = cancel.cancelled() => return Err(OpenError::Cancelled),
            ready = wait_until(self.config.lookup_timeout(), self.config.poll_interval(), move || async move {
                surface
                    .evaluate(READY_STATE_SCRIPT)
                    .await
                    .map(|state| state.as_str() == Some("complete"))
            }) => ready.map_err(|err| OpenError::Fault(err.to_string()))?,
        };
        if !ready {
            return Err(OpenError::Fault(format!(
                "page did not finish loading within {} ms",
                self.config.lookup_timeout_ms
            )));
        }
        engine_info!("Website {} opened successfully", url);

        self.dismiss_consent().await;
        Ok(())
    }

    /// A missing or unclickable banner is not worth failing the run over.
    async fn dismiss_consent(&self) {
        let Some(selector) = self.config.consent() else {
            return;
        };
        match self.surface.locate(&selector).await {
            Ok(Some(button)) => match self.surface.click(&button).await {
                Ok(()) => engine_info!("Cookie banner closed"),
                Err(err) => engine_warn!("Could not click cookie banner: {}", err),
            },
            Ok(None) => engine_info!("No cookie banner matched {:?}", selector),
            Err(err) => engine_warn!("Cookie banner lookup failed: {}", err),
        }
    }

    async fn locate_container(
        &self,
        slot: &mut Option<S::Handle>,
        cancel: &CancellationToken,
    ) -> Msg {
        let selector = self.config.container();
        let surface = &self.surface;
        let target = &selector;
        let found = tokio::select! {
            _ = cancel.cancelled() => return Msg::Cancel,
            found = wait_until(self.config.lookup_timeout(), self.config.poll_interval(), move || async move {
                surface.locate(target).await.map(|found| found.is_some())
            }) => found,
        };

        match found {
            Ok(true) => match self.surface.locate(&selector).await {
                Ok(Some(handle)) => {
                    engine_info!("Located list container {}", self.config.container_selector);
                    *slot = Some(handle);
                    Msg::ContainerLocated
                }
                Ok(None) => Msg::ContainerMissing,
                Err(err) => Msg::SurfaceFault(err.to_string()),
            },
            Ok(false) => {
                engine_error!(
                    "List container {} not found within {} ms",
                    self.config.container_selector,
                    self.config.lookup_timeout_ms
                );
                Msg::ContainerMissing
            }
            Err(err) => Msg::SurfaceFault(err.to_string()),
        }
    }

    /// Waits up to the lookup timeout for a materialized row, then measures.
    async fn probe_geometry(
        &self,
        container: Option<&S::Handle>,
        cancel: &CancellationToken,
    ) -> Msg {
        let Some(container) = container else {
            return Msg::GeometryUnavailable;
        };
        let rows = self.config.rows();
        let surface = &self.surface;
        let target = &rows;
        let populated = tokio::select! {
            _ = cancel.cancelled() => return Msg::Cancel,
            populated = wait_until(self.config.lookup_timeout(), self.config.poll_interval(), move || async move {
                surface
                    .locate_all(container, target)
                    .await
                    .map(|found| !found.is_empty())
            }) => populated,
        };
        match populated {
            Ok(true) => {}
            Ok(false) => {
                engine_error!(
                    "No row of the list materialized within {} ms",
                    self.config.lookup_timeout_ms
                );
                return Msg::GeometryUnavailable;
            }
            Err(err) => return Msg::SurfaceFault(err.to_string()),
        }

        match probe(&self.surface, container, &rows).await {
            Ok(snapshot) => {
                engine_debug!(
                    "geometry: row {:.1}px, viewport {:.1}px, document {:.1}px, offset {:.1}px",
                    snapshot.row_height,
                    snapshot.viewport_height,
                    snapshot.document_height,
                    snapshot.scroll_offset
                );
                Msg::GeometryProbed(snapshot)
            }
            Err(ProbeError::Surface(err)) => Msg::SurfaceFault(err.to_string()),
            Err(err) => {
                engine_error!("List geometry unavailable: {}", err);
                Msg::GeometryUnavailable
            }
        }
    }

    async fn extract_batch(
        &self,
        container: &S::Handle,
        state: &HarvestState,
        page_url: &str,
        sink: &dyn ProgressSink,
    ) -> Vec<Msg> {
        let rows = match self.surface.locate_all(container, &self.config.rows()).await {
            Ok(rows) => rows,
            Err(err) => return vec![Msg::SurfaceFault(err.to_string())],
        };

        let mut msgs = Vec::with_capacity(rows.len() + 1);
        let mut visited: HashSet<RowIdentity> = HashSet::new();
        for row in &rows {
            let identity = match self.extractor.identity(&self.surface, row).await {
                Ok(identity) => identity,
                Err(err) => {
                    let reason = err.to_string();
                    engine_warn!("Skipping row: {}", reason);
                    sink.emit(HarvestEvent::RowSkipped {
                        identity: None,
                        reason,
                    });
                    msgs.push(Msg::RowSkipped { identity: None });
                    continue;
                }
            };
            if !state.should_extract(identity) || !visited.insert(identity) {
                continue;
            }

            match self
                .extractor
                .extract(&self.surface, row, identity, page_url)
                .await
            {
                Ok(record) => {
                    sink.emit(HarvestEvent::RecordHarvested { identity });
                    msgs.push(Msg::RowHarvested(record));
                }
                Err(err) => {
                    let reason = err.to_string();
                    engine_warn!("Skipping row with index {}: {}", identity, reason);
                    sink.emit(HarvestEvent::RowSkipped {
                        identity: Some(identity),
                        reason,
                    });
                    msgs.push(Msg::RowSkipped {
                        identity: Some(identity),
                    });
                }
            }
        }

        engine_debug!(
            "visited {} materialized rows, {} unseen",
            rows.len(),
            visited.len()
        );
        msgs.push(Msg::BatchExtracted { rows: rows.len() });
        msgs
    }

    async fn scroll_by(&self, px: f64) -> Msg {
        engine_debug!("scrolling by {:.1}px", px);
        match self.surface.evaluate(&scroll_by_script(px)).await {
            Ok(_) => Msg::Scrolled,
            Err(err) => Msg::SurfaceFault(err.to_string()),
        }
    }

    async fn await_row(
        &self,
        container: Option<&S::Handle>,
        identity: RowIdentity,
        cancel: &CancellationToken,
    ) -> Msg {
        let Some(container) = container else {
            return Msg::SurfaceFault("list container handle lost".to_string());
        };
        let selector = self.config.row_with_identity(identity);
        let surface = &self.surface;
        let target = &selector;
        let appeared = tokio::select! {
            _ = cancel.cancelled() => return Msg::Cancel,
            appeared = wait_until(self.config.growth_wait_timeout(), self.config.poll_interval(), move || async move {
                surface
                    .locate_within(container, target)
                    .await
                    .map(|row| row.is_some())
            }) => appeared,
        };

        match appeared {
            Ok(true) => Msg::GrowthObserved,
            Ok(false) => {
                engine_warn!(
                    "Row with index {} did not appear within {} ms, scrolling some more",
                    identity,
                    self.config.growth_wait_timeout_ms
                );
                Msg::GrowthTimedOut
            }
            Err(err) => Msg::SurfaceFault(err.to_string()),
        }
    }
}

fn apply(
    state: HarvestState,
    msg: Msg,
    effects: &mut VecDeque<Effect>,
    sink: &dyn ProgressSink,
) -> HarvestState {
    let before = state.phase();
    let awaited = state.expected_identity();
    let stalled = matches!(msg, Msg::GrowthTimedOut) && before == Phase::AwaitGrowth;

    let (state, next) = update(state, msg);
    if stalled {
        sink.emit(HarvestEvent::Stalled {
            awaited,
            consecutive: state.consecutive_stalls(),
        });
    }
    if state.phase() != before {
        sink.emit(HarvestEvent::PhaseChanged(state.phase()));
    }
    effects.extend(next);
    state
}

fn log_completion(state: &HarvestState) {
    let count = state.records().len();
    match state.phase() {
        Phase::Done(DoneReason::EndOfList) => {
            engine_info!("All {} records extracted, reached the end of the list", count)
        }
        Phase::Done(DoneReason::TrackShrank) => engine_info!(
            "Scroll track shrank, treating the list as exhausted after {} records",
            count
        ),
        Phase::Done(DoneReason::StallExceeded) => engine_warn!(
            "Stopped after {} consecutive stalls with {} records, list is probably incomplete",
            state.consecutive_stalls(),
            count
        ),
        Phase::Failed(kind) => engine_error!(
            "Harvest failed ({}{}), keeping {} partial records",
            kind,
            state.fault().map(|d| format!(": {d}")).unwrap_or_default(),
            count
        ),
        phase => engine_error!("Harvest stopped unexpectedly in phase {:?}", phase),
    }
}
