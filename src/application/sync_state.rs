// Reconciliation state machine for bulk fetches, filter fetches and pushes
//
// Mutations here are synchronous and happen under the controller's lock, so
// readers never observe a half-applied update. Network awaits happen between
// a `begin_*` call and its matching `complete_*` call.
use crate::application::errors::{FetchError, PushError};
use crate::application::fleet_store::FleetStore;
use crate::application::staleness_clock::StalenessClock;
use crate::domain::dashboard::{
    DashboardView, LoadState, StatisticsView, VehicleDetail, VehicleRow,
};
use crate::domain::fleet::{FilterState, ServerStatistics, StatisticsSnapshot};
use crate::domain::vehicle::{Vehicle, VehicleStatus};
use std::time::{Duration, Instant};

pub const BULK_FETCH_FAILED: &str = "Failed to fetch vehicles data";
pub const FILTER_FETCH_FAILED: &str = "Failed to filter vehicles";
pub const DETAIL_FETCH_FAILED: &str = "Failed to fetch vehicle details";

/// Issued when a fetch starts. Carries the request's sequence number and the
/// revision of its target collection at issue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
    revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRequest {
    /// `all` is served from the canonical set; nothing to fetch.
    Local,
    Remote {
        ticket: FetchTicket,
        status: VehicleStatus,
    },
}

/// What happened to a completed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Failed,
    /// A newer request of the same kind was issued after this one.
    Superseded,
    /// The target collection was written after this request was issued.
    Stale,
    /// The session was torn down.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub raised_at: Instant,
}

#[derive(Debug)]
pub struct SyncState {
    store: FleetStore,
    clock: StalenessClock,
    load_state: LoadState,
    live: bool,
    server_statistics: Option<ServerStatistics>,
    statistics: StatisticsSnapshot,
    notification: Option<Notification>,
    notification_ttl: Duration,
    selected: Option<Vehicle>,
    active: bool,
    next_seq: u64,
    latest_bulk: u64,
    latest_filter: u64,
    bulk_in_flight: bool,
    filter_in_flight: bool,
    canonical_revision: u64,
    view_revision: u64,
}

impl SyncState {
    pub fn new(notification_ttl: Duration) -> Self {
        Self {
            store: FleetStore::new(),
            clock: StalenessClock::new(),
            load_state: LoadState::Loading,
            live: false,
            server_statistics: None,
            statistics: StatisticsSnapshot::default(),
            notification: None,
            notification_ttl,
            selected: None,
            active: true,
            next_seq: 0,
            latest_bulk: 0,
            latest_filter: 0,
            bulk_in_flight: false,
            filter_in_flight: false,
            canonical_revision: 0,
            view_revision: 0,
        }
    }

    pub fn store(&self) -> &FleetStore {
        &self.store
    }

    pub fn clock(&self) -> &StalenessClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut StalenessClock {
        &mut self.clock
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn statistics(&self) -> &StatisticsSnapshot {
        &self.statistics
    }

    pub fn selected(&self) -> Option<&Vehicle> {
        self.selected.as_ref()
    }

    /// The active notification, unless it has expired.
    pub fn notification(&self, now: Instant) -> Option<&str> {
        self.notification
            .as_ref()
            .filter(|n| now.saturating_duration_since(n.raised_at) < self.notification_ttl)
            .map(|n| n.message.as_str())
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }

    pub fn begin_refresh(&mut self) -> FetchTicket {
        self.load_state = LoadState::Loading;
        let seq = self.issue();
        self.latest_bulk = seq;
        self.bulk_in_flight = true;
        FetchTicket {
            seq,
            revision: self.canonical_revision,
        }
    }

    pub fn complete_refresh(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Vehicle>, FetchError>,
    ) -> Outcome {
        if !self.active {
            return Outcome::Ignored;
        }
        if ticket.seq != self.latest_bulk {
            return Outcome::Superseded;
        }
        self.bulk_in_flight = false;

        match result {
            Ok(vehicles) => {
                self.settle_loading(LoadState::Ready);
                if ticket.revision != self.canonical_revision {
                    tracing::debug!("Discarding bulk fetch overtaken by a push");
                    return Outcome::Stale;
                }
                self.replace_canonical(vehicles);
                Outcome::Applied
            }
            Err(err) => {
                tracing::warn!(error = %err, "Bulk fetch failed, keeping last-known-good data");
                self.settle_loading(LoadState::Error);
                self.raise(BULK_FETCH_FAILED);
                Outcome::Failed
            }
        }
    }

    pub fn begin_filter(&mut self, filter: FilterState) -> FilterRequest {
        self.store.set_filter(filter);
        let seq = self.issue();
        self.latest_filter = seq;

        match filter.status() {
            None => {
                self.filter_in_flight = false;
                self.settle_loading(LoadState::Ready);
                FilterRequest::Local
            }
            Some(status) => {
                // The previous filter's rows must not show under the new label.
                self.store.set_filtered(Vec::new());
                self.filter_in_flight = true;
                self.load_state = LoadState::Loading;
                FilterRequest::Remote {
                    ticket: FetchTicket {
                        seq,
                        revision: self.view_revision,
                    },
                    status,
                }
            }
        }
    }

    pub fn complete_filter(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<Vehicle>, FetchError>,
    ) -> Outcome {
        if !self.active {
            return Outcome::Ignored;
        }
        if ticket.seq != self.latest_filter {
            return Outcome::Superseded;
        }
        self.filter_in_flight = false;

        match result {
            Ok(vehicles) => {
                self.settle_loading(LoadState::Ready);
                if ticket.revision != self.view_revision {
                    tracing::debug!("Discarding filter fetch overtaken by a newer snapshot");
                    return Outcome::Stale;
                }
                self.store.set_filtered(vehicles);
                self.view_revision += 1;
                Outcome::Applied
            }
            Err(err) => {
                tracing::warn!(
                    filter = %self.store.filter(),
                    error = %err,
                    "Filter fetch failed"
                );
                self.store.set_filtered(Vec::new());
                self.view_revision += 1;
                self.settle_loading(LoadState::Error);
                self.raise(FILTER_FETCH_FAILED);
                Outcome::Failed
            }
        }
    }

    /// Accept a pushed fleet snapshot. Independent of the load state.
    pub fn apply_push(&mut self, vehicles: Vec<Vehicle>) -> Outcome {
        if !self.active {
            return Outcome::Ignored;
        }
        self.replace_canonical(vehicles);
        self.clock.reset();
        self.live = true;
        Outcome::Applied
    }

    pub fn mark_not_live(&mut self, reason: &PushError) {
        if self.live {
            tracing::info!(reason = %reason, "Live updates paused");
        }
        self.live = false;
    }

    pub fn apply_statistics(&mut self, result: Result<ServerStatistics, FetchError>) {
        if !self.active {
            return;
        }
        self.server_statistics = match result {
            Ok(stats) => Some(stats),
            Err(err) => {
                tracing::warn!(error = %err, "Statistics unavailable, deriving locally");
                None
            }
        };
        self.rederive_statistics();
    }

    /// Summary record used while (and if) the detail fetch fails.
    pub fn begin_detail(&self, id: &str) -> Option<Vehicle> {
        self.store.find(id).cloned()
    }

    pub fn complete_detail(
        &mut self,
        summary: Option<Vehicle>,
        result: Result<Option<Vehicle>, FetchError>,
    ) -> Option<Vehicle> {
        if !self.active {
            return None;
        }
        let shown = match result {
            Ok(detail) => detail.or(summary),
            Err(err) => {
                tracing::warn!(error = %err, "Vehicle detail unavailable, showing summary");
                self.raise(DETAIL_FETCH_FAILED);
                summary
            }
        };
        self.selected = shown.clone();
        shown
    }

    pub fn close_detail(&mut self) {
        self.selected = None;
    }

    /// Tear down: stop the clock and ignore anything that completes later.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.clock.stop();
    }

    pub fn snapshot(&self, now: Instant) -> DashboardView {
        DashboardView {
            filter: self.store.filter(),
            load_state: self.load_state,
            live: self.live,
            vehicles: self.store.view().iter().map(VehicleRow::from_vehicle).collect(),
            counts: self.store.counts_by_status(),
            statistics: StatisticsView::from(&self.statistics),
            seconds_since_update: self.clock.seconds_since_update(),
            updated_ago: self.clock.label(),
            notification: self.notification(now).map(str::to_string),
            selected: self.selected.as_ref().map(VehicleDetail::from_vehicle),
        }
    }

    fn issue(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    // Ready only once nothing is in flight; errors surface immediately.
    fn settle_loading(&mut self, state: LoadState) {
        self.load_state = match state {
            LoadState::Ready if self.bulk_in_flight || self.filter_in_flight => LoadState::Loading,
            other => other,
        };
    }

    fn replace_canonical(&mut self, vehicles: Vec<Vehicle>) {
        self.store.replace_all(vehicles);
        self.canonical_revision += 1;

        if let Some(status) = self.store.filter().status() {
            let view = self.store.select_by_status(status);
            self.store.set_filtered(view);
            self.view_revision += 1;
        }
        self.rederive_statistics();
    }

    fn rederive_statistics(&mut self) {
        self.statistics =
            StatisticsSnapshot::resolve(self.server_statistics.as_ref(), self.store.vehicles());
    }

    fn raise(&mut self, message: &str) {
        self.notification = Some(Notification {
            message: message.to_string(),
            raised_at: Instant::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(6);

    fn vehicle(id: &str, status: VehicleStatus) -> Vehicle {
        Vehicle::new(id, status)
    }

    fn failure() -> FetchError {
        FetchError::Transport {
            endpoint: "/api/vehicles".to_string(),
            message: "connection refused".to_string(),
        }
    }

    fn loaded(vehicles: Vec<Vehicle>) -> SyncState {
        let mut state = SyncState::new(TTL);
        let ticket = state.begin_refresh();
        assert_eq!(state.complete_refresh(ticket, Ok(vehicles)), Outcome::Applied);
        state
    }

    fn ids(vehicles: &[Vehicle]) -> Vec<&str> {
        vehicles.iter().map(|v| v.id.as_str()).collect()
    }

    #[test]
    fn test_starts_loading_and_empty() {
        let state = SyncState::new(TTL);
        let view = state.snapshot(Instant::now());

        assert_eq!(view.load_state, LoadState::Loading);
        assert!(!view.live);
        assert!(view.vehicles.is_empty());
        assert_eq!(view.counts.all, 0);
    }

    #[test]
    fn test_bulk_then_push_end_to_end() {
        let mut state = loaded(vec![
            vehicle("a", VehicleStatus::Idle),
            vehicle("b", VehicleStatus::EnRoute),
        ]);
        assert_eq!(state.load_state(), LoadState::Ready);
        assert!(!state.is_live());

        let counts = state.store().counts_by_status();
        assert_eq!((counts.all, counts.idle, counts.en_route, counts.delivered), (2, 1, 1, 0));

        for _ in 0..42 {
            state.clock().tick();
        }
        assert_eq!(
            state.apply_push(vec![vehicle("c", VehicleStatus::Delivered)]),
            Outcome::Applied
        );

        let counts = state.store().counts_by_status();
        assert_eq!((counts.all, counts.idle, counts.en_route, counts.delivered), (1, 0, 0, 1));
        assert_eq!(state.clock().seconds_since_update(), 0);
        assert!(state.is_live());
        assert_eq!(ids(state.store().vehicles()), vec!["c"]);
    }

    #[test]
    fn test_failed_bulk_keeps_last_known_good() {
        let mut state = loaded(vec![vehicle("a", VehicleStatus::Idle)]);

        let ticket = state.begin_refresh();
        assert_eq!(state.load_state(), LoadState::Loading);
        assert_eq!(state.complete_refresh(ticket, Err(failure())), Outcome::Failed);

        assert_eq!(state.load_state(), LoadState::Error);
        assert_eq!(ids(state.store().vehicles()), vec!["a"]);
        assert_eq!(state.notification(Instant::now()), Some(BULK_FETCH_FAILED));
    }

    #[test]
    fn test_first_bulk_failure_shows_empty_state() {
        let mut state = SyncState::new(TTL);
        let ticket = state.begin_refresh();
        state.complete_refresh(ticket, Err(failure()));

        let view = state.snapshot(Instant::now());
        assert_eq!(view.load_state, LoadState::Error);
        assert!(view.vehicles.is_empty());
        assert_eq!(view.statistics.total_vehicles, 0);
    }

    #[test]
    fn test_bulk_overtaken_by_push_is_discarded() {
        let mut state = SyncState::new(TTL);
        let ticket = state.begin_refresh();
        state.apply_push(vec![vehicle("pushed", VehicleStatus::EnRoute)]);

        let outcome =
            state.complete_refresh(ticket, Ok(vec![vehicle("fetched", VehicleStatus::Idle)]));

        assert_eq!(outcome, Outcome::Stale);
        assert_eq!(ids(state.store().vehicles()), vec!["pushed"]);
        assert_eq!(state.load_state(), LoadState::Ready);
    }

    #[test]
    fn test_older_refresh_is_superseded() {
        let mut state = SyncState::new(TTL);
        let first = state.begin_refresh();
        let second = state.begin_refresh();

        assert_eq!(state.complete_refresh(first, Err(failure())), Outcome::Superseded);
        assert_eq!(state.notification(Instant::now()), None);
        assert_eq!(
            state.complete_refresh(second, Ok(vec![vehicle("a", VehicleStatus::Idle)])),
            Outcome::Applied
        );
    }

    #[test]
    fn test_all_filter_is_local_and_shows_canonical() {
        let mut state = loaded(vec![
            vehicle("a", VehicleStatus::Idle),
            vehicle("b", VehicleStatus::Delivered),
        ]);

        assert_eq!(state.begin_filter(FilterState::All), FilterRequest::Local);
        assert_eq!(state.load_state(), LoadState::Ready);
        assert_eq!(state.store().view(), state.store().vehicles());
    }

    #[test]
    fn test_filter_fetch_replaces_view_only() {
        let mut state = loaded(vec![
            vehicle("a", VehicleStatus::Idle),
            vehicle("b", VehicleStatus::Delivered),
        ]);

        let FilterRequest::Remote { ticket, status } = state.begin_filter(FilterState::Idle) else {
            panic!("idle filter should fetch");
        };
        assert_eq!(status, VehicleStatus::Idle);

        let served = vec![vehicle("x", VehicleStatus::Idle), vehicle("y", VehicleStatus::Idle)];
        assert_eq!(state.complete_filter(ticket, Ok(served)), Outcome::Applied);

        assert_eq!(ids(state.store().view()), vec!["x", "y"]);
        assert_eq!(ids(state.store().vehicles()), vec!["a", "b"]);
        assert_eq!(state.clock().seconds_since_update(), 0);
        assert_eq!(state.load_state(), LoadState::Ready);
    }

    #[test]
    fn test_failed_filter_empties_view() {
        let mut state = loaded(vec![vehicle("a", VehicleStatus::Idle)]);

        let FilterRequest::Remote { ticket, .. } = state.begin_filter(FilterState::Idle) else {
            panic!("idle filter should fetch");
        };
        state.complete_filter(ticket, Ok(vec![vehicle("a", VehicleStatus::Idle)]));

        let FilterRequest::Remote { ticket, .. } = state.begin_filter(FilterState::Delivered) else {
            panic!("delivered filter should fetch");
        };
        assert_eq!(state.complete_filter(ticket, Err(failure())), Outcome::Failed);

        assert!(state.store().view().is_empty());
        assert_eq!(state.load_state(), LoadState::Error);
        assert_eq!(state.notification(Instant::now()), Some(FILTER_FETCH_FAILED));
        assert_eq!(state.store().vehicles().len(), 1);
    }

    #[test]
    fn test_switching_filter_supersedes_pending_fetch() {
        let mut state = loaded(vec![vehicle("a", VehicleStatus::Idle)]);

        let FilterRequest::Remote { ticket, .. } = state.begin_filter(FilterState::EnRoute) else {
            panic!("en_route filter should fetch");
        };
        state.begin_filter(FilterState::All);

        let late = vec![vehicle("late", VehicleStatus::EnRoute)];
        assert_eq!(state.complete_filter(ticket, Ok(late)), Outcome::Superseded);
        assert_eq!(ids(state.store().view()), vec!["a"]);
    }

    #[test]
    fn test_push_rederives_filtered_view() {
        let mut state = loaded(vec![vehicle("a", VehicleStatus::Idle)]);
        let FilterRequest::Remote { ticket, .. } = state.begin_filter(FilterState::Idle) else {
            panic!("idle filter should fetch");
        };
        state.complete_filter(ticket, Ok(vec![vehicle("a", VehicleStatus::Idle)]));

        state.apply_push(vec![
            vehicle("b", VehicleStatus::Idle),
            vehicle("c", VehicleStatus::EnRoute),
        ]);

        assert_eq!(ids(state.store().view()), vec!["b"]);
    }

    #[test]
    fn test_push_does_not_clear_fetch_error() {
        let mut state = SyncState::new(TTL);
        let ticket = state.begin_refresh();
        state.complete_refresh(ticket, Err(failure()));

        state.apply_push(vec![vehicle("a", VehicleStatus::Idle)]);

        assert_eq!(state.load_state(), LoadState::Error);
        assert_eq!(state.store().vehicles().len(), 1);
    }

    #[test]
    fn test_retry_moves_error_to_loading() {
        let mut state = SyncState::new(TTL);
        let ticket = state.begin_refresh();
        state.complete_refresh(ticket, Err(failure()));

        state.begin_refresh();
        assert_eq!(state.load_state(), LoadState::Loading);
    }

    #[test]
    fn test_not_live_after_channel_failure() {
        let mut state = loaded(vec![vehicle("a", VehicleStatus::Idle)]);
        state.apply_push(vec![vehicle("b", VehicleStatus::Idle)]);

        state.mark_not_live(&PushError::MalformedPayload {
            reason: "expected value".to_string(),
        });

        assert!(!state.is_live());
        assert_eq!(ids(state.store().vehicles()), vec!["b"]);
    }

    #[test]
    fn test_statistics_fall_back_on_failure() {
        let mut vehicle_a = vehicle("a", VehicleStatus::EnRoute);
        vehicle_a.speed = Some(40.0);
        let mut state = loaded(vec![vehicle_a]);

        state.apply_statistics(Ok(ServerStatistics {
            total_vehicles: Some(12),
            ..ServerStatistics::default()
        }));
        assert_eq!(state.statistics().total_vehicles, 12);

        state.apply_statistics(Err(failure()));
        assert_eq!(state.statistics().total_vehicles, 1);
        assert_eq!(state.statistics().average_speed, 40.0);
    }

    #[test]
    fn test_detail_falls_back_to_summary() {
        let mut summary = vehicle("a", VehicleStatus::Idle);
        summary.driver_name = Some("Ana".to_string());
        let mut state = loaded(vec![summary.clone()]);

        let known = state.begin_detail("a");
        let shown = state.complete_detail(known, Err(failure()));

        assert_eq!(shown, Some(summary.clone()));
        assert_eq!(state.selected(), Some(&summary));
        assert_eq!(state.notification(Instant::now()), Some(DETAIL_FETCH_FAILED));

        let known = state.begin_detail("a");
        assert_eq!(state.complete_detail(known, Ok(None)), Some(summary));

        state.close_detail();
        assert!(state.selected().is_none());
    }

    #[test]
    fn test_detail_prefers_fetched_record() {
        let mut state = loaded(vec![vehicle("a", VehicleStatus::Idle)]);
        let mut detailed = vehicle("a", VehicleStatus::Idle);
        detailed.fuel_level = Some(55.0);

        let known = state.begin_detail("a");
        let shown = state.complete_detail(known, Ok(Some(detailed.clone())));

        assert_eq!(shown, Some(detailed));
    }

    #[test]
    fn test_notification_expires_and_dismisses() {
        let mut state = SyncState::new(Duration::from_millis(100));
        let ticket = state.begin_refresh();
        state.complete_refresh(ticket, Err(failure()));

        let now = Instant::now();
        assert!(state.notification(now).is_some());
        assert!(state.notification(now + Duration::from_secs(1)).is_none());

        state.dismiss_notification();
        assert!(state.notification(now).is_none());
    }

    #[test]
    fn test_results_after_teardown_are_ignored() {
        let mut state = loaded(vec![vehicle("a", VehicleStatus::Idle)]);
        let ticket = state.begin_refresh();
        state.deactivate();

        let late = vec![vehicle("late", VehicleStatus::Idle)];
        assert_eq!(state.complete_refresh(ticket, Ok(late.clone())), Outcome::Ignored);
        assert_eq!(state.apply_push(late), Outcome::Ignored);
        assert_eq!(ids(state.store().vehicles()), vec!["a"]);
    }
}
