// Sync controller - Applies bulk fetches, filter fetches and push snapshots
use crate::application::fleet_repository::FleetRepository;
use crate::application::push_channel::PushEvent;
use crate::application::sync_state::{FilterRequest, Outcome, SyncState};
use crate::domain::dashboard::DashboardView;
use crate::domain::fleet::FilterState;
use crate::domain::vehicle::Vehicle;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};

#[derive(Clone)]
pub struct SyncController {
    repository: Arc<dyn FleetRepository>,
    state: Arc<Mutex<SyncState>>,
}

impl SyncController {
    pub fn new(repository: Arc<dyn FleetRepository>, notification_ttl: Duration) -> Self {
        Self {
            repository,
            state: Arc::new(Mutex::new(SyncState::new(notification_ttl))),
        }
    }

    /// Begin the session: start the staleness clock, then run the initial load.
    pub async fn start(&self, tick: Duration) -> Outcome {
        self.state.lock().await.clock_mut().start(tick);
        self.refresh().await
    }

    /// Bulk fetch plus statistics, issued together.
    pub async fn refresh(&self) -> Outcome {
        let ticket = self.state.lock().await.begin_refresh();
        tracing::debug!("Fetching full fleet");

        let (vehicles, statistics) = tokio::join!(
            self.repository.list_vehicles(),
            self.repository.get_statistics()
        );

        let mut state = self.state.lock().await;
        let outcome = state.complete_refresh(ticket, vehicles);
        state.apply_statistics(statistics);
        tracing::info!(
            outcome = ?outcome,
            vehicles = state.store().vehicles().len(),
            "Fleet refresh finished"
        );
        outcome
    }

    pub async fn refresh_statistics(&self) {
        let statistics = self.repository.get_statistics().await;
        self.state.lock().await.apply_statistics(statistics);
    }

    pub async fn change_filter(&self, filter: FilterState) -> Outcome {
        let request = self.state.lock().await.begin_filter(filter);

        match request {
            FilterRequest::Local => Outcome::Applied,
            FilterRequest::Remote { ticket, status } => {
                tracing::debug!(filter = %filter, "Fetching filtered fleet");
                let result = self.repository.list_vehicles_by_status(status).await;
                self.state.lock().await.complete_filter(ticket, result)
            }
        }
    }

    /// Open the detail view. The fetched record is preferred, the known
    /// summary is the fallback; `None` only when neither exists.
    pub async fn select_vehicle(&self, id: &str) -> Option<Vehicle> {
        let summary = self.state.lock().await.begin_detail(id);
        let result = self.repository.get_vehicle(id).await;
        self.state.lock().await.complete_detail(summary, result)
    }

    pub async fn close_detail(&self) {
        self.state.lock().await.close_detail();
    }

    pub async fn dismiss_notification(&self) {
        self.state.lock().await.dismiss_notification();
    }

    pub async fn handle_push(&self, event: PushEvent) {
        match event {
            PushEvent::Snapshot(vehicles) => {
                let outcome = self.state.lock().await.apply_push(vehicles);
                if outcome == Outcome::Applied {
                    let controller = self.clone();
                    tokio::spawn(async move { controller.refresh_statistics().await });
                }
            }
            PushEvent::Malformed(err) | PushEvent::Disconnected(err) => {
                self.state.lock().await.mark_not_live(&err);
            }
        }
    }

    /// Drain push events until the channel manager goes away.
    pub async fn forward_push_events(self, mut events: mpsc::Receiver<PushEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_push(event).await;
        }
        tracing::debug!("Push event stream ended");
    }

    pub async fn snapshot(&self) -> DashboardView {
        self.state.lock().await.snapshot(Instant::now())
    }

    pub async fn stop(&self) {
        self.state.lock().await.deactivate();
        tracing::info!("Fleet session stopped");
    }
}
