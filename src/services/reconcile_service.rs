use crate::models::settings::clamp_check_interval;
use crate::models::stream::TwitchStream;
use crate::models::streamer::{LivenessTransition, Streamer};
use crate::services::live_notification_service::LiveAlerts;
use crate::services::message_bus::{BusMessage, MessageBus};
use crate::services::streamer_store::StreamerStore;
use crate::services::twitch_service::StatusSource;
use anyhow::{anyhow, Result};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Interval, MissedTickBehavior};

/// How many went-live transitions of a single pass may raise a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationCap {
    #[default]
    Unbounded,
    AtMost(usize),
}

impl NotificationCap {
    pub fn from_setting(cap: Option<usize>) -> Self {
        cap.map_or(Self::Unbounded, Self::AtMost)
    }

    fn allows(self, already_dispatched: usize) -> bool {
        match self {
            NotificationCap::Unbounded => true,
            NotificationCap::AtMost(cap) => already_dispatched < cap,
        }
    }
}

/// Where went-live transitions are delivered.
#[derive(Clone)]
pub enum AlertRoute {
    /// Emit through the notification sink right away.
    Direct(Arc<LiveAlerts>),
    /// Hand the transition to whichever context listens on the bus.
    Relay(MessageBus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing is tracked, no query was made.
    Idle,
    /// The status query failed; stored state was left untouched.
    Skipped,
    Completed {
        checked: usize,
        live: usize,
        went_live: usize,
        notified: usize,
    },
}

/// One reconciliation pass: query, diff against the store, write back, notify.
#[derive(Clone)]
pub struct Reconciler {
    streamers: StreamerStore,
    source: Arc<dyn StatusSource>,
    route: AlertRoute,
    cap: NotificationCap,
}

impl Reconciler {
    pub fn new(streamers: StreamerStore, source: Arc<dyn StatusSource>, route: AlertRoute) -> Self {
        Self {
            streamers,
            source,
            route,
            cap: NotificationCap::Unbounded,
        }
    }

    /// A reconciler over the same store that never runs concurrently with this one.
    pub fn sibling(&self, cap: NotificationCap, route: AlertRoute) -> Self {
        Self {
            streamers: self.streamers.clone(),
            source: self.source.clone(),
            route,
            cap,
        }
    }

    /// Runs under the store's write lock, so passes never overlap and tracker
    /// edits made meanwhile wait for the write-back instead of being lost.
    pub async fn reconcile(&self) -> Result<ReconcileOutcome> {
        let _pass = self.streamers.write_lock().await;

        let mut streamers = self.streamers.load()?;
        if streamers.is_empty() {
            debug!("[Reconcile] No tracked streamers, skipping status query");
            return Ok(ReconcileOutcome::Idle);
        }

        let logins: Vec<String> = streamers.iter().map(|s| s.username.clone()).collect();
        let live_streams = match self.source.live_streams(&logins).await {
            Ok(streams) => streams,
            Err(e) => {
                error!("[Reconcile] Status check failed, keeping previous state: {:#}", e);
                return Ok(ReconcileOutcome::Skipped);
            }
        };

        let transitions = apply_stream_status(&mut streamers, &live_streams);
        self.streamers.replace(&streamers)?;

        let went_live: Vec<&LivenessTransition> =
            transitions.iter().filter(|t| t.went_live()).collect();
        let mut dispatched = 0;
        let mut notified = 0;
        for transition in &went_live {
            if !self.cap.allows(dispatched) {
                debug!(
                    "[Reconcile] Notification cap reached, {} more went live silently",
                    went_live.len() - dispatched
                );
                break;
            }
            dispatched += 1;

            match self.dispatch(&transition.streamer).await {
                Ok(()) => notified += 1,
                Err(e) => error!(
                    "[Reconcile] Failed to announce {}: {:#}",
                    transition.streamer.username, e
                ),
            }
        }

        let outcome = ReconcileOutcome::Completed {
            checked: streamers.len(),
            live: streamers.iter().filter(|s| s.is_live).count(),
            went_live: went_live.len(),
            notified,
        };
        debug!("[Reconcile] Pass finished: {:?}", outcome);
        Ok(outcome)
    }

    async fn dispatch(&self, streamer: &Streamer) -> Result<()> {
        match &self.route {
            AlertRoute::Direct(alerts) => {
                alerts
                    .announce(&streamer.display_name, &streamer.username, &streamer.title)
                    .await?;
            }
            AlertRoute::Relay(bus) => {
                let message = BusMessage::StreamerLive {
                    display_name: streamer.display_name.clone(),
                    channel: streamer.username.clone(),
                    title: streamer.title.clone(),
                };
                if bus.publish(message) == 0 {
                    warn!(
                        "[Reconcile] {} went live but no background listener is running",
                        streamer.username
                    );
                }
            }
        }
        Ok(())
    }
}

/// Apply one status result to every tracked streamer.
///
/// Each transition compares against the streamer's value from before this
/// call; presence in `live` means live, absence means offline.
pub fn apply_stream_status(
    streamers: &mut [Streamer],
    live: &[TwitchStream],
) -> Vec<LivenessTransition> {
    let live_by_login: HashMap<String, &TwitchStream> = live
        .iter()
        .map(|stream| (stream.user_login.to_lowercase(), stream))
        .collect();

    streamers
        .iter_mut()
        .map(|streamer| {
            let was_live = streamer.is_live;
            match live_by_login.get(&streamer.username.to_lowercase()) {
                Some(stream) => streamer.mark_live(stream),
                None => streamer.mark_offline(),
            }
            LivenessTransition {
                streamer: streamer.clone(),
                was_live,
                is_live: streamer.is_live,
            }
        })
        .collect()
}

#[derive(Debug)]
enum MonitorCommand {
    CheckNow,
    Stop,
}

/// Control handle for a running [`LivenessMonitor`].
#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::UnboundedSender<MonitorCommand>,
}

impl MonitorHandle {
    pub fn check_now(&self) -> Result<()> {
        self.send(MonitorCommand::CheckNow)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(MonitorCommand::Stop)
    }

    fn send(&self, command: MonitorCommand) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| anyhow!("Liveness monitor is not running"))
    }
}

/// Runs the reconciler on a fixed interval and serves the background side of
/// the message bus.
///
/// A single task owns the timer. An interval change replaces it: one pass
/// runs straight away and the next one follows after the new interval.
pub struct LivenessMonitor {
    reconciler: Reconciler,
    alerts: Arc<LiveAlerts>,
    bus: MessageBus,
    interval_secs: u64,
}

impl LivenessMonitor {
    pub fn new(
        reconciler: Reconciler,
        alerts: Arc<LiveAlerts>,
        bus: MessageBus,
        interval_secs: u64,
    ) -> Self {
        Self {
            reconciler,
            alerts,
            bus,
            interval_secs: clamp_check_interval(interval_secs),
        }
    }

    pub fn spawn(self) -> (MonitorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        // Subscribe before spawning so nothing published from here on is missed
        let bus_rx = self.bus.subscribe();
        let task = tokio::spawn(self.run(rx, bus_rx));
        (MonitorHandle { tx }, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<MonitorCommand>,
        mut bus_rx: mpsc::UnboundedReceiver<BusMessage>,
    ) {
        info!(
            "[Reconcile] Liveness monitor started, checking every {}s",
            self.interval_secs
        );
        let mut ticker = new_ticker(self.interval_secs);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_pass("scheduled").await,
                command = commands.recv() => match command {
                    Some(MonitorCommand::CheckNow) => self.run_pass("on-demand").await,
                    Some(MonitorCommand::Stop) | None => break,
                },
                message = bus_rx.recv() => match message {
                    Some(BusMessage::IntervalChanged { interval_secs }) => {
                        self.interval_secs = clamp_check_interval(interval_secs);
                        ticker = new_ticker(self.interval_secs);
                        info!("[Reconcile] Check interval changed to {}s", self.interval_secs);
                    }
                    Some(BusMessage::StreamerLive { display_name, channel, title }) => {
                        if let Err(e) = self.alerts.announce(&display_name, &channel, &title).await {
                            error!("[Reconcile] Failed to announce relayed {}: {:#}", channel, e);
                        }
                    }
                    None => break,
                },
            }
        }

        info!("[Reconcile] Liveness monitor stopped");
    }

    async fn run_pass(&self, trigger: &str) {
        match self.reconciler.reconcile().await {
            Ok(ReconcileOutcome::Completed {
                went_live, notified, ..
            }) if went_live > 0 => {
                info!(
                    "[Reconcile] {} pass: {} went live, {} notified",
                    trigger, went_live, notified
                );
            }
            Ok(outcome) => debug!("[Reconcile] {} pass: {:?}", trigger, outcome),
            Err(e) => error!("[Reconcile] {} pass failed: {:#}", trigger, e),
        }
    }
}

fn new_ticker(secs: u64) -> Interval {
    let mut ticker = interval(Duration::from_secs(secs));
    // A slow pass pushes the schedule back instead of bursting
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
