//! Polling monitor — drives the node version check on a fixed cadence.
//!
//! A single task owns the ticker, the in-flight request and the change
//! filter. Ticks that fire while a request is outstanding are dropped, failed
//! polls become the "no data" report, and only verdict changes reach
//! subscribers through a `watch` channel (replay-latest).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::domain::change_filter::ChangeFilter;
use crate::domain::node::NodesInfo;
use crate::domain::report::{CompatibilityReport, ReportBuilder};
use crate::domain::version_policy::VersionPolicy;
use crate::error::{ConfigError, MonitorError, TransportError};
use crate::source::NodeInfoSource;

type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<NodesInfo, TransportError>> + Send + 'a>>;

/// Receiver side of the report stream.
///
/// `borrow()` yields the latest delivered report (if any); `changed()`
/// resolves on every later delivery and errors once the monitor has stopped.
pub type ReportReceiver = watch::Receiver<Option<CompatibilityReport>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Polling,
    Stopped,
}

pub struct PollingMonitor<S> {
    source: Arc<S>,
    builder: ReportBuilder,
    interval: Duration,
    state: MonitorState,
    reports_tx: Option<watch::Sender<Option<CompatibilityReport>>>,
    reports_rx: ReportReceiver,
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl<S: NodeInfoSource + 'static> PollingMonitor<S> {
    /// Validate the configuration and take ownership of the node source.
    pub fn new(config: &MonitorConfig, source: S) -> Result<Self, ConfigError> {
        config.validate()?;

        let builder = ReportBuilder::new(
            config.application_version.trim(),
            config.ignore_version_mismatch,
            VersionPolicy::new(config.version_strictness),
        );
        let (reports_tx, reports_rx) = watch::channel(None);
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            source: Arc::new(source),
            builder,
            interval: config.poll_interval(),
            state: MonitorState::Idle,
            reports_tx: Some(reports_tx),
            reports_rx,
            shutdown_tx,
            handle: None,
        })
    }

    /// Begin polling: the first poll runs immediately, then once per interval.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<(), MonitorError> {
        match self.state {
            MonitorState::Polling => return Err(MonitorError::AlreadyStarted),
            MonitorState::Stopped => return Err(MonitorError::Stopped),
            MonitorState::Idle => {}
        }
        let reports = self.reports_tx.take().ok_or(MonitorError::Stopped)?;

        info!(
            application_version = %self.builder.application_version(),
            interval_ms = self.interval.as_millis() as u64,
            "starting node version monitor"
        );

        self.handle = Some(tokio::spawn(run_poll_loop(
            self.source.clone(),
            self.builder.clone(),
            self.interval,
            reports,
            self.shutdown_tx.subscribe(),
        )));
        self.state = MonitorState::Polling;
        Ok(())
    }

    /// Stop polling. Any in-flight request is discarded; once this returns
    /// no further report is delivered and subscriber channels are closed.
    pub async fn stop(&mut self) {
        if self.state == MonitorState::Stopped {
            return;
        }
        self.state = MonitorState::Stopped;
        self.reports_tx = None;
        self.shutdown_tx.send_replace(true);

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "node version monitor task ended abnormally");
            }
        }
        info!("node version monitor stopped");
    }

    pub fn subscribe(&self) -> ReportReceiver {
        self.reports_rx.clone()
    }

    pub fn latest(&self) -> Option<CompatibilityReport> {
        self.reports_rx.borrow().clone()
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }
}

impl<S> Drop for PollingMonitor<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.shutdown_tx.send_replace(true);
            handle.abort();
        }
    }
}

async fn run_poll_loop<S: NodeInfoSource + ?Sized>(
    source: Arc<S>,
    builder: ReportBuilder,
    interval: Duration,
    reports: watch::Sender<Option<CompatibilityReport>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut filter = ChangeFilter::new();
    let mut in_flight: Option<FetchFuture<'_>> = None;
    let mut polls: u64 = 0;

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    if in_flight.is_some() {
                        debug!(poll = polls, "discarding in-flight poll on shutdown");
                    }
                    break;
                }
            }

            result = async {
                match in_flight.as_mut() {
                    Some(fetch) => fetch.await,
                    None => std::future::pending().await,
                }
            }, if in_flight.is_some() => {
                in_flight = None;

                let snapshot = result.unwrap_or_else(|e| {
                    warn!(poll = polls, error = %e, "node version poll failed, reporting no data");
                    NodesInfo::default()
                });
                let report = builder.build(&snapshot);

                if let Some(report) = filter.offer(report) {
                    log_verdict(polls, &report);
                    reports.send_replace(Some(report));
                }
            }

            _ = ticker.tick() => {
                if in_flight.is_some() {
                    debug!(poll = polls, "previous poll still in flight, dropping tick");
                    continue;
                }
                polls += 1;
                in_flight = Some(source.fetch_node_versions());
            }
        }
    }

    debug!(
        polls,
        last_compatible = ?filter.last().map(|r| r.is_compatible),
        "poll loop exited"
    );
}

fn log_verdict(poll: u64, report: &CompatibilityReport) {
    let message = report.message.as_deref().unwrap_or("all nodes match");
    if report.is_compatible && report.warning_nodes.is_empty() {
        info!(poll, is_compatible = true, "{}", message);
    } else if report.is_compatible {
        warn!(
            poll,
            is_compatible = true,
            warning_nodes = report.warning_nodes.len(),
            "{}",
            message
        );
    } else {
        warn!(
            poll,
            is_compatible = false,
            incompatible_nodes = report.incompatible_nodes.len(),
            "{}",
            message
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::domain::node::{NodeHttp, NodeInfo};
    use crate::domain::report::NO_DATA_MESSAGE;
    use crate::domain::version_policy::VersionStrictness;

    const INTERVAL: Duration = Duration::from_millis(100);

    /// Replays scripted responses; the last one repeats forever.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<NodesInfo, u16>>>,
        delay: Duration,
        calls: Arc<AtomicUsize>,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<NodesInfo, u16>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                delay: Duration::ZERO,
                calls: Arc::new(AtomicUsize::new(0)),
                in_flight: Arc::new(AtomicUsize::new(0)),
                max_in_flight: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn next_response(&self) -> Result<NodesInfo, u16> {
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front().unwrap()
            } else {
                responses.front().cloned().unwrap_or_else(|| Ok(NodesInfo::default()))
            }
        }
    }

    #[async_trait]
    impl NodeInfoSource for ScriptedSource {
        async fn fetch_node_versions(&self) -> Result<NodesInfo, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let response = self.next_response();
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            response.map_err(|code| TransportError::Status {
                url: "http://cluster/_nodes".into(),
                status: reqwest::StatusCode::from_u16(code).unwrap(),
            })
        }
    }

    fn cluster(versions: &[(&str, &str)]) -> NodesInfo {
        NodesInfo {
            nodes: versions
                .iter()
                .enumerate()
                .map(|(i, (key, version))| {
                    let ip = format!("10.0.0.{}", i + 1);
                    (
                        key.to_string(),
                        NodeInfo {
                            version: version.to_string(),
                            http: Some(NodeHttp {
                                publish_address: Some(format!("{ip}:9200")),
                            }),
                            ip,
                        },
                    )
                })
                .collect(),
        }
    }

    fn monitor_config() -> MonitorConfig {
        MonitorConfig {
            poll_interval_ms: INTERVAL.as_millis() as u64,
            application_version: "2.4.0".into(),
            ignore_version_mismatch: false,
            version_strictness: VersionStrictness::Strict,
        }
    }

    #[test]
    fn rejects_invalid_configuration() {
        let mut config = monitor_config();
        config.poll_interval_ms = 0;
        let result = PollingMonitor::new(&config, ScriptedSource::new(vec![]));
        assert!(matches!(result, Err(ConfigError::InvalidPollInterval)));

        let mut config = monitor_config();
        config.application_version = "latest".into();
        let result = PollingMonitor::new(&config, ScriptedSource::new(vec![]));
        assert!(matches!(result, Err(ConfigError::InvalidApplicationVersion(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn first_poll_is_immediate() {
        let source = ScriptedSource::new(vec![Ok(cluster(&[("n1", "2.4.0")]))]);
        let calls = source.calls.clone();
        let mut monitor = PollingMonitor::new(&monitor_config(), source).unwrap();
        let mut rx = monitor.subscribe();
        assert_eq!(monitor.state(), MonitorState::Idle);
        assert!(monitor.latest().is_none());

        monitor.start().unwrap();
        assert_eq!(monitor.state(), MonitorState::Polling);
        rx.changed().await.unwrap();

        let report = rx.borrow_and_update().clone().unwrap();
        assert!(report.is_compatible);
        assert!(report.message.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        monitor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn identical_polls_emit_once() {
        let source = ScriptedSource::new(vec![Ok(cluster(&[("n1", "2.4.0")]))]);
        let calls = source.calls.clone();
        let mut monitor = PollingMonitor::new(&monitor_config(), source).unwrap();
        let mut rx = monitor.subscribe();

        monitor.start().unwrap();
        rx.changed().await.unwrap();
        let _ = rx.borrow_and_update();

        tokio::time::sleep(INTERVAL * 5 + INTERVAL / 2).await;

        assert!(calls.load(Ordering::SeqCst) >= 5);
        assert!(!rx.has_changed().unwrap());

        monitor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn verdict_changes_are_delivered_in_order() {
        let source = ScriptedSource::new(vec![
            Ok(cluster(&[("n1", "2.4.0"), ("n2", "2.4.0")])),
            Ok(cluster(&[("n1", "2.4.0"), ("n2", "2.3.0")])),
            Ok(cluster(&[("n1", "2.4.0"), ("n2", "2.3.0")])),
            Ok(cluster(&[("n1", "2.4.0"), ("n2", "2.4.0")])),
        ]);
        let mut monitor = PollingMonitor::new(&monitor_config(), source).unwrap();
        let mut rx = monitor.subscribe();
        monitor.start().unwrap();

        let mut seen = Vec::new();
        for _ in 0..3 {
            rx.changed().await.unwrap();
            let report = rx.borrow_and_update().clone().unwrap();
            seen.push((report.is_compatible, report.incompatible_nodes.len()));
        }
        assert_eq!(seen, [(true, 0), (false, 1), (true, 0)]);

        monitor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_poll_reports_no_data_and_keeps_polling() {
        let source = ScriptedSource::new(vec![Err(503), Ok(cluster(&[("n1", "2.4.0")]))]);
        let mut monitor = PollingMonitor::new(&monitor_config(), source).unwrap();
        let mut rx = monitor.subscribe();
        monitor.start().unwrap();

        rx.changed().await.unwrap();
        let report = rx.borrow_and_update().clone().unwrap();
        assert!(!report.is_compatible);
        assert_eq!(report.message.as_deref(), Some(NO_DATA_MESSAGE));
        assert!(report.incompatible_nodes.is_empty());

        rx.changed().await.unwrap();
        let report = rx.borrow_and_update().clone().unwrap();
        assert!(report.is_compatible);
        assert_eq!(monitor.state(), MonitorState::Polling);

        monitor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_never_overlaps() {
        let source = ScriptedSource::new(vec![Ok(cluster(&[("n1", "2.4.0")]))])
            .with_delay(INTERVAL * 3 + INTERVAL / 2);
        let calls = source.calls.clone();
        let max_in_flight = source.max_in_flight.clone();
        let mut monitor = PollingMonitor::new(&monitor_config(), source).unwrap();
        monitor.start().unwrap();

        tokio::time::sleep(INTERVAL * 10).await;

        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        let calls = calls.load(Ordering::SeqCst);
        assert!((2..=3).contains(&calls), "unexpected call count {calls}");

        monitor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_discards_in_flight_poll() {
        let source = ScriptedSource::new(vec![Ok(cluster(&[("n1", "2.4.0")]))])
            .with_delay(Duration::from_secs(60));
        let calls = source.calls.clone();
        let mut monitor = PollingMonitor::new(&monitor_config(), source).unwrap();
        let mut rx = monitor.subscribe();
        monitor.start().unwrap();

        tokio::time::sleep(INTERVAL / 2).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        monitor.stop().await;
        assert_eq!(monitor.state(), MonitorState::Stopped);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(rx.borrow().is_none());
        assert!(rx.changed().await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn late_subscriber_sees_latest_report() {
        let source = ScriptedSource::new(vec![Ok(cluster(&[("n1", "2.3.0")]))]);
        let mut monitor = PollingMonitor::new(&monitor_config(), source).unwrap();
        let mut early = monitor.subscribe();
        monitor.start().unwrap();
        early.changed().await.unwrap();

        let late = monitor.subscribe();
        let replayed = late.borrow().clone().unwrap();
        assert!(!replayed.is_compatible);
        assert_eq!(replayed.incompatible_nodes[0].version, "2.3.0");
        assert_eq!(monitor.latest(), Some(replayed));

        monitor.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn lifecycle_transitions_are_one_way() {
        let mut monitor =
            PollingMonitor::new(&monitor_config(), ScriptedSource::new(vec![])).unwrap();
        monitor.start().unwrap();
        assert_eq!(monitor.start(), Err(MonitorError::AlreadyStarted));

        monitor.stop().await;
        monitor.stop().await;
        assert_eq!(monitor.start(), Err(MonitorError::Stopped));

        let mut idle =
            PollingMonitor::new(&monitor_config(), ScriptedSource::new(vec![])).unwrap();
        let mut rx = idle.subscribe();
        idle.stop().await;
        assert_eq!(idle.state(), MonitorState::Stopped);
        assert!(rx.changed().await.is_err());
    }
}
