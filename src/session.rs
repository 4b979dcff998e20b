// The single owner of viewer state: store, filter, threshold, analysis and the stream simulator.
// Views are pure projections recomputed on every call. One tokio mutex orders all mutations;
// the stream tick and the analysis completion each commit under it in one step.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::analysis::{self, AnalysisBackend, AnalysisError};
use crate::analysis_repo::AnalysisRepo;
use crate::analytics::{compute_stats, incidents::detect_incidents_with};
use crate::config::AppConfig;
use crate::ingest::{self, IngestError};
use crate::models::{AnalysisResult, Sample, SessionEvent, TimeRange, View};
use crate::store::SampleStore;
use crate::stream::{self, StreamDeps, StreamSimulator, StreamTaskConfig};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("no samples to work with")]
    NoData,
    #[error("no analysis to save")]
    NoAnalysis,
    #[error("stream is active; stop it first")]
    StreamActive,
    #[error("time range is locked while the stream is active")]
    RangeLocked,
    #[error("an analysis is already in progress")]
    AnalysisInFlight,
    #[error("threshold must be between 1 and 100, got {0}")]
    InvalidThreshold(u16),
    #[error("range start is after range end")]
    InvalidRange,
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Session tunables, taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub tick_interval: Duration,
    pub window_capacity: usize,
    pub default_threshold: u8,
    pub min_run_length: usize,
    pub model: String,
    pub max_points: usize,
    pub event_capacity: usize,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            tick_interval: Duration::from_millis(config.stream.tick_interval_ms),
            window_capacity: config.stream.window_capacity,
            default_threshold: config.incidents.default_threshold,
            min_run_length: config.incidents.min_run_length,
            model: config.analysis.model.clone(),
            max_points: config.analysis.max_points,
            event_capacity: config.server.broadcast_capacity,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            window_capacity: 100,
            default_threshold: 80,
            min_run_length: crate::analytics::incidents::MIN_RUN_LENGTH,
            model: "gemini-2.5-flash".into(),
            max_points: 100,
            event_capacity: 64,
        }
    }
}

/// Mutable state behind the session lock.
pub struct SessionState {
    pub(crate) store: SampleStore,
    pub(crate) range: TimeRange,
    pub(crate) threshold: u8,
    pub(crate) analysis: Option<AnalysisResult>,
    pub(crate) analyzing: bool,
    /// Bumped on every wholesale replace; an analysis started on an older generation is stale.
    pub(crate) generation: u64,
    pub(crate) simulator: StreamSimulator,
}

impl SessionState {
    /// While streaming the range filter is bypassed: the whole window is visible.
    fn visible_samples(&self) -> Vec<Sample> {
        if self.simulator.is_active() {
            self.store.all()
        } else {
            self.store.filter(&self.range)
        }
    }
}

#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
    analyzer: Arc<dyn AnalysisBackend>,
    repo: Arc<AnalysisRepo>,
    settings: Arc<SessionSettings>,
}

impl Session {
    pub fn new(
        settings: SessionSettings,
        analyzer: Arc<dyn AnalysisBackend>,
        repo: Arc<AnalysisRepo>,
    ) -> Self {
        let (events, _) = broadcast::channel(settings.event_capacity.max(1));
        let state = SessionState {
            store: SampleStore::new(),
            range: TimeRange::default(),
            threshold: settings.default_threshold,
            analysis: None,
            analyzing: false,
            generation: 0,
            simulator: StreamSimulator::new(),
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            events,
            analyzer,
            repo,
            settings: Arc::new(settings),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: SessionEvent) {
        // No subscribers is the normal case without WebSocket clients.
        let _ = self.events.send(event);
    }

    /// Replaces the store with the valid lines of `text`. Zero valid lines → error, store untouched.
    pub async fn load_text(&self, text: &str) -> Result<usize, SessionError> {
        let samples = ingest::parse_non_empty(text)?;
        Ok(self.replace_samples(samples).await)
    }

    pub async fn load_demo(&self) -> usize {
        self.replace_samples(ingest::generate_demo()).await
    }

    pub async fn load_samples(&self, samples: Vec<Sample>) -> Result<usize, SessionError> {
        if samples.is_empty() {
            return Err(IngestError::NoValidLines.into());
        }
        Ok(self.replace_samples(samples).await)
    }

    async fn replace_samples(&self, samples: Vec<Sample>) -> usize {
        let count = samples.len();
        {
            let mut st = self.state.lock().await;
            st.store.replace(samples);
            st.generation += 1;
            st.analysis = None;
        }
        info!(count, "samples loaded");
        self.publish(SessionEvent::Reloaded { count });
        count
    }

    pub async fn set_range(&self, range: TimeRange) -> Result<(), SessionError> {
        if let (Some(start), Some(end)) = (range.start, range.end)
            && start > end
        {
            return Err(SessionError::InvalidRange);
        }
        let mut st = self.state.lock().await;
        if st.simulator.is_active() {
            return Err(SessionError::RangeLocked);
        }
        st.range = range;
        Ok(())
    }

    pub async fn set_threshold(&self, threshold: u16) -> Result<(), SessionError> {
        let value = u8::try_from(threshold)
            .ok()
            .filter(|t| (1..=100).contains(t))
            .ok_or(SessionError::InvalidThreshold(threshold))?;
        self.state.lock().await.threshold = value;
        Ok(())
    }

    /// Filtered samples, stats and incidents, derived from current state.
    pub async fn view(&self) -> View {
        let st = self.state.lock().await;
        let samples = st.visible_samples();
        let stats = compute_stats(&samples);
        let incidents =
            detect_incidents_with(&samples, f64::from(st.threshold), self.settings.min_run_length);
        View {
            samples,
            stats,
            incidents,
            threshold: st.threshold,
            range: st.range,
            streaming: st.simulator.is_active(),
            analyzing: st.analyzing,
            analysis: st.analysis.clone(),
        }
    }

    pub async fn is_streaming(&self) -> bool {
        self.state.lock().await.simulator.is_active()
    }

    /// idle → active. Returns `Ok(false)` if already streaming. Clears the in-memory analysis.
    pub async fn start_stream(&self) -> Result<bool, SessionError> {
        let mut st = self.state.lock().await;
        if st.simulator.is_active() {
            return Ok(false);
        }
        if st.analyzing {
            return Err(SessionError::AnalysisInFlight);
        }
        if st.store.is_empty() {
            return Err(SessionError::NoData);
        }
        st.analysis = None;

        let weak = Arc::downgrade(&self.state);
        let events = self.events.clone();
        let config = StreamTaskConfig {
            tick_interval: self.settings.tick_interval,
            window_capacity: self.settings.window_capacity,
        };
        st.simulator.start(|epoch, shutdown_rx| {
            stream::spawn(
                StreamDeps {
                    state: weak,
                    events,
                    epoch,
                    shutdown_rx,
                },
                config,
            )
        });
        drop(st);

        info!(
            tick_interval_ms = self.settings.tick_interval.as_millis() as u64,
            "stream started"
        );
        self.publish(SessionEvent::StreamStarted);
        Ok(true)
    }

    /// active → idle. Returns false if already idle. No tick commits after this returns.
    pub async fn stop_stream(&self) -> bool {
        let stopped = self.state.lock().await.simulator.stop();
        if stopped {
            info!("stream stopped");
            self.publish(SessionEvent::StreamStopped);
        }
        stopped
    }

    /// Runs an AI analysis of the visible samples. While streaming, `confirm_stop_stream` must be
    /// set; the stream is then stopped first. The request runs to completion even if the caller
    /// goes away. The result replaces the current one and is saved, unless it is the fallback
    /// report or the samples were replaced while it ran.
    pub async fn analyze(&self, confirm_stop_stream: bool) -> Result<AnalysisResult, SessionError> {
        let (samples, generation) = {
            let mut st = self.state.lock().await;
            if st.analyzing {
                return Err(SessionError::AnalysisInFlight);
            }
            if st.simulator.is_active() {
                if !confirm_stop_stream {
                    return Err(SessionError::StreamActive);
                }
                st.simulator.stop();
                info!("stream stopped for analysis");
                self.publish(SessionEvent::StreamStopped);
            }
            let samples = st.visible_samples();
            if samples.is_empty() {
                return Err(SessionError::NoData);
            }
            st.analyzing = true;
            (samples, st.generation)
        };

        let session = self.clone();
        let task = tokio::spawn(async move { session.finish_analysis(samples, generation).await });
        match task.await {
            Ok(result) => result,
            Err(e) => {
                self.state.lock().await.analyzing = false;
                Err(SessionError::Storage(anyhow::anyhow!("analysis task: {}", e)))
            }
        }
    }

    async fn finish_analysis(
        &self,
        samples: Vec<Sample>,
        generation: u64,
    ) -> Result<AnalysisResult, SessionError> {
        let outcome = analysis::request_analysis(
            self.analyzer.as_ref(),
            &self.settings.model,
            &samples,
            self.settings.max_points,
        )
        .await;

        let result = {
            let mut st = self.state.lock().await;
            st.analyzing = false;
            let result = outcome?;
            if st.generation != generation {
                info!("samples replaced during analysis; result discarded");
                return Ok(result);
            }
            st.analysis = Some(result.clone());
            result
        };

        // Fallback reports stay in memory only.
        if result.is_fallback() {
            debug!("fallback report not persisted");
        } else if let Err(e) = self.repo.save(&result).await {
            warn!(error = %e, "failed to persist analysis");
        }
        self.publish(SessionEvent::Analysis {
            analysis: Some(result.clone()),
        });
        Ok(result)
    }

    pub async fn current_analysis(&self) -> Option<AnalysisResult> {
        self.state.lock().await.analysis.clone()
    }

    pub async fn save_analysis(&self) -> Result<(), SessionError> {
        let current = self.current_analysis().await.ok_or(SessionError::NoAnalysis)?;
        self.repo.save(&current).await?;
        Ok(())
    }

    pub async fn has_saved_analysis(&self) -> Result<bool, SessionError> {
        Ok(self.repo.has_saved().await?)
    }

    /// Restores the saved report into memory. Empty or corrupt slot → `Ok(None)`, state untouched.
    pub async fn load_saved_analysis(&self) -> Result<Option<AnalysisResult>, SessionError> {
        let saved = self.repo.load().await?;
        if let Some(result) = &saved {
            self.state.lock().await.analysis = Some(result.clone());
            self.publish(SessionEvent::Analysis {
                analysis: Some(result.clone()),
            });
        }
        Ok(saved)
    }

    /// Empties the saved slot, then drops the in-memory report. A storage failure leaves memory intact.
    pub async fn clear_analysis(&self) -> Result<(), SessionError> {
        self.repo.clear().await?;
        self.state.lock().await.analysis = None;
        self.publish(SessionEvent::Analysis { analysis: None });
        Ok(())
    }

    /// Stops any pending stream work; called on process exit.
    pub async fn shutdown(&self) {
        if self.stop_stream().await {
            info!("stream cancelled on shutdown");
        }
    }
}
