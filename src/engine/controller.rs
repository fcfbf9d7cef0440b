//! Viewport clustering controller
//!
//! `ClusteringEngine` owns the point set, the built strategy and the
//! published entity list. Data changes start a pass right away; viewport
//! changes go through the debouncer first. Small point sets are clustered
//! inline, larger ones on a worker thread that reports back over a channel.
//! The pass tracker decides which results get published.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use tracing::{debug, warn};

use super::config::{EngineConfig, StrategyChoice};
use super::debounce::Debouncer;
use super::listener::{MapListener, NoopListener};
use super::tracker::{Completion, PassState, PassTracker};
use crate::cluster::{
    Cluster, ClusterEntity, ClusterId, ClusterIndex, ClusterOptions, ClusterStrategy,
    DistanceClusterer, cap_entities,
};
use crate::error::{ClusterError, OptionsError};
use crate::geometry::{FeaturePoint, RawRecord, decode_batch};
use crate::viewport::{Viewport, get_bounds_for_cluster_expansion};

pub type SharedStrategy<P> = Arc<dyn ClusterStrategy<P>>;

/// Builds the strategy `config` asks for over `points`
pub fn build_strategy<P>(
    points: Arc<[FeaturePoint<P>]>,
    config: &EngineConfig,
) -> Result<SharedStrategy<P>, OptionsError>
where
    P: Clone + Send + Sync + 'static,
{
    let use_distance = match config.strategy {
        StrategyChoice::Hierarchical => false,
        StrategyChoice::Distance => true,
        StrategyChoice::Auto => points.len() < config.auto_distance_below,
    };

    if use_distance {
        let clusterer = DistanceClusterer::new(points.iter().cloned())
            .with_min_points(config.options.min_points);
        Ok(Arc::new(clusterer))
    } else {
        Ok(Arc::new(ClusterIndex::build(points, config.options)?))
    }
}

/// Everything one pass needs, detached from the engine
struct PassJob<P> {
    seq: u64,
    generation: u64,
    points: Arc<[FeaturePoint<P>]>,
    strategy: Option<SharedStrategy<P>>,
    config: EngineConfig,
    viewport: Viewport,
}

struct PassResult<P> {
    seq: u64,
    generation: u64,
    viewport: Viewport,
    strategy: Option<SharedStrategy<P>>,
    entities: Vec<ClusterEntity<P>>,
}

impl<P: Clone + Send + Sync + 'static> PassJob<P> {
    fn run(self) -> PassResult<P> {
        let started = Instant::now();
        let seq = self.seq;

        let strategy = match self.strategy {
            Some(strategy) => Some(strategy),
            None => match build_strategy(Arc::clone(&self.points), &self.config) {
                Ok(strategy) => {
                    debug!(
                        seq,
                        strategy = strategy.name(),
                        points = self.points.len(),
                        elapsed_us = started.elapsed().as_micros() as u64,
                        "built cluster strategy"
                    );
                    Some(strategy)
                }
                Err(e) => {
                    warn!(seq, error = %e, "cannot build cluster strategy");
                    None
                }
            },
        };

        let mut entities = strategy
            .as_ref()
            .map(|s| s.clusters(&self.viewport))
            .unwrap_or_default();
        cap_entities(&mut entities, self.config.max_entities);
        debug!(
            seq,
            entities = entities.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "pass finished"
        );

        PassResult {
            seq,
            generation: self.generation,
            viewport: self.viewport,
            strategy,
            entities,
        }
    }
}

/// Turns a point set and a moving viewport into render-ready entities
///
/// Not shared between threads itself; the worker threads it spawns only see
/// immutable snapshots of the points and the strategy.
pub struct ClusteringEngine<P> {
    config: EngineConfig,
    points: Arc<[FeaturePoint<P>]>,
    /// Bumped on every data or options change
    generation: u64,
    /// Strategy built for the current generation, once a pass produced it
    strategy: Option<SharedStrategy<P>>,
    viewport: Option<Viewport>,
    debouncer: Debouncer<Viewport>,
    tracker: PassTracker,
    entities: Vec<ClusterEntity<P>>,
    /// Strategy and viewport the published entities came from
    published: Option<(SharedStrategy<P>, Viewport)>,
    results_tx: Sender<PassResult<P>>,
    results_rx: Receiver<PassResult<P>>,
    listener: Box<dyn MapListener<P>>,
}

impl<P: Clone + Send + Sync + 'static> ClusteringEngine<P> {
    pub fn new(config: EngineConfig) -> Result<Self, OptionsError> {
        config.validate()?;
        let (results_tx, results_rx) = unbounded();

        Ok(Self {
            debouncer: Debouncer::new(config.debounce()),
            config,
            points: Arc::from(Vec::new()),
            generation: 0,
            strategy: None,
            viewport: None,
            tracker: PassTracker::new(),
            entities: Vec::new(),
            published: None,
            results_tx,
            results_rx,
            listener: Box::new(NoopListener),
        })
    }

    pub fn with_listener(mut self, listener: impl MapListener<P> + 'static) -> Self {
        self.listener = Box::new(listener);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn points(&self) -> &[FeaturePoint<P>] {
        &self.points
    }

    /// Last applied viewport (pending debounced ones excluded)
    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn state(&self) -> PassState {
        self.tracker.state()
    }

    /// Latest published entity list
    pub fn entities(&self) -> &[ClusterEntity<P>] {
        &self.entities
    }

    /// Name of the strategy behind the published entities
    pub fn strategy_name(&self) -> Option<&'static str> {
        self.published.as_ref().map(|(s, _)| s.name())
    }

    /// Looks a cluster up in the published entities
    pub fn find_cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.entities
            .iter()
            .filter_map(|e| e.as_cluster())
            .find(|c| c.id == id)
    }

    /// Decodes a record batch and replaces the point set with it
    ///
    /// Undecodable records are dropped. Returns the number of points kept.
    pub fn set_records(&mut self, records: &[RawRecord<P>]) -> usize {
        let points = decode_batch(records);
        let kept = points.len();
        if kept < records.len() {
            debug!(dropped = records.len() - kept, kept, "record batch decoded");
        }
        self.set_points(points);
        kept
    }

    /// Replaces the point set; the strategy is rebuilt on the next pass
    pub fn set_points(&mut self, points: Vec<FeaturePoint<P>>) {
        self.points = points.into();
        self.invalidate();
        debug!(points = self.points.len(), generation = self.generation, "point set replaced");
        self.request_pass();
    }

    pub fn set_options(&mut self, options: ClusterOptions) -> Result<(), OptionsError> {
        options.validate()?;
        self.config.options = options;
        self.invalidate();
        self.request_pass();
        Ok(())
    }

    /// Feeds a viewport change
    ///
    /// The change is applied once `debounce_ms` passed without another one,
    /// checked here and in `tick`. Invalid viewports are ignored.
    pub fn set_viewport(&mut self, viewport: Viewport, now: Instant) {
        if !viewport.is_valid() {
            warn!(?viewport, "ignoring invalid viewport");
            return;
        }
        self.debouncer.push(viewport, now);
        self.tick(now);
    }

    /// Applies a due viewport and handles finished background passes
    pub fn tick(&mut self, now: Instant) {
        if let Some(viewport) = self.debouncer.poll(now) {
            self.apply_viewport(viewport);
        }
        while let Ok(result) = self.results_rx.try_recv() {
            self.handle_result(result);
        }
    }

    /// Applies a pending viewport without waiting for the quiet period
    pub fn flush(&mut self) {
        if let Some(viewport) = self.debouncer.flush() {
            self.apply_viewport(viewport);
        }
    }

    /// Blocks until no pass is in flight or `timeout` elapses
    ///
    /// Superseded results that come back restart a pass, which is waited for
    /// as well. Returns `false` on timeout.
    pub fn wait_for_pass(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        while !self.tracker.is_idle() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.results_rx.recv_timeout(remaining) {
                Ok(result) => self.handle_result(result),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return false;
                }
            }
        }
        true
    }

    pub fn press_marker(&mut self, point: &FeaturePoint<P>) {
        self.listener.on_marker_press(point);
    }

    /// Camera target for a tap on `cluster`
    ///
    /// Fails with `IndexNotBuilt` before the first publish and with
    /// `ClusterNotFound` when the cluster came from an older point set.
    pub fn expansion_target(&self, cluster: &Cluster) -> Result<Viewport, ClusterError> {
        let (strategy, published_viewport) =
            self.published.as_ref().ok_or(ClusterError::IndexNotBuilt)?;
        let current = self.viewport.unwrap_or(*published_viewport);
        let zoom = strategy.expansion_zoom(cluster, &current)?;
        Ok(get_bounds_for_cluster_expansion(cluster, zoom, &current))
    }

    /// Handles a tap on a cluster
    ///
    /// Returns the viewport to animate to. Taps on clusters that no longer
    /// exist are ignored and return `None`.
    pub fn press_cluster(&mut self, cluster: &Cluster) -> Option<Viewport> {
        match self.expansion_target(cluster) {
            Ok(target) => {
                debug!(cluster = %cluster.id, zoom = target.zoom(), "expanding cluster");
                self.listener.on_cluster_press(cluster, &target);
                Some(target)
            }
            Err(e) => {
                debug!(cluster = %cluster.id, error = %e, "ignoring cluster press");
                None
            }
        }
    }

    fn invalidate(&mut self) {
        self.generation += 1;
        self.strategy = None;
    }

    fn apply_viewport(&mut self, viewport: Viewport) {
        debug!(zoom = viewport.zoom(), "viewport applied");
        self.viewport = Some(viewport);
        self.request_pass();
    }

    fn request_pass(&mut self) {
        let Some(viewport) = self.viewport else {
            debug!("no viewport yet, pass deferred");
            return;
        };
        match self.tracker.request() {
            Some(seq) => self.start_pass(seq, viewport),
            None => debug!(latest = self.tracker.latest(), "pass in flight, marked stale"),
        }
    }

    fn start_pass(&mut self, seq: u64, viewport: Viewport) {
        let job = PassJob {
            seq,
            generation: self.generation,
            points: Arc::clone(&self.points),
            strategy: self.strategy.clone(),
            config: self.config.clone(),
            viewport,
        };

        if self.points.len() > self.config.background_threshold {
            debug!(seq, points = self.points.len(), "starting background pass");
            let tx = self.results_tx.clone();
            thread::spawn(move || {
                // the engine may be gone by the time the pass ends
                let _ = tx.send(job.run());
            });
        } else {
            let result = job.run();
            self.handle_result(result);
        }
    }

    fn handle_result(&mut self, result: PassResult<P>) {
        if result.generation == self.generation && self.strategy.is_none() {
            self.strategy = result.strategy.clone();
        }

        match self.tracker.complete(result.seq) {
            Completion::Publish => {
                debug!(seq = result.seq, entities = result.entities.len(), "publishing entities");
                self.entities = result.entities;
                self.published = result.strategy.map(|s| (s, result.viewport));
                self.listener.on_entities(&self.entities);
            }
            Completion::Discard { restart } => {
                debug!(seq = result.seq, "discarding superseded result");
                if let (Some(next), Some(viewport)) = (restart, self.viewport) {
                    self.start_pass(next, viewport);
                }
            }
        }
    }
}
