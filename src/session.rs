use crate::{
    catalog::FrameCatalog,
    diagnostics::{Diagnostics, LoadFailure},
    error::ViewerError,
    loader::{FrameLoader, LoadEvent, LoadEventKind, LoadRequest, RequestId},
    scene::{Helper, RenderSurface, Scene, SurfaceConfig},
    sequencer::{FrameCommand, FrameSequencer},
};
use flume::{Receiver, Sender};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerConfig {
    pub surface: SurfaceConfig,
    pub axes_size: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            surface: SurfaceConfig::default(),
            axes_size: 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Unmounted,
    /// Mounted, nothing displayed and nothing pending. Reached when the
    /// first load fails.
    Empty,
    Loading,
    Ready,
}

/// Owns the scene and everything needed to show one frame of a catalog.
///
/// Loads run through the [FrameLoader] and report back over a channel that
/// [ViewerSession::poll] drains on the render thread. Only the most recent
/// request may replace the displayed mesh; older completions are dropped.
pub struct ViewerSession<L, D> {
    catalog: FrameCatalog,
    sequencer: FrameSequencer,
    config: ViewerConfig,
    loader: L,
    diagnostics: D,
    scene: Scene,
    state: SessionState,
    next_request: u64,
    latest: Option<RequestId>,
    events_tx: Sender<LoadEvent>,
    events_rx: Receiver<LoadEvent>,
}

impl<L, D> ViewerSession<L, D>
where
    L: FrameLoader,
    D: Diagnostics,
{
    pub fn new(catalog: FrameCatalog, config: ViewerConfig, loader: L, diagnostics: D) -> Self {
        let sequencer = FrameSequencer::new(catalog.len());
        let (events_tx, events_rx) = flume::unbounded();
        Self {
            catalog,
            sequencer,
            config,
            loader,
            diagnostics,
            scene: Scene::new(),
            state: SessionState::Unmounted,
            next_request: 0,
            latest: None,
            events_tx,
            events_rx,
        }
    }

    pub fn mount<S>(&mut self, surface: &mut S)
    where
        S: RenderSurface + ?Sized,
    {
        if self.is_mounted() {
            debug!("session already mounted");
            return;
        }

        surface.configure(&self.config.surface);
        self.scene = Scene::new();
        self.scene.add_helper(Helper::Axes {
            size: self.config.axes_size,
        });
        self.state = SessionState::Empty;
        info!("mounted viewer with {} frames", self.catalog.len());

        let index = self.sequencer.index();
        if let Err(err) = self.load_frame(index) {
            debug!("initial load not issued: {err}");
        }
    }

    /// Disposes every scene resource and releases the surface. Loads still
    /// in flight are discarded when they finish.
    pub fn unmount<S>(&mut self, surface: &mut S)
    where
        S: RenderSurface + ?Sized,
    {
        if !self.is_mounted() {
            return;
        }

        self.scene.dispose();
        surface.release();

        // Workers holding the old sender now send into a closed channel.
        let (events_tx, events_rx) = flume::unbounded();
        self.events_tx = events_tx;
        self.events_rx = events_rx;
        self.latest = None;
        self.state = SessionState::Unmounted;
        info!("unmounted viewer");
    }

    /// Jumps to `index`, rejecting indices outside the catalog.
    pub fn set_frame(&mut self, index: usize) -> Result<usize, ViewerError> {
        self.apply(FrameCommand::Set(index))
    }

    /// Moves by `delta` frames with wraparound.
    pub fn step(&mut self, delta: isize) -> usize {
        let index = self.sequencer.step(delta);
        self.reload(index);
        index
    }

    pub fn apply(&mut self, command: FrameCommand) -> Result<usize, ViewerError> {
        let index = self.sequencer.apply(command)?;
        self.reload(index);
        Ok(index)
    }

    fn reload(&mut self, index: usize) {
        if self.is_mounted() {
            if let Err(err) = self.load_frame(index) {
                debug!("load for frame {index} not issued: {err}");
            }
        }
    }

    /// Requests decoding of frame `index` and returns immediately.
    pub fn load_frame(&mut self, index: usize) -> Result<RequestId, ViewerError> {
        if !self.is_mounted() {
            return Err(ViewerError::NotMounted);
        }
        let path = self
            .catalog
            .get(index)
            .ok_or(ViewerError::InvalidFrameIndex {
                index,
                len: self.catalog.len(),
            })?
            .to_path_buf();

        let id = RequestId(self.next_request);
        self.next_request += 1;
        self.latest = Some(id);
        self.state = SessionState::Loading;

        debug!("loading frame {index} ({id}) from {}", path.display());
        self.loader.load(
            LoadRequest {
                id,
                frame: index,
                path,
            },
            self.events_tx.clone(),
        );
        Ok(id)
    }

    /// Applies every load event that has arrived. Returns how many were
    /// handled.
    pub fn poll(&mut self) -> usize {
        let events: Vec<_> = self.events_rx.try_iter().collect();
        let count = events.len();
        for event in events {
            self.handle_event(event);
        }
        count
    }

    fn handle_event(&mut self, event: LoadEvent) {
        let LoadEvent { id, frame, kind } = event;
        let is_latest = self.latest == Some(id);

        match kind {
            LoadEventKind::Progress { loaded, total } => {
                if is_latest {
                    self.diagnostics.progress(id, frame, loaded, total);
                }
            }
            LoadEventKind::Loaded(geometry) => {
                if !is_latest || !self.is_mounted() {
                    debug!("discarding stale result for frame {frame} ({id})");
                    return;
                }
                let point_count = geometry.len();
                let mesh = self
                    .scene
                    .create_mesh(frame, geometry, self.config.surface.point_size);
                let replaced = self.scene.replace_mesh(mesh);
                self.latest = None;
                self.state = SessionState::Ready;
                debug!(
                    "frame {frame} ({id}) displayed with {point_count} points, replacing {replaced:?}"
                );
            }
            LoadEventKind::Failed(error) => {
                self.diagnostics.failure(&LoadFailure { id, frame, error });
                if is_latest {
                    self.latest = None;
                    self.state = if self.scene.mesh().is_some() {
                        SessionState::Ready
                    } else {
                        SessionState::Empty
                    };
                }
            }
        }
    }

    pub fn render<S>(&self, surface: &mut S)
    where
        S: RenderSurface + ?Sized,
    {
        if self.is_mounted() {
            self.scene.render(surface);
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.state != SessionState::Unmounted
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn index(&self) -> usize {
        self.sequencer.index()
    }

    pub fn catalog(&self) -> &FrameCatalog {
        &self.catalog
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        data::PointCloudGeometry, diagnostics::RecordingDiagnostics, error::LoadError,
        scene::PointCloudMesh,
    };
    use nalgebra::Point3;
    use std::path::PathBuf;

    /// Records requests; tests complete them by hand.
    #[derive(Default)]
    pub(crate) struct ManualLoader {
        pub requests: Vec<(LoadRequest, Sender<LoadEvent>)>,
    }

    impl FrameLoader for ManualLoader {
        fn load(&mut self, request: LoadRequest, events: Sender<LoadEvent>) {
            self.requests.push((request, events));
        }
    }

    impl ManualLoader {
        pub fn succeed(&self, nth: usize, points: usize) {
            let (request, events) = &self.requests[nth];
            let geometry = PointCloudGeometry::uniform(vec![Point3::origin(); points]);
            let _ = events.send(LoadEvent {
                id: request.id,
                frame: request.frame,
                kind: LoadEventKind::Loaded(geometry),
            });
        }

        pub fn fail(&self, nth: usize) {
            let (request, events) = &self.requests[nth];
            let _ = events.send(LoadEvent {
                id: request.id,
                frame: request.frame,
                kind: LoadEventKind::Failed(LoadError::Decode {
                    path: request.path.clone(),
                    message: "truncated".to_string(),
                }),
            });
        }

        pub fn progress(&self, nth: usize, loaded: u64, total: u64) {
            let (request, events) = &self.requests[nth];
            let _ = events.send(LoadEvent {
                id: request.id,
                frame: request.frame,
                kind: LoadEventKind::Progress { loaded, total },
            });
        }
    }

    #[derive(Debug, Default)]
    pub(crate) struct RecordingSurface {
        pub configured: Option<SurfaceConfig>,
        pub axes: Vec<f32>,
        pub point_draws: Vec<usize>,
        pub released: bool,
    }

    impl RenderSurface for RecordingSurface {
        fn configure(&mut self, config: &SurfaceConfig) {
            self.configured = Some(*config);
        }

        fn draw_axes(&mut self, _origin: Point3<f32>, size: f32) {
            self.axes.push(size);
        }

        fn draw_points(&mut self, mesh: &PointCloudMesh) {
            self.point_draws.push(mesh.frame());
        }

        fn release(&mut self) {
            self.released = true;
        }
    }

    pub(crate) type TestSession = ViewerSession<ManualLoader, RecordingDiagnostics>;

    pub(crate) fn session(frames: usize) -> TestSession {
        let catalog = FrameCatalog::from_paths(
            (1..=frames).map(|n| PathBuf::from(format!("models/scan_{n:03}.pcd"))),
        )
        .unwrap();
        ViewerSession::new(
            catalog,
            ViewerConfig::default(),
            ManualLoader::default(),
            RecordingDiagnostics::default(),
        )
    }

    fn mounted(frames: usize) -> (TestSession, RecordingSurface) {
        let mut session = session(frames);
        let mut surface = RecordingSurface::default();
        session.mount(&mut surface);
        (session, surface)
    }

    #[test]
    fn mount_configures_surface_and_loads_first_frame() {
        let (session, surface) = mounted(12);

        assert_eq!(surface.configured, Some(SurfaceConfig::default()));
        assert_eq!(session.state(), SessionState::Loading);
        let (request, _) = &session.loader().requests[0];
        assert_eq!(request.frame, 0);
        assert_eq!(request.path, PathBuf::from("models/scan_001.pcd"));
        assert_eq!(session.scene().drawable_count(), 1);
    }

    #[test]
    fn mount_passes_configured_size_to_surface() {
        let config = ViewerConfig {
            surface: SurfaceConfig {
                width: 1280,
                height: 720,
                point_size: 2.0,
            },
            axes_size: 5.0,
        };
        let mut session = ViewerSession::new(
            FrameCatalog::from_paths(["models/scan_001.pcd"]).unwrap(),
            config,
            ManualLoader::default(),
            RecordingDiagnostics::default(),
        );
        let mut surface = RecordingSurface::default();
        session.mount(&mut surface);
        session.render(&mut surface);

        assert_eq!(surface.configured, Some(config.surface));
        assert_eq!(surface.axes, vec![5.0]);
    }

    #[test]
    fn successful_load_replaces_previous_mesh() {
        let (mut session, mut surface) = mounted(12);
        session.loader.succeed(0, 10);
        session.poll();
        assert_eq!(session.state(), SessionState::Ready);
        let a_ids = session.scene().mesh().unwrap().resource_ids();

        session.step(1);
        assert_eq!(session.state(), SessionState::Loading);
        session.loader.succeed(1, 20);
        session.poll();

        let scene = session.scene();
        assert_eq!(scene.mesh().unwrap().frame(), 1);
        assert_eq!(scene.mesh().unwrap().geometry().len(), 20);
        assert_eq!(scene.live_resources(), 2);
        assert!(a_ids.iter().all(|id| !scene.is_live(*id)));

        session.render(&mut surface);
        assert_eq!(surface.point_draws, vec![1]);
        assert_eq!(surface.axes, vec![20.0]);
    }

    #[test]
    fn failed_load_keeps_previous_mesh_and_reports() {
        let (mut session, _surface) = mounted(12);
        session.loader.succeed(0, 10);
        session.poll();

        session.set_frame(5).unwrap();
        session.loader.fail(1);
        session.poll();

        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.scene().mesh().unwrap().frame(), 0);
        assert_eq!(session.scene().live_resources(), 2);
        let failures = &session.diagnostics().failures;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].frame, 5);
    }

    #[test]
    fn failed_first_load_leaves_session_empty() {
        let (mut session, _surface) = mounted(3);
        session.loader.fail(0);
        session.poll();
        assert_eq!(session.state(), SessionState::Empty);
        assert!(session.scene().mesh().is_none());
    }

    #[test]
    fn out_of_range_set_frame_never_reaches_loader() {
        let (mut session, _surface) = mounted(12);
        assert!(session.set_frame(12).is_err());
        assert_eq!(session.index(), 0);
        assert_eq!(session.loader().requests.len(), 1);
    }

    #[test]
    fn repeated_set_frame_attaches_one_mesh() {
        let (mut session, _surface) = mounted(12);
        session.set_frame(4).unwrap();
        session.set_frame(4).unwrap();
        session.loader.succeed(1, 5);
        session.loader.succeed(2, 5);
        session.poll();

        let scene = session.scene();
        assert_eq!(scene.mesh().unwrap().frame(), 4);
        assert_eq!(scene.drawable_count(), 2);
        assert_eq!(scene.live_resources(), 2);
    }

    #[test]
    fn out_of_order_completion_keeps_latest_request() {
        let (mut session, _surface) = mounted(12);
        session.step(1);
        session.step(1);

        // Frame 2 finishes first, then the superseded frame 1.
        session.loader.succeed(2, 5);
        session.loader.succeed(1, 5);
        session.poll();

        assert_eq!(session.scene().mesh().unwrap().frame(), 2);
        assert_eq!(session.scene().live_resources(), 2);
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn progress_is_reported_for_latest_request_only() {
        let (mut session, _surface) = mounted(12);
        session.step(1);
        session.loader.progress(0, 1, 2);
        session.loader.progress(1, 1, 4);
        session.poll();

        let progress = &session.diagnostics().progress;
        assert_eq!(progress, &vec![(RequestId(1), 1, 4)]);
    }

    #[test]
    fn unmount_releases_everything() {
        let (mut session, mut surface) = mounted(12);
        session.loader.succeed(0, 10);
        session.poll();

        session.unmount(&mut surface);
        assert!(surface.released);
        assert_eq!(session.state(), SessionState::Unmounted);
        assert_eq!(session.scene().drawable_count(), 0);
        assert_eq!(session.scene().live_resources(), 0);
    }

    #[test]
    fn late_completion_after_unmount_is_discarded() {
        let (mut session, mut surface) = mounted(12);
        session.unmount(&mut surface);

        session.loader.succeed(0, 10);
        assert_eq!(session.poll(), 0);
        assert!(session.scene().mesh().is_none());
        assert_eq!(session.scene().live_resources(), 0);
    }

    #[test]
    fn stale_request_is_ignored_after_remount() {
        let (mut session, mut surface) = mounted(12);
        session.unmount(&mut surface);
        session.mount(&mut surface);

        session.loader.succeed(0, 10);
        session.loader.succeed(1, 7);
        session.poll();

        let mesh = session.scene().mesh().unwrap();
        assert_eq!(mesh.geometry().len(), 7);
        assert_eq!(session.scene().live_resources(), 2);
    }

    #[test]
    fn frame_changes_while_unmounted_do_not_load() {
        let mut session = session(3);
        assert_eq!(session.step(-1), 2);
        assert!(matches!(session.load_frame(2), Err(ViewerError::NotMounted)));
        assert!(session.loader().requests.is_empty());

        let mut surface = RecordingSurface::default();
        session.mount(&mut surface);
        assert_eq!(session.loader().requests[0].0.frame, 2);
    }

    #[test]
    fn single_frame_step_reloads_same_frame() {
        let (mut session, _surface) = mounted(1);
        assert_eq!(session.step(1), 0);
        assert_eq!(session.loader().requests.len(), 2);
        assert_eq!(session.loader().requests[1].0.frame, 0);
    }
}
