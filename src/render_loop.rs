use crate::{
    diagnostics::Diagnostics,
    loader::FrameLoader,
    scene::RenderSurface,
    session::ViewerSession,
};
use std::{cell::Cell, rc::Rc};

/// Navigation helper advanced once per tick.
pub trait Controls {
    fn update(&mut self);
}

/// Cancellation handle for a [RenderLoop]. Clones share the same flag.
#[derive(Debug, Clone)]
pub struct LoopHandle {
    live: Rc<Cell<bool>>,
}

impl LoopHandle {
    pub fn stop(&self) {
        self.live.set(false);
    }

    pub fn is_live(&self) -> bool {
        self.live.get()
    }
}

/// Per-refresh driver. The host calls [RenderLoop::tick] once per display
/// frame until it returns `false`.
#[derive(Debug)]
pub struct RenderLoop {
    handle: LoopHandle,
    ticks: u64,
}

impl RenderLoop {
    pub fn start() -> (Self, LoopHandle) {
        let handle = LoopHandle {
            live: Rc::new(Cell::new(true)),
        };
        let driver = Self {
            handle: handle.clone(),
            ticks: 0,
        };
        (driver, handle)
    }

    pub fn handle(&self) -> LoopHandle {
        self.handle.clone()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advances the controls, applies finished loads, then draws the
    /// session. Returns `false` once the handle has been stopped, without
    /// touching anything.
    pub fn tick<C, L, D, S>(
        &mut self,
        controls: &mut C,
        session: &mut ViewerSession<L, D>,
        surface: &mut S,
    ) -> bool
    where
        C: Controls + ?Sized,
        L: FrameLoader,
        D: Diagnostics,
        S: RenderSurface + ?Sized,
    {
        if !self.handle.is_live() {
            return false;
        }
        controls.update();
        session.poll();
        session.render(surface);
        self.ticks += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        scene::{PointCloudMesh, SurfaceConfig},
        session::tests::{session, RecordingSurface},
    };
    use nalgebra::Point3;
    use std::cell::RefCell;

    type CallLog = Rc<RefCell<Vec<&'static str>>>;

    struct LoggingControls(CallLog);

    impl Controls for LoggingControls {
        fn update(&mut self) {
            self.0.borrow_mut().push("update");
        }
    }

    struct LoggingSurface(CallLog);

    impl RenderSurface for LoggingSurface {
        fn configure(&mut self, _config: &SurfaceConfig) {}

        fn draw_axes(&mut self, _origin: Point3<f32>, _size: f32) {
            self.0.borrow_mut().push("axes");
        }

        fn draw_points(&mut self, _mesh: &PointCloudMesh) {
            self.0.borrow_mut().push("points");
        }

        fn release(&mut self) {}
    }

    #[derive(Default)]
    struct CountingControls {
        updates: usize,
    }

    impl Controls for CountingControls {
        fn update(&mut self) {
            self.updates += 1;
        }
    }

    #[test]
    fn tick_updates_controls_then_renders() {
        let mut session = session(3);
        let mut surface = RecordingSurface::default();
        let mut controls = CountingControls::default();
        session.mount(&mut surface);

        let (mut driver, _handle) = RenderLoop::start();
        assert!(driver.tick(&mut controls, &mut session, &mut surface));
        assert_eq!(controls.updates, 1);
        assert_eq!(surface.axes.len(), 1);
        assert!(surface.point_draws.is_empty());
    }

    #[test]
    fn controls_advance_before_the_scene_is_drawn() {
        let log = CallLog::default();
        let mut session = session(3);
        let mut surface = LoggingSurface(log.clone());
        let mut controls = LoggingControls(log.clone());
        session.mount(&mut surface);
        session.loader().succeed(0, 4);

        let (mut driver, _handle) = RenderLoop::start();
        driver.tick(&mut controls, &mut session, &mut surface);
        driver.tick(&mut controls, &mut session, &mut surface);

        assert_eq!(
            *log.borrow(),
            vec!["update", "axes", "points", "update", "axes", "points"]
        );
    }

    #[test]
    fn swapped_frame_shows_up_on_next_tick() {
        let mut session = session(3);
        let mut surface = RecordingSurface::default();
        let mut controls = CountingControls::default();
        session.mount(&mut surface);
        let (mut driver, _handle) = RenderLoop::start();

        driver.tick(&mut controls, &mut session, &mut surface);
        session.loader().succeed(0, 4);
        driver.tick(&mut controls, &mut session, &mut surface);

        assert_eq!(surface.point_draws, vec![0]);
        assert_eq!(driver.ticks(), 2);
    }

    #[test]
    fn stopped_loop_does_nothing() {
        let mut session = session(3);
        let mut surface = RecordingSurface::default();
        let mut controls = CountingControls::default();
        session.mount(&mut surface);

        let (mut driver, handle) = RenderLoop::start();
        handle.stop();
        assert!(!driver.handle().is_live());
        assert!(!driver.tick(&mut controls, &mut session, &mut surface));
        assert_eq!(controls.updates, 0);
        assert!(surface.axes.is_empty());
        assert_eq!(driver.ticks(), 0);
    }
}
