use crate::{
    catalog::FrameCatalog,
    data::Bounds,
    diagnostics::TracingDiagnostics,
    loader::PcdLoader,
    render_loop::{Controls, LoopHandle, RenderLoop},
    scene::{PointCloudMesh, RenderSurface, SurfaceConfig},
    sequencer::FrameCommand,
    session::{SessionState, ViewerConfig, ViewerSession},
    ui::{self, UiBinding, UiInput, UiKind},
};
use kiss3d::{
    camera::{ArcBall, Camera},
    conrod::{widget, widget_ids, Labelable, Positionable, Sizeable, Widget},
    event::{Action, Key, WindowEvent},
    light::Light,
    planar_camera::PlanarCamera,
    post_processing::PostProcessingEffect,
    text::Font,
    window::{State, Window},
};
use kiss3d_utils::WindowPlotExt;
use nalgebra::{Point2, Point3, Vector3};
use std::{
    rc::Rc,
    time::{Duration, Instant},
};
use tracing::{info, warn};

widget_ids! {
    pub struct Ids {
        slider,
        previous,
        next,
    }
}

const MARGIN: f64 = 10.0;
const WIDGET_HEIGHT: f64 = 30.0;
const BUTTON_WIDTH: f64 = 120.0;
const SLIDER_WIDTH: f64 = 400.0;
const NUDGE: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppConfig {
    pub viewer: ViewerConfig,
    pub ui: UiKind,
    pub debounce: Duration,
    pub colored: bool,
}

pub struct App {
    session: ViewerSession<PcdLoader, TracingDiagnostics>,
    binding: Box<dyn UiBinding>,
    controls: OrbitControls,
    driver: RenderLoop,
    handle: LoopHandle,
    ids: Ids,
    font: Rc<Font>,
    slider_value: f32,
    framed: bool,
}

impl State for App {
    fn step(&mut self, window: &mut Window) {
        let now = Instant::now();
        self.handle_events(window, now);
        self.draw_widgets(window, now);

        if let Some(command) = self.binding.poll(now) {
            self.apply(command);
        }

        if !self
            .driver
            .tick(&mut self.controls, &mut self.session, window)
        {
            self.session.unmount(window);
            return;
        }
        self.frame_first_cloud();
        self.draw_status(window);
    }

    fn cameras_and_effect(
        &mut self,
    ) -> (
        Option<&mut dyn Camera>,
        Option<&mut dyn PlanarCamera>,
        Option<&mut dyn PostProcessingEffect>,
    ) {
        (Some(&mut self.controls.camera), None, None)
    }
}

impl App {
    /// Builds the app and mounts its session on `window`.
    pub fn build(catalog: FrameCatalog, config: AppConfig, window: &mut Window) -> Self {
        let AppConfig {
            viewer,
            ui: ui_kind,
            debounce,
            colored,
        } = config;

        let ids = Ids::new(window.conrod_ui_mut().widget_id_generator());
        let mut session = ViewerSession::new(
            catalog,
            viewer,
            PcdLoader::new(colored),
            TracingDiagnostics,
        );
        session.mount(window);

        let (driver, handle) = RenderLoop::start();
        info!("using {ui_kind:?} controls");

        Self {
            session,
            binding: ui::binding(ui_kind, debounce),
            controls: OrbitControls::new(),
            driver,
            handle,
            ids,
            font: Font::default(),
            slider_value: 0.0,
            framed: false,
        }
    }

    /// Points the camera at the first cloud that gets displayed. Later
    /// frames keep whatever view the user has set up.
    fn frame_first_cloud(&mut self) {
        if self.framed {
            return;
        }
        let bounds = self
            .session
            .scene()
            .mesh()
            .and_then(|mesh| mesh.geometry().bounds());
        if let Some(bounds) = bounds {
            self.controls.frame(&bounds);
            self.framed = true;
        }
    }

    fn apply(&mut self, command: FrameCommand) {
        match self.session.apply(command) {
            Ok(index) => self.slider_value = index as f32,
            Err(err) => warn!("{err}"),
        }
    }

    fn handle_events(&mut self, window: &mut Window, now: Instant) {
        let mut inputs = vec![];

        window.events().iter().for_each(|event| {
            use Action as A;
            use Key as K;
            use WindowEvent as E;

            match event.value {
                E::Key(K::N, A::Press, _) => inputs.push(UiInput::Next),
                E::Key(K::P, A::Press, _) => inputs.push(UiInput::Previous),
                E::Key(K::R, A::Press, _) => inputs.push(UiInput::Restart),
                E::Key(K::Q, A::Press, _) => self.handle.stop(),
                E::Key(K::Left, A::Release, _) => self.controls.nudge(-NUDGE, 0.0),
                E::Key(K::Right, A::Release, _) => self.controls.nudge(NUDGE, 0.0),
                E::Key(K::Down, A::Release, _) => self.controls.nudge(0.0, -NUDGE),
                E::Key(K::Up, A::Release, _) => self.controls.nudge(0.0, NUDGE),
                _ => {}
            }
        });

        self.dispatch(inputs, now);
    }

    fn draw_widgets(&mut self, window: &mut Window, now: Instant) {
        let len = self.session.catalog().len();
        let mut inputs = vec![];

        {
            let mut ui = window.conrod_ui_mut().set_widgets();

            match self.binding.kind() {
                UiKind::Slider if len > 1 => {
                    let label = format!("{}", self.slider_value.round());
                    if let Some(value) =
                        widget::Slider::new(self.slider_value, 0.0, (len - 1) as f32)
                            .w_h(SLIDER_WIDTH, WIDGET_HEIGHT)
                            .bottom_left_with_margin(MARGIN)
                            .label(&label)
                            .set(self.ids.slider, &mut ui)
                    {
                        self.slider_value = value;
                        inputs.push(UiInput::SliderMoved(value));
                    }
                }
                UiKind::Slider => {}
                UiKind::Buttons => {
                    if widget::Button::new()
                        .w_h(BUTTON_WIDTH, WIDGET_HEIGHT)
                        .bottom_left_with_margin(MARGIN)
                        .label("Previous")
                        .set(self.ids.previous, &mut ui)
                        .was_clicked()
                    {
                        inputs.push(UiInput::Previous);
                    }
                    if widget::Button::new()
                        .w_h(BUTTON_WIDTH, WIDGET_HEIGHT)
                        .right_from(self.ids.previous, MARGIN)
                        .label("Next")
                        .set(self.ids.next, &mut ui)
                        .was_clicked()
                    {
                        inputs.push(UiInput::Next);
                    }
                }
            }
        }

        self.dispatch(inputs, now);
    }

    fn dispatch(&mut self, inputs: Vec<UiInput>, now: Instant) {
        for input in inputs {
            if let Some(command) = self.binding.handle(input, now) {
                self.apply(command);
            }
        }
    }

    fn draw_status(&self, window: &mut Window) {
        let index = self.session.index();
        let catalog = self.session.catalog();
        let name = catalog.name(index).unwrap_or("?");
        let marker = match self.session.state() {
            SessionState::Loading => " (loading...)",
            SessionState::Empty => " (no data)",
            SessionState::Ready | SessionState::Unmounted => "",
        };

        window.draw_text(
            &format!("Index: {}/{}, name: {name}{marker}", index + 1, catalog.len()),
            &Point2::from([5.0; 2]),
            40.0,
            &self.font,
            &Point3::from([0.0, 204.0, 0.0]),
        );
    }
}

/// Orbit camera plus keyboard nudges applied on the next update.
pub struct OrbitControls {
    camera: ArcBall,
    pending_yaw: f32,
    pending_pitch: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new()
    }
}

impl OrbitControls {
    pub fn new() -> Self {
        let eye = Point3::from([0.0f32, -80.0, 32.0]);
        let at = Point3::origin();
        let mut camera = ArcBall::new_with_frustrum(40f32.to_radians(), 1.0, 10000.0, eye, at);
        camera.set_up_axis(Vector3::from([0.0, 0.0, 1.0]));

        Self {
            camera,
            pending_yaw: 0.0,
            pending_pitch: 0.0,
        }
    }

    /// Orbits around the center of `bounds`.
    pub fn frame(&mut self, bounds: &Bounds) {
        self.camera.set_at(bounds.center());
    }

    pub fn nudge(&mut self, yaw: f32, pitch: f32) {
        self.pending_yaw += yaw;
        self.pending_pitch += pitch;
    }
}

impl Controls for OrbitControls {
    fn update(&mut self) {
        if self.pending_yaw != 0.0 {
            self.camera.set_yaw(self.camera.yaw() + self.pending_yaw);
            self.pending_yaw = 0.0;
        }
        if self.pending_pitch != 0.0 {
            self.camera.set_pitch(self.camera.pitch() + self.pending_pitch);
            self.pending_pitch = 0.0;
        }
    }
}

impl RenderSurface for Window {
    fn configure(&mut self, config: &SurfaceConfig) {
        self.set_light(Light::StickToCamera);
        self.set_point_size(config.point_size);

        let size = self.size();
        if size[0] != config.width || size[1] != config.height {
            warn!(
                "window is {}x{}, configured for {}x{}",
                size[0], size[1], config.width, config.height
            );
        }
    }

    fn draw_axes(&mut self, origin: Point3<f32>, size: f32) {
        WindowPlotExt::draw_axes(self, origin, size);
    }

    fn draw_points(&mut self, mesh: &PointCloudMesh) {
        self.set_point_size(mesh.point_size());
        mesh.geometry()
            .points()
            .for_each(|(point, color)| self.draw_point(point, color));
    }

    fn release(&mut self) {
        self.close();
    }
}
