//! Adapters from user input to frame commands.
//!
//! Both adapters drive the same session. The slider waits for the user to
//! stop dragging; the buttons step immediately.

use crate::{
    debounce::{debounce, Debounced},
    sequencer::FrameCommand,
};
use clap::ValueEnum;
use std::{
    cell::Cell,
    rc::Rc,
    time::{Duration, Instant},
};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiInput {
    /// Raw slider position, in frames.
    SliderMoved(f32),
    Previous,
    Next,
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UiKind {
    Slider,
    Buttons,
}

pub trait UiBinding {
    fn kind(&self) -> UiKind;

    /// Translates one input. Returns a command to apply right away, if any.
    fn handle(&mut self, input: UiInput, now: Instant) -> Option<FrameCommand>;

    /// Returns a deferred command that has become due.
    fn poll(&mut self, _now: Instant) -> Option<FrameCommand> {
        None
    }
}

/// Debounced slider. The settled position lands in `due` and is handed out
/// by the next [UiBinding::poll].
pub struct SliderBinding {
    debounced: Debounced<usize, Box<dyn FnMut(usize)>>,
    due: Rc<Cell<Option<usize>>>,
}

impl SliderBinding {
    pub fn new(delay: Duration) -> Self {
        let due = Rc::new(Cell::new(None));
        let settle: Box<dyn FnMut(usize)> = {
            let due = due.clone();
            Box::new(move |index| due.set(Some(index)))
        };
        Self {
            debounced: debounce(settle, delay),
            due,
        }
    }
}

impl UiBinding for SliderBinding {
    fn kind(&self) -> UiKind {
        UiKind::Slider
    }

    fn handle(&mut self, input: UiInput, now: Instant) -> Option<FrameCommand> {
        match input {
            UiInput::SliderMoved(value) => {
                let rounded = value.round();
                if !rounded.is_finite() || rounded < 0.0 {
                    warn!("ignoring slider value {value}");
                    return None;
                }
                self.debounced.call(now, rounded as usize);
                None
            }
            // Any discrete input supersedes a drag that has not settled yet.
            UiInput::Restart => {
                self.debounced.cancel();
                Some(FrameCommand::Set(0))
            }
            UiInput::Previous => {
                self.debounced.cancel();
                Some(FrameCommand::Step(-1))
            }
            UiInput::Next => {
                self.debounced.cancel();
                Some(FrameCommand::Step(1))
            }
        }
    }

    fn poll(&mut self, now: Instant) -> Option<FrameCommand> {
        self.debounced.poll(now);
        self.due.take().map(FrameCommand::Set)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ButtonBinding;

impl UiBinding for ButtonBinding {
    fn kind(&self) -> UiKind {
        UiKind::Buttons
    }

    fn handle(&mut self, input: UiInput, _now: Instant) -> Option<FrameCommand> {
        match input {
            UiInput::Previous => Some(FrameCommand::Step(-1)),
            UiInput::Next => Some(FrameCommand::Step(1)),
            UiInput::Restart => Some(FrameCommand::Set(0)),
            UiInput::SliderMoved(_) => None,
        }
    }
}

pub fn binding(kind: UiKind, debounce: Duration) -> Box<dyn UiBinding> {
    match kind {
        UiKind::Slider => Box::new(SliderBinding::new(debounce)),
        UiKind::Buttons => Box::new(ButtonBinding),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::{session, RecordingSurface};

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn slider_drag_settles_on_last_position() {
        let t0 = Instant::now();
        let mut slider = SliderBinding::new(ms(200));

        assert_eq!(slider.handle(UiInput::SliderMoved(1.0), t0), None);
        assert_eq!(slider.handle(UiInput::SliderMoved(2.4), t0 + ms(50)), None);
        assert_eq!(slider.handle(UiInput::SliderMoved(2.6), t0 + ms(100)), None);

        assert_eq!(slider.poll(t0 + ms(299)), None);
        assert_eq!(slider.poll(t0 + ms(300)), Some(FrameCommand::Set(3)));
        assert_eq!(slider.poll(t0 + ms(600)), None);
    }

    #[test]
    fn slider_ignores_negative_positions() {
        let t0 = Instant::now();
        let mut slider = SliderBinding::new(ms(200));
        slider.handle(UiInput::SliderMoved(-3.0), t0);
        assert_eq!(slider.poll(t0 + ms(1000)), None);
    }

    #[test]
    fn step_during_drag_drops_pending_position() {
        let t0 = Instant::now();
        let mut slider = SliderBinding::new(ms(200));

        slider.handle(UiInput::SliderMoved(5.0), t0);
        assert_eq!(
            slider.handle(UiInput::Next, t0 + ms(50)),
            Some(FrameCommand::Step(1))
        );
        assert_eq!(slider.poll(t0 + ms(250)), None);

        slider.handle(UiInput::SliderMoved(2.0), t0 + ms(300));
        assert_eq!(
            slider.handle(UiInput::Previous, t0 + ms(310)),
            Some(FrameCommand::Step(-1))
        );
        assert_eq!(slider.poll(t0 + ms(1000)), None);
    }

    #[test]
    fn buttons_step_immediately() {
        let now = Instant::now();
        let mut buttons = ButtonBinding;
        assert_eq!(buttons.handle(UiInput::Next, now), Some(FrameCommand::Step(1)));
        assert_eq!(buttons.handle(UiInput::Previous, now), Some(FrameCommand::Step(-1)));
        assert_eq!(buttons.handle(UiInput::SliderMoved(4.0), now), None);
        assert_eq!(buttons.poll(now), None);
    }

    #[test]
    fn previous_from_first_frame_wraps_to_last() {
        let now = Instant::now();
        let mut session = session(3);
        let mut surface = RecordingSurface::default();
        session.mount(&mut surface);

        let mut buttons = binding(UiKind::Buttons, ms(200));
        let command = buttons.handle(UiInput::Previous, now).unwrap();
        assert_eq!(session.apply(command).unwrap(), 2);
        assert_eq!(session.loader().requests.last().unwrap().0.frame, 2);
    }

    #[test]
    fn debounced_slider_past_the_end_is_rejected() {
        let t0 = Instant::now();
        let mut session = session(3);
        let mut surface = RecordingSurface::default();
        session.mount(&mut surface);

        let mut slider = binding(UiKind::Slider, ms(200));
        slider.handle(UiInput::SliderMoved(7.0), t0);
        let command = slider.poll(t0 + ms(200)).unwrap();
        assert!(session.apply(command).is_err());
        assert_eq!(session.index(), 0);
        assert_eq!(session.loader().requests.len(), 1);
    }
}
