//! Point cloud frame viewer.
//!
//! A [session::ViewerSession] shows one frame of a [catalog::FrameCatalog]
//! at a time. Frames are decoded off the render thread by a
//! [loader::FrameLoader] and swapped into the [scene::Scene] on the next
//! [render_loop::RenderLoop] tick. The [ui] adapters turn slider moves and
//! button presses into frame commands.

pub mod catalog;
pub mod data;
pub mod debounce;
pub mod diagnostics;
pub mod error;
pub mod gui;
pub mod loader;
pub mod render_loop;
pub mod scene;
pub mod sequencer;
pub mod session;
pub mod ui;
