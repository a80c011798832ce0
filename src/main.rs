use anyhow::{bail, Result};
use clap::Parser;
use kiss3d::window::Window;
use pcd_frame_viewer::{
    catalog::FrameCatalog,
    gui::{App, AppConfig},
    scene::SurfaceConfig,
    session::ViewerConfig,
    ui::UiKind,
};
use std::{path::PathBuf, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset or unparsable.
const DEFAULT_LOG_FILTER: &str = "info";

/// Steps through a sequence of .pcd point cloud frames.
#[derive(Parser)]
struct Opts {
    /// The directory that contains .pcd point cloud files.
    #[clap(long, conflicts_with = "manifest")]
    pub pcd_dir: Option<PathBuf>,

    /// A JSON file listing the frames in order.
    #[clap(long)]
    pub manifest: Option<PathBuf>,

    /// The directory manifest entries are resolved against.
    #[clap(long, requires = "manifest")]
    pub asset_root: Option<PathBuf>,

    /// How frames are selected.
    #[clap(long, value_enum, default_value = "slider")]
    pub ui: UiKind,

    /// Window width in pixels.
    #[clap(long, default_value = "800")]
    pub width: u32,

    /// Window height in pixels.
    #[clap(long, default_value = "600")]
    pub height: u32,

    /// Length of the coordinate axes.
    #[clap(long, default_value = "20.0")]
    pub axes_size: f32,

    /// Set the plotted point size.
    #[clap(long, default_value = "1.0")]
    pub point_size: f32,

    /// Quiet period before a slider move loads a frame, in milliseconds.
    #[clap(long, default_value = "200")]
    pub debounce_ms: u64,

    /// Color points by height.
    #[clap(long)]
    pub colored: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .init();

    let Opts {
        pcd_dir,
        manifest,
        asset_root,
        ui,
        width,
        height,
        axes_size,
        point_size,
        debounce_ms,
        colored,
    } = Opts::parse();

    let catalog = match (pcd_dir, manifest) {
        (Some(dir), None) => FrameCatalog::from_dir(dir)?,
        (None, Some(manifest)) => FrameCatalog::from_manifest(manifest, asset_root.as_deref())?,
        _ => bail!("pass either --pcd-dir or --manifest"),
    };
    info!("loaded catalog with {} frames", catalog.len());

    let config = AppConfig {
        viewer: ViewerConfig {
            surface: SurfaceConfig {
                width,
                height,
                point_size,
            },
            axes_size,
        },
        ui,
        debounce: Duration::from_millis(debounce_ms),
        colored,
    };

    let mut window = Window::new_with_size(env!("CARGO_BIN_NAME"), width, height);
    let state = App::build(catalog, config, &mut window);
    window.render_loop(state);

    Ok(())
}

fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}
