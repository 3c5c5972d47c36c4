//! # VKCLICKER Headless
//!
//! Runs the render loop without a window or GPU.
//!
//! ```bash
//! # Defaults, or ./vkclicker.toml if present
//! ./vkclicker
//!
//! # Explicit config, verbose memory logs
//! RUST_LOG=vkclicker_mem=debug ./vkclicker configs/stress.toml
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use vkclicker::{build_draw_list, AppConfig, GpuCore, RenderLoop, DEFAULT_CONFIG_PATH};
use vkclicker_mem::MemResult;

/// Quads laid out per frame.
const QUAD_COUNT: u32 = 4096;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    match run(&path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "vkclicker failed");
            ExitCode::FAILURE
        }
    }
}

fn run(path: &Path) -> MemResult<()> {
    let config = AppConfig::load_or_default(path)?;
    let mut render = RenderLoop::new(&config)?;

    let core = GpuCore::create(render.registry_mut(), "VkClicker");
    tracing::info!(
        frames = config.render.frames,
        target_fps = config.render.target_fps,
        "render loop starting"
    );

    render.run(config.render.frames, |ctx| {
        let list = build_draw_list(&mut ctx.scratch, ctx.frame, QUAD_COUNT);
        if ctx.frame % 60 == 0 {
            tracing::debug!(
                frame = ctx.frame,
                visible = list.label.as_str(&ctx.scratch).unwrap_or("?"),
                "draw list"
            );
        }
    });

    let remaining = core.destroy(render.registry_mut());
    if remaining != 0 {
        tracing::warn!(remaining, "device objects leaked");
    }

    tracing::info!(recent_ms = render.recent_frame_ms(), "render loop finished");
    render.finish().log_summary();
    Ok(())
}
