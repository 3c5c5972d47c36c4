//! # VKCLICKER Render Loop
//!
//! ```text
//! Frame N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. BEGIN FRAME                                                      │
//! │    └─ Open a scratch scope                                          │
//! │                                                                     │
//! │ 2. TICK                                                             │
//! │    ├─ Scratch: working sets that die with the scope                 │
//! │    └─ Frame: results read until the end of the iteration            │
//! │                                                                     │
//! │ 3. END FRAME                                                        │
//! │    ├─ Scratch scope dropped (rewound)                               │
//! │    ├─ registry.frame(): frame arena cleared, scratch leak check     │
//! │    └─ Frame time pushed into the rolling history                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::{Duration, Instant};

use vkclicker_mem::{ArenaClass, ArenaRegistry, MemResult, Queue, Scope};

use crate::config::{AppConfig, RenderConfig};

/// Frame timing and memory statistics.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
    /// Total frame time in microseconds.
    pub total_us: u64,
    /// Frame number.
    pub frame: u64,
    /// Scratch bytes in use at the end of the tick, before rewinding.
    pub scratch_bytes: u64,
    /// Frame-arena bytes in use before clearing.
    pub frame_bytes: u64,
}

/// Handles for a single frame's work.
///
/// Created at the start of each frame and dropped at the end, which rewinds
/// the scratch arena.
pub struct FrameContext<'a> {
    /// Scratch scope. Derefs to the registry.
    pub scratch: Scope<'a>,
    /// Current frame number.
    pub frame: u64,
    /// Delta time since last frame, in seconds.
    pub delta_time: f32,
}

/// The render loop orchestrator.
///
/// Owns the arena registry and drives its per-iteration lifecycle.
pub struct RenderLoop {
    registry: ArenaRegistry,
    config: RenderConfig,
    frame_count: u64,
    last_frame_time: Instant,
    /// Recent frame times in milliseconds, in the persistent arena.
    frame_times: Queue<f32>,
    stats: FrameStatsAccumulator,
}

impl RenderLoop {
    /// Builds the registry described by `config`.
    ///
    /// # Errors
    ///
    /// Returns error if the memory configuration is invalid.
    pub fn new(config: &AppConfig) -> MemResult<Self> {
        config.validate()?;
        let mut registry = ArenaRegistry::init(&config.memory)?;
        let frame_times = Queue::new(
            &mut registry,
            ArenaClass::PERSISTENT,
            config.render.history as usize,
        );
        let budget = config.render.target_frame_time();

        Ok(Self {
            registry,
            config: config.render.clone(),
            frame_count: 0,
            last_frame_time: Instant::now(),
            frame_times,
            stats: FrameStatsAccumulator::new(budget),
        })
    }

    /// Begins a new frame.
    pub fn begin_frame(&mut self) -> FrameContext<'_> {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame_time);
        self.last_frame_time = now;

        FrameContext {
            scratch: self.registry.scope(ArenaClass::Scratch),
            frame: self.frame_count,
            // Clamp so a stall does not produce a huge step.
            delta_time: delta.as_secs_f32().min(0.1),
        }
    }

    /// Ends the current frame.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if scratch memory outlived the frame.
    pub fn end_frame(&mut self, stats: FrameStats) {
        self.registry.frame();
        self.frame_count += 1;
        self.stats.record(stats);

        #[allow(clippy::cast_precision_loss)]
        let ms = stats.total_us as f32 / 1000.0;
        self.frame_times.add(&mut self.registry, ms);

        let limit = self.config.target_frame_time() * 2;
        if self.config.enable_timing_logs && Duration::from_micros(stats.total_us) > limit {
            tracing::warn!(
                frame = stats.frame,
                ms,
                limit_ms = limit.as_secs_f64() * 1000.0,
                "frame exceeded budget"
            );
        }
    }

    /// Runs `frames` iterations of `tick`.
    pub fn run(&mut self, frames: u64, mut tick: impl FnMut(&mut FrameContext<'_>)) {
        for _ in 0..frames {
            let start = Instant::now();
            let frame = self.frame_count;
            let scratch_bytes = {
                let mut ctx = self.begin_frame();
                tick(&mut ctx);
                ctx.scratch.arena(ArenaClass::Scratch).used_bytes()
            };
            let frame_bytes = self.registry.arena(ArenaClass::Frame).used_bytes();

            self.end_frame(FrameStats {
                total_us: u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX),
                frame,
                scratch_bytes,
                frame_bytes,
            });
        }
    }

    /// Average of the recent frame times, in milliseconds.
    #[must_use]
    pub fn recent_frame_ms(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.frame_times.iter(&self.registry).sum();
        #[allow(clippy::cast_precision_loss)]
        let count = self.frame_times.len() as f32;
        sum / count
    }

    /// Returns the current frame count.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Returns the accumulated statistics.
    #[must_use]
    pub fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats
    }

    /// The arena registry.
    #[must_use]
    pub fn registry(&self) -> &ArenaRegistry {
        &self.registry
    }

    /// The arena registry, mutably.
    #[must_use]
    pub fn registry_mut(&mut self) -> &mut ArenaRegistry {
        &mut self.registry
    }

    /// Ends the registry and returns the accumulated statistics.
    #[must_use]
    pub fn finish(self) -> FrameStatsAccumulator {
        self.registry.end();
        self.stats
    }
}

/// Accumulator for frame statistics.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Total frames recorded.
    pub frames_recorded: u64,
    /// Sum of total frame times.
    pub total_us_sum: u64,
    /// Min frame time.
    pub min_frame_us: u64,
    /// Max frame time.
    pub max_frame_us: u64,
    /// Frames that exceeded the budget.
    pub frames_over_budget: u64,
    /// Highest scratch usage seen at the end of a tick.
    pub peak_scratch_bytes: u64,
    /// Highest frame-arena usage seen before clearing.
    pub peak_frame_bytes: u64,
    budget_us: u64,
}

impl FrameStatsAccumulator {
    /// Creates an accumulator measuring against `budget`.
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self {
            frames_recorded: 0,
            total_us_sum: 0,
            min_frame_us: u64::MAX,
            max_frame_us: 0,
            frames_over_budget: 0,
            peak_scratch_bytes: 0,
            peak_frame_bytes: 0,
            budget_us: u64::try_from(budget.as_micros()).unwrap_or(u64::MAX),
        }
    }

    /// Records a frame's statistics.
    pub fn record(&mut self, stats: FrameStats) {
        self.frames_recorded += 1;
        self.total_us_sum += stats.total_us;
        self.min_frame_us = self.min_frame_us.min(stats.total_us);
        self.max_frame_us = self.max_frame_us.max(stats.total_us);
        self.peak_scratch_bytes = self.peak_scratch_bytes.max(stats.scratch_bytes);
        self.peak_frame_bytes = self.peak_frame_bytes.max(stats.frame_bytes);

        if stats.total_us > self.budget_us {
            self.frames_over_budget += 1;
        }
    }

    /// Returns average frame time in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_frame_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.frames_recorded as f64) / 1000.0
    }

    /// Returns average FPS.
    #[must_use]
    pub fn avg_fps(&self) -> f64 {
        let avg_ms = self.avg_frame_ms();
        if avg_ms <= 0.0 {
            return 0.0;
        }
        1000.0 / avg_ms
    }

    /// Returns the fraction of frames over budget.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.frames_over_budget as f64 / self.frames_recorded as f64
    }

    /// Logs a summary of the statistics.
    pub fn log_summary(&self) {
        tracing::info!(
            frames = self.frames_recorded,
            avg_ms = self.avg_frame_ms(),
            fps = self.avg_fps(),
            over_budget = self.frames_over_budget,
            peak_scratch_bytes = self.peak_scratch_bytes,
            peak_frame_bytes = self.peak_frame_bytes,
            "frame statistics"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vkclicker_mem::{Arr, RegistryConfig};

    fn config() -> AppConfig {
        AppConfig {
            memory: RegistryConfig::default()
                .with_scratch_size(4096)
                .with_frame_size(4096)
                .with_long_lived(1, 4096),
            render: RenderConfig {
                history: 4,
                ..RenderConfig::default()
            },
        }
    }

    #[test]
    fn test_render_loop_creation() {
        let render = RenderLoop::new(&config()).unwrap();
        assert_eq!(render.frame_count(), 0);
        assert!((render.recent_frame_ms() - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_frame_cycle_rewinds_scratch_and_clears_frame() {
        let mut render = RenderLoop::new(&config()).unwrap();

        let ctx = render.begin_frame();
        assert_eq!(ctx.frame, 0);
        drop(ctx);
        render.end_frame(FrameStats::default());
        assert_eq!(render.frame_count(), 1);

        render.run(5, |ctx| {
            let work: Arr<u32> = Arr::new(&mut ctx.scratch, ArenaClass::Scratch, 64);
            work.fill(&mut ctx.scratch, ctx.frame as u32);
            let _kept: Arr<u32> = Arr::new(&mut ctx.scratch, ArenaClass::Frame, 16);
        });

        assert_eq!(render.frame_count(), 6);
        assert_eq!(render.registry().frame_index(), 6);
        assert!(render.registry().arena(ArenaClass::Scratch).is_unwound());
        assert_eq!(render.registry().arena(ArenaClass::Frame).front(), 0);
        assert_eq!(render.stats().frames_recorded, 6);
        assert_eq!(render.stats().peak_scratch_bytes, 64 * 4 + 4);
        assert_eq!(render.stats().peak_frame_bytes, 16 * 4 + 4);
        let _ = render.finish();
    }

    #[test]
    fn test_history_keeps_most_recent_frames() {
        let mut render = RenderLoop::new(&config()).unwrap();
        for total_us in [1000, 2000, 3000, 4000, 5000, 6000] {
            render.end_frame(FrameStats {
                total_us,
                ..FrameStats::default()
            });
        }
        assert!((render.recent_frame_ms() - 4.5).abs() < 1e-4);
    }

    #[test]
    fn test_accumulator_budget() {
        let mut stats = FrameStatsAccumulator::new(Duration::from_millis(16));
        stats.record(FrameStats {
            total_us: 10_000,
            ..FrameStats::default()
        });
        stats.record(FrameStats {
            total_us: 30_000,
            ..FrameStats::default()
        });
        assert_eq!(stats.frames_over_budget, 1);
        assert!((stats.avg_frame_ms() - 20.0).abs() < 1e-9);
        assert!((stats.over_budget_ratio() - 0.5).abs() < 1e-9);
        assert_eq!(stats.min_frame_us, 10_000);
    }
}
