/// Performance measurement utilities
/// Each rendering stage can be timed and logged for optimization analysis
pub mod profiling;

pub use profiling::{CounterSnapshot, RenderCounters, RENDER_COUNTERS};

use std::time::{Duration, Instant};

pub struct PerfTimer {
    name: &'static str,
    start: Instant,
}

impl PerfTimer {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        log::trace!("[PERF] {}: {}μs", self.name, self.elapsed().as_micros());
    }
}

/// Per-frame summary returned by the frame orchestrator
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub meshes_rendered: usize,
    /// Triangles produced by the mesh topology before clipping
    pub source_triangles: usize,
    /// Triangles in the post-clip working index lists
    pub clipped_triangles: usize,
    pub elapsed: Duration,
}

impl FrameStats {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Macro for scoped timing, logged at trace level
#[macro_export]
macro_rules! perf_scope {
    ($name:expr) => {
        let _timer = $crate::perf::PerfTimer::new($name);
    };
}
