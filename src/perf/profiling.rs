/// Pipeline counters for microoptimization.
/// Incremented through `count_call!` / `count_add!`, which compile to nothing
/// unless the `profiling` feature is enabled.
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for each pipeline stage
pub struct RenderCounters {
    // Vertex stage
    pub vertices_transformed: AtomicU64,

    // Clipper
    pub triangles_submitted: AtomicU64,
    pub triangles_degenerate: AtomicU64,
    pub triangles_accepted: AtomicU64,
    pub triangles_clipped: AtomicU64,
    pub triangles_discarded: AtomicU64,
    pub clip_vertices_created: AtomicU64,

    // Rasterizer
    pub triangles_rasterized: AtomicU64,
    pub triangles_rejected: AtomicU64,
    pub triangles_culled: AtomicU64,
    pub pixels_tested: AtomicU64,
    pub depth_passed: AtomicU64,
    pub depth_failed: AtomicU64,

    // Shader
    pub pixels_shaded: AtomicU64,
    pub transparent_skipped: AtomicU64,

    // Framebuffer
    pub framebuffer_clears: AtomicU64,
}

impl RenderCounters {
    pub const fn new() -> Self {
        Self {
            vertices_transformed: AtomicU64::new(0),
            triangles_submitted: AtomicU64::new(0),
            triangles_degenerate: AtomicU64::new(0),
            triangles_accepted: AtomicU64::new(0),
            triangles_clipped: AtomicU64::new(0),
            triangles_discarded: AtomicU64::new(0),
            clip_vertices_created: AtomicU64::new(0),
            triangles_rasterized: AtomicU64::new(0),
            triangles_rejected: AtomicU64::new(0),
            triangles_culled: AtomicU64::new(0),
            pixels_tested: AtomicU64::new(0),
            depth_passed: AtomicU64::new(0),
            depth_failed: AtomicU64::new(0),
            pixels_shaded: AtomicU64::new(0),
            transparent_skipped: AtomicU64::new(0),
            framebuffer_clears: AtomicU64::new(0),
        }
    }

    fn all(&self) -> [&AtomicU64; 16] {
        [
            &self.vertices_transformed,
            &self.triangles_submitted,
            &self.triangles_degenerate,
            &self.triangles_accepted,
            &self.triangles_clipped,
            &self.triangles_discarded,
            &self.clip_vertices_created,
            &self.triangles_rasterized,
            &self.triangles_rejected,
            &self.triangles_culled,
            &self.pixels_tested,
            &self.depth_passed,
            &self.depth_failed,
            &self.pixels_shaded,
            &self.transparent_skipped,
            &self.framebuffer_clears,
        ]
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        for counter in self.all() {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> CounterSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CounterSnapshot {
            vertices_transformed: load(&self.vertices_transformed),
            triangles_submitted: load(&self.triangles_submitted),
            triangles_degenerate: load(&self.triangles_degenerate),
            triangles_accepted: load(&self.triangles_accepted),
            triangles_clipped: load(&self.triangles_clipped),
            triangles_discarded: load(&self.triangles_discarded),
            clip_vertices_created: load(&self.clip_vertices_created),
            triangles_rasterized: load(&self.triangles_rasterized),
            triangles_rejected: load(&self.triangles_rejected),
            triangles_culled: load(&self.triangles_culled),
            pixels_tested: load(&self.pixels_tested),
            depth_passed: load(&self.depth_passed),
            depth_failed: load(&self.depth_failed),
            pixels_shaded: load(&self.pixels_shaded),
            transparent_skipped: load(&self.transparent_skipped),
            framebuffer_clears: load(&self.framebuffer_clears),
        }
    }
}

impl Default for RenderCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of counter values at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub vertices_transformed: u64,
    pub triangles_submitted: u64,
    pub triangles_degenerate: u64,
    pub triangles_accepted: u64,
    pub triangles_clipped: u64,
    pub triangles_discarded: u64,
    pub clip_vertices_created: u64,
    pub triangles_rasterized: u64,
    pub triangles_rejected: u64,
    pub triangles_culled: u64,
    pub pixels_tested: u64,
    pub depth_passed: u64,
    pub depth_failed: u64,
    pub pixels_shaded: u64,
    pub transparent_skipped: u64,
    pub framebuffer_clears: u64,
}

impl CounterSnapshot {
    /// Log a formatted report at info level
    pub fn log_report(&self) {
        log::info!("=== Pipeline Counters ===");
        log::info!("vertices transformed:     {:12}", self.vertices_transformed);
        log::info!(
            "triangles submitted:      {:12} (degenerate {}, accepted {}, clipped {}, discarded {})",
            self.triangles_submitted,
            self.triangles_degenerate,
            self.triangles_accepted,
            self.triangles_clipped,
            self.triangles_discarded
        );
        log::info!("clip vertices created:    {:12}", self.clip_vertices_created);
        log::info!(
            "triangles rasterized:     {:12} (rejected {}, culled {})",
            self.triangles_rasterized,
            self.triangles_rejected,
            self.triangles_culled
        );
        log::info!("pixels tested:            {:12}", self.pixels_tested);
        log::info!("depth test passed:        {:12}", self.depth_passed);
        log::info!("depth test failed:        {:12}", self.depth_failed);
        if self.pixels_tested > 0 {
            let pass_rate = (self.depth_passed as f64 / self.pixels_tested as f64) * 100.0;
            log::info!("depth test pass rate:     {:11.2}%", pass_rate);
        }
        log::info!("pixels shaded:            {:12}", self.pixels_shaded);
        log::info!("transparent skipped:      {:12}", self.transparent_skipped);
        log::info!("framebuffer clears:       {:12}", self.framebuffer_clears);
    }
}

/// Global pipeline counters instance
pub static RENDER_COUNTERS: RenderCounters = RenderCounters::new();

/// Macro for incrementing a counter (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_call {
    ($counter:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    };
}

/// Macro for adding to a counter (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_add {
    ($counter:expr, $value:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add($value as u64, std::sync::atomic::Ordering::Relaxed);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments_and_reset() {
        let counters = RenderCounters::new();
        counters.pixels_tested.fetch_add(5, Ordering::Relaxed);
        counters.depth_passed.fetch_add(3, Ordering::Relaxed);

        let snap = counters.snapshot();
        assert_eq!(snap.pixels_tested, 5);
        assert_eq!(snap.depth_passed, 3);

        counters.reset();
        assert_eq!(counters.snapshot(), CounterSnapshot::default());
    }
}
