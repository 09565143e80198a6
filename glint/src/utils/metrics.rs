#[cfg(feature = "metrics")]
use std::time::{Duration, Instant};

#[cfg(feature = "metrics")]
use fxhash::FxHashMap;
#[cfg(feature = "metrics")]
use log::debug;

/// Wall-clock timings of the renderer's passes; everything in here is a
/// no-op unless the `metrics` feature is enabled.
#[derive(Debug, Default)]
pub struct Metrics {
    #[cfg(feature = "metrics")]
    timings: FxHashMap<&'static str, (u32, Duration)>,
}

#[derive(Clone, Copy, Debug)]
pub struct MetricsTimer {
    #[cfg(feature = "metrics")]
    started_at: Instant,
}

impl Metrics {
    pub fn start() -> MetricsTimer {
        MetricsTimer {
            #[cfg(feature = "metrics")]
            started_at: Instant::now(),
        }
    }

    pub fn record(&mut self, name: &'static str, timer: MetricsTimer) {
        #[cfg(feature = "metrics")]
        {
            let (runs, total) = self.timings.entry(name).or_default();

            *runs += 1;
            *total += timer.started_at.elapsed();
        }

        #[cfg(not(feature = "metrics"))]
        {
            _ = (name, timer);
        }
    }

    /// Logs and resets the timings gathered so far.
    pub fn report(&mut self) {
        #[cfg(feature = "metrics")]
        {
            let mut timings: Vec<_> = self.timings.drain().collect();

            timings.sort_by_key(|(name, _)| *name);

            for (name, (runs, total)) in timings {
                debug!(
                    "{name}: {} ({runs} run(s))",
                    humantime::format_duration(total)
                );
            }
        }
    }
}
