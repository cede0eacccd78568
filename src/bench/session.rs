//! Frame sampling for one benchmark run
//!
//! Frames pass through a warmup phase, then completed frame times are
//! averaged in batches of `frames_per_measurement`. Each batch average is one
//! measurement fed to the score. Failed frames still advance the clock but
//! never enter a measurement.

use std::time::Duration;

use super::score::{compute_score, Score};
use crate::core::config::BenchConfig;
use crate::core::types::Result;

/// Outcome of one frame as seen by the benchmark
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameSample {
    /// Frame rendered and submitted in `frame_ms`
    Completed { frame_ms: f32 },
    /// Frame failed after `elapsed_ms`; excluded from measurements
    Failed { elapsed_ms: f32 },
}

impl FrameSample {
    /// Sample for a frame whose redraw interval was `interval`
    ///
    /// The interval spans event-loop time as well as rendering, so the
    /// score tracks the frame rate the window actually achieved.
    pub fn from_outcome<T, E>(outcome: &std::result::Result<T, E>, interval: Duration) -> Self {
        let ms = interval.as_secs_f32() * 1000.0;
        match outcome {
            Ok(_) => FrameSample::Completed { frame_ms: ms },
            Err(_) => FrameSample::Failed { elapsed_ms: ms },
        }
    }

    fn elapsed_ms(&self) -> f32 {
        match *self {
            FrameSample::Completed { frame_ms } => frame_ms,
            FrameSample::Failed { elapsed_ms } => elapsed_ms,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Warmup,
    Measuring,
    Finished,
    Aborted,
}

pub struct BenchmarkSession {
    phase: SessionPhase,
    warmup_left: u32,
    frames_per_measurement: usize,
    duration: Duration,
    measured: Duration,
    batch: Vec<f32>,
    measurements: Vec<f32>,
    completed_frames: u64,
    failed_frames: u64,
}

impl BenchmarkSession {
    pub fn new(config: &BenchConfig) -> Self {
        let frames_per_measurement = config.frames_per_measurement.max(1) as usize;
        let duration = Duration::from_secs_f32(config.duration_secs.max(0.0));
        Self {
            phase: if config.warmup_frames > 0 {
                SessionPhase::Warmup
            } else {
                SessionPhase::Measuring
            },
            warmup_left: config.warmup_frames,
            frames_per_measurement,
            duration,
            measured: Duration::ZERO,
            batch: Vec::with_capacity(frames_per_measurement),
            measurements: Vec::new(),
            completed_frames: 0,
            failed_frames: 0,
        }
    }

    /// Feed one frame; returns the phase after accounting for it
    pub fn record(&mut self, sample: FrameSample) -> SessionPhase {
        match self.phase {
            SessionPhase::Finished | SessionPhase::Aborted => return self.phase,
            SessionPhase::Warmup => {
                self.warmup_left = self.warmup_left.saturating_sub(1);
                if self.warmup_left == 0 {
                    log::info!("Warmup complete, measuring for {:.1}s", self.duration.as_secs_f32());
                    self.phase = SessionPhase::Measuring;
                }
                return self.phase;
            }
            SessionPhase::Measuring => {}
        }

        match sample {
            FrameSample::Completed { frame_ms } => {
                self.completed_frames += 1;
                self.batch.push(frame_ms);
                if self.batch.len() == self.frames_per_measurement {
                    let avg = self.batch.iter().sum::<f32>() / self.batch.len() as f32;
                    log::debug!("Measurement {}: {:.3} ms", self.measurements.len(), avg);
                    self.measurements.push(avg);
                    self.batch.clear();
                }
            }
            FrameSample::Failed { .. } => {
                self.failed_frames += 1;
            }
        }

        self.measured += Duration::from_secs_f32(sample.elapsed_ms().max(0.0) / 1000.0);
        if self.measured >= self.duration {
            log::info!(
                "Benchmark finished: {} measurements, {} frames, {} failed",
                self.measurements.len(),
                self.completed_frames,
                self.failed_frames
            );
            self.phase = SessionPhase::Finished;
        }
        self.phase
    }

    /// Stop sampling; the run can no longer be scored
    pub fn abort(&mut self) {
        if self.phase != SessionPhase::Finished {
            log::warn!("Benchmark aborted after {:.1}s", self.measured.as_secs_f32());
            self.phase = SessionPhase::Aborted;
        }
    }

    /// Score the measurements taken so far
    pub fn score(&self) -> Result<Score> {
        compute_score(&self.measurements)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        matches!(self.phase, SessionPhase::Finished | SessionPhase::Aborted)
    }

    pub fn measurements(&self) -> &[f32] {
        &self.measurements
    }

    pub fn failed_frames(&self) -> u64 {
        self.failed_frames
    }

    /// Fraction of the measured duration elapsed, in `[0, 1]`
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.measured.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(warmup: u32, per_measurement: u32, duration_secs: f32) -> BenchConfig {
        BenchConfig {
            warmup_frames: warmup,
            frames_per_measurement: per_measurement,
            duration_secs,
            ..Default::default()
        }
    }

    fn ok(ms: f32) -> FrameSample {
        FrameSample::Completed { frame_ms: ms }
    }

    #[test]
    fn test_warmup_frames_are_ignored() {
        let mut session = BenchmarkSession::new(&config(3, 2, 10.0));
        assert_eq!(session.record(ok(500.0)), SessionPhase::Warmup);
        assert_eq!(session.record(ok(500.0)), SessionPhase::Warmup);
        assert_eq!(session.record(ok(500.0)), SessionPhase::Measuring);
        session.record(ok(10.0));
        session.record(ok(20.0));
        assert_eq!(session.measurements(), &[15.0]);
    }

    #[test]
    fn test_failed_frames_excluded() {
        let mut session = BenchmarkSession::new(&config(0, 2, 10.0));
        session.record(ok(10.0));
        session.record(FrameSample::Failed { elapsed_ms: 999.0 });
        session.record(ok(30.0));
        assert_eq!(session.measurements(), &[20.0]);
        assert_eq!(session.failed_frames(), 1);
    }

    #[test]
    fn test_finishes_after_duration() {
        // 1 second of 10 ms frames
        let mut session = BenchmarkSession::new(&config(0, 10, 1.0));
        let mut frames = 0;
        while session.record(ok(10.0)) != SessionPhase::Finished {
            frames += 1;
            assert!(frames < 200);
        }
        assert_eq!(session.measurements().len(), 10);
        assert_eq!(session.progress(), 1.0);

        let score = session.score().unwrap();
        assert_eq!(score.fps, 100.0);

        // Further frames are ignored
        session.record(ok(1.0));
        assert_eq!(session.measurements().len(), 10);
    }

    #[test]
    fn test_abort_stops_sampling() {
        let mut session = BenchmarkSession::new(&config(0, 1, 10.0));
        session.record(ok(10.0));
        session.abort();
        assert!(session.is_done());
        assert_eq!(session.record(ok(10.0)), SessionPhase::Aborted);
        assert!(session.score().is_err());
    }

    #[test]
    fn test_sample_uses_redraw_interval() {
        let interval = Duration::from_millis(20);
        let render_cpu_ms: std::result::Result<f32, ()> = Ok(3.0);
        assert_eq!(
            FrameSample::from_outcome(&render_cpu_ms, interval),
            FrameSample::Completed { frame_ms: 20.0 }
        );
        assert_eq!(
            FrameSample::from_outcome(&Err::<f32, _>("lost"), interval),
            FrameSample::Failed { elapsed_ms: 20.0 }
        );
    }
}
