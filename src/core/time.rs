//! Frame timing utilities

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How long frame history is retained for rolling statistics
const HISTORY_WINDOW: Duration = Duration::from_secs(5);

/// Rolling FPS statistics over a time window
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FpsWindow {
    pub avg: f32,
    pub min: f32,
    pub max: f32,
}

/// Tracks wall-clock frame timing
pub struct FrameTimer {
    start: Instant,
    last_frame: Instant,
    delta: Duration,
    frame_count: u64,
    /// Ring buffer of (timestamp, frame_time_secs) for rolling stats
    frame_history: VecDeque<(Instant, f32)>,
}

impl FrameTimer {
    /// Create a new frame timer starting now
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Create a timer with an explicit start instant
    pub fn starting_at(now: Instant) -> Self {
        Self {
            start: now,
            last_frame: now,
            delta: Duration::ZERO,
            frame_count: 0,
            frame_history: VecDeque::new(),
        }
    }

    /// Call once per frame to update timing
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Advance the timer to `now`
    pub fn tick_at(&mut self, now: Instant) {
        self.delta = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;
        self.frame_count += 1;

        self.frame_history.push_back((now, self.delta.as_secs_f32()));

        let cutoff = now.checked_sub(HISTORY_WINDOW).unwrap_or(self.start);
        while let Some(&(timestamp, _)) = self.frame_history.front() {
            if timestamp < cutoff {
                self.frame_history.pop_front();
            } else {
                break;
            }
        }
    }

    /// Delta time of the last frame in seconds
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Delta time of the last frame
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Time since the timer was created, measured at the last tick
    pub fn elapsed(&self) -> Duration {
        self.last_frame.saturating_duration_since(self.start)
    }

    /// Total frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// FPS statistics over the trailing `window` ending at the last tick
    pub fn fps_window(&self, window: Duration) -> FpsWindow {
        let cutoff = self.last_frame.checked_sub(window).unwrap_or(self.start);

        let mut frame_count = 0;
        let mut total_time = 0.0f32;
        let mut min_fps = f32::INFINITY;
        let mut max_fps = 0.0f32;

        for &(timestamp, frame_time) in &self.frame_history {
            if timestamp < cutoff || frame_time <= 0.0 {
                continue;
            }
            frame_count += 1;
            total_time += frame_time;
            let fps = 1.0 / frame_time;
            min_fps = min_fps.min(fps);
            max_fps = max_fps.max(fps);
        }

        if frame_count == 0 {
            return FpsWindow::default();
        }

        FpsWindow {
            avg: frame_count as f32 / total_time,
            min: min_fps,
            max: max_fps,
        }
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_tracks_delta_and_count() {
        let start = Instant::now();
        let mut timer = FrameTimer::starting_at(start);
        timer.tick_at(start + Duration::from_millis(16));
        timer.tick_at(start + Duration::from_millis(36));

        assert_eq!(timer.frame_count(), 2);
        assert_eq!(timer.delta(), Duration::from_millis(20));
        assert_eq!(timer.elapsed(), Duration::from_millis(36));
    }

    #[test]
    fn test_fps_window() {
        let start = Instant::now();
        let mut timer = FrameTimer::starting_at(start);
        for i in 1..=10 {
            timer.tick_at(start + Duration::from_millis(10 * i));
        }
        let stats = timer.fps_window(Duration::from_secs(1));
        assert!((stats.avg - 100.0).abs() < 0.5);
        assert!((stats.min - 100.0).abs() < 0.5);
    }

    #[test]
    fn test_empty_window_is_zero() {
        let timer = FrameTimer::new();
        assert_eq!(timer.fps_window(Duration::from_secs(1)), FpsWindow::default());
    }
}
