//! Frame timing utilities

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// FPS statistics for a time window
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct FpsWindow {
    pub avg: f32,
    pub min: f32,
    pub max: f32,
}

/// Rolling FPS statistics used by the post-processing downgrade policy
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct FpsStats {
    pub one_sec: FpsWindow,
    pub five_sec: FpsWindow,
    pub current_fps: f32,
    pub frame_count: u64,
}

/// Tracks frame timing and calculates FPS
pub struct FrameTimer {
    last_frame: Instant,
    delta: Duration,
    frame_count: u64,
    fps_timer: Instant,
    fps: f32,
    fps_frame_count: u32,
    /// Ring buffer of (timestamp, frame_time_secs) for rolling stats
    frame_history: VecDeque<(Instant, f32)>,
}

impl FrameTimer {
    /// Create a new frame timer
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            delta: Duration::ZERO,
            frame_count: 0,
            fps_timer: now,
            fps: 0.0,
            fps_frame_count: 0,
            frame_history: VecDeque::new(),
        }
    }

    /// Call once per frame to update timing
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.delta = now - self.last_frame;
        self.last_frame = now;
        self.frame_count += 1;
        self.fps_frame_count += 1;

        let frame_time = self.delta.as_secs_f32();
        self.frame_history.push_back((now, frame_time));

        // Prune frames older than the widest stats window
        let cutoff = now - Duration::from_secs(5);
        while let Some(&(timestamp, _)) = self.frame_history.front() {
            if timestamp < cutoff {
                self.frame_history.pop_front();
            } else {
                break;
            }
        }

        // Update FPS every second
        let fps_elapsed = now - self.fps_timer;
        if fps_elapsed >= Duration::from_secs(1) {
            self.fps = self.fps_frame_count as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = 0;
            self.fps_timer = now;
        }
    }

    /// Get rolling FPS statistics over 1s and 5s windows
    pub fn fps_stats(&self) -> FpsStats {
        let now = Instant::now();

        FpsStats {
            one_sec: self.compute_window_stats(now, Duration::from_secs(1)),
            five_sec: self.compute_window_stats(now, Duration::from_secs(5)),
            current_fps: self.fps,
            frame_count: self.frame_count,
        }
    }

    /// True when the 5s average FPS has settled below `threshold`
    ///
    /// Requires at least one second of history so a couple of slow startup
    /// frames never trigger a downgrade.
    pub fn sustained_fps_below(&self, threshold: f32) -> bool {
        let now = Instant::now();
        let elapsed: f32 = self
            .frame_history
            .iter()
            .map(|&(_, frame_time)| frame_time)
            .sum();
        if elapsed < 1.0 {
            return false;
        }
        let window = self.compute_window_stats(now, Duration::from_secs(5));
        window.avg > 0.0 && window.avg < threshold
    }

    /// Compute FPS statistics for a given time window
    fn compute_window_stats(&self, now: Instant, window: Duration) -> FpsWindow {
        let cutoff = now - window;

        let mut frame_count = 0;
        let mut total_time = 0.0f32;
        let mut min_fps = f32::INFINITY;
        let mut max_fps = 0.0f32;

        for &(timestamp, frame_time) in self.frame_history.iter() {
            if timestamp >= cutoff {
                frame_count += 1;
                total_time += frame_time;

                let fps = if frame_time > 0.0 { 1.0 / frame_time } else { 0.0 };
                min_fps = min_fps.min(fps);
                max_fps = max_fps.max(fps);
            }
        }

        let avg_fps = if total_time > 0.0 {
            frame_count as f32 / total_time
        } else {
            0.0
        };

        if frame_count == 0 {
            min_fps = 0.0;
            max_fps = 0.0;
        }

        FpsWindow {
            avg: avg_fps,
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
    fn test_tick_advances_frame_count() {
        let mut timer = FrameTimer::new();
        timer.tick();
        timer.tick();
        assert_eq!(timer.fps_stats().frame_count, 2);
    }

    #[test]
    fn test_no_downgrade_without_history() {
        let mut timer = FrameTimer::new();
        timer.tick();
        // A single fast frame is nowhere near a second of history
        assert!(!timer.sustained_fps_below(30.0));
    }

    #[test]
    fn test_sustained_slow_frames_detected() {
        let mut timer = FrameTimer::new();
        // Fake 30 frames of 50ms each (20 fps, 1.5s of history)
        let now = Instant::now();
        for _ in 0..30 {
            timer.frame_history.push_back((now, 0.05));
        }
        assert!(timer.sustained_fps_below(30.0));
        assert!(!timer.sustained_fps_below(15.0));
    }
}
