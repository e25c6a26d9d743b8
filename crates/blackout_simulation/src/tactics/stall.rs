//! Stall detector: агент в movement state, но почти не сдвинулся за окно времени
//!
//! Не зависит от таймаутов состояний: срабатывает по смещению, поэтому угол/застревание
//! ограничено окном `stall_window`, а не длиной самого долгого таймаута.

use bevy::prelude::*;
use std::collections::VecDeque;

/// Сэмпл позиции агента
#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    time: f32,
    position: Vec2,
}

/// Trailing window позиций агента
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    samples: VecDeque<Sample>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Записать позицию (вызывается раз в тик, пока агент пытается двигаться)
    pub fn record(&mut self, now: f32, position: Vec2, window: f32) {
        self.samples.push_back(Sample { time: now, position });

        // Оставляем один сэмпл старше окна: он и есть начало окна
        while self.samples.len() > 2 && self.samples[1].time <= now - window {
            self.samples.pop_front();
        }
    }

    /// Сбросить историю (смена состояния, агент стоит намеренно)
    pub fn reset(&mut self) {
        self.samples.clear();
    }

    /// Окно заполнено и смещение за него меньше epsilon
    pub fn is_progress_stalled(&self, window: f32, epsilon: f32) -> bool {
        let (Some(oldest), Some(latest)) = (self.samples.front(), self.samples.back()) else {
            return false;
        };
        if latest.time - oldest.time < window - 1e-4 {
            return false;
        }

        let displacement = self
            .samples
            .iter()
            .map(|s| s.position.distance(latest.position))
            .fold(0.0f32, f32::max);
        displacement < epsilon
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_not_stalled_before_window_filled() {
        let mut tracker = ProgressTracker::new();
        for tick in 0..10 {
            tracker.record(tick as f32 * DT, Vec2::ZERO, 0.5);
        }
        assert!(!tracker.is_progress_stalled(0.5, 4.0));
    }

    #[test]
    fn test_stalled_when_standing_still_for_window() {
        let mut tracker = ProgressTracker::new();
        for tick in 0..=30 {
            tracker.record(tick as f32 * DT, Vec2::new(5.0, 5.0), 0.5);
        }
        assert!(tracker.is_progress_stalled(0.5, 4.0));
    }

    #[test]
    fn test_moving_agent_not_stalled() {
        let mut tracker = ProgressTracker::new();
        for tick in 0..=60 {
            tracker.record(tick as f32 * DT, Vec2::new(tick as f32 * 2.0, 0.0), 0.5);
        }
        assert!(!tracker.is_progress_stalled(0.5, 4.0));
    }

    #[test]
    fn test_jitter_in_corner_is_stalled() {
        // Дёргается туда-сюда на месте (corner loop)
        let mut tracker = ProgressTracker::new();
        for tick in 0..=60 {
            let offset = if tick % 2 == 0 { 1.0 } else { -1.0 };
            tracker.record(tick as f32 * DT, Vec2::new(offset, 0.0), 0.5);
        }
        assert!(tracker.is_progress_stalled(0.5, 4.0));
    }

    #[test]
    fn test_reset_clears_history() {
        let mut tracker = ProgressTracker::new();
        for tick in 0..=30 {
            tracker.record(tick as f32 * DT, Vec2::ZERO, 0.5);
        }
        tracker.reset();
        assert_eq!(tracker.sample_count(), 0);
        assert!(!tracker.is_progress_stalled(0.5, 4.0));
    }
}
