//! Timed fade-out of erased pixels.
//!
//! When the machine steps quickly, a pixel can be erased and redrawn within
//! one rendered instant; cutting it to black immediately makes the whole
//! display flicker. Instead, every batch of erased pixels is queued and kept
//! on screen for a few more render frames at decreasing opacity.
//!
//! The queue is strictly ordered: batches append at the tail, age on every
//! render tick, and evict from the head once they have been shown for the
//! configured number of frames.

use std::collections::VecDeque;

use crate::frame::{Pixel, PixelSet};

/// Fade timing constants. These are configuration, never derived.
#[derive(Debug, Clone, Copy)]
pub struct FadeConfig {
    /// Opacity a batch starts at, in (0, 1].
    pub initial_alpha: f32,
    /// Opacity lost per render frame.
    pub alpha_step: f32,
    /// Render frames a batch stays queued before eviction.
    pub frame_threshold: u32,
}

impl Default for FadeConfig {
    fn default() -> Self {
        FadeConfig {
            initial_alpha: 0.95,
            alpha_step: 0.2,
            frame_threshold: 3,
        }
    }
}

/// One group of pixels that turned off between two machine frames.
/// Owned exclusively by the queue and mutated in place as it ages.
#[derive(Debug, Clone)]
struct ErasedBatch {
    pixels: PixelSet,
    frames_shown: u32,
    alpha: f32,
}

/// Ordered queue of [`ErasedBatch`]es, oldest first.
#[derive(Debug)]
pub struct FadeQueue {
    batches: VecDeque<ErasedBatch>,
    config: FadeConfig,
}

impl FadeQueue {
    pub fn new(config: FadeConfig) -> Self {
        FadeQueue {
            batches: VecDeque::new(),
            config,
        }
    }

    /// Append a batch of freshly erased pixels at the tail.
    ///
    /// Empty sets are skipped: they would contribute nothing when drawn, and
    /// skipping them keeps queue growth bounded by actual erasures.
    pub fn push(&mut self, erased: PixelSet) {
        if erased.is_empty() {
            return;
        }
        self.batches.push_back(ErasedBatch {
            pixels: erased,
            frames_shown: 0,
            alpha: self.config.initial_alpha,
        });
    }

    /// Age every batch by one render frame, then evict expired batches from
    /// the head.
    ///
    /// Eviction repeats while the head has reached the threshold: if render
    /// ticks were delayed, several stale batches may have piled up.
    pub fn tick(&mut self) {
        for batch in self.batches.iter_mut() {
            batch.frames_shown += 1;
            batch.alpha -= self.config.alpha_step;
        }
        while self
            .batches
            .front()
            .map_or(false, |b| b.frames_shown >= self.config.frame_threshold)
        {
            self.batches.pop_front();
        }
    }

    /// Visit every queued pixel with its batch's current opacity, oldest
    /// batch first so newer (more opaque) erasures win on overlap.
    ///
    /// Alpha is clamped to [0, 1] in case a batch lingers past its natural
    /// fade.
    pub fn draw_all(&self, mut draw: impl FnMut(Pixel, f32)) {
        for batch in self.batches.iter() {
            let alpha = batch.alpha.clamp(0.0, 1.0);
            for pixel in batch.pixels.iter() {
                draw(pixel, alpha);
            }
        }
    }

    /// Drop every pending batch immediately. Used on hard display reset.
    pub fn clear(&mut self) {
        self.batches.clear();
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_pixel() -> PixelSet {
        PixelSet::from_coords(&[(1, 1)]).unwrap()
    }

    #[test]
    fn test_push_skips_empty_batches() {
        let mut q = FadeQueue::new(FadeConfig::default());
        q.push(PixelSet::new());
        assert!(q.is_empty());
        q.push(one_pixel());
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_eviction_at_exactly_threshold_ticks() {
        let config = FadeConfig::default();
        let mut q = FadeQueue::new(config);
        q.push(one_pixel());
        for _ in 0..config.frame_threshold - 1 {
            q.tick();
        }
        assert_eq!(q.len(), 1, "one tick short of threshold must not evict");
        q.tick();
        assert!(q.is_empty(), "threshold ticks must evict");
    }

    #[test]
    fn test_alpha_decreases_by_step_each_tick() {
        let config = FadeConfig {
            initial_alpha: 0.95,
            alpha_step: 0.2,
            frame_threshold: 10,
        };
        let mut q = FadeQueue::new(config);
        q.push(one_pixel());
        for k in 1..=4u32 {
            q.tick();
            let mut seen = None;
            q.draw_all(|_, alpha| seen = Some(alpha));
            let expected = (0.95 - k as f32 * 0.2).max(0.0);
            let got = seen.expect("batch still queued");
            assert!((got - expected).abs() < 1e-6, "tick {}: {} != {}", k, got, expected);
        }
    }

    #[test]
    fn test_alpha_clamped_at_zero_for_lingering_batches() {
        let config = FadeConfig {
            initial_alpha: 0.3,
            alpha_step: 0.2,
            frame_threshold: 100,
        };
        let mut q = FadeQueue::new(config);
        q.push(one_pixel());
        for _ in 0..5 {
            q.tick();
        }
        q.draw_all(|_, alpha| assert_eq!(alpha, 0.0));
    }

    #[test]
    fn test_stale_batches_all_evict_from_head() {
        let mut q = FadeQueue::new(FadeConfig::default());
        q.push(one_pixel());
        q.push(PixelSet::from_coords(&[(2, 2)]).unwrap());
        q.push(PixelSet::from_coords(&[(3, 3)]).unwrap());
        // All three batches age together, so one tick past the threshold
        // must drain all of them, not just the first.
        for _ in 0..3 {
            q.tick();
        }
        assert!(q.is_empty());
    }

    #[test]
    fn test_draw_all_visits_oldest_first() {
        let mut q = FadeQueue::new(FadeConfig {
            initial_alpha: 1.0,
            alpha_step: 0.1,
            frame_threshold: 10,
        });
        q.push(one_pixel());
        q.tick();
        q.push(PixelSet::from_coords(&[(2, 2)]).unwrap());
        let mut alphas = Vec::new();
        q.draw_all(|_, alpha| alphas.push(alpha));
        assert_eq!(alphas.len(), 2);
        assert!(alphas[0] < alphas[1], "older batch drawn first, more faded");
    }
}
