//! Frame renderer.
//!
//! Owns the current pixel set, the fade-out queue, and an RGBA framebuffer
//! that the host blits once per display refresh. The render loop is paced by
//! the host (one [`RenderEngine::render_tick`] per refresh) and is fully
//! decoupled from the machine's step rate: new machine frames arrive through
//! [`RenderEngine::submit_frame`] whenever the machine's display changes.
//!
//! Within one tick the order is fixed: clear the surface, draw the fading
//! erased batches, draw the current set at full opacity, then age the queue.

use log::debug;

use crate::fade::{FadeConfig, FadeQueue};
use crate::frame::{diff, Pixel, PixelSet};
use crate::{EngineError, SCREEN_HEIGHT, SCREEN_WIDTH};

const FB_SIZE: usize = SCREEN_WIDTH * SCREEN_HEIGHT * 4; // RGBA

pub struct RenderEngine {
    /// RGBA framebuffer, row-major, rewritten on every render tick
    framebuffer: [u8; FB_SIZE],
    /// Lit pixels of the newest machine frame
    current: PixelSet,
    /// Pixels erased by recent frames, still fading out
    fade: FadeQueue,
    /// Cleared by [`RenderEngine::stop`]; the host loop checks it before
    /// scheduling the next tick
    running: bool,
    /// Render frames produced so far
    pub frame_count: u64,
}

impl RenderEngine {
    pub fn new(config: FadeConfig) -> Self {
        let mut engine = RenderEngine {
            framebuffer: [0; FB_SIZE],
            current: PixelSet::new(),
            fade: FadeQueue::new(config),
            running: true,
            frame_count: 0,
        };
        engine.clear_surface();
        engine
    }

    /// New-frame handoff from the machine: diff against the previous set,
    /// queue whatever was erased, and adopt the new set.
    ///
    /// The differ runs here — once per machine frame — and never inside
    /// [`RenderEngine::render_tick`].
    pub fn submit_frame(&mut self, next: PixelSet) {
        let erased = diff(&self.current, &next);
        if !erased.is_empty() {
            debug!("frame handoff: {} lit, {} erased", next.len(), erased.len());
            self.fade.push(erased);
        }
        self.current = next;
    }

    /// [`RenderEngine::submit_frame`] from raw `(x, y)` pairs, rejecting
    /// out-of-range coordinates.
    pub fn submit_coords(&mut self, coords: &[(u8, u8)]) -> Result<(), EngineError> {
        let next = PixelSet::from_coords(coords)?;
        self.submit_frame(next);
        Ok(())
    }

    /// Hard display reset: empty the current set, drop every pending fade
    /// batch (no fade-out), black the surface. Used when a new program is
    /// loaded into the machine.
    pub fn clear_display(&mut self) {
        self.current.clear();
        self.fade.clear();
        self.clear_surface();
    }

    /// One render frame: clear, draw fading erasures, draw the current set
    /// at full opacity, then age the queue.
    pub fn render_tick(&mut self) {
        self.clear_surface();

        let fb = &mut self.framebuffer;
        self.fade.draw_all(|pixel, alpha| paint(fb, pixel, alpha));
        for pixel in self.current.iter() {
            paint(fb, pixel, 1.0);
        }

        self.fade.tick();
        self.frame_count += 1;
    }

    /// Request the host loop to stop scheduling render ticks.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn current_pixels(&self) -> &PixelSet {
        &self.current
    }

    pub fn pending_fade_batches(&self) -> usize {
        self.fade.len()
    }

    /// Raw RGBA framebuffer as last rendered.
    pub fn framebuffer_rgba(&self) -> &[u8] {
        &self.framebuffer
    }

    /// Framebuffer as 0xRRGGBB pixels for minifb.
    pub fn framebuffer_u32(&self) -> Vec<u32> {
        let mut pixels = vec![0u32; SCREEN_WIDTH * SCREEN_HEIGHT];
        for i in 0..pixels.len() {
            let r = self.framebuffer[i * 4] as u32;
            let g = self.framebuffer[i * 4 + 1] as u32;
            let b = self.framebuffer[i * 4 + 2] as u32;
            pixels[i] = (r << 16) | (g << 8) | b;
        }
        pixels
    }

    fn clear_surface(&mut self) {
        for px in self.framebuffer.chunks_exact_mut(4) {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            px[3] = 0xFF;
        }
    }
}

/// Write one monochrome pixel at the given opacity: white scaled down to
/// gray as the pixel fades.
fn paint(fb: &mut [u8; FB_SIZE], pixel: Pixel, alpha: f32) {
    let level = (alpha.clamp(0.0, 1.0) * 255.0) as u8;
    let offset = (pixel.y as usize * SCREEN_WIDTH + pixel.x as usize) * 4;
    fb[offset] = level;
    fb[offset + 1] = level;
    fb[offset + 2] = level;
    fb[offset + 3] = 0xFF;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red_at(engine: &RenderEngine, x: usize, y: usize) -> u8 {
        engine.framebuffer_rgba()[(y * SCREEN_WIDTH + x) * 4]
    }

    #[test]
    fn test_current_pixels_render_at_full_opacity() {
        let mut engine = RenderEngine::new(FadeConfig::default());
        engine.submit_coords(&[(0, 0), (5, 7)]).unwrap();
        engine.render_tick();
        assert_eq!(red_at(&engine, 0, 0), 0xFF);
        assert_eq!(red_at(&engine, 5, 7), 0xFF);
        assert_eq!(red_at(&engine, 1, 0), 0);
    }

    #[test]
    fn test_erased_pixel_fades_instead_of_vanishing() {
        let mut engine = RenderEngine::new(FadeConfig::default());
        engine.submit_coords(&[(0, 0)]).unwrap();
        engine.render_tick();

        // Machine erases everything; (0,0) must leave the full-opacity pass
        // but keep showing at reduced brightness.
        engine.submit_frame(PixelSet::new());
        assert!(!engine.current_pixels().contains(0, 0));
        engine.render_tick();
        let level = red_at(&engine, 0, 0);
        assert!(level > 0, "erased pixel must still be visible");
        assert!(level < 0xFF, "erased pixel must not be full opacity");
    }

    #[test]
    fn test_faded_pixel_expires_after_threshold_frames() {
        let config = FadeConfig::default();
        let mut engine = RenderEngine::new(config);
        engine.submit_coords(&[(3, 3)]).unwrap();
        engine.render_tick();
        engine.submit_frame(PixelSet::new());
        for _ in 0..config.frame_threshold {
            engine.render_tick();
        }
        assert_eq!(engine.pending_fade_batches(), 0);
        engine.render_tick();
        assert_eq!(red_at(&engine, 3, 3), 0);
    }

    #[test]
    fn test_redrawn_pixel_wins_over_its_own_fade() {
        // Erase and immediately redraw: the full-opacity pass overdraws the
        // fading copy, so the pixel never visibly blinks.
        let mut engine = RenderEngine::new(FadeConfig::default());
        engine.submit_coords(&[(4, 4)]).unwrap();
        engine.render_tick();
        engine.submit_frame(PixelSet::new());
        engine.submit_coords(&[(4, 4)]).unwrap();
        engine.render_tick();
        assert_eq!(red_at(&engine, 4, 4), 0xFF);
    }

    #[test]
    fn test_clear_display_drops_pending_batches_immediately() {
        let mut engine = RenderEngine::new(FadeConfig::default());
        engine.submit_coords(&[(1, 1), (2, 2)]).unwrap();
        engine.render_tick();
        engine.submit_frame(PixelSet::new());
        assert_eq!(engine.pending_fade_batches(), 1);

        engine.clear_display();
        assert_eq!(engine.pending_fade_batches(), 0);
        engine.render_tick();
        assert!(engine.framebuffer_rgba().chunks_exact(4).all(|px| px[0] == 0),
            "next tick after clear_display must draw nothing");
    }

    #[test]
    fn test_submit_coords_rejects_out_of_range() {
        let mut engine = RenderEngine::new(FadeConfig::default());
        let err = engine.submit_coords(&[(64, 0)]).unwrap_err();
        assert_eq!(err, EngineError::PixelOutOfRange { x: 64, y: 0 });
    }

    #[test]
    fn test_stop_flag() {
        let mut engine = RenderEngine::new(FadeConfig::default());
        assert!(engine.is_running());
        engine.stop();
        assert!(!engine.is_running());
    }
}
