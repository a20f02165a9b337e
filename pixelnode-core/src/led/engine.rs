//! Animation engine
//!
//! [`LedEngine`] owns the frame buffer and the strip. Instant sets write
//! the buffer and flush it in one transfer. A fade is planned up front and
//! then advanced one frame per [`LedEngine::fade_step`]:
//!
//! ```text
//! start_fade ──► step ──► step ──► ... ──► step (exact target) ──► Done
//!   (plan)       +inc      +inc             final write
//! ```
//!
//! Per-channel increments use truncating integer division, so the last
//! frame writes the true target to absorb the accumulated error. Each plan
//! carries the generation it was started under; starting a new fade,
//! setting a color or reconfiguring bumps the generation and every step
//! issued for an older one is reported as [`FadeStep::Stale`].

use core::cell::RefCell;

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use heapless::Vec;
use pixelnode_hal::{Clock, PixelStrip};

use super::buffer::{PixelBuffer, MAX_FRAME_LEN};
use super::expr::{parse_color, parse_range, Color, PixelRange};
use super::LedError;
use crate::task::Generation;

/// Maximum number of range expressions per request
pub const MAX_EXPRS: usize = 16;

/// Parsed `(range, color)` pairs, applied in order
pub type Targets = Vec<(PixelRange, Color), MAX_EXPRS>;

struct FadePlan {
    generation: u32,
    targets: Targets,
    increments: Vec<i16, MAX_FRAME_LEN>,
    remaining: u16,
    delay_ms: u32,
}

/// Result of one [`LedEngine::fade_step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FadeStep {
    /// A frame was written; call again after `delay_ms`
    Running { delay_ms: u32 },
    /// The exact target was written; carries the last target color
    Done(Color),
    /// The fade was cancelled or replaced
    Stale,
}

/// Pixel buffer, strip and at most one fade in flight
pub struct LedEngine<S> {
    strip: S,
    buffer: PixelBuffer,
    fade: Option<FadePlan>,
    generation: Generation,
}

impl<S: PixelStrip> LedEngine<S> {
    /// # Arguments
    /// * `strip` - Output the buffer is flushed to
    /// * `count` - Number of pixels
    /// * `channels` - 3 (GRB) or 4 (GRBW)
    pub fn new(strip: S, count: u16, channels: u8) -> Result<Self, LedError> {
        Ok(Self {
            strip,
            buffer: PixelBuffer::new(count, channels)?,
            fade: None,
            generation: Generation::new(),
        })
    }

    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    pub fn strip(&self) -> &S {
        &self.strip
    }

    pub fn count(&self) -> u16 {
        self.buffer.count()
    }

    /// Whether any pixel is lit
    pub fn is_lit(&self) -> bool {
        self.buffer.is_lit()
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Current generation; steps for any other value are stale
    pub fn generation(&self) -> u32 {
        self.generation.current()
    }

    /// Replace the buffer with a black one of the new geometry
    ///
    /// Any fade in flight is discarded. On error the old buffer is kept.
    pub fn reconfigure(&mut self, count: u16, channels: u8) -> Result<(), LedError> {
        let buffer = PixelBuffer::new(count, channels)?;
        self.cancel_fade();
        self.buffer = buffer;
        info!("strip reconfigured: {=u16} pixels, {=u8} channels", count, channels);
        Ok(())
    }

    /// Parse `(range, color)` expressions against the current strip
    ///
    /// Fails on the first bad expression.
    pub fn parse_targets(&self, pixels: &[(&str, &str)]) -> Result<Targets, LedError> {
        let mut targets = Targets::new();
        for &(range, color) in pixels {
            let range = parse_range(range, self.count())?;
            let color = parse_color(color)?;
            targets
                .push((range, color))
                .map_err(|_| LedError::InvalidRequest)?;
        }
        Ok(targets)
    }

    /// Set pixels to colors at once
    pub fn set_color(&mut self, pixels: &[(&str, &str)]) -> Result<(), LedError> {
        let targets = self.parse_targets(pixels)?;
        self.set_targets(&targets)
    }

    /// Set every pixel to `color` at once
    pub fn fill(&mut self, color: Color) -> Result<(), LedError> {
        let mut targets = Targets::new();
        // One entry always fits
        let _ = targets.push((PixelRange::all(self.count()), color));
        self.set_targets(&targets)
    }

    /// Write parsed targets and flush; cancels any fade
    pub fn set_targets(&mut self, targets: &[(PixelRange, Color)]) -> Result<(), LedError> {
        self.cancel_fade();
        self.apply(targets);
        self.flush()
    }

    /// Plan a fade from the current buffer to `pixels`
    ///
    /// Cancels any fade in flight. With `steps == 0` the target is set at
    /// once and `None` is returned; otherwise returns the generation the
    /// steps must be driven with.
    pub fn start_fade(
        &mut self,
        pixels: &[(&str, &str)],
        steps: u16,
        delay_ms: u32,
    ) -> Result<Option<u32>, LedError> {
        let targets = self.parse_targets(pixels)?;
        self.fade_to(targets, steps, delay_ms)
    }

    /// [`LedEngine::start_fade`] with already parsed targets
    pub fn fade_to(
        &mut self,
        targets: Targets,
        steps: u16,
        delay_ms: u32,
    ) -> Result<Option<u32>, LedError> {
        if steps == 0 || targets.is_empty() {
            self.set_targets(&targets)?;
            return Ok(None);
        }

        let mut increments: Vec<i16, MAX_FRAME_LEN> = Vec::new();
        increments
            .resize(self.buffer.as_bytes().len(), 0)
            .map_err(|_| LedError::InvalidCount)?;

        let channels = self.buffer.channels() as usize;
        let current = self.buffer.as_bytes();
        for &(range, color) in targets.iter() {
            let wire = color.wire();
            for (offset, inc) in increments[self.buffer.span(range)].iter_mut().enumerate() {
                let index = self.buffer.span(range).start + offset;
                let diff = i32::from(wire[offset % channels]) - i32::from(current[index]);
                // Truncates toward zero
                *inc = (diff / i32::from(steps)) as i16;
            }
        }

        if self.fade.is_some() {
            debug!("fade replaced");
        }
        let generation = self.generation.bump();
        self.fade = Some(FadePlan {
            generation,
            targets,
            increments,
            remaining: steps,
            delay_ms,
        });
        info!("fade started: {=u16} steps, {=u32} ms", steps, delay_ms);
        Ok(Some(generation))
    }

    /// Advance the fade started under `generation` by one frame
    pub fn fade_step(&mut self, generation: u32) -> Result<FadeStep, LedError> {
        let plan = match self.fade.as_mut() {
            Some(plan) if plan.generation == generation => plan,
            _ => return Ok(FadeStep::Stale),
        };

        if plan.remaining > 0 {
            plan.remaining -= 1;
            let delay_ms = plan.delay_ms;
            for (byte, &inc) in self.buffer.bytes_mut().iter_mut().zip(plan.increments.iter()) {
                *byte = (i16::from(*byte) + inc).clamp(0, 255) as u8;
            }
            if let Err(e) = self.flush() {
                self.fade = None;
                return Err(e);
            }
            return Ok(FadeStep::Running { delay_ms });
        }

        let Some(plan) = self.fade.take() else {
            return Ok(FadeStep::Stale);
        };
        self.apply(&plan.targets);
        self.flush()?;
        let last = plan.targets.last().map(|&(_, color)| color).unwrap_or_default();
        Ok(FadeStep::Done(last))
    }

    /// Drop the fade in flight, if any
    pub fn cancel_fade(&mut self) {
        if self.fade.take().is_some() {
            debug!("fade cancelled");
        }
        self.generation.bump();
    }

    fn apply(&mut self, targets: &[(PixelRange, Color)]) {
        for &(range, color) in targets {
            self.buffer.fill(range, color);
        }
    }

    /// Transfer the whole buffer to the strip
    pub fn flush(&mut self) -> Result<(), LedError> {
        self.strip.write(self.buffer.as_bytes())?;
        Ok(())
    }
}

/// How a driven fade ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FadeOutcome {
    /// Reached its target, the last target color
    Completed(Color),
    /// Replaced by the fade with this generation
    Superseded(u32),
    /// Cancelled with nothing to run next
    Cancelled,
}

/// A [`LedEngine`] shared between request handlers and the fade task
pub struct SharedEngine<M: RawMutex, S> {
    engine: Mutex<M, RefCell<LedEngine<S>>>,
    started: Signal<M, u32>,
}

impl<M: RawMutex, S: PixelStrip> SharedEngine<M, S> {
    pub fn new(engine: LedEngine<S>) -> Self {
        Self {
            engine: Mutex::new(RefCell::new(engine)),
            started: Signal::new(),
        }
    }

    /// Run `f` with exclusive access to the engine
    pub fn lock<R>(&self, f: impl FnOnce(&mut LedEngine<S>) -> R) -> R {
        self.engine.lock(|engine| f(&mut engine.borrow_mut()))
    }

    /// Plan a fade and hand it to the fade task
    ///
    /// Returns the fade's generation, or `None` if it was applied at once.
    pub fn fade_to(
        &self,
        targets: Targets,
        steps: u16,
        delay_ms: u32,
    ) -> Result<Option<u32>, LedError> {
        let generation = self.lock(|e| e.fade_to(targets, steps, delay_ms))?;
        if let Some(generation) = generation {
            self.started.signal(generation);
        }
        Ok(generation)
    }

    /// Wait for the next fade to be started
    pub async fn next_fade(&self) -> u32 {
        self.started.wait().await
    }

    /// Drive the fade started under `generation` to its end
    ///
    /// Sleeps between frames race against a new fade being started, so a
    /// replacement takes over without waiting out the old delay.
    pub async fn run_fade<C: Clock>(
        &self,
        generation: u32,
        clock: &C,
    ) -> Result<FadeOutcome, LedError> {
        loop {
            match self.lock(|e| e.fade_step(generation))? {
                FadeStep::Running { delay_ms } => {
                    if let Either::Second(next) =
                        select(clock.sleep_ms(delay_ms), self.started.wait()).await
                    {
                        return Ok(FadeOutcome::Superseded(next));
                    }
                }
                FadeStep::Done(color) => return Ok(FadeOutcome::Completed(color)),
                FadeStep::Stale => {
                    return Ok(match self.started.try_take() {
                        Some(next) => FadeOutcome::Superseded(next),
                        None => FadeOutcome::Cancelled,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::led::ExprError;
    use pixelnode_hal::mock::MockStrip;

    fn engine(count: u16, channels: u8) -> LedEngine<MockStrip> {
        LedEngine::new(MockStrip::new(), count, channels).unwrap()
    }

    fn run_to_end(e: &mut LedEngine<MockStrip>, generation: u32) -> (usize, FadeStep) {
        let mut frames = 0;
        loop {
            match e.fade_step(generation).unwrap() {
                FadeStep::Running { .. } => frames += 1,
                done => return (frames, done),
            }
        }
    }

    #[test]
    fn test_set_color_range_is_grb() {
        let mut e = engine(10, 3);
        e.set_color(&[("2-4", "#ff0000")]).unwrap();

        let bytes = e.strip().last.as_slice();
        assert_eq!(e.strip().frames, 1);
        assert_eq!(&bytes[..3], &[0, 0, 0]);
        for pixel in 1..4 {
            assert_eq!(&bytes[pixel * 3..pixel * 3 + 3], &[0, 255, 0]);
        }
        assert!(bytes[12..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_bad_expression_changes_nothing() {
        let mut e = engine(10, 3);
        assert_eq!(
            e.set_color(&[("1", "#00ff00"), ("11", "#ff0000")]),
            Err(LedError::Expr(ExprError::InvalidRange))
        );
        assert!(!e.is_lit());
        assert_eq!(e.strip().frames, 0);
    }

    #[test]
    fn test_fade_truncation_then_exact_target() {
        let mut e = engine(1, 3);
        let generation = e.start_fade(&[("all", "#0a0000")], 3, 20).unwrap().unwrap();

        // 10 / 3 truncates to 3 per step
        assert_eq!(e.fade_step(generation), Ok(FadeStep::Running { delay_ms: 20 }));
        assert_eq!(e.buffer().color(0), Color::rgbw(3, 0, 0, 0));
        e.fade_step(generation).unwrap();
        e.fade_step(generation).unwrap();
        assert_eq!(e.buffer().color(0), Color::rgbw(9, 0, 0, 0));

        assert_eq!(e.fade_step(generation), Ok(FadeStep::Done(Color::rgbw(10, 0, 0, 0))));
        assert_eq!(e.buffer().color(0), Color::rgbw(10, 0, 0, 0));
        assert_eq!(e.strip().frames, 4);
        assert!(!e.is_fading());
    }

    #[test]
    fn test_fade_down() {
        let mut e = engine(2, 4);
        e.fill(Color::rgbw(200, 100, 50, 255)).unwrap();
        let generation = e.start_fade(&[("2", "#00000000")], 7, 5).unwrap().unwrap();

        let (frames, done) = run_to_end(&mut e, generation);
        assert_eq!(frames, 7);
        assert_eq!(done, FadeStep::Done(Color::BLACK));
        assert_eq!(e.buffer().color(0), Color::rgbw(200, 100, 50, 255));
        assert_eq!(e.buffer().color(1), Color::BLACK);
    }

    #[test]
    fn test_new_fade_makes_old_stale() {
        let mut e = engine(4, 3);
        let first = e.start_fade(&[("all", "#ffffff")], 10, 5).unwrap().unwrap();
        e.fade_step(first).unwrap();

        let second = e.start_fade(&[("all", "#000000")], 2, 5).unwrap().unwrap();
        assert_eq!(e.fade_step(first), Ok(FadeStep::Stale));
        let (frames, _) = run_to_end(&mut e, second);
        assert_eq!(frames, 2);
        assert!(!e.is_lit());
    }

    #[test]
    fn test_zero_steps_is_instant() {
        let mut e = engine(3, 3);
        assert_eq!(e.start_fade(&[("all", "#123456")], 0, 100), Ok(None));
        assert_eq!(e.buffer().color(2), Color::rgbw(0x12, 0x34, 0x56, 0));
        assert_eq!(e.strip().frames, 1);
    }

    #[test]
    fn test_reconfigure_discards_fade() {
        let mut e = engine(4, 3);
        e.fill(Color::rgbw(1, 1, 1, 0)).unwrap();
        let generation = e.start_fade(&[("all", "#ffffff")], 10, 5).unwrap().unwrap();

        e.reconfigure(6, 4).unwrap();
        assert_eq!(e.fade_step(generation), Ok(FadeStep::Stale));
        assert_eq!(e.buffer().as_bytes().len(), 24);
        assert!(!e.is_lit());

        // Invalid geometry keeps the current buffer
        assert_eq!(e.reconfigure(0, 4), Err(LedError::InvalidCount));
        assert_eq!(e.count(), 6);
    }

    #[test]
    fn test_set_color_cancels_fade() {
        let mut e = engine(2, 3);
        let generation = e.start_fade(&[("all", "#ffffff")], 10, 5).unwrap().unwrap();
        e.set_color(&[("1", "#010101")]).unwrap();
        assert_eq!(e.fade_step(generation), Ok(FadeStep::Stale));
    }
}
