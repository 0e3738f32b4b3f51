use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use web_time::Instant;

use crate::cine::CineClock;
use crate::config::ViewerOptions;
use crate::enums::{Phase, WheelMode};
use crate::fit::fit_scale;
use crate::prefetch::PrefetchScheduler;
use crate::source::{DecodeError, DecodedImage, ImageSource};
use crate::stack::Stack;
use crate::target::RenderSurface;
use crate::viewport::{Rotation, ViewportState, Voi, clamp_scale};

#[derive(Debug, Error)]
pub enum ViewportError {
    #[error("no stack attached")]
    NotAttached,

    #[error("stack contains no images")]
    EmptyStack,

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// One wheel gesture as reported by the host.
#[derive(Clone, Copy, Debug)]
pub struct WheelEvent {
    /// Positive values scroll down.
    pub delta_y: f64,
    /// True while the host's zoom modifier (ctrl/cmd) is held.
    pub modifier: bool,
}

/// A single user-driven viewport mutation.
///
/// Out-of-range values are clamped per field, never rejected — sliders
/// routinely produce boundary-adjacent input.
#[derive(Clone, Copy, Debug)]
pub enum Parameter {
    Zoom(f32),
    /// The raw user toggle. The displayed inversion composes this with the
    /// current image's native photometric inversion.
    Invert(bool),
    WindowCenter(i32),
    WindowWidth(i32),
    /// Degrees; rounded to the nearest quarter turn modulo 360.
    Rotation(f32),
    Interpolation(bool),
}

struct State<T> {
    surface: T,
    stack: Option<Stack>,
    phase: Phase,
    /// Latest requested index — the host's intent. May briefly lead
    /// `displayed_index` while a load is in flight.
    target_index: usize,
    displayed_index: usize,
    /// Monotonic per-binding counter. Bumped by attach, set_index and
    /// detach; an async completion whose snapshot no longer matches is
    /// stale and must not touch the viewport.
    generation: u64,
    current: Option<Rc<DecodedImage>>,
    viewport: ViewportState,
    user_invert: bool,
    user_voi: Option<Voi>,
    /// Sticky flag set by an explicit zoom parameter; cleared by
    /// `reset_view`.
    manual_zoom: bool,
    /// When the last wheel zoom happened. Compared against the hold window
    /// at the point of use instead of keeping a live timer.
    wheel_zoom_at: Option<Instant>,
    last_error: Option<DecodeError>,
    cine: CineClock,
    stale_discards: u64,
}

/// Binds one image stack to one rendering surface and keeps the on-screen
/// transform consistent across slice changes, resizes and gestures.
///
/// The controller is a cheaply cloneable handle over shared state; async
/// operations re-validate a generation snapshot after every await, so the
/// latest call's intent always wins and superseded loads are discarded at
/// resolution time.
///
/// Prefetching spawns onto the current thread via
/// `tokio::task::spawn_local`, so a controller with prefetch enabled must
/// run inside a [`tokio::task::LocalSet`].
pub struct ViewportController<S, T> {
    source: S,
    state: Rc<RefCell<State<T>>>,
    prefetch: Rc<PrefetchScheduler>,
    options: ViewerOptions,
}

impl<S: Clone, T> Clone for ViewportController<S, T> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            state: Rc::clone(&self.state),
            prefetch: Rc::clone(&self.prefetch),
            options: self.options.clone(),
        }
    }
}

impl<S, T> ViewportController<S, T>
where
    S: ImageSource + Clone + 'static,
    T: RenderSurface,
{
    pub fn new(source: S, surface: T, options: ViewerOptions) -> Self {
        let cine = CineClock::new(options.cine_fps);
        let prefetch = PrefetchScheduler::new(options.prefetch.clone());
        Self {
            source,
            state: Rc::new(RefCell::new(State {
                surface,
                stack: None,
                phase: Phase::Unbound,
                target_index: 0,
                displayed_index: 0,
                generation: 0,
                current: None,
                viewport: ViewportState::default(),
                user_invert: false,
                user_voi: None,
                manual_zoom: false,
                wheel_zoom_at: None,
                last_error: None,
                cine,
                stale_discards: 0,
            })),
            prefetch: Rc::new(prefetch),
            options,
        }
    }

    /// Binds `stack` and displays its first image. See [`attach_at`].
    ///
    /// [`attach_at`]: ViewportController::attach_at
    pub async fn attach(&self, stack: Stack) -> Result<(), ViewportError> {
        self.attach_at(stack, 0).await
    }

    /// Binds `stack` and displays the image at `index` (clamped).
    ///
    /// Idempotent for the stack key currently bound. A new key tears the
    /// previous binding down, enables the surface and derives a fresh
    /// viewport state. On decode failure the surface stays blank and the
    /// error is returned.
    pub async fn attach_at(&self, stack: Stack, index: usize) -> Result<(), ViewportError> {
        if stack.is_empty() {
            return Err(ViewportError::EmptyStack);
        }

        let (generation, index, id) = {
            let mut state = self.state.borrow_mut();
            let same_key = state
                .stack
                .as_ref()
                .is_some_and(|bound| bound.key() == stack.key());
            if state.phase.is_bound() && same_key {
                return Ok(());
            }
            if state.phase.is_bound() {
                state.surface.disable();
            }

            let index = stack.clamp_index(index as i64);
            let id = stack
                .id(index)
                .map(str::to_string)
                .ok_or(ViewportError::EmptyStack)?;

            state.generation += 1;
            state.phase = Phase::Initializing;
            state.target_index = index;
            state.displayed_index = index;
            state.current = None;
            state.viewport = ViewportState::default();
            state.user_invert = false;
            state.user_voi = None;
            state.manual_zoom = false;
            state.wheel_zoom_at = None;
            state.last_error = None;
            state.cine.stop();
            state.stack = Some(stack);
            state.surface.enable();
            debug!(generation = state.generation, "stack attached");
            (state.generation, index, id)
        };

        let loaded = self.source.load_image(&id).await;
        self.complete_load(generation, index, loaded)
    }

    /// Navigates to `index` (clamped to the stack bounds).
    ///
    /// The latest call wins: if another `set_index` or `attach` arrives
    /// before this one's decode resolves, the resolved image is discarded
    /// instead of displayed. A failed load keeps the last good frame on
    /// screen.
    pub async fn set_index(&self, index: i64) -> Result<(), ViewportError> {
        let (generation, index, id) = {
            let mut state = self.state.borrow_mut();
            if !state.phase.is_bound() {
                return Err(ViewportError::NotAttached);
            }
            let stack = state.stack.as_ref().ok_or(ViewportError::NotAttached)?;
            let clamped = stack.clamp_index(index);
            if clamped == state.target_index && state.last_error.is_none() {
                return Ok(());
            }
            let id = stack
                .id(clamped)
                .map(str::to_string)
                .ok_or(ViewportError::EmptyStack)?;

            state.generation += 1;
            state.target_index = clamped;
            state.phase = Phase::Loading;
            (state.generation, clamped, id)
        };

        let loaded = self.source.load_image(&id).await;
        self.complete_load(generation, index, loaded)
    }

    /// Shared tail of attach and set_index: re-validate the generation
    /// snapshot, then either present the image or record the failure.
    fn complete_load(
        &self,
        generation: u64,
        index: usize,
        loaded: Result<Rc<DecodedImage>, DecodeError>,
    ) -> Result<(), ViewportError> {
        let mut state = self.state.borrow_mut();
        if state.generation != generation {
            state.stale_discards += 1;
            debug!(index, "stale load result discarded");
            return Ok(());
        }

        match loaded {
            Ok(image) => {
                self.present(&mut state, image);
                state.displayed_index = index;
                let stack = state.stack.clone();
                drop(state);
                if let Some(stack) = stack {
                    self.prefetch.reanchor(&self.source, &stack, index);
                }
                Ok(())
            }
            Err(error) => {
                // Keep the last good frame visible; Initializing stays
                // Initializing so the surface remains blank after a failed
                // first load.
                if state.current.is_some() {
                    state.phase = Phase::Ready;
                }
                state.last_error = Some(error.clone());
                Err(error.into())
            }
        }
    }

    /// Derives and applies the viewport for a freshly decoded image.
    /// Only fields tied to the image's geometry change; a manual zoom or a
    /// user transform carries over untouched.
    fn present(&self, state: &mut State<T>, image: Rc<DecodedImage>) {
        let par = image.pixel_aspect_ratio();
        state.viewport.pixel_aspect_ratio = par;
        // Native inversion can flip between slices, so the effective value
        // is recomputed on every presentation.
        state.viewport.invert = state.user_invert ^ image.native_invert;
        if let Some(voi) = state.user_voi {
            state.viewport.voi = Some(voi);
        } else if let Some(voi) = image.default_voi {
            state.viewport.voi = Some(voi);
        }

        if self.options.fit_to_window && !self.manual_zoom_active(state) {
            let (width, height) = state.surface.dimensions();
            let scale = fit_scale(
                image.rows(),
                image.columns(),
                width,
                height,
                state.viewport.rotation,
                par,
            );
            state
                .viewport
                .apply_fit(clamp_scale(scale, self.options.min_zoom, self.options.max_zoom));
        }

        state.surface.display(&image, &state.viewport);
        state.current = Some(image);
        state.phase = Phase::Ready;
        state.last_error = None;
    }

    fn manual_zoom_active(&self, state: &State<T>) -> bool {
        if state.manual_zoom {
            return true;
        }
        let hold = Duration::from_millis(self.options.manual_zoom_hold_ms);
        state
            .wheel_zoom_at
            .is_some_and(|at| at.elapsed() < hold)
    }

    /// Applies one clamped parameter change to the live viewport without
    /// reloading the image.
    pub fn set_parameter(&self, parameter: Parameter) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if !state.phase.is_bound() {
            return;
        }

        match parameter {
            Parameter::Zoom(zoom) => {
                state
                    .viewport
                    .set_scale(zoom, self.options.min_zoom, self.options.max_zoom);
                state.manual_zoom = true;
            }
            Parameter::Invert(toggle) => {
                state.user_invert = toggle;
            }
            Parameter::WindowCenter(center) => {
                let base = self.voi_base(&state);
                state.user_voi = Some(base.with_center(center));
            }
            Parameter::WindowWidth(width) => {
                let base = self.voi_base(&state);
                state.user_voi = Some(base.with_width(width));
            }
            Parameter::Rotation(degrees) => {
                state.viewport.rotation = Rotation::from_degrees(degrees);
            }
            Parameter::Interpolation(smooth) => {
                state.viewport.interpolation = smooth;
            }
        }

        // Effective invert depends on both the toggle and the current
        // image, so recompute it for every parameter change.
        let native = state
            .current
            .as_ref()
            .is_some_and(|image| image.native_invert);
        state.viewport.invert = state.user_invert ^ native;
        if let Some(voi) = state.user_voi {
            state.viewport.voi = Some(voi);
        }

        // A rotation swaps the fit basis; refit unless the user owns the
        // scale.
        if matches!(parameter, Parameter::Rotation(_)) {
            self.refit(&mut *state);
        }

        state.surface.set_viewport(&state.viewport);
    }

    /// Base VOI for a partial window update: the explicit user value,
    /// falling back to the applied one, then the image default.
    fn voi_base(&self, state: &State<T>) -> Voi {
        state
            .user_voi
            .or(state.viewport.voi)
            .or_else(|| state.current.as_ref().and_then(|image| image.default_voi))
            .unwrap_or_default()
    }

    fn refit(&self, state: &mut State<T>) {
        if !self.options.fit_to_window || self.manual_zoom_active(state) {
            return;
        }
        if let Some(image) = state.current.clone() {
            let (width, height) = state.surface.dimensions();
            let scale = fit_scale(
                image.rows(),
                image.columns(),
                width,
                height,
                state.viewport.rotation,
                state.viewport.pixel_aspect_ratio,
            );
            state
                .viewport
                .apply_fit(clamp_scale(scale, self.options.min_zoom, self.options.max_zoom));
        }
    }

    /// Reacts to a surface size change. Recomputes the deterministic fit
    /// unless a manual zoom is in effect; the current transform is
    /// re-applied either way.
    pub fn resize(&self) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if !state.phase.is_bound() {
            return;
        }
        state.surface.resized();
        self.refit(state);
        state.surface.set_viewport(&state.viewport);
    }

    /// Clears the manual-zoom override and restores the deterministic fit.
    pub fn reset_view(&self) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if !state.phase.is_bound() {
            return;
        }
        state.manual_zoom = false;
        state.wheel_zoom_at = None;
        self.refit(state);
        state.surface.set_viewport(&state.viewport);
    }

    /// Routes one wheel tick to either a slice step or a zoom step,
    /// depending on the configured mode and the modifier key.
    pub async fn handle_wheel(&self, event: WheelEvent) -> Result<(), ViewportError> {
        let zooming = match self.options.wheel_mode {
            WheelMode::Zoom => true,
            WheelMode::Slice => false,
            WheelMode::Mixed => event.modifier,
        };
        let down = event.delta_y > 0.0;

        if zooming {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            if !state.phase.is_bound() {
                return Ok(());
            }
            let factor = if down {
                1.0 - self.options.zoom_step
            } else {
                1.0 + self.options.zoom_step
            };
            let next = state.viewport.scale * factor;
            state
                .viewport
                .set_scale(next, self.options.min_zoom, self.options.max_zoom);
            state.wheel_zoom_at = Some(Instant::now());
            state.surface.set_viewport(&state.viewport);
            return Ok(());
        }

        let target = {
            let state = self.state.borrow();
            if state.stack.as_ref().is_none_or(|stack| stack.len() <= 1) {
                return Ok(());
            }
            let step: i64 = if down { 1 } else { -1 };
            state.target_index as i64 + step
        };
        // set_index clamps, so a tick past either end stays put.
        self.set_index(target).await
    }

    /// Unbinds the surface and drops all per-stack state. Idempotent; also
    /// invalidates pending loads and the prefetch run, and stops cine.
    pub fn detach(&self) {
        let mut state = self.state.borrow_mut();
        state.generation += 1;
        self.prefetch.cancel();
        state.cine.stop();
        state.surface.disable();
        state.phase = Phase::Detached;
        state.stack = None;
        state.current = None;
        state.viewport = ViewportState::default();
        state.user_invert = false;
        state.user_voi = None;
        state.manual_zoom = false;
        state.wheel_zoom_at = None;
        state.last_error = None;
        debug!("detached");
    }

    /// Starts cine playback. Refused for stacks of one image.
    pub fn cine_start(&self) {
        let mut state = self.state.borrow_mut();
        let playable = state.stack.as_ref().is_some_and(|stack| stack.len() > 1);
        if playable {
            state.cine.start();
        }
    }

    pub fn cine_stop(&self) {
        self.state.borrow_mut().cine.stop();
    }

    pub fn set_cine_fps(&self, fps: f64) {
        self.state.borrow_mut().cine.set_fps(fps);
    }

    pub fn is_playing(&self) -> bool {
        self.state.borrow().cine.is_playing()
    }

    /// Advances playback by one frame when the clock says so, wrapping to
    /// the first slice past the end.
    pub async fn cine_tick(&self, now: Instant) -> Result<(), ViewportError> {
        let next = {
            let mut state = self.state.borrow_mut();
            let len = state.stack.as_ref().map_or(0, Stack::len);
            if len <= 1 || !state.cine.tick(now) {
                return Ok(());
            }
            (state.target_index + 1) % len
        };
        self.set_index(next as i64).await
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    /// The latest requested index — the host's navigation intent.
    pub fn current_index(&self) -> usize {
        self.state.borrow().target_index
    }

    /// The index of the image actually on screen.
    pub fn displayed_index(&self) -> usize {
        self.state.borrow().displayed_index
    }

    pub fn viewport_state(&self) -> Option<ViewportState> {
        let state = self.state.borrow();
        state.phase.is_bound().then(|| state.viewport.clone())
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state.borrow().phase, Phase::Loading | Phase::Initializing)
    }

    pub fn last_error(&self) -> Option<DecodeError> {
        self.state.borrow().last_error.clone()
    }

    pub fn stack_key(&self) -> Option<String> {
        let state = self.state.borrow();
        state.stack.as_ref().map(|stack| stack.key().to_string())
    }

    /// How many async completions were dropped for arriving after their
    /// context changed. Instrumentation for tests and diagnostics; a stale
    /// discard is not an error.
    pub fn stale_discards(&self) -> u64 {
        self.state.borrow().stale_discards
    }
}
