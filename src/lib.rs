//! # DICOM-viewport library
//!
//! This crate provides the viewport rendering and interaction controller of
//! a stack-based DICOM viewer: given an ordered sequence of image
//! identifiers, it loads decoded pixel data, keeps a deterministic
//! on-screen transform (scale, translation, rotation, window/level,
//! inversion, interpolation) consistent across slice changes, surface
//! resizes and wheel gestures, and warms the decode cache for neighbouring
//! slices in the background.
//!
//! Decoding and pixel presentation are both collaborators, not concerns of
//! this crate: an [`ImageSource`] resolves identifiers to normalized
//! [`DecodedImage`]s (a file-backed adapter over the dicom-rs ecosystem is
//! included), and a [`RenderSurface`] presents them. Both are injected into
//! the [`ViewportController`] at construction, so the controller runs
//! unchanged against a browser canvas, a GPU pane or a test double.
//!
//! The concurrency model is single-threaded and cooperative. Loads may
//! resolve out of order; every completion re-checks a generation snapshot
//! before touching shared state, so the latest navigation intent always
//! wins. Background prefetch is spawned with `tokio::task::spawn_local` and
//! therefore needs a [`tokio::task::LocalSet`] (or prefetch disabled via
//! [`PrefetchOptions`]).
//!
//! # Examples
//!
//! ## Displaying a stack and stepping through it
//!
//! ```no_run
//! # use dicom_viewport::{
//! #     CachedSource, DicomFileSource, Stack, ViewerOptions, ViewportController,
//! # };
//! # async fn example(surface: impl dicom_viewport::RenderSurface + 'static) {
//! let source = CachedSource::new(DicomFileSource::new("dicom"));
//! let controller = ViewportController::new(source, surface, ViewerOptions::default());
//!
//! let stack: Stack = (0..120).map(|i| format!("slice-{i:03}.dcm")).collect();
//! controller.attach(stack).await.expect("first image should display");
//! controller.set_index(60).await.expect("slice 60 should display");
//! # }
//! ```
//!
//! [`PrefetchOptions`]: crate::config::PrefetchOptions

pub mod cache;
pub mod cine;
pub mod config;
pub mod controller;
pub mod enums;
pub mod fit;
pub mod prefetch;
pub mod source;
pub mod stack;
pub mod target;
pub mod viewport;

mod dicom_source;

pub use cache::CachedSource;
pub use cine::CineClock;
pub use config::{PrefetchOptions, ViewerOptions};
pub use controller::{Parameter, ViewportController, ViewportError, WheelEvent};
pub use dicom_source::DicomFileSource;
pub use enums::{Phase, WheelMode};
pub use fit::fit_scale;
pub use prefetch::PrefetchScheduler;
pub use source::{DecodeError, DecodedImage, ImageSource};
pub use stack::Stack;
pub use target::RenderSurface;
pub use viewport::{Rotation, ViewportState, Voi};
