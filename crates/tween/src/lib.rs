//! `pm-tween` — Animatable value tracks for the playmix compositing core.
//!
//! A [`Tween`] interpolates a transform from a source to a destination
//! over an integer tick count under a named easing curve resolved through
//! an [`EaseRegistry`].

pub mod ease;
pub mod track;

pub use ease::{linear, EaseFn, EaseRegistry};
pub use track::{Lerp, Tween};
