//! Easing curves and the name registry that resolves them.
//!
//! A curve maps normalized time `t ∈ [0, 1]` to a normalized progress
//! value, with `curve(0) == 0` and `curve(1) == 1` so that tween tracks
//! hit their endpoints exactly.
//!
//! The registry is an explicit value: it is built once at startup and
//! injected into the mixer device, rather than living in process-wide
//! state. Collaborators extend it with [`register`](EaseRegistry::register).

use std::collections::HashMap;

use tracing::warn;

/// An easing curve over normalized time.
pub type EaseFn = fn(f64) -> f64;

pub fn linear(t: f64) -> f64 {
    t
}

fn ease_in_quad(t: f64) -> f64 {
    t * t
}

fn ease_out_quad(t: f64) -> f64 {
    1.0 - (1.0 - t) * (1.0 - t)
}

fn ease_in_out_quad(t: f64) -> f64 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

fn ease_in_cubic(t: f64) -> f64 {
    t * t * t
}

fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

fn ease_in_out_cubic(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

fn ease_in_sine(t: f64) -> f64 {
    1.0 - (t * std::f64::consts::FRAC_PI_2).cos()
}

fn ease_out_sine(t: f64) -> f64 {
    (t * std::f64::consts::FRAC_PI_2).sin()
}

fn ease_in_out_sine(t: f64) -> f64 {
    -((std::f64::consts::PI * t).cos() - 1.0) / 2.0
}

/// Mapping from curve names to easing functions.
pub struct EaseRegistry {
    curves: HashMap<String, EaseFn>,
}

impl EaseRegistry {
    /// Registry with the built-in curve set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("linear", linear);
        registry.register("easeinquad", ease_in_quad);
        registry.register("easeoutquad", ease_out_quad);
        registry.register("easeinoutquad", ease_in_out_quad);
        registry.register("easeincubic", ease_in_cubic);
        registry.register("easeoutcubic", ease_out_cubic);
        registry.register("easeinoutcubic", ease_in_out_cubic);
        registry.register("easeinsine", ease_in_sine);
        registry.register("easeoutsine", ease_out_sine);
        registry.register("easeinoutsine", ease_in_out_sine);
        registry
    }

    /// Empty registry, for collaborators that bring their own curve set.
    /// [`resolve`](Self::resolve) still falls back to linear.
    pub fn new() -> Self {
        Self {
            curves: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, curve: EaseFn) {
        self.curves.insert(name.into(), curve);
    }

    /// Resolve a curve by name. Unknown names fall back to linear with a
    /// logged warning.
    pub fn resolve(&self, name: &str) -> EaseFn {
        match self.curves.get(name) {
            Some(curve) => *curve,
            None => {
                warn!(curve = name, "Unknown easing curve, falling back to linear");
                linear
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.curves.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }
}

impl Default for EaseRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILT_IN: &[&str] = &[
        "linear",
        "easeinquad",
        "easeoutquad",
        "easeinoutquad",
        "easeincubic",
        "easeoutcubic",
        "easeinoutcubic",
        "easeinsine",
        "easeoutsine",
        "easeinoutsine",
    ];

    #[test]
    fn every_curve_hits_its_endpoints() {
        let registry = EaseRegistry::with_defaults();
        for name in BUILT_IN {
            let curve = registry.resolve(name);
            assert!(curve(0.0).abs() < 1e-9, "{name} at t=0");
            assert!((curve(1.0) - 1.0).abs() < 1e-9, "{name} at t=1");
        }
    }

    #[test]
    fn curves_are_monotone_on_samples() {
        let registry = EaseRegistry::with_defaults();
        for name in BUILT_IN {
            let curve = registry.resolve(name);
            let mut last = curve(0.0);
            for i in 1..=100 {
                let v = curve(i as f64 / 100.0);
                assert!(v >= last - 1e-9, "{name} not monotone at step {i}");
                last = v;
            }
        }
    }

    #[test]
    fn unknown_name_falls_back_to_linear() {
        let registry = EaseRegistry::with_defaults();
        let curve = registry.resolve("no-such-curve");
        assert_eq!(curve(0.25), 0.25);
        assert_eq!(curve(0.75), 0.75);
    }

    #[test]
    fn collaborator_registration() {
        let mut registry = EaseRegistry::new();
        assert!(registry.is_empty());
        registry.register("snap", |t| if t < 1.0 { 0.0 } else { 1.0 });
        assert!(registry.contains("snap"));
        assert_eq!(registry.resolve("snap")(0.5), 0.0);
        assert_eq!(registry.resolve("snap")(1.0), 1.0);
    }

    #[test]
    fn linear_midpoint() {
        assert_eq!(linear(0.5), 0.5);
    }
}
