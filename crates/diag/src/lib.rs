//! `pm-diag` — Diagnostics graph for the playmix compositing core.
//!
//! A [`Graph`] is a named, thread-safe sink of runtime health signals:
//! continuous value series (queue fill ratios, tick timing) and discrete
//! event tags (loop-wrap seeks). Components publish into it from their
//! worker threads; a monitoring surface samples it at its own rate.
//!
//! Values are also emitted through `tracing` at trace level so that an
//! ordinary subscriber picks them up without polling.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

/// Display color assigned to a series (0..1 RGB).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

#[derive(Default)]
struct GraphState {
    colors: HashMap<String, Color>,
    guides: HashMap<String, f64>,
    values: HashMap<String, f64>,
    tags: HashMap<String, u64>,
}

/// A shareable diagnostics sink.
///
/// Cloning is cheap and clones refer to the same underlying state.
#[derive(Clone)]
pub struct Graph {
    name: Arc<String>,
    state: Arc<Mutex<GraphState>>,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::new(name.into()),
            state: Arc::new(Mutex::new(GraphState::default())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Assign a display color to a series.
    pub fn set_color(&self, series: &str, color: Color) {
        self.state.lock().colors.insert(series.to_string(), color);
    }

    /// Add a horizontal reference guide for a series.
    pub fn add_guide(&self, series: &str, value: f64) {
        self.state.lock().guides.insert(series.to_string(), value);
    }

    /// Publish the current value of a series.
    pub fn set_value(&self, series: &str, value: f64) {
        trace!(graph = %self.name, series, value, "diag value");
        self.state.lock().values.insert(series.to_string(), value);
    }

    /// Publish a per-tick measurement of a series.
    pub fn update_value(&self, series: &str, value: f64) {
        self.set_value(series, value);
    }

    /// Record a discrete event.
    pub fn tag(&self, event: &str) {
        trace!(graph = %self.name, event, "diag tag");
        *self.state.lock().tags.entry(event.to_string()).or_insert(0) += 1;
    }

    /// Latest published value of a series, if any.
    pub fn value(&self, series: &str) -> Option<f64> {
        self.state.lock().values.get(series).copied()
    }

    /// Number of times an event has been tagged.
    pub fn tag_count(&self, event: &str) -> u64 {
        self.state.lock().tags.get(event).copied().unwrap_or(0)
    }

    /// Display color of a series, if assigned.
    pub fn color(&self, series: &str) -> Option<Color> {
        self.state.lock().colors.get(series).copied()
    }

    /// Guide value of a series, if assigned.
    pub fn guide(&self, series: &str) -> Option<f64> {
        self.state.lock().guides.get(series).copied()
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("series", &state.values.len())
            .field("tags", &state.tags.len())
            .finish()
    }
}
