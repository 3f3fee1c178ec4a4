//! Mixer device — composites layered frames into one output per tick.
//!
//! Every tick, [`send`](MixerDevice::send) hands a batch of layer frames
//! to the worker, which advances the transforms touched this tick,
//! composites image and audio passes, and broadcasts the result to
//! subscribers. All mutation — per-tick composition and the transform
//! API — is serialized on one executor worker, so the transform tables
//! need no locking. The executor's input queue holds two ticks: a
//! producer outrunning the clock blocks in `send`, which is the mixer's
//! back-pressure.
//!
//! Each tween touched by a tick advances exactly once: one sub-tick in
//! progressive mode, two in interlaced mode (reading the track after
//! each sub-advance yields the two field transforms). Frames sharing a
//! layer reuse that layer's advancement instead of compounding it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use pm_common::{
    join_label, AudioTransform, ImageTransform, MixerConfig, PixelFormat, PixelFormatDesc,
    PlaneDesc, VideoFormatDesc, VideoMode,
};
use pm_diag::{Color, Graph};
use pm_exec::{ExecError, Executor, Spawner};
use pm_tween::{EaseRegistry, Lerp, Tween};

use crate::audio::AudioMixer;
use crate::frame::{LayerFrame, WriteFrame};
use crate::image::{ImageMixer, PendingImage, RenderItem};
use crate::output::{OutputFrame, OutputHub, Subscription};

/// Ticks the executor queue may hold before `send` blocks.
const MIXER_QUEUE_CAPACITY: usize = 2;

/// State owned by the mixer worker thread.
struct MixerState {
    format: VideoFormatDesc,
    graph: Graph,
    output: OutputHub,
    image_mixer: ImageMixer,
    audio_mixer: AudioMixer,
    root_image: Tween<ImageTransform>,
    root_audio: Tween<AudioTransform>,
    image_table: HashMap<i32, Tween<ImageTransform>>,
    audio_table: HashMap<i32, Tween<AudioTransform>>,
    last_tick: Option<Instant>,
    queue_probe: Option<Spawner<MixerState>>,
}

/// Composites per-tick frame batches under animatable transforms and
/// emits one output frame per tick.
pub struct MixerDevice {
    label: String,
    format: VideoFormatDesc,
    registry: Arc<EaseRegistry>,
    graph: Graph,
    output: OutputHub,
    executor: Executor<MixerState>,
}

impl MixerDevice {
    pub fn new(config: MixerConfig, registry: Arc<EaseRegistry>, graph: Graph) -> Self {
        let label = join_label(&config.parent_label, "mixer");
        graph.add_guide("frame-time", 0.5);
        graph.set_color("frame-time", Color::new(1.0, 0.0, 0.0));
        graph.set_color("tick-time", Color::new(0.1, 0.7, 0.8));
        graph.set_color("input-buffer", Color::new(1.0, 1.0, 0.0));

        let output = OutputHub::new();
        let format = config.format.clone();
        let state = MixerState {
            format: format.clone(),
            graph: graph.clone(),
            output: output.clone(),
            image_mixer: ImageMixer::new(format.clone()),
            audio_mixer: AudioMixer::new(format.clone()),
            root_image: Tween::default(),
            root_audio: Tween::default(),
            image_table: HashMap::new(),
            audio_table: HashMap::new(),
            last_tick: None,
            queue_probe: None,
        };
        let executor = Executor::new(label.clone(), MIXER_QUEUE_CAPACITY, state);
        let probe = executor.spawner();
        executor
            .spawn(move |state| state.queue_probe = Some(probe))
            .expect("executor just started");

        info!(label = %label, format = %format, "Successfully initialized");

        Self {
            label,
            format,
            registry,
            graph,
            output,
            executor,
        }
    }

    /// Register a subscriber for composited output frames. Delivery is
    /// synchronous on the mixer worker; dropping the handle
    /// unsubscribes.
    pub fn connect(
        &self,
        subscriber: impl Fn(&Arc<OutputFrame>) + Send + 'static,
    ) -> Subscription {
        self.output.connect(subscriber)
    }

    /// Enqueue one tick of layer frames. Blocks while the executor queue
    /// already holds two pending ticks.
    pub fn send(&self, frames: Vec<LayerFrame>) -> Result<(), ExecError> {
        self.executor.spawn(move |state| state.tick(frames))?;
        self.graph.set_value(
            "input-buffer",
            self.executor.size() as f64 / self.executor.capacity() as f64,
        );
        Ok(())
    }

    pub fn format_desc(&self) -> &VideoFormatDesc {
        &self.format
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Allocate a writable layer frame with the given geometry.
    pub fn create_frame(&self, desc: PixelFormatDesc) -> WriteFrame {
        WriteFrame::new(desc)
    }

    /// Allocate a 4-channel frame of the given size.
    pub fn create_frame_sized(&self, format: PixelFormat, width: u32, height: u32) -> WriteFrame {
        WriteFrame::new(PixelFormatDesc {
            format,
            planes: vec![PlaneDesc::new(width, height, 4)],
        })
    }

    /// Allocate a 4-channel frame at the output resolution.
    pub fn create_full_frame(&self, format: PixelFormat) -> WriteFrame {
        self.create_frame_sized(format, self.format.width, self.format.height)
    }

    // ── Transform mutation API ───────────────────────────────────────
    //
    // Every method re-seats a track on the worker: the track's current
    // fetch() (read without advancing) becomes the new source, so the
    // animated value never jumps at the moment of the call.

    /// Animate the root image transform toward `transform`.
    pub fn set_image_transform(
        &self,
        transform: ImageTransform,
        duration: u32,
        curve: &str,
    ) -> Result<(), ExecError> {
        let curve = self.registry.resolve(curve);
        self.executor.invoke(move |state| {
            state.root_image = state.root_image.retarget(transform, duration, curve);
        })
    }

    /// Animate one layer's image transform toward `transform`.
    pub fn set_layer_image_transform(
        &self,
        layer: i32,
        transform: ImageTransform,
        duration: u32,
        curve: &str,
    ) -> Result<(), ExecError> {
        let curve = self.registry.resolve(curve);
        self.executor.invoke(move |state| {
            let tween = state.image_table.entry(layer).or_default();
            *tween = tween.retarget(transform, duration, curve);
        })
    }

    /// Animate the root image transform toward `f(current)`.
    pub fn apply_image_transform(
        &self,
        f: impl FnOnce(&ImageTransform) -> ImageTransform + Send + 'static,
        duration: u32,
        curve: &str,
    ) -> Result<(), ExecError> {
        let curve = self.registry.resolve(curve);
        self.executor.invoke(move |state| {
            let source = state.root_image.fetch();
            state.root_image = state.root_image.retarget(f(&source), duration, curve);
        })
    }

    /// Animate one layer's image transform toward `f(current)`.
    pub fn apply_layer_image_transform(
        &self,
        layer: i32,
        f: impl FnOnce(&ImageTransform) -> ImageTransform + Send + 'static,
        duration: u32,
        curve: &str,
    ) -> Result<(), ExecError> {
        let curve = self.registry.resolve(curve);
        self.executor.invoke(move |state| {
            let tween = state.image_table.entry(layer).or_default();
            let source = tween.fetch();
            *tween = tween.retarget(f(&source), duration, curve);
        })
    }

    /// Animate the root and every layer image transform back to
    /// identity.
    pub fn reset_image_transforms(&self, duration: u32, curve: &str) -> Result<(), ExecError> {
        let curve = self.registry.resolve(curve);
        self.executor.invoke(move |state| {
            for tween in state.image_table.values_mut() {
                *tween = tween.retarget(ImageTransform::default(), duration, curve);
            }
            state.root_image =
                state
                    .root_image
                    .retarget(ImageTransform::default(), duration, curve);
        })
    }

    /// Animate the root audio transform toward `transform`.
    pub fn set_audio_transform(
        &self,
        transform: AudioTransform,
        duration: u32,
        curve: &str,
    ) -> Result<(), ExecError> {
        let curve = self.registry.resolve(curve);
        self.executor.invoke(move |state| {
            state.root_audio = state.root_audio.retarget(transform, duration, curve);
        })
    }

    /// Animate one layer's audio transform toward `transform`.
    pub fn set_layer_audio_transform(
        &self,
        layer: i32,
        transform: AudioTransform,
        duration: u32,
        curve: &str,
    ) -> Result<(), ExecError> {
        let curve = self.registry.resolve(curve);
        self.executor.invoke(move |state| {
            let tween = state.audio_table.entry(layer).or_default();
            *tween = tween.retarget(transform, duration, curve);
        })
    }

    /// Animate the root audio transform toward `f(current)`.
    pub fn apply_audio_transform(
        &self,
        f: impl FnOnce(&AudioTransform) -> AudioTransform + Send + 'static,
        duration: u32,
        curve: &str,
    ) -> Result<(), ExecError> {
        let curve = self.registry.resolve(curve);
        self.executor.invoke(move |state| {
            let source = state.root_audio.fetch();
            state.root_audio = state.root_audio.retarget(f(&source), duration, curve);
        })
    }

    /// Animate one layer's audio transform toward `f(current)`.
    pub fn apply_layer_audio_transform(
        &self,
        layer: i32,
        f: impl FnOnce(&AudioTransform) -> AudioTransform + Send + 'static,
        duration: u32,
        curve: &str,
    ) -> Result<(), ExecError> {
        let curve = self.registry.resolve(curve);
        self.executor.invoke(move |state| {
            let tween = state.audio_table.entry(layer).or_default();
            let source = tween.fetch();
            *tween = tween.retarget(f(&source), duration, curve);
        })
    }

    /// Animate the root and every layer audio transform back to
    /// identity.
    pub fn reset_audio_transforms(&self, duration: u32, curve: &str) -> Result<(), ExecError> {
        let curve = self.registry.resolve(curve);
        self.executor.invoke(move |state| {
            for tween in state.audio_table.values_mut() {
                *tween = tween.retarget(AudioTransform::default(), duration, curve);
            }
            state.root_audio =
                state
                    .root_audio
                    .retarget(AudioTransform::default(), duration, curve);
        })
    }

    // ── Transform snapshots ──────────────────────────────────────────

    /// Current root image transform, read without advancing time.
    pub fn root_image_transform(&self) -> Result<ImageTransform, ExecError> {
        self.executor.invoke(|state| state.root_image.fetch())
    }

    /// Current image transform of a layer (identity when absent), read
    /// without advancing time.
    pub fn layer_image_transform(&self, layer: i32) -> Result<ImageTransform, ExecError> {
        self.executor.invoke(move |state| {
            state
                .image_table
                .get(&layer)
                .map(Tween::fetch)
                .unwrap_or_default()
        })
    }

    /// Current root audio transform, read without advancing time.
    pub fn root_audio_transform(&self) -> Result<AudioTransform, ExecError> {
        self.executor.invoke(|state| state.root_audio.fetch())
    }

    /// Current audio transform of a layer (identity when absent), read
    /// without advancing time.
    pub fn layer_audio_transform(&self, layer: i32) -> Result<AudioTransform, ExecError> {
        self.executor.invoke(move |state| {
            state
                .audio_table
                .get(&layer)
                .map(Tween::fetch)
                .unwrap_or_default()
        })
    }

    /// Stop the worker. Pending ticks are dropped; the in-flight one
    /// completes.
    pub fn stop(&mut self) {
        self.executor.stop();
        info!(label = %self.label, "Stopped");
    }
}

impl MixerState {
    fn tick(&mut self, frames: Vec<LayerFrame>) {
        let now = Instant::now();
        if let Some(last) = self.last_tick {
            self.graph.update_value(
                "tick-time",
                (now - last).as_secs_f64() / self.format.interval * 0.5,
            );
        }
        self.last_tick = Some(now);

        let frames: Vec<LayerFrame> = frames
            .into_iter()
            .filter(|f| !f.is_empty() && !f.is_eof())
            .collect();

        let image = self.mix_image(&frames);
        let audio = self.mix_audio(&frames);
        let frame = Arc::new(OutputFrame {
            image: image.wait(),
            audio,
        });
        self.output.emit(&frame);

        self.graph.update_value(
            "frame-time",
            now.elapsed().as_secs_f64() / self.format.interval * 0.5,
        );
        if let Some(probe) = &self.queue_probe {
            self.graph.set_value(
                "input-buffer",
                probe.len() as f64 / MIXER_QUEUE_CAPACITY as f64,
            );
        }
    }

    fn mix_image(&mut self, frames: &[LayerFrame]) -> PendingImage {
        let interlaced = self.format.mode.is_interlaced();
        let mut pass = self.image_mixer.begin_pass();
        if !frames.is_empty() {
            let root = advance_pair(&mut self.root_image, interlaced);
            let mut layers = HashMap::new();
            for frame in frames {
                if !layers.contains_key(&frame.layer()) {
                    let tween = self.image_table.entry(frame.layer()).or_default();
                    layers.insert(frame.layer(), advance_pair(tween, interlaced));
                }
            }
            for item in plan_image_items(frames, &root, &layers, self.format.mode) {
                pass.accept(item);
            }
        }
        pass.end_pass()
    }

    fn mix_audio(&mut self, frames: &[LayerFrame]) -> Vec<i16> {
        let sub_ticks = self.format.mode.sub_ticks();
        let mut pass = self.audio_mixer.begin_pass();
        if !frames.is_empty() {
            let root = self.root_audio.advance(sub_ticks);
            let mut layers = HashMap::new();
            for frame in frames {
                if !layers.contains_key(&frame.layer()) {
                    let tween = self.audio_table.entry(frame.layer()).or_default();
                    layers.insert(frame.layer(), tween.advance(sub_ticks));
                }
            }
            for frame in frames {
                let Some(data) = frame.data() else { continue };
                pass.accept(data, &root.compose(&layers[&frame.layer()]));
            }
        }
        pass.end_pass()
    }
}

/// Advance a tween for one tick and return its sub-field values: one
/// sub-tick read twice in progressive mode, two successive sub-ticks in
/// interlaced mode.
fn advance_pair<T: Lerp + Clone>(tween: &mut Tween<T>, interlaced: bool) -> (T, T) {
    if interlaced {
        let first = tween.advance(1);
        let second = tween.advance(1);
        (first, second)
    } else {
        let value = tween.advance(1);
        (value.clone(), value)
    }
}

/// Turn a filtered frame batch into pass submissions. Interlaced frames
/// whose two sub-field transforms agree collapse into a single draw —
/// the fields would be identical.
fn plan_image_items(
    frames: &[LayerFrame],
    root: &(ImageTransform, ImageTransform),
    layers: &HashMap<i32, (ImageTransform, ImageTransform)>,
    mode: VideoMode,
) -> Vec<RenderItem> {
    let mut items = Vec::with_capacity(frames.len());
    for frame in frames {
        let Some(data) = frame.data() else { continue };
        let (layer_first, layer_second) = &layers[&frame.layer()];
        let first = root.0.compose(layer_first);
        let second = root.1.compose(layer_second);
        if mode.is_interlaced() && first != second {
            items.push(RenderItem::InterlacedPair {
                data: Arc::clone(data),
                first,
                second,
                mode,
            });
        } else {
            items.push(RenderItem::Single {
                data: Arc::clone(data),
                transform: second,
            });
        }
    }
    items
}
