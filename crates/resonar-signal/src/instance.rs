//! Signal instances: one buffered, playable unit of audio.
//!
//! An instance owns an ordered sequence of [`Buffer`]s plus the metadata that
//! places them in musical time. It plays one of three roles:
//!
//! - [`Role::Template`]: the prototype waveform of a container (at most one)
//! - [`Role::RuntimeTemplate`]: a format-specialized copy of the template,
//!   cached so voices can spin up without converting
//! - [`Role::Playback`]: rendered in real time for exactly one [`Scope`]
//!
//! Instances are shared handles. State sits behind a re-entrant mutex, so a
//! callback that already holds an instance can call back into it on the same
//! thread.
//!
//! # Frame markers
//!
//! `first_frame`, `loop_start` and `loop_end` are frame positions in the
//! instance's frame stream. `last_frame` is the offset inside the last buffer
//! where data ends.

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::sync::{Arc, Weak};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use resonar_core::segment::segments;
use uuid::Uuid;

use crate::buffer::Buffer;
use crate::container::{Container, ContainerShared};
use crate::format::{AudioFormat, SampleFormat};
use crate::note::Note;
use crate::scope::Scope;
use crate::soundcard::Soundcard;

/// Role of an instance inside its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Prototype waveform, one per container
    Template,
    /// Format-specialized copy of the template
    RuntimeTemplate,
    /// Real-time rendered instance bound to a scope
    Playback(Scope),
}

pub(crate) struct InstanceShared {
    id: Uuid,
    state: ReentrantMutex<RefCell<InstanceState>>,
}

struct InstanceState {
    role: Role,
    container: Weak<ContainerShared>,
    output_device: Option<Arc<dyn Soundcard>>,
    input_device: Option<Arc<dyn Soundcard>>,
    format: AudioFormat,
    buffers: Vec<Buffer>,
    current: usize,
    delay: f64,
    attack: usize,
    first_frame: usize,
    last_frame: usize,
    loop_start: usize,
    loop_end: usize,
    frame_count: usize,
    rt_template: Weak<InstanceShared>,
    notes: Vec<Note>,
}

impl InstanceState {
    fn capacity(&self) -> usize {
        self.buffers.len() * self.format.buffer_size
    }

    fn resize(&mut self, length: usize) {
        let (format, buffer_size) = (self.format.format, self.format.buffer_size);
        self.buffers
            .resize_with(length, || Buffer::new(format, buffer_size));
        self.current = self.current.min(length.saturating_sub(1));
        self.frame_count = self.frame_count.min(self.capacity());
    }

    fn copy_markers_from(&mut self, other: &InstanceState) {
        self.delay = other.delay;
        self.attack = other.attack;
        self.first_frame = other.first_frame;
        self.last_frame = other.last_frame;
        self.loop_start = other.loop_start;
        self.loop_end = other.loop_end;
        self.frame_count = other.frame_count;
    }

    fn decode_all(&self) -> Vec<f32> {
        let buffer_size = self.format.buffer_size;
        let mut frames = vec![0.0; self.capacity()];
        for (i, buffer) in self.buffers.iter().enumerate() {
            buffer.read(0, &mut frames[i * buffer_size..(i + 1) * buffer_size]);
        }
        frames
    }

    fn encode_all(&mut self, frames: &[f32]) {
        let buffer_size = self.format.buffer_size;
        let length = frames.len().div_ceil(buffer_size);
        self.buffers = (0..length)
            .map(|i| {
                let end = ((i + 1) * buffer_size).min(frames.len());
                let mut buffer = Buffer::new(self.format.format, buffer_size);
                buffer.write(0, &frames[i * buffer_size..end]);
                buffer
            })
            .collect();
        self.current = self.current.min(length.saturating_sub(1));
    }

    fn set_samplerate(&mut self, samplerate: u32) {
        let old = self.format.samplerate;
        if old == samplerate || samplerate == 0 {
            return;
        }
        let ratio = f64::from(samplerate) / f64::from(old.max(1));
        let scale = |frame: usize| (frame as f64 * ratio).round() as usize;

        let source = self.decode_all();
        let target_len = scale(source.len());
        let step = 1.0 / ratio;
        let resampled: Vec<f32> = (0..target_len)
            .map(|j| {
                let pos = j as f64 * step;
                let i = pos as usize;
                let frac = (pos - i as f64) as f32;
                let a = source.get(i).copied().unwrap_or(0.0);
                let b = source.get(i + 1).copied().unwrap_or(a);
                a + (b - a) * frac
            })
            .collect();

        self.format.samplerate = samplerate;
        self.encode_all(&resampled);
        self.first_frame = scale(self.first_frame);
        self.loop_start = scale(self.loop_start);
        self.loop_end = scale(self.loop_end);
        self.attack = scale(self.attack);
        self.frame_count = scale(self.frame_count).min(self.capacity());
        self.last_frame = (self.first_frame + self.frame_count) % self.format.buffer_size;
    }

    fn set_buffer_size(&mut self, buffer_size: usize) {
        let buffer_size = buffer_size.max(1);
        let old = self.format.buffer_size;
        if old == buffer_size {
            return;
        }
        let capacity = self.capacity();
        let length = capacity.div_ceil(buffer_size);
        let mut reblocked: Vec<Buffer> = (0..length)
            .map(|_| Buffer::new(self.format.format, buffer_size))
            .collect();
        for step in segments(0, 0, capacity, buffer_size, old) {
            if let Some(src) = step.src {
                reblocked[step.dst.block].copy_from(
                    step.dst.offset,
                    &self.buffers[src.block],
                    src.offset,
                    step.len,
                );
            }
        }
        let current_frame = self.current * old;

        self.buffers = reblocked;
        self.format.buffer_size = buffer_size;
        self.current = (current_frame / buffer_size).min(length.saturating_sub(1));
        self.last_frame = if self.frame_count > 0 {
            (self.first_frame + self.frame_count) % buffer_size
        } else {
            self.last_frame % buffer_size
        };
    }

    fn set_format(&mut self, format: SampleFormat) {
        for buffer in &mut self.buffers {
            buffer.convert(format);
        }
        self.format.format = format;
    }

    fn set_audio_format(&mut self, format: AudioFormat) {
        self.set_samplerate(format.samplerate);
        self.set_buffer_size(format.buffer_size);
        self.set_format(format.format);
    }
}

/// Shared handle to one signal instance.
///
/// Clones refer to the same instance; equality is identity.
///
/// # Example
///
/// ```rust
/// use resonar_signal::{AudioFormat, SampleFormat, SignalInstance};
///
/// let format = AudioFormat::new(48000, 4, SampleFormat::Float);
/// let template = SignalInstance::template(format);
/// template.set_samples(&[0.1, 0.2, 0.3, 0.4, 0.5]);
/// assert_eq!(template.length(), 2);
/// assert_eq!(template.last_frame(), 1);
/// ```
#[derive(Clone)]
pub struct SignalInstance {
    shared: Arc<InstanceShared>,
}

impl SignalInstance {
    /// Creates an empty instance with `role` and `format`.
    pub fn new(role: Role, format: AudioFormat) -> Self {
        let state = InstanceState {
            role,
            container: Weak::new(),
            output_device: None,
            input_device: None,
            format,
            buffers: Vec::new(),
            current: 0,
            delay: 0.0,
            attack: 0,
            first_frame: 0,
            last_frame: 0,
            loop_start: 0,
            loop_end: 0,
            frame_count: 0,
            rt_template: Weak::new(),
            notes: Vec::new(),
        };
        Self {
            shared: Arc::new(InstanceShared {
                id: Uuid::new_v4(),
                state: ReentrantMutex::new(RefCell::new(state)),
            }),
        }
    }

    /// Creates an empty template.
    pub fn template(format: AudioFormat) -> Self {
        Self::new(Role::Template, format)
    }

    /// Creates an empty runtime template.
    pub fn runtime_template(format: AudioFormat) -> Self {
        Self::new(Role::RuntimeTemplate, format)
    }

    /// Creates an empty playback instance for `scope`.
    pub fn playback(scope: Scope, format: AudioFormat) -> Self {
        Self::new(Role::Playback(scope), format)
    }

    pub(crate) fn from_shared(shared: Arc<InstanceShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn downgrade(&self) -> Weak<InstanceShared> {
        Arc::downgrade(&self.shared)
    }

    fn lock(&self) -> ReentrantMutexGuard<'_, RefCell<InstanceState>> {
        self.shared.state.lock()
    }

    fn read<R>(&self, f: impl FnOnce(&InstanceState) -> R) -> R {
        let guard = self.lock();
        let state = guard.borrow();
        f(&state)
    }

    fn write<R>(&self, f: impl FnOnce(&mut InstanceState) -> R) -> R {
        let guard = self.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    /// Identity.
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Whether both handles refer to the same instance.
    pub fn ptr_eq(&self, other: &SignalInstance) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Role inside the container.
    pub fn role(&self) -> Role {
        self.read(|s| s.role)
    }

    /// Scope of a playback instance.
    pub fn scope(&self) -> Option<Scope> {
        match self.role() {
            Role::Playback(scope) => Some(scope),
            Role::Template | Role::RuntimeTemplate => None,
        }
    }

    /// Whether this is the template role.
    pub fn is_template(&self) -> bool {
        self.role() == Role::Template
    }

    /// Whether this is a runtime template.
    pub fn is_runtime_template(&self) -> bool {
        self.role() == Role::RuntimeTemplate
    }

    /// Owning container, if attached and still alive.
    pub fn container(&self) -> Option<Container> {
        self.read(|s| s.container.upgrade()).map(Container::from_shared)
    }

    pub(crate) fn attach(&self, container: Weak<ContainerShared>) {
        self.write(|s| s.container = container);
    }

    pub(crate) fn detach(&self) {
        self.write(|s| s.container = Weak::new());
    }

    /// Template a runtime template was derived from, while it is alive.
    pub fn rt_template(&self) -> Option<SignalInstance> {
        self.read(|s| s.rt_template.upgrade())
            .map(SignalInstance::from_shared)
    }

    /// Whether this instance was derived from `template`.
    pub fn derives_from(&self, template: &SignalInstance) -> bool {
        self.read(|s| Weak::ptr_eq(&s.rt_template, &template.downgrade()))
    }

    /// Output device the instance renders for.
    pub fn output_device(&self) -> Option<Arc<dyn Soundcard>> {
        self.read(|s| s.output_device.clone())
    }

    /// Input device the instance records from.
    pub fn input_device(&self) -> Option<Arc<dyn Soundcard>> {
        self.read(|s| s.input_device.clone())
    }

    /// Replaces the output device.
    pub fn set_output_device(&self, device: Option<Arc<dyn Soundcard>>) {
        self.write(|s| s.output_device = device);
    }

    /// Replaces the input device.
    pub fn set_input_device(&self, device: Option<Arc<dyn Soundcard>>) {
        self.write(|s| s.input_device = device);
    }

    /// Format descriptor.
    pub fn audio_format(&self) -> AudioFormat {
        self.read(|s| s.format)
    }

    /// Sample rate in Hz.
    pub fn samplerate(&self) -> u32 {
        self.read(|s| s.format.samplerate)
    }

    /// Frames per buffer.
    pub fn buffer_size(&self) -> usize {
        self.read(|s| s.format.buffer_size)
    }

    /// Frame encoding.
    pub fn format(&self) -> SampleFormat {
        self.read(|s| s.format.format)
    }

    /// Number of buffers.
    pub fn length(&self) -> usize {
        self.read(|s| s.buffers.len())
    }

    /// Total frames the buffers can hold.
    pub fn capacity(&self) -> usize {
        self.read(InstanceState::capacity)
    }

    /// Fractional tick offset.
    pub fn delay(&self) -> f64 {
        self.read(|s| s.delay)
    }

    /// Frame offset inside the first buffer.
    pub fn attack(&self) -> usize {
        self.read(|s| s.attack)
    }

    /// Sets delay and attack without moving data.
    pub fn set_delay_attack(&self, delay: f64, attack: usize) {
        self.write(|s| {
            s.delay = delay.clamp(0.0, 1.0);
            s.attack = attack;
        });
    }

    /// First frame carrying data.
    pub fn first_frame(&self) -> usize {
        self.read(|s| s.first_frame)
    }

    /// Offset inside the last buffer where data ends.
    pub fn last_frame(&self) -> usize {
        self.read(|s| s.last_frame)
    }

    /// Start of the loop region.
    pub fn loop_start(&self) -> usize {
        self.read(|s| s.loop_start)
    }

    /// End of the loop region (exclusive).
    pub fn loop_end(&self) -> usize {
        self.read(|s| s.loop_end)
    }

    /// Sets the loop region. `start == end` means no loop.
    pub fn set_loop(&self, start: usize, end: usize) {
        self.write(|s| {
            s.loop_start = start.min(end);
            s.loop_end = end.max(start);
        });
    }

    /// Frames of audible data.
    pub fn frame_count(&self) -> usize {
        self.read(|s| s.frame_count)
    }

    /// Whether the instance has no buffers or no frames, i.e. is not yet
    /// playable.
    pub fn is_empty(&self) -> bool {
        self.read(|s| s.buffers.is_empty() || s.frame_count == 0)
    }

    /// Replaces the data with `samples`, encoded in the instance format.
    ///
    /// Resets `first_frame` to 0 and recomputes `frame_count` and
    /// `last_frame`.
    pub fn set_samples(&self, samples: &[f32]) {
        self.write(|s| {
            s.encode_all(samples);
            s.first_frame = 0;
            s.frame_count = samples.len();
            s.last_frame = samples.len() % s.format.buffer_size;
        });
    }

    /// Decodes every buffer into one frame vector.
    pub fn to_vec(&self) -> Vec<f32> {
        self.read(InstanceState::decode_all)
    }

    /// Resizes the buffer sequence to `length` buffers. Growth is silent.
    pub fn stream_resize(&self, length: usize) {
        self.write(|s| s.resize(length));
    }

    /// Like [`stream_resize`](Self::stream_resize) but never drops the
    /// buffers up to and including the current one.
    pub fn safe_resize(&self, length: usize) {
        self.write(|s| {
            let floor = if s.buffers.is_empty() { 0 } else { s.current + 1 };
            s.resize(length.max(floor));
        });
    }

    /// Appends one silent buffer.
    pub fn add_buffer(&self) {
        self.write(|s| {
            let length = s.buffers.len() + 1;
            s.resize(length);
        });
    }

    /// Index of the buffer being rendered.
    pub fn current(&self) -> usize {
        self.read(|s| s.current)
    }

    /// Moves the render cursor, clamped to the sequence.
    pub fn set_current(&self, index: usize) {
        self.write(|s| s.current = index.min(s.buffers.len().saturating_sub(1)));
    }

    /// Moves the cursor to the next buffer. Returns `false` at the end.
    pub fn advance(&self) -> bool {
        self.write(|s| {
            if s.current + 1 < s.buffers.len() {
                s.current += 1;
                true
            } else {
                false
            }
        })
    }

    /// Frames preceding the current buffer.
    pub fn length_till_current(&self) -> usize {
        self.read(|s| s.current * s.format.buffer_size)
    }

    /// Runs `f` on buffer `index`.
    ///
    /// `f` may call back into this instance. See [`with_buffer_mut`](Self::with_buffer_mut).
    pub fn with_buffer<R>(&self, index: usize, f: impl FnOnce(&Buffer) -> R) -> Option<R> {
        self.with_buffer_mut(index, |buffer| f(buffer))
    }

    /// Runs `f` on buffer `index` mutably.
    ///
    /// The buffer is detached from the instance while `f` runs, so `f` may
    /// call back into this instance on the same thread, including mutating
    /// calls. Inside `f` buffer `index` reads as empty. If `f` shrinks the
    /// instance past `index`, the detached buffer is dropped.
    pub fn with_buffer_mut<R>(&self, index: usize, f: impl FnOnce(&mut Buffer) -> R) -> Option<R> {
        let _guard = self.lock();
        let mut buffer = self.write(|s| s.buffers.get_mut(index).map(mem::take))?;
        let result = f(&mut buffer);
        self.write(|s| {
            if let Some(slot) = s.buffers.get_mut(index) {
                *slot = buffer;
            }
        });
        Some(result)
    }

    /// Decodes frames from absolute frame `start` into `out`, crossing
    /// buffer boundaries. Frames past the end read as silence.
    pub fn read_frames(&self, start: usize, out: &mut [f32]) {
        out.fill(0.0);
        self.read(|s| {
            for step in segments(start, 0, out.len(), s.format.buffer_size, out.len()) {
                let Some(src) = step.src else { continue };
                if let Some(buffer) = s.buffers.get(step.dst.block) {
                    buffer.read(step.dst.offset, &mut out[src.offset..src.offset + step.len]);
                }
            }
        });
    }

    /// Adds `input` onto the frames from absolute frame `start`. Frames past
    /// the last buffer are dropped. Returns the number of frames mixed.
    pub fn mix_frames(&self, start: usize, input: &[f32]) -> usize {
        self.write(|s| {
            let mut mixed = 0;
            for step in segments(start, 0, input.len(), s.format.buffer_size, input.len()) {
                let Some(src) = step.src else { continue };
                if let Some(buffer) = s.buffers.get_mut(step.dst.block) {
                    mixed += buffer.mix(step.dst.offset, &input[src.offset..src.offset + step.len]);
                }
            }
            mixed
        })
    }

    /// Clears every buffer.
    pub fn clear(&self) {
        self.write(|s| s.buffers.iter_mut().for_each(Buffer::clear));
    }

    /// Copies the template's buffers into this instance.
    ///
    /// Buffers are converted to this instance's encoding and re-blocked when
    /// buffer sizes differ. The sequence is grown to hold the template; data
    /// beyond the template is left untouched.
    pub fn duplicate_stream(&self, template: &SignalInstance) {
        if self.ptr_eq(template) {
            return;
        }
        let template_guard = template.lock();
        let source = template_guard.borrow();

        self.write(|s| {
            let src_bs = source.format.buffer_size;
            let dst_bs = s.format.buffer_size;
            let frames = source.capacity();
            let needed = frames.div_ceil(dst_bs);
            if s.buffers.len() < needed {
                s.resize(needed);
            }
            for step in segments(0, 0, frames, dst_bs, src_bs) {
                if let Some(src) = step.src {
                    s.buffers[step.dst.block].copy_from(
                        step.dst.offset,
                        &source.buffers[src.block],
                        src.offset,
                        step.len,
                    );
                }
            }
        });
    }

    /// Extends the instance by `frame_count` frames read from `template`,
    /// repeating its loop region once reading passes the loop end.
    ///
    /// Reading resumes where the previous feed stopped, so repeated calls
    /// continue one looped stream.
    pub fn feed(&self, template: &SignalInstance, frame_count: usize) {
        if self.ptr_eq(template) || frame_count == 0 {
            return;
        }
        let template_guard = template.lock();
        let source = template_guard.borrow();

        self.write(|s| {
            let dst_start = s.first_frame + s.frame_count;
            let end = dst_start + frame_count;
            let needed = end.div_ceil(s.format.buffer_size);
            if s.buffers.len() < needed {
                s.resize(needed);
            }
            let read_start = s.frame_count;
            fill_looped(s, &source, dst_start, read_start, frame_count);
            s.frame_count += frame_count;
            s.last_frame = end % s.format.buffer_size;
        });
    }

    /// Rebuilds this instance as a copy of `template` in `format`.
    ///
    /// Used for runtime templates: the data is converted to the target
    /// sample rate, buffer size and encoding, and the back-reference is set.
    pub fn derive_from(&self, template: &SignalInstance, format: AudioFormat) {
        if self.ptr_eq(template) {
            return;
        }
        let template_guard = template.lock();
        let source = template_guard.borrow();

        self.write(|s| {
            s.format = source.format;
            s.buffers = source.buffers.clone();
            s.current = 0;
            s.copy_markers_from(&source);
            s.output_device = source.output_device.clone();
            s.input_device = source.input_device.clone();
            s.rt_template = Arc::downgrade(&template.shared);
            s.set_audio_format(format);
        });
    }

    /// Converts the data to `samplerate`, rescaling every frame marker.
    pub fn set_samplerate(&self, samplerate: u32) {
        self.write(|s| s.set_samplerate(samplerate));
    }

    /// Re-blocks the data into buffers of `buffer_size` frames, keeping the
    /// frame stream continuous.
    pub fn set_buffer_size(&self, buffer_size: usize) {
        self.write(|s| s.set_buffer_size(buffer_size));
    }

    /// Re-encodes every buffer.
    pub fn set_format(&self, format: SampleFormat) {
        self.write(|s| s.set_format(format));
    }

    /// Applies all three format fields.
    pub fn set_audio_format(&self, format: AudioFormat) {
        self.write(|s| s.set_audio_format(format));
    }

    /// Attaches a note.
    pub fn add_note(&self, note: Note) {
        self.write(|s| {
            if !s.notes.iter().any(|n| n.id == note.id) {
                s.notes.push(note);
            }
        });
    }

    /// Detaches the note with `id`. Returns whether it was attached.
    pub fn remove_note(&self, id: Uuid) -> bool {
        self.write(|s| {
            let before = s.notes.len();
            s.notes.retain(|n| n.id != id);
            s.notes.len() != before
        })
    }

    /// Attached notes.
    pub fn notes(&self) -> Vec<Note> {
        self.read(|s| s.notes.clone())
    }

    /// Whether any note is attached.
    pub fn is_active(&self) -> bool {
        self.read(|s| !s.notes.is_empty())
    }

    pub(crate) fn derive_layout(
        &self,
        template: &SignalInstance,
        frame_count: Option<usize>,
        delay: f64,
        attack: usize,
    ) {
        if self.ptr_eq(template) {
            return;
        }
        let template_guard = template.lock();
        let source = template_guard.borrow();

        self.write(|s| {
            let buffer_size = source.format.buffer_size;
            let delay = delay.clamp(0.0, 1.0);
            let shift = (delay * buffer_size as f64) as usize + attack;

            s.format = source.format;
            s.delay = delay;
            s.attack = attack;
            s.current = 0;
            s.buffers.clear();

            match frame_count {
                None => {
                    s.last_frame = (shift + source.last_frame) % buffer_size;
                    s.loop_start = (shift + source.loop_start) % buffer_size;
                    s.loop_end = (shift + source.loop_end) % buffer_size;
                    s.first_frame = source.first_frame;
                    s.frame_count = source.frame_count;
                    s.buffers = source.buffers.clone();
                }
                Some(frame_count) => {
                    s.first_frame = shift;
                    s.loop_start = shift + source.loop_start;
                    s.loop_end = shift + source.loop_end;
                    s.last_frame = (shift + frame_count) % buffer_size;
                    s.frame_count = 0;
                    s.resize((shift + frame_count).div_ceil(buffer_size).max(1));
                    fill_looped(s, &source, shift, 0, frame_count);
                    s.frame_count = frame_count;
                }
            }
        });
    }

    pub(crate) fn reset_empty(&self, delay: f64, attack: usize) {
        self.write(|s| {
            s.delay = delay.clamp(0.0, 1.0);
            s.attack = attack;
            s.resize(0);
            s.frame_count = 0;
            s.first_frame = 0;
            s.last_frame = 0;
        });
    }
}

/// Copies `len` frames of `source`'s looped stream, read from `read_start`,
/// into `dst` from frame `dst_start`.
fn fill_looped(
    dst: &mut InstanceState,
    source: &InstanceState,
    dst_start: usize,
    read_start: usize,
    len: usize,
) {
    let plan = resonar_core::segment::looped_segments(
        dst_start,
        read_start,
        len,
        dst.format.buffer_size,
        source.format.buffer_size,
        source.capacity(),
        source.loop_start,
        source.loop_end,
    );
    for step in plan {
        let Some(src) = step.src else { continue };
        if let Some(buffer) = dst.buffers.get_mut(step.dst.block) {
            buffer.copy_from(
                step.dst.offset,
                &source.buffers[src.block],
                src.offset,
                step.len,
            );
        }
    }
}

impl PartialEq for SignalInstance {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for SignalInstance {}

impl fmt::Debug for SignalInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.lock();
        match guard.try_borrow() {
            Ok(state) => f
                .debug_struct("SignalInstance")
                .field("id", &self.shared.id)
                .field("role", &state.role)
                .field("format", &state.format)
                .field("length", &state.buffers.len())
                .field("frame_count", &state.frame_count)
                .finish(),
            Err(_) => f
                .debug_struct("SignalInstance")
                .field("id", &self.shared.id)
                .finish_non_exhaustive(),
        }
    }
}

/// First instance carrying the template role.
pub fn find_template(instances: &[SignalInstance]) -> Option<SignalInstance> {
    instances.iter().find(|i| i.is_template()).cloned()
}

/// Every runtime template, in order.
pub fn find_runtime_templates(instances: &[SignalInstance]) -> Vec<SignalInstance> {
    instances
        .iter()
        .filter(|i| i.is_runtime_template())
        .cloned()
        .collect()
}

/// Playback instance bound to `scope`.
pub fn find_by_scope(instances: &[SignalInstance], scope: Scope) -> Option<SignalInstance> {
    instances
        .iter()
        .find(|i| i.scope() == Some(scope))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::SoundScope;

    fn format(bs: usize) -> AudioFormat {
        AudioFormat::new(48000, bs, SampleFormat::Float)
    }

    fn ramp(n: usize) -> Vec<f32> {
        (0..n).map(|i| i as f32 / n as f32).collect()
    }

    #[test]
    fn test_set_samples_layout() {
        let t = SignalInstance::template(format(4));
        t.set_samples(&ramp(10));
        assert_eq!(t.length(), 3);
        assert_eq!(t.frame_count(), 10);
        assert_eq!(t.last_frame(), 2);
        assert_eq!(&t.to_vec()[..10], ramp(10).as_slice());
    }

    #[test]
    fn test_stream_resize_and_safe_resize() {
        let i = SignalInstance::playback(Scope::new(SoundScope::Playback), format(8));
        i.stream_resize(4);
        assert_eq!(i.length(), 4);
        i.set_current(2);
        i.safe_resize(1);
        assert_eq!(i.length(), 3, "safe resize keeps the current buffer");
        i.stream_resize(1);
        assert_eq!(i.length(), 1);
        assert_eq!(i.current(), 0);
    }

    #[test]
    fn test_advance_and_length_till_current() {
        let i = SignalInstance::template(format(16));
        i.stream_resize(2);
        assert!(i.advance());
        assert!(!i.advance());
        assert_eq!(i.length_till_current(), 16);
    }

    #[test]
    fn test_duplicate_stream_reblocks() {
        let t = SignalInstance::template(format(4));
        t.set_samples(&ramp(8));
        let i = SignalInstance::playback(Scope::new(SoundScope::Playback), format(3));
        i.duplicate_stream(&t);
        assert_eq!(i.length(), 3);
        assert_eq!(&i.to_vec()[..8], ramp(8).as_slice());
    }

    #[test]
    fn test_feed_loops() {
        let t = SignalInstance::template(format(4));
        t.set_samples(&[1.0, 2.0, 3.0, 4.0]);
        t.set_loop(1, 3);
        let i = SignalInstance::playback(Scope::new(SoundScope::Playback), format(4));
        i.feed(&t, 3);
        i.feed(&t, 4);
        assert_eq!(i.frame_count(), 7);
        assert_eq!(&i.to_vec()[..7], &[1.0, 2.0, 3.0, 2.0, 3.0, 2.0, 3.0]);
        assert_eq!(i.last_frame(), 3);
    }

    #[test]
    fn test_set_buffer_size_keeps_stream() {
        let i = SignalInstance::template(format(4));
        i.set_samples(&ramp(10));
        i.set_buffer_size(3);
        assert_eq!(i.buffer_size(), 3);
        assert_eq!(i.length(), 4);
        assert_eq!(&i.to_vec()[..10], ramp(10).as_slice());
        assert_eq!(i.last_frame(), 1);
    }

    #[test]
    fn test_set_samplerate_rescales_markers() {
        let i = SignalInstance::template(format(64));
        i.set_samples(&ramp(100));
        i.set_loop(10, 50);
        i.set_samplerate(96000);
        assert_eq!(i.samplerate(), 96000);
        assert_eq!(i.frame_count(), 200);
        assert_eq!(i.loop_start(), 20);
        assert_eq!(i.loop_end(), 100);
        let data = i.to_vec();
        assert!((data[20] - ramp(100)[10]).abs() < 1e-6);
    }

    #[test]
    fn test_set_format_converts() {
        let i = SignalInstance::template(format(4));
        i.set_samples(&[0.5, -0.5]);
        i.set_format(SampleFormat::S16);
        assert_eq!(i.format(), SampleFormat::S16);
        assert!((i.to_vec()[0] - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_mix_and_read_frames_cross_buffers() {
        let i = SignalInstance::playback(Scope::new(SoundScope::Playback), format(4));
        i.stream_resize(3);
        assert_eq!(i.mix_frames(3, &[1.0; 6]), 6);
        assert_eq!(i.mix_frames(10, &[1.0; 6]), 2);
        let mut out = [0.0; 5];
        i.read_frames(2, &mut out);
        assert_eq!(out, [0.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_notes() {
        let i = SignalInstance::playback(Scope::new(SoundScope::Notation), format(4));
        let note = Note::new(0, 4, 60);
        assert!(!i.is_active());
        i.add_note(note);
        i.add_note(note);
        assert_eq!(i.notes().len(), 1);
        assert!(i.is_active());
        assert!(i.remove_note(note.id));
        assert!(!i.remove_note(note.id));
    }

    #[test]
    fn test_derive_from_sets_back_reference() {
        let t = SignalInstance::template(format(4));
        t.set_samples(&ramp(8));
        let rt = SignalInstance::runtime_template(format(4));
        rt.derive_from(&t, AudioFormat::new(48000, 2, SampleFormat::S32));
        assert!(rt.derives_from(&t));
        assert_eq!(rt.rt_template(), Some(t.clone()));
        assert_eq!(rt.buffer_size(), 2);
        assert_eq!(rt.format(), SampleFormat::S32);
        assert_eq!(rt.length(), 4);
        drop(t);
        assert!(rt.rt_template().is_none());
    }

    #[test]
    fn test_find_helpers() {
        let scope = Scope::new(SoundScope::Wave);
        let list = vec![
            SignalInstance::runtime_template(format(4)),
            SignalInstance::template(format(4)),
            SignalInstance::playback(scope, format(4)),
        ];
        assert!(find_template(&list).is_some_and(|t| t.ptr_eq(&list[1])));
        assert_eq!(find_runtime_templates(&list).len(), 1);
        assert!(find_by_scope(&list, scope).is_some_and(|p| p.ptr_eq(&list[2])));
        assert!(find_by_scope(&list, Scope::new(SoundScope::Wave)).is_none());
    }

    #[test]
    fn test_reentrant_access_from_callback() {
        let i = SignalInstance::template(format(4));
        i.stream_resize(1);
        let inner = i.clone();
        let length = i.with_buffer(0, |_| inner.length());
        assert_eq!(length, Some(1));
    }

    #[test]
    fn test_reentrant_access_from_mut_callback() {
        let i = SignalInstance::template(format(4));
        i.stream_resize(2);
        let inner = i.clone();
        let length = i.with_buffer_mut(1, |b| {
            b.set(0, 0.5);
            inner.set_current(1);
            assert_eq!(inner.current(), 1);
            inner.length()
        });
        assert_eq!(length, Some(2));
        let kept = i.with_buffer(1, |b| b.get(0));
        assert!(kept.is_some_and(|v| (v - 0.5).abs() < 1e-3));
    }

    #[test]
    fn test_buffer_callback_survives_shrink() {
        let i = SignalInstance::template(format(4));
        i.stream_resize(2);
        let inner = i.clone();
        let done = i.with_buffer_mut(1, |b| {
            b.set(0, 0.5);
            inner.stream_resize(1);
        });
        assert_eq!(done, Some(()));
        assert_eq!(i.length(), 1);
        assert_eq!(i.with_buffer(1, |b| b.len()), None);
    }
}
