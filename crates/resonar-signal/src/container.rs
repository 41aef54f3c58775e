//! Signal containers: nodes of the signal tree.
//!
//! A [`Container`] owns the signal instances of one audio-routing point. It
//! keeps the format descriptor every new instance inherits, propagates
//! format changes to its template and runtime templates, and links to its
//! parent and siblings.
//!
//! # Ownership
//!
//! Containers are shared handles. The sibling list holds strong `next` and
//! weak `prev` links, the parent link is weak, and the owning channel is
//! referenced weakly, so no cycle keeps a dropped tree alive.
//!
//! # Locking
//!
//! State sits behind a re-entrant mutex. Acquisition order is container,
//! then instance; a derived instance is locked after its template. Tree walks
//! lock one container at a time and release it before moving on.

use std::cell::RefCell;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use uuid::Uuid;

use crate::channel::AudioChannel;
use crate::error::SignalError;
use crate::format::{AudioFormat, SampleFormat};
use crate::instance::{Role, SignalInstance, find_by_scope, find_runtime_templates, find_template};
use crate::scope::Scope;
use crate::soundcard::Soundcard;

pub(crate) struct ContainerShared {
    id: Uuid,
    state: ReentrantMutex<RefCell<ContainerState>>,
}

struct ContainerState {
    channel: Option<Weak<dyn AudioChannel>>,
    output_device: Option<Arc<dyn Soundcard>>,
    input_device: Option<Arc<dyn Soundcard>>,
    format: AudioFormat,
    parent: Weak<ContainerShared>,
    next: Option<Container>,
    prev: Weak<ContainerShared>,
    instances: Vec<SignalInstance>,
}

/// Shared handle to one node of the signal tree.
///
/// # Example
///
/// ```rust
/// use resonar_signal::{AudioFormat, Container, SampleFormat, Scope, SoundScope, SignalInstance};
///
/// let container = Container::new(AudioFormat::new(48000, 256, SampleFormat::Float));
/// let template = container.template().expect("new containers carry a template");
/// template.set_samples(&vec![0.5; 1024]);
///
/// let scope = Scope::new(SoundScope::Playback);
/// let instance = container.playback_instance(scope);
/// container.create_instance_with_defaults(&instance, 0.5, 10).unwrap();
/// container.add_instance(&instance).unwrap();
///
/// assert_eq!(instance.length(), template.length());
/// assert!(container.find_by_scope(scope).is_some());
/// ```
#[derive(Clone)]
pub struct Container {
    shared: Arc<ContainerShared>,
}

impl Container {
    /// Creates a container with an empty template in `format`.
    pub fn new(format: AudioFormat) -> Self {
        let container = Self::bare(format);
        let template = SignalInstance::template(format);
        container.write(|s| s.instances.push(template.clone()));
        template.attach(container.downgrade());
        container
    }

    /// Creates a container without any instance.
    pub fn bare(format: AudioFormat) -> Self {
        Self {
            shared: Arc::new(ContainerShared {
                id: Uuid::new_v4(),
                state: ReentrantMutex::new(RefCell::new(ContainerState {
                    channel: None,
                    output_device: None,
                    input_device: None,
                    format,
                    parent: Weak::new(),
                    next: None,
                    prev: Weak::new(),
                    instances: Vec::new(),
                })),
            }),
        }
    }

    /// Creates the container of `channel` connected to `output`. The format
    /// is taken from the device.
    pub fn connect(channel: &Arc<dyn AudioChannel>, output: Arc<dyn Soundcard>) -> Self {
        let container = Self::new(output.audio_format());
        container.write(|s| s.channel = Some(Arc::downgrade(channel)));
        container.set_output_device(Some(output));
        tracing::debug!(
            container = %container.id(),
            line = channel.line(),
            "container connected"
        );
        container
    }

    /// Releases every instance and drops the device references.
    pub fn disconnect(&self) {
        let released = self.write(|s| {
            s.output_device = None;
            s.input_device = None;
            s.channel = None;
            std::mem::take(&mut s.instances)
        });
        for instance in &released {
            instance.detach();
        }
        tracing::debug!(container = %self.id(), released = released.len(), "container disconnected");
    }

    pub(crate) fn from_shared(shared: Arc<ContainerShared>) -> Self {
        Self { shared }
    }

    fn downgrade(&self) -> Weak<ContainerShared> {
        Arc::downgrade(&self.shared)
    }

    fn lock(&self) -> ReentrantMutexGuard<'_, RefCell<ContainerState>> {
        self.shared.state.lock()
    }

    fn read<R>(&self, f: impl FnOnce(&ContainerState) -> R) -> R {
        let guard = self.lock();
        let state = guard.borrow();
        f(&state)
    }

    fn write<R>(&self, f: impl FnOnce(&mut ContainerState) -> R) -> R {
        let guard = self.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    /// Identity.
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Whether both handles refer to the same container.
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Owning channel, while it is alive.
    pub fn channel(&self) -> Option<Arc<dyn AudioChannel>> {
        self.read(|s| s.channel.as_ref().and_then(Weak::upgrade))
    }

    /// Sets the owning channel.
    pub fn set_channel(&self, channel: &Arc<dyn AudioChannel>) {
        self.write(|s| s.channel = Some(Arc::downgrade(channel)));
    }

    /// Format descriptor.
    pub fn audio_format(&self) -> AudioFormat {
        self.read(|s| s.format)
    }

    /// Snapshot of the owned instances.
    pub fn instances(&self) -> Vec<SignalInstance> {
        self.read(|s| s.instances.clone())
    }

    /// The template, if any.
    pub fn template(&self) -> Option<SignalInstance> {
        self.read(|s| find_template(&s.instances))
    }

    /// Every runtime template.
    pub fn runtime_templates(&self) -> Vec<SignalInstance> {
        self.read(|s| find_runtime_templates(&s.instances))
    }

    /// Playback instance rendering `scope`.
    pub fn find_by_scope(&self, scope: Scope) -> Option<SignalInstance> {
        self.read(|s| find_by_scope(&s.instances, scope))
    }

    /// Whether `scope` has a playback instance with attached notes.
    pub fn is_active(&self, scope: Scope) -> bool {
        self.find_by_scope(scope)
            .is_some_and(|instance| instance.is_active())
    }

    /// Creates an empty playback instance for `scope` carrying this
    /// container's format and devices. The instance is not added.
    pub fn playback_instance(&self, scope: Scope) -> SignalInstance {
        let (format, output, input) =
            self.read(|s| (s.format, s.output_device.clone(), s.input_device.clone()));
        let instance = SignalInstance::playback(scope, format);
        instance.set_output_device(output);
        instance.set_input_device(input);
        instance
    }

    /// Inserts `instance`.
    ///
    /// Returns `Ok(false)` without changes if it is already present. A new
    /// template replaces the current one in one step: the old template is
    /// detached first, and every runtime template derived from it is rebuilt
    /// against the new one.
    pub fn add_instance(&self, instance: &SignalInstance) -> Result<bool, SignalError> {
        let _guard = self.lock();

        if self.read(|s| s.instances.iter().any(|i| i.ptr_eq(instance))) {
            return Ok(false);
        }
        if let Some(owner) = instance.container()
            && !owner.ptr_eq(self)
        {
            return Err(SignalError::ForeignInstance {
                instance: instance.id(),
            });
        }

        match instance.role() {
            Role::Template => {
                let old = self.write(|s| {
                    let position = s.instances.iter().position(SignalInstance::is_template);
                    position.map(|p| s.instances.remove(p))
                });
                self.write(|s| s.instances.insert(0, instance.clone()));
                instance.attach(self.downgrade());

                if let Some(old) = old {
                    old.detach();
                    let stale: Vec<SignalInstance> = self
                        .runtime_templates()
                        .into_iter()
                        .filter(|rt| rt.derives_from(&old))
                        .collect();
                    for rt in &stale {
                        let format = rt.audio_format();
                        rt.derive_from(instance, format);
                    }
                    tracing::debug!(
                        container = %self.id(),
                        old = %old.id(),
                        new = %instance.id(),
                        rebuilt = stale.len(),
                        "template replaced"
                    );
                }
            }
            Role::Playback(scope) => {
                if self.find_by_scope(scope).is_some() {
                    return Err(SignalError::scope_occupied(self.id(), scope));
                }
                self.write(|s| s.instances.insert(0, instance.clone()));
                instance.attach(self.downgrade());
            }
            Role::RuntimeTemplate => {
                self.write(|s| s.instances.insert(0, instance.clone()));
                instance.attach(self.downgrade());
            }
        }
        Ok(true)
    }

    /// Detaches `instance`. Returns whether it was present.
    pub fn remove_instance(&self, instance: &SignalInstance) -> bool {
        let _guard = self.lock();
        let removed = self.write(|s| {
            let position = s.instances.iter().position(|i| i.ptr_eq(instance));
            position.map(|p| s.instances.remove(p))
        });
        match removed {
            Some(removed) => {
                removed.detach();
                true
            }
            None => false,
        }
    }

    /// Detaches and returns every playback instance of `scope`.
    pub fn remove_scope(&self, scope: Scope) -> Vec<SignalInstance> {
        let _guard = self.lock();
        let removed: Vec<SignalInstance> = self.write(|s| {
            let (gone, kept) = std::mem::take(&mut s.instances)
                .into_iter()
                .partition(|i| i.scope() == Some(scope));
            s.instances = kept;
            gone
        });
        for instance in &removed {
            instance.detach();
        }
        removed
    }

    /// Output device.
    pub fn output_device(&self) -> Option<Arc<dyn Soundcard>> {
        self.read(|s| s.output_device.clone())
    }

    /// Input device.
    pub fn input_device(&self) -> Option<Arc<dyn Soundcard>> {
        self.read(|s| s.input_device.clone())
    }

    /// Replaces the output device and hands it to every playback instance.
    pub fn set_output_device(&self, device: Option<Arc<dyn Soundcard>>) {
        let _guard = self.lock();
        let playback = self.write(|s| {
            s.output_device.clone_from(&device);
            playback_instances(&s.instances)
        });
        for instance in playback {
            instance.set_output_device(device.clone());
        }
    }

    /// Replaces the input device and hands it to every playback instance.
    pub fn set_input_device(&self, device: Option<Arc<dyn Soundcard>>) {
        let _guard = self.lock();
        let playback = self.write(|s| {
            s.input_device.clone_from(&device);
            playback_instances(&s.instances)
        });
        for instance in playback {
            instance.set_input_device(device.clone());
        }
    }

    fn update_templates(&self, update: impl Fn(&SignalInstance), describe: impl FnOnce(&mut AudioFormat)) {
        let _guard = self.lock();
        let targets = self.write(|s| {
            describe(&mut s.format);
            s.instances
                .iter()
                .filter(|i| !matches!(i.role(), Role::Playback(_)))
                .cloned()
                .collect::<Vec<_>>()
        });
        // template first, so runtime templates are locked after it
        for instance in targets.iter().filter(|i| i.is_template()) {
            update(instance);
        }
        for instance in targets.iter().filter(|i| i.is_runtime_template()) {
            update(instance);
        }
    }

    /// Changes the sample rate of the container, its template and its
    /// runtime templates. Playback instances keep their rate.
    pub fn set_samplerate(&self, samplerate: u32) {
        self.update_templates(
            |i| i.set_samplerate(samplerate),
            |f| f.samplerate = samplerate,
        );
        tracing::debug!(container = %self.id(), samplerate, "samplerate changed");
    }

    /// Changes the buffer size of the container, its template and its
    /// runtime templates. Playback instances keep their size.
    pub fn set_buffer_size(&self, buffer_size: usize) {
        let buffer_size = buffer_size.max(1);
        self.update_templates(
            |i| i.set_buffer_size(buffer_size),
            |f| f.buffer_size = buffer_size,
        );
        tracing::debug!(container = %self.id(), buffer_size, "buffer size changed");
    }

    /// Changes the encoding of the container, its template and its runtime
    /// templates. Playback instances keep their encoding.
    pub fn set_format(&self, format: SampleFormat) {
        self.update_templates(|i| i.set_format(format), |f| f.format = format);
        tracing::debug!(container = %self.id(), %format, "format changed");
    }

    /// Applies all three format fields.
    pub fn set_audio_format(&self, format: AudioFormat) {
        self.update_templates(|i| i.set_audio_format(format), |f| *f = format);
    }

    /// Builds a runtime template of the current template in `format` and
    /// adds it.
    pub fn create_runtime_template(&self, format: AudioFormat) -> Result<SignalInstance, SignalError> {
        let _guard = self.lock();
        let Some(template) = self.template() else {
            return Err(SignalError::missing_template(self.id()));
        };
        let runtime = SignalInstance::runtime_template(format);
        runtime.derive_from(&template, format);
        self.add_instance(&runtime)?;
        tracing::debug!(
            container = %self.id(),
            template = %template.id(),
            samplerate = format.samplerate,
            buffer_size = format.buffer_size,
            "runtime template created"
        );
        Ok(runtime)
    }

    /// Lays out `instance` after the template.
    ///
    /// The buffer sequence gets the template's length and data; `last_frame`,
    /// `loop_start` and `loop_end` are shifted by `delay * buffer_size +
    /// attack` modulo the buffer size.
    ///
    /// Without a template the instance is left empty (not yet playable) and
    /// [`SignalError::MissingTemplate`] is returned.
    pub fn create_instance_with_defaults(
        &self,
        instance: &SignalInstance,
        delay: f64,
        attack: usize,
    ) -> Result<(), SignalError> {
        self.derive(instance, None, delay, attack)
    }

    /// Lays out `instance` to hold exactly `frame_count` frames starting at
    /// `delay * buffer_size + attack`, looping the template's loop region
    /// until the count is filled.
    ///
    /// Without a loop the template plays once and the rest stays silent.
    /// Without a template the instance is left empty and
    /// [`SignalError::MissingTemplate`] is returned.
    pub fn create_instance_with_frame_count(
        &self,
        instance: &SignalInstance,
        frame_count: usize,
        delay: f64,
        attack: usize,
    ) -> Result<(), SignalError> {
        self.derive(instance, Some(frame_count), delay, attack)
    }

    fn derive(
        &self,
        instance: &SignalInstance,
        frame_count: Option<usize>,
        delay: f64,
        attack: usize,
    ) -> Result<(), SignalError> {
        let _guard = self.lock();
        let Some(template) = self.template() else {
            instance.reset_empty(delay, attack);
            tracing::warn!(container = %self.id(), "derivation without template");
            return Err(SignalError::missing_template(self.id()));
        };

        instance.derive_layout(&template, frame_count, delay, attack);
        let (output, input) = self.read(|s| (s.output_device.clone(), s.input_device.clone()));
        instance.set_output_device(output);
        instance.set_input_device(input);
        Ok(())
    }

    /// Next sibling.
    pub fn next(&self) -> Option<Container> {
        self.read(|s| s.next.clone())
    }

    /// Previous sibling.
    pub fn prev(&self) -> Option<Container> {
        self.read(|s| s.prev.upgrade()).map(Container::from_shared)
    }

    /// Parent container.
    pub fn parent(&self) -> Option<Container> {
        self.read(|s| s.parent.upgrade()).map(Container::from_shared)
    }

    /// Sets the parent.
    pub fn set_parent(&self, parent: Option<&Container>) {
        let weak = parent.map_or_else(Weak::new, Container::downgrade);
        self.write(|s| s.parent = weak);
    }

    /// Links `next` directly after this container, splicing it in front of
    /// the current successor.
    pub fn link_after(&self, next: &Container) {
        let old_next = self.write(|s| s.next.replace(next.clone()));
        let self_weak = self.downgrade();
        next.write(|s| {
            s.prev = self_weak;
            s.next.clone_from(&old_next);
        });
        if let Some(old_next) = old_next {
            let next_weak = next.downgrade();
            old_next.write(|s| s.prev = next_weak);
        }
    }

    /// Removes this container from its sibling list.
    pub fn unlink(&self) {
        let (prev, next) = self.write(|s| (s.prev.upgrade().map(Container::from_shared), s.next.take()));
        self.write(|s| s.prev = Weak::new());
        if let Some(next) = &next {
            let prev_weak = prev.as_ref().map_or_else(Weak::new, Container::downgrade);
            next.write(|s| s.prev = prev_weak);
        }
        if let Some(prev) = prev {
            prev.write(|s| s.next = next);
        }
    }

    /// First container in `[start, end)` whose channel differs from
    /// `prev_channel`. Containers without a live channel never match.
    pub fn find_next_channel(
        start: &Container,
        end: Option<&Container>,
        prev_channel: Option<&Arc<dyn AudioChannel>>,
    ) -> Option<Container> {
        let mut current = Some(start.clone());
        while let Some(container) = current {
            if end.is_some_and(|end| end.ptr_eq(&container)) {
                return None;
            }
            if let Some(channel) = container.channel() {
                let same = prev_channel.is_some_and(|prev| Arc::ptr_eq(prev, &channel));
                if !same {
                    return Some(container);
                }
            }
            current = container.next();
        }
        None
    }

    /// Zero-based index of `target` in `[start, end)`.
    pub fn position(start: &Container, end: Option<&Container>, target: &Container) -> Option<usize> {
        let mut current = Some(start.clone());
        let mut index = 0;
        while let Some(container) = current {
            if end.is_some_and(|end| end.ptr_eq(&container)) {
                return None;
            }
            if container.ptr_eq(target) {
                return Some(index);
            }
            index += 1;
            current = container.next();
        }
        None
    }
}

fn playback_instances(instances: &[SignalInstance]) -> Vec<SignalInstance> {
    instances
        .iter()
        .filter(|i| i.scope().is_some())
        .cloned()
        .collect()
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Container {}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.lock();
        match guard.try_borrow() {
            Ok(state) => f
                .debug_struct("Container")
                .field("id", &self.shared.id)
                .field("format", &state.format)
                .field("instances", &state.instances.len())
                .finish(),
            Err(_) => f
                .debug_struct("Container")
                .field("id", &self.shared.id)
                .finish_non_exhaustive(),
        }
    }
}
