//! Resonar Signal - the signal container tree
//!
//! Every audio channel owns a [`Container`]. A container holds the
//! [`SignalInstance`]s rendered for that channel:
//!
//! - exactly one template carrying the prototype waveform
//! - runtime templates, format-specialized copies of the template
//! - playback instances, one per render [`Scope`]
//!
//! Instances store audio as an ordered sequence of fixed-size [`Buffer`]s
//! encoded in one [`SampleFormat`]. Frame markers (`first_frame`,
//! `last_frame`, loop region, `frame_count`) place that data in musical
//! time.
//!
//! # Concurrency
//!
//! Containers and instances are cheap shared handles. Every mutating
//! operation takes the node's re-entrant lock, so a render callback holding
//! a container can call back into it. Locks are taken container first, then
//! instance, and a template before anything derived from it.
//!
//! # Example
//!
//! ```rust
//! use resonar_signal::{AudioFormat, Container, SampleFormat, Scope, SoundScope};
//!
//! let container = Container::new(AudioFormat::new(44100, 256, SampleFormat::S16));
//! container.template().unwrap().set_samples(&[0.25; 600]);
//!
//! let scope = Scope::new(SoundScope::Playback);
//! let voice = container.playback_instance(scope);
//! container.create_instance_with_frame_count(&voice, 1000, 0.0, 0).unwrap();
//! container.add_instance(&voice).unwrap();
//!
//! assert_eq!(voice.frame_count(), 1000);
//! assert_eq!(voice.length(), 4);
//! ```

pub mod buffer;
pub mod channel;
pub mod container;
pub mod error;
pub mod format;
pub mod instance;
pub mod note;
pub mod scope;
pub mod soundcard;

pub use buffer::Buffer;
pub use channel::{AudioChannel, Channel};
pub use container::Container;
pub use error::SignalError;
pub use format::{AudioFormat, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLERATE, SampleFormat};
pub use instance::{Role, SignalInstance, find_by_scope, find_runtime_templates, find_template};
pub use note::Note;
pub use scope::{Scope, SoundScope};
pub use soundcard::{DeviceInfo, Soundcard};
