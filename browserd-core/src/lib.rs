//! Session multiplexer: turns one native browser into many isolated,
//! independently addressable sessions (input mapping, debug channel
//! management, command queueing, the session registry, and human
//! intervention coordination).

pub mod command_queue;
pub mod debug_channel;
pub mod error;
pub mod error_classifier;
pub mod input_mapper;
pub mod intervention;
pub mod registry;
pub mod session;
pub mod sink;

pub use command_queue::{CommandOutcome, CommandQueue, DelayMode, QueueConfig, WaitUntil};
pub use debug_channel::DebugChannel;
pub use error::{CoreError, Result};
pub use intervention::{CreateRequest, InterventionCoordinator, InterventionRecord, InterventionStatus, Resolution};
pub use registry::{Registry, RegistryConfig, SessionCreateOptions};
pub use session::{Session, SessionOptions, SessionState};
pub use sink::{EventSink, Frame, NullSink};
