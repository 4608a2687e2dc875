//! Typed - handler API for pending tasks.
//!
//! Payloads are stored as opaque JSON keyed by `task_type`; this module gives
//! handlers a typed view of them without the engine knowing any concrete
//! payload.
//!
//! - **surface (typed)**: `PendingPayload`, `PendingHandler<T>`
//! - **inside (dyn)**: `DynPendingHandler`, stored in `HandlerRegistry`

pub mod codec;
pub mod handler;
pub mod registry;
pub mod task;

pub use self::codec::PayloadCodec;
pub use self::handler::{DynPendingHandler, PendingHandler, PollContext, TypedPendingHandler};
pub use self::registry::HandlerRegistry;
pub use self::task::PendingPayload;
