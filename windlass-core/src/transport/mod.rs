//! Transport layer: session lifecycle and channel admission
//!
//! [`session::Session`] owns the authenticated connection; [`gate`] bounds
//! how many command channels may be open on it at once; [`classify`] turns
//! low-level network errors into readable text.

mod classify;
mod gate;
mod session;

pub use classify::describe_transport_error;
pub use gate::{CommandGate, DEFAULT_CHANNEL_LIMIT, GateError, GateTicket};
pub use session::{Session, TransportError, TransportResult};
