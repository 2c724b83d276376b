//! Realtime push channel.
//!
//! ```text
//! Disconnected -> Connecting -> Connected{ack: false} -> Connected{ack: true}
//!       ^                              |                        |
//!       +------------ disconnect / connect_error / drop --------+
//! ```
//!
//! Every fresh `Connected` from the transport re-runs the handshake, since
//! acknowledgement does not survive a reconnect.

mod channel;
pub mod messages;

pub use channel::{ChannelState, RealtimeChannel};
pub use messages::{handshake_payload, ServerEvent};
