// =============================================================================
// Live price stream
// =============================================================================

pub mod manager;
pub mod protocol;
pub mod transport;

pub use manager::{backoff_delay, PriceCallback, StreamConfig, StreamSubscriptionManager, Subscription};
pub use protocol::{parse_inbound, ControlMessage, PriceUpdate};
pub use transport::{Transport, TransportEvent, TransportHandle, WebSocketTransport};
