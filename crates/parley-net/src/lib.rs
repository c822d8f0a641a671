// Connection layer of the Parley client: one WebSocket to the chat backend,
// driven by a synchronous state machine with reconnect backoff.

pub mod backoff;
pub mod bus;
pub mod connection;
pub mod memory;
pub mod scheduler;
pub mod transport;
pub mod websocket;
pub mod ws;

pub use backoff::ReconnectPolicy;
pub use bus::{EventBus, Subscription, SubscriptionId};
pub use connection::{ConnectionEvent, ConnectionManager, ConnectionState};
pub use memory::MemoryTransport;
pub use scheduler::{ManualScheduler, RetryToken, Scheduler, TokioScheduler};
pub use transport::{ConnectRequest, Transport, TransportError, TransportEvent, TransportEventKind};
pub use websocket::WsTransport;
