pub mod messages;
pub mod registry;
pub mod broadcaster;
pub mod handler;

pub use messages::{ClientMessage, StockUpdateData, WsMessage};
pub use registry::{outbound_channel, ConnectionId, SubscriptionRegistry};
pub use broadcaster::{Broadcaster, DeliveryReport, DispatcherStats};
pub use handler::{apply_control_message, websocket_handler};
