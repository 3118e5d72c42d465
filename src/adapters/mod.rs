// Adapters layer: concrete implementations for the payment network (http transport, instruction templates).

pub mod http;
pub mod network;

pub use http::PaymanClient;
pub use network::AgentPaymentNetwork;
