pub mod http;
pub mod shield_client;

pub use http::HttpTransport;
pub use shield_client::ShieldClient;
