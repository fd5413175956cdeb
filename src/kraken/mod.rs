pub mod rest;
pub mod websocket;

pub use rest::KrakenRestClient;
pub use websocket::run_trade_stream;
