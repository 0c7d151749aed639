pub mod capture_delegate;
pub mod capture_provider;
pub mod message_sink;
pub mod sensor_node;
