pub mod buffer_converter;
pub mod negotiation;
