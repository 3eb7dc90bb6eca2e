// Adapters layer: concrete implementations of the domain ports (transport, converters).

pub mod converter;
pub mod http;
