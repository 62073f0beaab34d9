pub mod core;
pub(crate) mod endpoint;
pub mod transport;
