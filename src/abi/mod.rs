pub mod decoder;
pub mod registry;

#[cfg(test)]
pub mod test_logs;

pub use decoder::decode;
pub use registry::{EventKind, EventRegistry};
