pub mod connection;
pub mod encoder;
pub mod sequencer;
pub mod tracker;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::*;
pub use encoder::*;
pub use sequencer::*;
pub use tracker::*;
pub use transport::*;
