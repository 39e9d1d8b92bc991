pub mod action;
pub mod config;
pub mod goal;
pub mod outcome;
pub mod pose;

pub use action::*;
pub use config::*;
pub use goal::*;
pub use outcome::*;
pub use pose::*;
