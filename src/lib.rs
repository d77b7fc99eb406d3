pub mod batch;
pub mod error;
pub mod fixed;
pub mod modem;
pub mod ui;
pub mod utils;

pub use error::{LinkError, LinkResult};
