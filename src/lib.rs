pub mod app;
pub mod dispatch;
pub mod error;
pub mod notify;

pub use error::SnoopError;
