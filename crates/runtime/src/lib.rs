pub mod event_bus;
pub mod scheduler;
pub mod tick;

pub use event_bus::*;
pub use scheduler::*;
pub use tick::*;
