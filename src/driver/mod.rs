pub mod controller;
mod loop_worker;

pub use controller::DriverHandle;
pub use loop_worker::{event_loop, timer_loop, Clock, SystemClock};
