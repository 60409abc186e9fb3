//! Device access and availability tracking

pub mod availability;
pub mod device;

pub use availability::{AvailabilityState, Transition};
pub use device::{DeviceFetcher, Endpoint};
