mod error;
mod in_flight;
mod manager;

pub use error::{ErrorKind, LifecycleError};
pub(crate) use in_flight::{InFlight, InFlightGuard};
pub use manager::{LifecycleManager, address_of};
