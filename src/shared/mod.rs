pub mod clock;
pub mod context;
pub mod types;
pub mod utills;

pub use clock::{Clock, SystemClock};
pub use context::{CancelSignal, OperationContext};
pub use types::*;
pub use utills::*;
