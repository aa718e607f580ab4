pub mod clock;
pub mod errors;
pub mod json_ext; // Lenient lookups over untyped report payloads

pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{Result, RiskError};
pub use json_ext::ValueExt;
