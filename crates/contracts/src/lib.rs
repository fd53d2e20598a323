//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - All timestamps are microseconds from a monotonic [`Clock`]
//! - Block-relative sample offsets are milliseconds (see the `codec` crate)
//!
//! ## Collaborators
//! - [`Storage`] / [`StorageFile`]: persistent medium (SD card, flash, local disk)
//! - [`Clock`]: monotonic microsecond source

mod blueprint;
mod clock;
mod error;
mod limits;
mod sample;
mod session;
mod storage;

pub use blueprint::*;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::*;
pub use limits::*;
pub use sample::*;
pub use session::*;
pub use storage::*;
