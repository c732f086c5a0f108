//! Access control in front of the package sync cache
//!
//! - **CallLimiter**: fixed-window per-key call counter
//! - **StatusCache**: cached account verification outcomes, invalidated when
//!   a request presents a different uuid than the one verified
//! - **KeyCache**: access keys already issued to a launcher identity
//! - **AccessController**: owns all of the above plus the wall-clock
//!   schedule on which the caches are flushed
//!
//! Nothing here returns an error of its own. A key that has never been
//! seen is a first sighting, and a poisoned lock is recovered rather than
//! propagated.

mod controller;
mod keys;
mod limiter;
mod shard;
mod status;

pub use controller::AccessController;
pub use keys::{KeyCache, KeyRequest, generate_access_key};
pub use limiter::CallLimiter;
pub use status::{AccountStatus, AccountVerifier, StatusCache, Verification};
