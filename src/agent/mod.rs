//! Client tracking agent.
//!
//! The browser agent ships as `assets/tracker.js`, embedded and served at
//! `/script.js`. [`tracker::Tracker`] follows the same session and
//! navigation rules for native clients.

pub mod script;
pub mod session;
pub mod tracker;
pub mod transport;

pub use session::{MemoryStorage, SessionManager, SessionState, SessionStorage};
pub use tracker::Tracker;
pub use transport::{HttpTransport, Transport};
