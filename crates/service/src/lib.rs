//! fundrouter service
//!
//! Orchestrates the assembled provider set: best-quote fan-out, dispatch by
//! provider name, and the balance diagnostics behind "no quotes" answers.

mod manager;

pub use manager::{ChainBalanceLine, ManagerError, SwapManager};
