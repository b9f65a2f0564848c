//! Per-identity admission control for quota-limited Google APIs
//!
//! A fixed window re-anchored at the first request after the previous window
//! lapsed. Bursts straddling a window boundary can admit up to twice the
//! ceiling within one window length; that approximation is accepted. A
//! sliding-window or token-bucket limiter could replace it behind the same
//! `admit` call if stricter guarantees are needed.

pub mod window;

pub use window::{RateLimiter, WindowState};
