//! Timing-control and state-diffing primitives for UI state layers.
//!
//! - [`Debounce`], [`Throttle`], [`DelayedInvoke`], [`Timeout`] and [`Interval`] coalesce and delay calls.
//!   Each owns at most one pending [`Timer`] in the thread's [`Runtime`].
//! - [`state_changed`] computes the changed entries between two [`Record`] snapshots.
//!
//! ```
//! use std::{cell::Cell, rc::Rc, time::Duration};
//! use pacer::{Debounce, Runtime};
//!
//! let mut rt = Runtime::with_manual_clock();
//! let saved = Rc::new(Cell::new(0));
//! let s = saved.clone();
//! let save = Debounce::new(move |n: i32| s.set(n), Duration::from_millis(100));
//! save.call(1);
//! save.call(2);
//! rt.advance(Duration::from_millis(100)).unwrap();
//! assert_eq!(saved.get(), 2);
//! ```
mod config;
mod core;
mod debounce;
mod delay;
mod delayed_invoke;
mod diff;
mod error;
mod interval;
mod latest;
mod throttle;
mod timeout;
mod value;

pub use config::*;
pub use crate::core::{ClockKind, Runtime, Timer};
pub use debounce::*;
pub use delay::*;
pub use delayed_invoke::*;
pub use diff::*;
pub use error::*;
pub use interval::*;
pub use latest::*;
pub use throttle::*;
pub use timeout::*;
pub use value::{record_from_json, Record, Value, ValueKind};
