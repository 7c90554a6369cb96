//! # Communication layer for fieldnav
//!
//! - **HaltSignal / CancelToken**: single-writer atomic flags
//! - **Link**: bounded SPSC point-to-point channel, never blocks the producer
//!
//! ```rust
//! use fieldnav_core::communication::{HaltSignal, Link};
//!
//! let halt = HaltSignal::new();
//! let reader = halt.clone();
//! halt.raise();
//! assert!(reader.is_raised());
//!
//! let (tx, rx) = Link::<String>::pair("log", 16);
//! tx.send("hello".to_string(), None).unwrap();
//! assert_eq!(rx.recv(None).as_deref(), Some("hello"));
//! ```

pub mod link;
pub mod signal;
pub mod traits;

pub use link::{Link, LinkRole};
pub use signal::{CancelToken, HaltSignal};
pub use traits::{Publisher, Subscriber};
