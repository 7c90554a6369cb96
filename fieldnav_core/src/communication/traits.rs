//! Common traits for message passing in fieldnav
//!
//! Nodes and sinks are written against these so an in-process link can be
//! swapped for another transport without touching the control code.

use crate::core::node::LogSummary;
use crate::error::{NavError, NavResult};
use std::fmt::Debug;

use super::link::Link;

/// Common trait for publisher/sender implementations
pub trait Publisher<T>: Send + Debug {
    /// Send a message - returns Ok on success, Err on failure
    fn publish(&self, msg: T) -> NavResult<()>;

    /// Try to send without blocking
    fn try_publish(&self, msg: T) -> bool {
        self.publish(msg).is_ok()
    }
}

/// Common trait for subscriber/receiver implementations
pub trait Subscriber<T>: Send + Debug {
    /// Receive a message without blocking
    fn poll(&self) -> Option<T>;

    /// Check if messages are available
    fn has_messages(&self) -> bool {
        false
    }
}

impl<T> Publisher<T> for Link<T>
where
    T: LogSummary + Send + Debug,
{
    fn publish(&self, msg: T) -> NavResult<()> {
        self.send(msg, None)
            .map_err(|_| NavError::Internal(format!("Link '{}' full or closed", self.topic())))
    }
}

impl<T> Subscriber<T> for Link<T>
where
    T: LogSummary + Send + Debug,
{
    fn poll(&self) -> Option<T> {
        self.recv(None)
    }

    fn has_messages(&self) -> bool {
        Link::has_messages(self)
    }
}
