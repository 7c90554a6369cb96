use crate::core::node::{LogSummary, NodeInfo};
use crossbeam::channel::{self, Receiver, Sender, TryRecvError, TrySendError};

/// Link role - determines whether this end can send or receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    Producer,
    Consumer,
}

#[derive(Debug)]
enum Endpoint<T> {
    Tx(Sender<T>),
    Rx(Receiver<T>),
}

/// SPSC (Single Producer Single Consumer) bounded in-process link
///
/// Sending never blocks: a full link hands the message back so the producer
/// can drop it and keep its tick budget.
#[derive(Debug)]
pub struct Link<T> {
    topic_name: String,
    role: LinkRole,
    endpoint: Endpoint<T>,
}

impl<T> Link<T> {
    /// Create both ends of a link with the given capacity
    pub fn pair(topic_name: &str, capacity: usize) -> (Link<T>, Link<T>) {
        let (tx, rx) = channel::bounded(capacity.max(1));
        (
            Link {
                topic_name: topic_name.to_string(),
                role: LinkRole::Producer,
                endpoint: Endpoint::Tx(tx),
            },
            Link {
                topic_name: topic_name.to_string(),
                role: LinkRole::Consumer,
                endpoint: Endpoint::Rx(rx),
            },
        )
    }

    /// Non-blocking send; `Err(msg)` when the link is full, closed, or this is
    /// the consumer end
    pub fn send(&self, msg: T, ctx: Option<&mut NodeInfo>) -> Result<(), T>
    where
        T: LogSummary,
    {
        let Endpoint::Tx(tx) = &self.endpoint else {
            return Err(msg);
        };

        if let Some(ctx) = ctx {
            ctx.log_record(&self.topic_name, &msg);
        }

        match tx.try_send(msg) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(msg)) | Err(TrySendError::Disconnected(msg)) => Err(msg),
        }
    }

    /// Non-blocking receive
    pub fn recv(&self, ctx: Option<&mut NodeInfo>) -> Option<T>
    where
        T: LogSummary,
    {
        let Endpoint::Rx(rx) = &self.endpoint else {
            return None;
        };

        match rx.try_recv() {
            Ok(msg) => {
                if let Some(ctx) = ctx {
                    ctx.log_record(&self.topic_name, &msg);
                }
                Some(msg)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Drain everything currently buffered
    pub fn drain(&self) -> Vec<T> {
        match &self.endpoint {
            Endpoint::Rx(rx) => rx.try_iter().collect(),
            Endpoint::Tx(_) => Vec::new(),
        }
    }

    /// Check if link has messages available
    pub fn has_messages(&self) -> bool {
        match &self.endpoint {
            Endpoint::Rx(rx) => !rx.is_empty(),
            Endpoint::Tx(_) => false,
        }
    }

    /// Get the role of this Link end
    pub fn role(&self) -> LinkRole {
        self.role
    }

    pub fn topic(&self) -> &str {
        &self.topic_name
    }
}
