//! Messaging between the capture coordinator and the decode worker
//!
//! Each actor owns a FIFO mailbox. Handles wrap the sending side so that
//! callbacks and background tasks can post without touching actor state.

pub mod messages;

pub use messages::{
    CoordinatorHandle, CoordinatorMessage, DecodeMessage, DecodeMode, DecodeWorkerHandle,
    SessionClosed,
};
