//! Streaming tool-call interception.

pub mod interceptor;

pub use interceptor::{
    BraceCounter, DiscardReason, InterceptEvent, Interceptor, Mode, StreamState, DEFAULT_SENTINEL,
};
