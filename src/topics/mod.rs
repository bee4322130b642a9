//! # Topic storage primitives.
//!
//! - [`Registration`](registration::Registration): one handler bound to one topic, with
//!   lock-free once-semantics;
//! - [`TopicBucket`](bucket::TopicBucket): copy-on-write ordered registrations of one topic.

mod bucket;
mod registration;

pub(crate) use bucket::TopicBucket;
pub(crate) use registration::Registration;
