//! Job intake, the synchronous render pipeline and its worker thread.

pub mod intake;
pub mod manifest;
pub mod pipeline;
pub mod worker;
