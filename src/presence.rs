//! Person-presence input for auto-record
//!
//! No detector lives in this crate. An external detector calls these hooks
//! as people enter and leave the frame; the controller implements them and
//! decides, based on the auto-record preference, whether to start or stop a
//! clip.

use async_trait::async_trait;

#[async_trait]
pub trait PresenceSignal: Send + Sync {
    /// A person entered the frame
    async fn on_detected(&self);

    /// Nobody is in frame any more
    async fn on_lost(&self);
}
