//! Medium access control
//!
//! A [`Session`] owns one transport endpoint and runs both halves of the
//! protocol over it: stop-and-wait sending with ALOHA backoff, and
//! validated, acknowledged reception.

mod backoff;
mod receiver;
mod sender;
mod session;
mod transform;

pub use backoff::{
    backoff_ceiling, backoff_exponent, backoff_slots, sample_backoff, BitrateFrameTime,
    ConstantFrameTime, FrameTimer,
};
pub use receiver::Delivery;
pub use sender::SendReport;
pub use session::{Session, SessionStats};
pub use transform::{Passthrough, PayloadTransform};
