//! The dialog step protocol core: outbound framing, the streaming channel,
//! the timed-message scheduler and the step runner.

pub mod channel;
pub mod envelope;
pub mod schedule;
pub mod step;

pub use channel::{OutboundFrame, StreamChannel};
pub use envelope::Envelope;
pub use schedule::TimedQueue;
pub use step::{StepOutcome, run_step};
