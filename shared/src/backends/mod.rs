mod instant;
mod timer;

pub use instant::Instant;
pub use timer::Timer;
