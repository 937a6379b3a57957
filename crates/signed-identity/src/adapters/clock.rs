use crate::ports::outbound::TimeSource;
use std::time::SystemTime;

/// Default time source using system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}
