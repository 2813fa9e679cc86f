/// A client handle created on first use and reused afterwards
#[derive(Debug, Default)]
pub enum Handle<T> {
    #[default]
    Uninitialized,
    Active(T),
}

impl<T> Handle<T> {
    pub fn is_active(&self) -> bool {
        matches!(self, Handle::Active(_))
    }

    /// Borrow the handle, running `init` first if it was never created.
    /// A failed `init` leaves the handle uninitialized.
    pub fn get_or_try_init<E>(&mut self, init: impl FnOnce() -> Result<T, E>) -> Result<&mut T, E> {
        if let Handle::Uninitialized = self {
            *self = Handle::Active(init()?);
        }
        match self {
            Handle::Active(handle) => Ok(handle),
            Handle::Uninitialized => unreachable!("handle initialized above"),
        }
    }
}

/// Lifecycle of a consume loop:
/// `Idle -> Subscribed -> Polling <-> Yielding -> Stopping -> Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeState {
    Idle,
    Subscribed,
    /// A poll is in flight, or the last poll delivered nothing
    Polling,
    /// A message was handed to the caller
    Yielding,
    /// Stop was requested but the loop has not reached an iteration
    /// boundary yet
    Stopping,
    /// Stop was observed at an iteration boundary. Terminal.
    Stopped,
}
