//! The error type returned by every fallible driver operation.

/// A driver error, generic over the error type `E` of the underlying `DisplayInterface`.
///
/// Out-of-range drawing coordinates are never reported here: they are clamped or the operation
/// silently does nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error<E> {
    /// The transport failed to send a command or data.
    Interface(E),
    /// The configuration can not be realized: panel dimensions out of range, or a tuning command
    /// argument outside of what the controller accepts.
    InvalidConfig,
    /// A background transfer did not report completion before the configured timeout. The
    /// transfer has been aborted and the driver remains usable; the data may be resent with
    /// `Display::write_sync`.
    TransferTimeout,
}
