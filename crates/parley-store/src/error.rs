use parley_shared::ChatError;

/// Convenience alias used throughout the crate.
///
/// Store failures are the channel-store subset of [`ChatError`]
/// (`DuplicateChannel`, `ProtectedChannel`, `UnknownChannel`,
/// `InvalidChannelName`).
pub type Result<T> = std::result::Result<T, ChatError>;
