/// Failure kinds callers may want to tell apart. They travel inside `anyhow::Error` and can be
/// recovered with `downcast_ref::<SortError>()`.
#[derive(Debug, thiserror::Error)]
pub enum SortError {
    /// A key value that is neither null, a number nor a string
    #[error("unexpected key value: {0}")]
    InvalidKey(String),

    /// The sorted stream was already handed out once
    #[error("sorted stream has already been consumed")]
    AlreadyConsumed,

    /// A reduction could not be applied
    #[error("reduce error: {0}")]
    Reduce(String),
}
