//! Task trait - ties a task type string to a payload type.

use serde::de::DeserializeOwned;

/// Task is the typed view of a message payload.
///
/// # Example
/// ```ignore
/// #[derive(Deserialize)]
/// struct SendEmail {
///     recipient: String,
///     subject: String,
/// }
///
/// impl Task for SendEmail {
///     const TYPE: &'static str = "email";
/// }
/// ```
///
/// # Trait Bounds
/// - `DeserializeOwned`: decoded from the opaque `payload` value
/// - `Send + Sync + 'static`: handed across tasks inside `Arc`s
pub trait Task: DeserializeOwned + Send + Sync + 'static {
    /// The `type` field of the wire message this payload belongs to.
    const TYPE: &'static str;
}
