//! PendingPayload - typed view of a pending task's opaque payload.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Binds a payload type to the `task_type` string stored on disk.
///
/// # Example
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct ImageJob {
///     vendor_job_id: String,
///     user_id: i64,
/// }
///
/// impl PendingPayload for ImageJob {
///     const TYPE: &'static str = "media.image.generate.v1";
/// }
/// ```
///
/// The row keeps the payload as plain JSON so handlers added later can still
/// read rows written by older builds.
pub trait PendingPayload: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// `{namespace}.{domain}.{action}.v{major}`
    const TYPE: &'static str;
}
