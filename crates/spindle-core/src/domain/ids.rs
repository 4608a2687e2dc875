//! ドメイン識別子（型安全な ID）
//!
//! すべて ULID。作成時刻順にソートでき、インスタンス間の調整なしで生成できる。
//! `Id<T>` はゼロサイズの marker を持つので、`PendingTaskId` を要求する場所に
//! `WorkItemId` を渡すとコンパイルエラーになる。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// ID の種類ごとの marker trait
///
/// `Display` の prefix（"work-", "pending-"）を提供する
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic ULID-backed identifier.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Marker for units of work handed to the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkItem {}

impl IdMarker for WorkItem {
    fn prefix() -> &'static str {
        "work-"
    }
}

/// Marker for pending-task rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PendingTask {}

impl IdMarker for PendingTask {
    fn prefix() -> &'static str {
        "pending-"
    }
}

/// Identifier of a unit of work submitted through the dispatch facade.
pub type WorkItemId = Id<WorkItem>;

/// Identifier of a pending-task row.
pub type PendingTaskId = Id<PendingTask>;
