//! Domain identifiers (strongly-typed IDs).
//!
//! ストアはアリーナ方式なので、ID は `u64` の連番です（1 から採番、0 は未採番）。
//! Phantom type パターンで、`TaskId` と `NewsletterId` などをコンパイル時に
//! 区別します。
//!
//! ## Phantom Type パターン
//! `Id<T>` というジェネリック型で共通実装を提供しつつ、
//! `T` は実行時には使わない（PhantomData）マーカー型です。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"task-", "newsletter-" など）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// Serialized as the bare integer, so snapshots stay readable.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: u64,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// Placeholder carried by records that have not been inserted yet.
    pub const UNASSIGNED: Self = Self::new(0);

    pub const fn new(value: u64) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn is_assigned(&self) -> bool {
        self.value != 0
    }
}

impl<T: IdMarker> From<u64> for Id<T> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.value)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Task {}

impl IdMarker for Task {
    fn prefix() -> &'static str {
        "task-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Newsletter {}

impl IdMarker for Newsletter {
    fn prefix() -> &'static str {
        "newsletter-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subscriber {}

impl IdMarker for Subscriber {
    fn prefix() -> &'static str {
        "subscriber-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {}

impl IdMarker for Segment {
    fn prefix() -> &'static str {
        "segment-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WpUser {}

impl IdMarker for WpUser {
    fn prefix() -> &'static str {
        "wp-user-"
    }
}

// ========================================
// Type Alias（使いやすさのため）
// ========================================

/// Identifier of a scheduled task (sending queues included).
pub type TaskId = Id<Task>;

pub type NewsletterId = Id<Newsletter>;

pub type SubscriberId = Id<Subscriber>;

pub type SegmentId = Id<Segment>;

/// Identifier of a WordPress user linked to a subscriber.
pub type WpUserId = Id<WpUser>;
