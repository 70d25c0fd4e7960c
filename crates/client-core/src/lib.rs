//! Core of the marketplace client shared by every list-backed screen.
//!
//! This crate defines typed network results and their normalization, the cursor
//! pagination engine, and the lifecycle-bound notification channel.

/// Lifecycle-bound single-consumer notification delivery.
pub mod channel;
/// Domain error codes, typed results and client faults.
pub mod error;
/// Press-twice-to-exit detector.
pub mod exit_confirm;
/// Foreground/background signal pair.
pub mod lifecycle;
/// Transport response to typed result mapping.
pub mod normalization;
/// Cursor pagination engine.
pub mod paging;
/// Notification drain-loop state machine.
pub mod state_machine;
/// Domain models shared with the UI layer.
pub mod types;

pub use channel::{
    ChannelConfig, NotificationChannel, NotificationConsumer, NotificationPresenter,
    NotificationTiming,
};
pub use error::{ClientError, ErrorCode, FailureClass, FailureKind, NetworkResult, RenderError};
pub use exit_confirm::{ExitConfirmationConfig, ExitConfirmationTimer, ExitDecision};
pub use lifecycle::{Lifecycle, LifecycleController, LifecycleSignal, lifecycle_channel};
pub use normalization::{TransportResponse, normalize, normalize_ack};
pub use paging::{Cursor, LoadResult, Page, PageSource, PagingConfig, PaginationCursorEngine};
pub use state_machine::{DrainState, DrainStateMachine};
pub use types::{AddFavorite, Article, ChatMessage, ChatRoom, Favorite, NotificationEvent};
