//! ブロックコマンド
//!
//! ローカルコレクションと永続化ポートの間で楽観的更新を仲介する

pub mod backend;
pub mod collection;
pub mod mutation;
pub mod service;

pub use backend::{BackendCall, BackendOp, BlockBackend, BlockPatch, MemoryBackend};
pub use collection::{BlockCollection, BlockPosition};
pub use mutation::{
    BlockMutation, CreateMutation, DeleteMutation, ReorderMutation, TransformMutation,
    UpdateContentMutation,
};
pub use service::{BlockCommandService, FocusTarget, GuardIntent, GuardOutcome, Staged};
