//! ブロックと描画用ブロック

use super::content::{BlockContent, BlockKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ブロックID（サーバー採番。楽観的作成中は一時ID）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 楽観的作成用の一時ID
    pub fn temporary() -> Self {
        Self(format!("tmp-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with("tmp-")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// 描画キー。楽観的更新とサーバー照合をまたいで不変
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

/// 文書を構成するブロック
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: BlockId,
    pub content: BlockContent,
    pub order_key: String,
    pub heading_level: Option<u8>,
}

impl Block {
    pub fn new(id: impl Into<BlockId>, content: BlockContent, order_key: impl Into<String>) -> Self {
        let heading_level = match content.kind() {
            BlockKind::Heading => Some(1),
            _ => None,
        };
        Self {
            id: id.into(),
            content,
            order_key: order_key.into(),
            heading_level,
        }
    }

    pub fn kind(&self) -> BlockKind {
        self.content.kind()
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// ローカルコレクション内のブロック
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderableBlock {
    pub client_id: ClientId,
    pub block: Block,
}

impl RenderableBlock {
    pub fn id(&self) -> &BlockId {
        &self.block.id
    }

    pub fn kind(&self) -> BlockKind {
        self.block.kind()
    }
}

/// 見出しレベルを 1..=3 に丸める
pub fn clamp_heading_level(level: u8) -> u8 {
    level.clamp(1, 3)
}
