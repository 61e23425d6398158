//! ブロック種別ごとの内容モデル
//!
//! 種別ごとの純粋関数（正規化・既定内容・段落テキスト投影）を
//! 表引きで提供する

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// ブロック種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    Heading,
    BulletedList,
    NumberedList,
    TodoList,
    Quote,
    Callout,
    Panel,
    Code,
    Divider,
}

impl BlockKind {
    pub const ALL: [BlockKind; 10] = [
        BlockKind::Paragraph,
        BlockKind::Heading,
        BlockKind::BulletedList,
        BlockKind::NumberedList,
        BlockKind::TodoList,
        BlockKind::Quote,
        BlockKind::Callout,
        BlockKind::Panel,
        BlockKind::Code,
        BlockKind::Divider,
    ];

    pub fn as_str(self) -> &'static str {
        entry(self).name
    }

    /// 段落・見出し（ブロック文脈でキーボード判定される種別）
    pub fn is_text_block(self) -> bool {
        matches!(self, BlockKind::Paragraph | BlockKind::Heading)
    }

    /// 削除ガードで段落へ格下げされる構造的な種別
    pub fn is_special(self) -> bool {
        matches!(
            self,
            BlockKind::BulletedList
                | BlockKind::NumberedList
                | BlockKind::TodoList
                | BlockKind::Quote
                | BlockKind::Callout
                | BlockKind::Panel
        )
    }

    /// 行コレクションで編集される種別
    pub fn has_rows(self) -> bool {
        matches!(
            self,
            BlockKind::BulletedList | BlockKind::NumberedList | BlockKind::TodoList
        )
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextContent {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListItem {
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoItem {
    pub id: String,
    pub text: String,
    pub checked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListContent {
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TodoContent {
    pub items: Vec<TodoItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteContent {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalloutContent {
    pub text: String,
    pub tone: String,
}

impl Default for CalloutContent {
    fn default() -> Self {
        Self {
            text: String::new(),
            tone: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelContent {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeContent {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// 種別タグ付きのブロック内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockContent {
    Paragraph(TextContent),
    Heading(TextContent),
    BulletedList(ListContent),
    NumberedList(ListContent),
    TodoList(TodoContent),
    Quote(QuoteContent),
    Callout(CalloutContent),
    Panel(PanelContent),
    Code(CodeContent),
    Divider,
}

impl BlockContent {
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockContent::Paragraph(_) => BlockKind::Paragraph,
            BlockContent::Heading(_) => BlockKind::Heading,
            BlockContent::BulletedList(_) => BlockKind::BulletedList,
            BlockContent::NumberedList(_) => BlockKind::NumberedList,
            BlockContent::TodoList(_) => BlockKind::TodoList,
            BlockContent::Quote(_) => BlockKind::Quote,
            BlockContent::Callout(_) => BlockKind::Callout,
            BlockContent::Panel(_) => BlockKind::Panel,
            BlockContent::Code(_) => BlockKind::Code,
            BlockContent::Divider => BlockKind::Divider,
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        BlockContent::Paragraph(TextContent { text: text.into() })
    }

    /// 単一テキストを持つ種別の内容を作る。行を持つ種別は一行目に入れる
    pub fn with_text(kind: BlockKind, text: impl Into<String>) -> Self {
        let text = text.into();
        match default_content(kind) {
            BlockContent::Paragraph(_) => BlockContent::Paragraph(TextContent { text }),
            BlockContent::Heading(_) => BlockContent::Heading(TextContent { text }),
            BlockContent::Quote(quote) => BlockContent::Quote(QuoteContent { text, ..quote }),
            BlockContent::Callout(callout) => {
                BlockContent::Callout(CalloutContent { text, ..callout })
            }
            BlockContent::Code(code) => BlockContent::Code(CodeContent { text, ..code }),
            BlockContent::Panel(_) => BlockContent::Panel(PanelContent {
                title: String::new(),
                body: text,
            }),
            other => {
                let mut rows = other.rows().unwrap_or_default();
                if let Some(first) = rows.first_mut() {
                    first.text = text;
                }
                other.with_rows(rows)
            }
        }
    }

    /// 単一テキストで編集される種別の本文
    pub fn primary_text(&self) -> Option<&str> {
        match self {
            BlockContent::Paragraph(text) | BlockContent::Heading(text) => Some(&text.text),
            BlockContent::Quote(quote) => Some(&quote.text),
            BlockContent::Callout(callout) => Some(&callout.text),
            BlockContent::Panel(panel) => Some(&panel.body),
            BlockContent::Code(code) => Some(&code.text),
            _ => None,
        }
    }

    /// 本文だけを差し替える。付随する属性（トーン・言語など）は保つ
    pub fn replace_primary_text(&mut self, replacement: impl Into<String>) -> bool {
        let slot = match self {
            BlockContent::Paragraph(text) | BlockContent::Heading(text) => &mut text.text,
            BlockContent::Quote(quote) => &mut quote.text,
            BlockContent::Callout(callout) => &mut callout.text,
            BlockContent::Panel(panel) => &mut panel.body,
            BlockContent::Code(code) => &mut code.text,
            _ => return false,
        };
        *slot = replacement.into();
        true
    }

    /// 行を持つ種別なら行一覧を返す
    pub fn rows(&self) -> Option<Vec<RowItem>> {
        match self {
            BlockContent::BulletedList(list) | BlockContent::NumberedList(list) => Some(
                list.items
                    .iter()
                    .map(|item| RowItem {
                        id: item.id.clone(),
                        text: item.text.clone(),
                        checked: false,
                        promoted: item.promoted,
                    })
                    .collect(),
            ),
            BlockContent::TodoList(todo) => Some(
                todo.items
                    .iter()
                    .map(|item| RowItem {
                        id: item.id.clone(),
                        text: item.text.clone(),
                        checked: item.checked,
                        promoted: item.promoted,
                    })
                    .collect(),
            ),
            _ => None,
        }
    }

    /// 行一覧で置き換えた内容を返す。行を持たない種別はそのまま
    pub fn with_rows(self, rows: Vec<RowItem>) -> Self {
        let list_items = |rows: &[RowItem]| {
            rows.iter()
                .map(|row| ListItem {
                    id: row.id.clone(),
                    text: row.text.clone(),
                    promoted: row.promoted,
                })
                .collect::<Vec<_>>()
        };
        match self {
            BlockContent::BulletedList(_) => BlockContent::BulletedList(ListContent {
                items: list_items(&rows[..]),
            }),
            BlockContent::NumberedList(_) => BlockContent::NumberedList(ListContent {
                items: list_items(&rows[..]),
            }),
            BlockContent::TodoList(_) => BlockContent::TodoList(TodoContent {
                items: rows
                    .into_iter()
                    .map(|row| TodoItem {
                        id: row.id,
                        text: row.text,
                        checked: row.checked,
                        promoted: row.promoted,
                    })
                    .collect(),
            }),
            other => other,
        }
    }

    /// 内容が空（空白のみ含む）か
    pub fn is_empty(&self) -> bool {
        derive_paragraph_text(self).trim().is_empty()
    }
}

/// 行コレクション（リスト・TODO）の一行
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowItem {
    pub id: String,
    pub text: String,
    /// TODO 行のみ意味を持つ
    pub checked: bool,
    pub promoted: Option<bool>,
}

impl RowItem {
    /// 新しい空行（ID 付き）
    pub fn empty() -> Self {
        Self {
            id: new_row_id(),
            ..Self::default()
        }
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            id: new_row_id(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

pub fn new_row_id() -> String {
    format!("row-{}", uuid::Uuid::new_v4().simple())
}

struct KindEntry {
    kind: BlockKind,
    name: &'static str,
    normalize: fn(&Value) -> Result<BlockContent, serde_json::Error>,
    default_content: fn() -> BlockContent,
}

static KIND_TABLE: [KindEntry; 10] = [
    KindEntry {
        kind: BlockKind::Paragraph,
        name: "paragraph",
        normalize: normalize_paragraph,
        default_content: || BlockContent::Paragraph(TextContent::default()),
    },
    KindEntry {
        kind: BlockKind::Heading,
        name: "heading",
        normalize: normalize_heading,
        default_content: || BlockContent::Heading(TextContent::default()),
    },
    KindEntry {
        kind: BlockKind::BulletedList,
        name: "bulleted_list",
        normalize: normalize_bulleted,
        default_content: || {
            BlockContent::BulletedList(ListContent {
                items: vec![ListItem {
                    id: new_row_id(),
                    ..ListItem::default()
                }],
            })
        },
    },
    KindEntry {
        kind: BlockKind::NumberedList,
        name: "numbered_list",
        normalize: normalize_numbered,
        default_content: || {
            BlockContent::NumberedList(ListContent {
                items: vec![ListItem {
                    id: new_row_id(),
                    ..ListItem::default()
                }],
            })
        },
    },
    KindEntry {
        kind: BlockKind::TodoList,
        name: "todo_list",
        normalize: normalize_todo,
        default_content: || {
            BlockContent::TodoList(TodoContent {
                items: vec![TodoItem {
                    id: new_row_id(),
                    ..TodoItem::default()
                }],
            })
        },
    },
    KindEntry {
        kind: BlockKind::Quote,
        name: "quote",
        normalize: normalize_quote,
        default_content: || BlockContent::Quote(QuoteContent::default()),
    },
    KindEntry {
        kind: BlockKind::Callout,
        name: "callout",
        normalize: normalize_callout,
        default_content: || BlockContent::Callout(CalloutContent::default()),
    },
    KindEntry {
        kind: BlockKind::Panel,
        name: "panel",
        normalize: normalize_panel,
        default_content: || BlockContent::Panel(PanelContent::default()),
    },
    KindEntry {
        kind: BlockKind::Code,
        name: "code",
        normalize: normalize_code,
        default_content: || BlockContent::Code(CodeContent::default()),
    },
    KindEntry {
        kind: BlockKind::Divider,
        name: "divider",
        normalize: |_| Ok(BlockContent::Divider),
        default_content: || BlockContent::Divider,
    },
];

fn entry(kind: BlockKind) -> &'static KindEntry {
    // KIND_TABLE は BlockKind::ALL と同じ順序
    let index = BlockKind::ALL
        .iter()
        .position(|candidate| *candidate == kind)
        .unwrap_or(0);
    let entry = &KIND_TABLE[index];
    debug_assert_eq!(entry.kind, kind);
    entry
}

fn parse<T: DeserializeOwned>(value: &Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(value.clone())
}

fn normalize_paragraph(value: &Value) -> Result<BlockContent, serde_json::Error> {
    parse(value).map(BlockContent::Paragraph)
}

fn normalize_heading(value: &Value) -> Result<BlockContent, serde_json::Error> {
    parse(value).map(BlockContent::Heading)
}

fn backfill_list(mut list: ListContent) -> ListContent {
    for item in &mut list.items {
        if item.id.is_empty() {
            item.id = new_row_id();
        }
    }
    if list.items.is_empty() {
        list.items.push(ListItem {
            id: new_row_id(),
            ..ListItem::default()
        });
    }
    list
}

fn normalize_bulleted(value: &Value) -> Result<BlockContent, serde_json::Error> {
    parse(value).map(|list| BlockContent::BulletedList(backfill_list(list)))
}

fn normalize_numbered(value: &Value) -> Result<BlockContent, serde_json::Error> {
    parse(value).map(|list| BlockContent::NumberedList(backfill_list(list)))
}

fn normalize_todo(value: &Value) -> Result<BlockContent, serde_json::Error> {
    parse::<TodoContent>(value).map(|mut todo| {
        for item in &mut todo.items {
            if item.id.is_empty() {
                item.id = new_row_id();
            }
        }
        if todo.items.is_empty() {
            todo.items.push(TodoItem {
                id: new_row_id(),
                ..TodoItem::default()
            });
        }
        BlockContent::TodoList(todo)
    })
}

fn normalize_quote(value: &Value) -> Result<BlockContent, serde_json::Error> {
    parse(value).map(BlockContent::Quote)
}

fn normalize_callout(value: &Value) -> Result<BlockContent, serde_json::Error> {
    parse(value).map(BlockContent::Callout)
}

fn normalize_panel(value: &Value) -> Result<BlockContent, serde_json::Error> {
    parse(value).map(BlockContent::Panel)
}

fn normalize_code(value: &Value) -> Result<BlockContent, serde_json::Error> {
    parse(value).map(BlockContent::Code)
}

/// 種別の既定内容
pub fn default_content(kind: BlockKind) -> BlockContent {
    (entry(kind).default_content)()
}

/// 永続化された JSON を種別に沿って正規化する
///
/// 形が合わない内容はその種別の既定内容に置き換える
pub fn normalize_content(kind: BlockKind, value: &Value) -> BlockContent {
    match (entry(kind).normalize)(value) {
        Ok(content) => content,
        Err(err) => {
            log::warn!("malformed {} content replaced with default: {}", kind, err);
            default_content(kind)
        }
    }
}

/// 文字列化された内容を正規化する
pub fn parse_block_content(kind: BlockKind, serialized: &str) -> BlockContent {
    match serde_json::from_str::<Value>(serialized) {
        Ok(value) => normalize_content(kind, &value),
        Err(err) => {
            log::warn!("unparsable {} content replaced with default: {}", kind, err);
            default_content(kind)
        }
    }
}

/// 内容を永続化用の JSON 文字列にする
pub fn serialize_block_content(content: &BlockContent) -> String {
    let value = content_to_value(content);
    value.to_string()
}

pub fn content_to_value(content: &BlockContent) -> Value {
    let result = match content {
        BlockContent::Paragraph(text) | BlockContent::Heading(text) => serde_json::to_value(text),
        BlockContent::BulletedList(list) | BlockContent::NumberedList(list) => {
            serde_json::to_value(list)
        }
        BlockContent::TodoList(todo) => serde_json::to_value(todo),
        BlockContent::Quote(quote) => serde_json::to_value(quote),
        BlockContent::Callout(callout) => serde_json::to_value(callout),
        BlockContent::Panel(panel) => serde_json::to_value(panel),
        BlockContent::Code(code) => serde_json::to_value(code),
        BlockContent::Divider => Ok(Value::Object(serde_json::Map::new())),
    };
    // 文字列キーの構造体のみなので失敗しない
    result.unwrap_or(Value::Null)
}

/// 段落へ格下げするときのテキスト投影
pub fn derive_paragraph_text(content: &BlockContent) -> String {
    match content {
        BlockContent::Paragraph(text) | BlockContent::Heading(text) => text.text.clone(),
        BlockContent::BulletedList(list) | BlockContent::NumberedList(list) => list
            .items
            .iter()
            .map(|item| item.text.as_str())
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        BlockContent::TodoList(todo) => todo
            .items
            .iter()
            .map(|item| item.text.as_str())
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        BlockContent::Quote(quote) => quote.text.clone(),
        BlockContent::Callout(callout) => callout.text.clone(),
        BlockContent::Panel(panel) => [panel.title.as_str(), panel.body.as_str()]
            .into_iter()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        BlockContent::Code(code) => code.text.clone(),
        BlockContent::Divider => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_table_matches_order() {
        for kind in BlockKind::ALL {
            assert_eq!(default_content(kind).kind(), kind);
        }
        assert_eq!(BlockKind::TodoList.as_str(), "todo_list");
    }

    #[test]
    fn test_kind_serde_names() {
        let json = serde_json::to_string(&BlockKind::NumberedList).unwrap();
        assert_eq!(json, "\"numbered_list\"");
    }

    #[test]
    fn test_replace_primary_text_keeps_attributes() {
        let mut content = default_content(BlockKind::Callout);
        assert!(content.replace_primary_text("note"));
        assert_eq!(content.primary_text(), Some("note"));
        match content {
            BlockContent::Callout(callout) => assert_eq!(callout.tone, "info"),
            _ => panic!("Expected callout"),
        }

        let mut list = default_content(BlockKind::BulletedList);
        assert!(!list.replace_primary_text("x"));
        assert_eq!(list.primary_text(), None);
    }

    #[test]
    fn test_normalize_backfills_row_ids() {
        let content = normalize_content(
            BlockKind::TodoList,
            &json!({"items": [{"text": "a", "checked": true}, {"id": "keep", "text": "b"}]}),
        );
        let rows = content.rows().unwrap();
        assert!(rows[0].id.starts_with("row-"));
        assert!(rows[0].checked);
        assert_eq!(rows[1].id, "keep");
    }

    #[test]
    fn test_malformed_content_falls_back_to_default() {
        let content = normalize_content(BlockKind::Paragraph, &json!({"text": 42}));
        assert_eq!(content, BlockContent::paragraph(""));

        let content = parse_block_content(BlockKind::Callout, "{oops");
        assert_eq!(content, BlockContent::Callout(CalloutContent::default()));
    }

    #[test]
    fn test_empty_list_gets_one_row() {
        let content = normalize_content(BlockKind::BulletedList, &json!({"items": []}));
        assert_eq!(content.rows().unwrap().len(), 1);
    }

    #[test]
    fn test_derive_paragraph_text() {
        let todo = BlockContent::TodoList(TodoContent {
            items: vec![
                TodoItem {
                    id: "1".into(),
                    text: "buy milk".into(),
                    ..TodoItem::default()
                },
                TodoItem {
                    id: "2".into(),
                    text: "  ".into(),
                    ..TodoItem::default()
                },
                TodoItem {
                    id: "3".into(),
                    text: "call mom".into(),
                    checked: true,
                    ..TodoItem::default()
                },
            ],
        });
        assert_eq!(derive_paragraph_text(&todo), "buy milk\ncall mom");

        let panel = BlockContent::Panel(PanelContent {
            title: "Title".into(),
            body: "Body".into(),
        });
        assert_eq!(derive_paragraph_text(&panel), "Title\nBody");
    }

    #[test]
    fn test_serialize_then_parse() {
        let quote = BlockContent::Quote(QuoteContent {
            text: "to be".into(),
            source: Some("hamlet".into()),
        });
        let serialized = serialize_block_content(&quote);
        assert_eq!(parse_block_content(BlockKind::Quote, &serialized), quote);
    }

    #[test]
    fn test_with_text_puts_text_in_first_row() {
        let content = BlockContent::with_text(BlockKind::BulletedList, "first");
        let rows = content.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text, "first");
    }
}
