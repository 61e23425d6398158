//! 編集面のセル配置
//!
//! 端末セル単位で各文字の描画位置を求め、点からの位置解決と
//! キャレット矩形の計算に使う

use super::tree::{DomPosition, NodeId, NodeKind, SurfaceTree};
use super::{CaretRect, Point};

/// 文字の表示幅（制御文字は0、全角は2）
pub fn char_width(ch: char) -> u16 {
    match ch {
        '\x00'..='\x1F' | '\x7F' => 0,
        '\x20'..='\x7E' => 1,
        '\u{0080}'..='\u{009F}' => 0,
        _ => unicode_width::UnicodeWidthChar::width(ch).unwrap_or(1) as u16,
    }
}

/// 文字列の表示幅
pub fn string_width(s: &str) -> u16 {
    s.chars().map(char_width).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LayoutCell {
    x: u16,
    y: u16,
    width: u16,
    before: DomPosition,
    after: DomPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineEnd {
    x: u16,
    y: u16,
    position: DomPosition,
}

/// 描画済み編集面の配置情報
#[derive(Debug, Clone, Default)]
pub struct SurfaceLayout {
    cells: Vec<LayoutCell>,
    line_ends: Vec<LineEnd>,
}

impl SurfaceLayout {
    /// `host` 以下を `origin` から描画した場合の配置を計算
    pub fn build(tree: &SurfaceTree, host: NodeId, origin: Point) -> Self {
        let mut layout = Self::default();
        let (mut x, mut y) = (origin.x, origin.y);
        let mut tail: Option<DomPosition> = None;

        for id in tree.text_bearing_descendants(host) {
            match tree.kind(id) {
                NodeKind::Text(text) => {
                    for (index, ch) in text.chars().enumerate() {
                        let width = char_width(ch);
                        if width == 0 {
                            continue;
                        }
                        layout.cells.push(LayoutCell {
                            x,
                            y,
                            width,
                            before: DomPosition::new(id, index),
                            after: DomPosition::new(id, index + 1),
                        });
                        x = x.saturating_add(width);
                    }
                    tail = Some(DomPosition::new(id, text.chars().count()));
                }
                NodeKind::LineBreak => {
                    let (Some(parent), Some(index)) = (tree.parent(id), tree.index_in_parent(id)) else {
                        continue;
                    };
                    layout.line_ends.push(LineEnd {
                        x,
                        y,
                        position: DomPosition::new(parent, index),
                    });
                    tail = Some(DomPosition::new(parent, index + 1));
                    x = origin.x;
                    y = y.saturating_add(1);
                }
                NodeKind::Element { .. } => {}
            }
        }

        if let Some(position) = tail {
            layout.line_ends.push(LineEnd { x, y, position });
        }
        layout
    }

    /// 点に文字セルがあればその位置（右半分ならその文字の後ろ）
    pub fn position_at(&self, point: Point) -> Option<DomPosition> {
        self.cells
            .iter()
            .find(|cell| cell.y == point.y && point.x >= cell.x && point.x < cell.x + cell.width)
            .map(|cell| {
                if cell.width > 1 && point.x >= cell.x + cell.width / 2 {
                    cell.after
                } else {
                    cell.before
                }
            })
    }

    /// 最も近い行の中で最も近い位置
    pub fn nearest_position(&self, point: Point) -> Option<DomPosition> {
        let row = self
            .line_ends
            .iter()
            .map(|end| end.y)
            .chain(self.cells.iter().map(|cell| cell.y))
            .min_by_key(|y| y.abs_diff(point.y))?;

        let line_end = self.line_ends.iter().find(|end| end.y == row);
        if let Some(end) = line_end {
            if point.x >= end.x {
                return Some(end.position);
            }
        }

        self.cells
            .iter()
            .filter(|cell| cell.y == row)
            .min_by_key(|cell| cell.x.abs_diff(point.x))
            .map(|cell| if point.x > cell.x { cell.after } else { cell.before })
            .or(line_end.map(|end| end.position))
    }
}

/// `host` 先頭から `position` までを描画した直後のセル位置
pub fn caret_rect(tree: &SurfaceTree, host: NodeId, origin: Point, position: DomPosition) -> Option<CaretRect> {
    if !tree.contains(host, position.node) {
        return None;
    }
    let mut before = String::new();
    tree.collect_until(host, position, &mut before);

    let row = before.matches('\n').count() as u16;
    let last_line = before.rsplit('\n').next().unwrap_or("");
    Some(CaretRect {
        x: origin.x.saturating_add(string_width(last_line)),
        y: origin.y.saturating_add(row),
        width: 1,
        height: 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_with(marker: &str, text: &str) -> (SurfaceTree, NodeId, NodeId) {
        let mut tree = SurfaceTree::new();
        let host = tree.create_element(false);
        let span = tree.create_element(false);
        let marker = tree.create_text(marker);
        let root = tree.create_element(true);
        tree.append_child(host, span);
        tree.append_child(span, marker);
        tree.append_child(host, root);
        tree.set_content_from_text(root, text);
        (tree, host, root)
    }

    #[test]
    fn test_char_width() {
        assert_eq!(char_width('a'), 1);
        assert_eq!(char_width('あ'), 2);
        assert_eq!(char_width('\u{200B}'), 0);
        assert_eq!(string_width("aあ"), 3);
    }

    #[test]
    fn test_exact_hit_and_line_end() {
        let (tree, host, root) = host_with("- ", "ab\ncd");
        let layout = SurfaceLayout::build(&tree, host, Point::new(0, 0));
        let text = tree.children(root)[0];

        assert_eq!(layout.position_at(Point::new(3, 0)), Some(DomPosition::new(text, 1)));
        assert_eq!(layout.position_at(Point::new(9, 0)), None);
        assert_eq!(
            layout.nearest_position(Point::new(9, 0)),
            Some(DomPosition::new(root, 1))
        );
        let second = tree.children(root)[2];
        assert_eq!(
            layout.nearest_position(Point::new(9, 5)),
            Some(DomPosition::new(second, 2))
        );
    }

    #[test]
    fn test_caret_rect_counts_marker_and_rows() {
        let (tree, host, root) = host_with("- ", "ab\nあい");
        let second = tree.children(root)[2];
        let rect = caret_rect(&tree, host, Point::new(2, 3), DomPosition::new(second, 1)).unwrap();
        assert_eq!((rect.x, rect.y), (4, 4));

        let first = tree.children(root)[0];
        let rect = caret_rect(&tree, host, Point::new(2, 3), DomPosition::new(first, 2)).unwrap();
        assert_eq!((rect.x, rect.y), (6, 3));
    }
}
