//! 文字列だけを持つ編集面（ヘッドレステスト用）

use super::layout::{char_width, string_width};
use super::{CaretRect, Point, TextSurface};
use crate::text::char_len;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySurface {
    text: String,
    /// `(アンカー, フォーカス)`
    selection: Option<(usize, usize)>,
    origin: Point,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }
}

impl TextSurface for MemorySurface {
    fn raw_text(&self) -> String {
        self.text.clone()
    }

    fn replace_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.selection = None;
    }

    fn selection_offsets(&self) -> Option<(usize, usize)> {
        self.selection
            .map(|(anchor, focus)| (anchor.min(focus), anchor.max(focus)))
    }

    fn caret_offset(&self) -> Option<usize> {
        self.selection.map(|(anchor, _)| anchor)
    }

    fn place_caret(&mut self, offset: usize) -> usize {
        let offset = offset.min(char_len(&self.text));
        self.selection = Some((offset, offset));
        offset
    }

    fn select_range(&mut self, start: usize, end: usize) -> (usize, usize) {
        let len = char_len(&self.text);
        let range = (start.min(len), end.min(len));
        self.selection = Some(range);
        range
    }

    fn clear_selection(&mut self) {
        self.selection = None;
    }

    fn offset_at_point(&self, point: Point) -> Option<usize> {
        if point.y < self.origin.y || point.x < self.origin.x {
            return None;
        }
        let row = usize::from(point.y - self.origin.y);
        let column = point.x - self.origin.x;

        let mut offset = 0;
        for (index, line) in self.text.split('\n').enumerate() {
            if index == row {
                let mut x = 0u16;
                for ch in line.chars() {
                    let width = char_width(ch);
                    if column < x + width {
                        return Some(offset);
                    }
                    x += width;
                    offset += 1;
                }
                return Some(offset);
            }
            offset += char_len(line) + 1;
        }
        None
    }

    fn caret_rect(&self) -> Option<CaretRect> {
        let (_, focus) = self.selection?;
        let before: String = self.text.chars().take(focus).collect();
        let row = before.matches('\n').count() as u16;
        let last_line = before.rsplit('\n').next().unwrap_or("");
        Some(CaretRect {
            x: self.origin.x + string_width(last_line),
            y: self.origin.y + row,
            width: 1,
            height: 1,
        })
    }

    fn origin(&self) -> Point {
        self.origin
    }

    fn set_origin(&mut self, origin: Point) {
        self.origin = origin;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_resolution() {
        let mut surface = MemorySurface::with_text("ab\nあい");
        surface.set_origin(Point::new(4, 1));
        assert_eq!(surface.offset_at_point(Point::new(3, 1)), None);
        assert_eq!(surface.offset_at_point(Point::new(5, 1)), Some(1));
        assert_eq!(surface.offset_at_point(Point::new(7, 2)), Some(4));
        assert_eq!(surface.offset_at_point(Point::new(30, 2)), Some(5));
        assert_eq!(surface.offset_at_point(Point::new(4, 9)), None);
    }

    #[test]
    fn test_clamps_caret() {
        let mut surface = MemorySurface::with_text("abc");
        assert_eq!(surface.place_caret(10), 3);
        assert_eq!(surface.select_range(5, 1), (3, 1));
        assert_eq!(surface.selection_offsets(), Some((1, 3)));
        assert_eq!(surface.caret_offset(), Some(3));
    }
}
