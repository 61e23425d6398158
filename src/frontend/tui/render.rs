//! ブロック文書の描画

use crate::command::BlockBackend;
use crate::editor::{BlockView, DocumentEditor};
use crate::model::{BlockKind, RenderableBlock};
use crate::surface::TreeSurface;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// 状態行に出す情報
#[derive(Debug, Clone, Copy)]
pub struct StatusLineInfo<'a> {
    pub message: Option<&'a str>,
}

fn kind_style(kind: BlockKind) -> Style {
    match kind {
        BlockKind::Heading => Style::default().add_modifier(Modifier::BOLD),
        BlockKind::Quote => Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        BlockKind::Callout => Style::default().fg(Color::Yellow),
        BlockKind::Panel => Style::default().fg(Color::Blue),
        BlockKind::Code => Style::default().fg(Color::Green),
        _ => Style::default(),
    }
}

fn block_lines(block: &RenderableBlock, view: &BlockView<TreeSurface>, width: u16) -> Vec<Line<'static>> {
    let style = kind_style(block.kind());
    match view {
        BlockView::Text { editor, .. } => editor
            .text()
            .split('\n')
            .map(|line| Line::from(Span::styled(line.to_string(), style)))
            .collect(),
        BlockView::Rows(rows) => rows
            .editors()
            .iter()
            .enumerate()
            .flat_map(|(index, editor)| {
                let marker = rows.marker_for(index);
                editor
                    .text()
                    .split('\n')
                    .enumerate()
                    .map(|(line_index, line)| {
                        let prefix = if line_index == 0 { marker.clone() } else { String::new() };
                        Line::from(vec![
                            Span::styled(prefix, Style::default().fg(Color::Cyan)),
                            Span::raw(line.to_string()),
                        ])
                    })
                    .collect::<Vec<_>>()
            })
            .collect(),
        BlockView::Divider => vec![Line::from(Span::styled(
            "─".repeat(usize::from(width)),
            Style::default().fg(Color::DarkGray),
        ))],
    }
}

/// 文書を描画し、キャレットの画面位置を返す
pub fn render_document<B: BlockBackend>(
    frame: &mut Frame<'_>,
    document: &DocumentEditor<B, TreeSurface>,
    status: StatusLineInfo<'_>,
) -> Option<(u16, u16)> {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());
    let (text_area, status_area) = (chunks[0], chunks[1]);

    let mut lines = Vec::new();
    for slot in document.layout() {
        let Some(block) = document.collection().by_client(slot.client_id) else {
            continue;
        };
        if let Some(view) = document.view(slot.client_id) {
            lines.extend(block_lines(block, view, text_area.width));
        }
    }
    frame.render_widget(Paragraph::new(lines), text_area);
    render_status_line(frame, status_area, document, status);

    let rect = document.caret_rect()?;
    caret_position(text_area, rect.x, rect.y)
}

fn caret_position(area: Rect, x: u16, y: u16) -> Option<(u16, u16)> {
    if x >= area.width || y >= area.height {
        return None;
    }
    Some((area.x + x, area.y + y))
}

fn render_status_line<B: BlockBackend>(
    frame: &mut Frame<'_>,
    area: Rect,
    document: &DocumentEditor<B, TreeSurface>,
    status: StatusLineInfo<'_>,
) {
    let mode = match document.active_block() {
        Some(block) => format!("editing {}", block.kind()),
        None => "viewing".to_string(),
    };
    let status_text = format!(
        " blockcaret  {} blocks  {}  {}",
        document.collection().len(),
        mode,
        status.message.unwrap_or("C-q quit  Esc exit edit  C-t toggle  M-↑/↓ move")
    );
    let paragraph = Paragraph::new(status_text)
        .style(Style::default().fg(Color::Black).bg(Color::Gray));
    frame.render_widget(paragraph, area);
}
