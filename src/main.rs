use anyhow::Context;
use blockcaret::model::{default_content, Block, BlockContent, BlockKind, RowItem};
use blockcaret::session::CaretEdge;
use blockcaret::{error, logging};
use blockcaret::{BlockCommandService, DocumentEditor, EditorConfig, EditorSession, MemoryBackend, TuiApplication};

fn main() -> anyhow::Result<()> {
    error::setup_panic_handler();

    let config = EditorConfig::load().context("failed to load configuration")?;
    if let Err(err) = logging::init(&config.logging) {
        eprintln!("logging disabled: {}", err);
    }
    log::info!("blockcaret {} starting", env!("CARGO_PKG_VERSION"));

    let blocks = scratch_document();
    let first = blocks.first().map(|block| block.id.clone());
    let service = BlockCommandService::new(MemoryBackend::with_blocks(blocks.clone()), "scratch", blocks);
    let mut document = DocumentEditor::new(EditorSession::with_system_clock(config), service);
    if let Some(id) = first {
        document
            .focus_block(&id, CaretEdge::End)
            .context("failed to focus the first block")?;
    }

    let mut app = TuiApplication::new(document);
    app.run().context("terminal session failed")?;
    Ok(())
}

/// 起動時に表示する見本の文書
fn scratch_document() -> Vec<Block> {
    let mut heading = Block::new("intro", BlockContent::with_text(BlockKind::Heading, "blockcaret"), "F");
    heading.heading_level = Some(1);

    let todo = default_content(BlockKind::TodoList).with_rows(vec![
        RowItem::with_text("Enter on a filled row adds a row"),
        RowItem::with_text("Enter twice on an empty list leaves it"),
    ]);

    vec![
        heading,
        Block::new(
            "usage",
            BlockContent::paragraph("Type \"- \", \"1. \", \"[] \" or \"# \" at the start of a paragraph."),
            "P",
        ),
        Block::new("checklist", todo, "V"),
        Block::new("tail", BlockContent::paragraph(""), "h"),
    ]
}
