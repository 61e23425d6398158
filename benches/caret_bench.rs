use blockcaret::keyboard::{decide, KeyIntent, KeyboardContext, ListKind};
use blockcaret::model::{key_between, BlockKind};
use blockcaret::surface::translate::{get_caret_offset_within, place_caret_at_text_offset};
use blockcaret::surface::SurfaceTree;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use std::time::Duration;

/// 長文ブロックでのオフセット変換
fn bench_offset_translation(c: &mut Criterion) {
    let mut group = c.benchmark_group("offset_translation");
    group.measurement_time(Duration::from_secs(5));

    // 改行の少ない段落
    let short_text = "Hello, block editor!\nSecond line.";
    group.bench_function("short_round_trip", |b| {
        b.iter_batched(
            || tree_with(short_text),
            |(mut tree, root)| {
                let mut selection = None;
                for offset in 0..32 {
                    place_caret_at_text_offset(&mut tree, root, &mut selection, black_box(offset));
                    black_box(get_caret_offset_within(&tree, root, selection.as_ref()));
                }
            },
            BatchSize::SmallInput,
        )
    });

    // 改行ノードが多いコードブロック相当
    let long_text = (0..500).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
    let len = long_text.chars().count();
    group.bench_function("many_breaks_end_of_text", |b| {
        b.iter_batched(
            || tree_with(&long_text),
            |(mut tree, root)| {
                let mut selection = None;
                place_caret_at_text_offset(&mut tree, root, &mut selection, black_box(len));
                black_box(get_caret_offset_within(&tree, root, selection.as_ref()));
            },
            BatchSize::SmallInput,
        )
    });

    group.finish();
}

fn tree_with(text: &str) -> (SurfaceTree, blockcaret::surface::NodeId) {
    let mut tree = SurfaceTree::new();
    let root = tree.create_element(true);
    tree.set_content_from_text(root, text);
    (tree, root)
}

fn bench_decide(c: &mut Criterion) {
    let contexts = [
        KeyboardContext::Block {
            block_kind: BlockKind::Paragraph,
            is_block_empty: false,
            has_inline_text: true,
            caret_at_start: false,
            caret_at_end: true,
            prefer_exit_for_lonely_empty: false,
        },
        KeyboardContext::ListItem {
            list_kind: ListKind::Numbered,
            is_item_empty: true,
            is_first_item: false,
            is_last_item: true,
            all_items_empty: false,
        },
        KeyboardContext::TodoItem {
            is_item_empty: true,
            is_first_item: true,
            is_last_item: true,
            all_items_empty: true,
        },
    ];

    c.bench_function("decide_mixed_contexts", |b| {
        b.iter(|| {
            for context in &contexts {
                black_box(decide(KeyIntent::Enter, black_box(context)));
                black_box(decide(KeyIntent::Backspace, black_box(context)));
            }
        })
    });
}

fn bench_order_keys(c: &mut Criterion) {
    c.bench_function("prepend_200_keys", |b| {
        b.iter(|| {
            let mut first: Option<String> = None;
            for _ in 0..200 {
                first = key_between(None, first.as_deref()).ok();
            }
            black_box(first)
        })
    });
}

criterion_group!(benches, bench_offset_translation, bench_decide, bench_order_keys);
criterion_main!(benches);
