//! Segment store benchmarks
//!
//! Target: register and patch a page of 500 segments in well under a frame

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use trellis_protocol::ChangeSet;
use trellis_segments::{ChangePipeline, MarkerConfig, ScriptRegistry, SegmentStore};

fn seg(id: &str, body: &str) -> String {
    format!(
        r#"<span class="begin" data-segid="{id}"></span>{body}<span class="end" data-segid="{id}"></span>"#
    )
}

fn generate_page(num_rows: usize) -> String {
    let mut page = String::from("<table>");
    for i in 0..num_rows {
        page.push_str(&format!(
            "<tr>{}</tr>",
            seg(&format!("row{i}"), &format!("<td>{i}</td><td><input value={i}></td>"))
        ));
    }
    page.push_str("</table>");
    page
}

fn loaded_store(page: &str) -> SegmentStore {
    let mut store = SegmentStore::new(MarkerConfig::default());
    store.load_document(page).ok();
    store.register_document();
    store
}

fn register_page(c: &mut Criterion) {
    let page = generate_page(500);

    c.bench_function("register_500_segments", |b| {
        b.iter_batched(
            || {
                let mut store = SegmentStore::new(MarkerConfig::default());
                store.load_document(&page).ok();
                store
            },
            |mut store| black_box(store.register_document()),
            BatchSize::SmallInput,
        )
    });
}

fn modify_rows(c: &mut Criterion) {
    let page = generate_page(500);
    let changes = ChangeSet {
        modified: (0..50)
            .map(|i| {
                let id = format!("row{}", i * 10);
                let markup = seg(&id, "<td>changed</td>");
                (id, markup)
            })
            .collect(),
        ..Default::default()
    };

    c.bench_function("modify_50_of_500_segments", |b| {
        b.iter_batched(
            || (loaded_store(&page), ScriptRegistry::new()),
            |(mut store, mut scripts)| {
                black_box(ChangePipeline::new(&mut store, &mut scripts).apply(&changes))
            },
            BatchSize::SmallInput,
        )
    });
}

fn segment_lookup(c: &mut Criterion) {
    let store = loaded_store(&generate_page(500));
    let deepest = store
        .tree()
        .descendants(store.document())
        .filter(|&n| store.tree().tag(n) == Some("input"))
        .last();

    c.bench_function("segment_id_for_node", |b| {
        b.iter(|| deepest.map(|node| store.segment_id_for_node(black_box(node)).map(str::len)))
    });
}

criterion_group!(benches, register_page, modify_rows, segment_lookup);
criterion_main!(benches);
