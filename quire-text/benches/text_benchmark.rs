use std::hint::black_box;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, Criterion};
use quire_core::Shape;
use quire_text::{
    layout_paragraph, Align, AttributedText, CodepointAttributes, EnglishHyphenator, FontCache,
    FontResource, GlyphAtlas, LayoutProperties, SubPixelArrangement, SyntheticBackend,
};

const PARAGRAPH: &str = "The quick brown fox jumps over the lazy dog. \
    Lorem ipsum dolor sit amet, consectetur adipiscing elit. \
    Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. \
    Typesetting engines balance the spacing of every line in a paragraph.";

fn text() -> AttributedText {
    let cache = FontCache::new(SyntheticBackend::new());
    let face = cache
        .face(&FontResource::new("box"), 16 * 64)
        .expect("synthetic face");
    AttributedText::from_text(PARAGRAPH, CodepointAttributes::new(face, Default::default()))
}

fn bench_greedy_paragraph(c: &mut Criterion) {
    let text = text();
    let shape = Shape::rectangle(400 * 64);
    let props = LayoutProperties {
        align: Align::JustifyLeft,
        ..LayoutProperties::default()
    };

    c.bench_function("paragraph_greedy", |b| {
        b.iter(|| layout_paragraph(black_box(&text), &shape, &props, 0));
    });
}

fn bench_optimal_hyphenated_paragraph(c: &mut Criterion) {
    let text = text();
    let shape = Shape::rectangle(240 * 64);
    let props = LayoutProperties {
        align: Align::JustifyLeft,
        optimize: true,
        hyphenate: true,
        hyphenator: Some(Rc::new(EnglishHyphenator)),
        ..LayoutProperties::default()
    };

    c.bench_function("paragraph_optimal_hyphenated", |b| {
        b.iter(|| layout_paragraph(black_box(&text), &shape, &props, 0));
    });
}

fn bench_atlas_packing(c: &mut Criterion) {
    let cache = FontCache::new(SyntheticBackend::new());
    let face = cache
        .face(&FontResource::new("box"), 16 * 64)
        .expect("synthetic face");

    c.bench_function("atlas_glyph_1024", |b| {
        let mut atlas = GlyphAtlas::new(1024);
        let mut glyph = 0u32;
        b.iter(|| {
            glyph = glyph.wrapping_add(1);
            atlas
                .glyph(&face, black_box(glyph), SubPixelArrangement::None, 0)
                .expect("fits");
        });
    });
}

criterion_group!(
    benches,
    bench_greedy_paragraph,
    bench_optimal_hyphenated_paragraph,
    bench_atlas_packing
);
criterion_main!(benches);
