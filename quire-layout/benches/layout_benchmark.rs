use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use quire_core::{px, MarkupNode, Shape, XmlDocument};
use quire_layout::{layout_document, save_layout, StyleSheet};
use quire_text::{FontCache, FontResource, SyntheticBackend};

const CSS: &str = "
    body { color: #202020; margin: 8px }
    h1 { font-size: 24px; text-align: center; margin: 12px }
    p { text-align: justify; margin: 6px }
    p.note { color: #606060; border-width: 1px; padding: 4px }
    ul li { padding: 2px }
    body > p:first-child { text-indent: 16px }
";

fn sheet() -> StyleSheet {
    let mut sheet = StyleSheet::new(FontCache::shared(SyntheticBackend::new()));
    sheet.add_font("sans", FontResource::new("box"));
    sheet.add_css(CSS).expect("valid css");
    sheet
}

fn document(paragraphs: usize) -> String {
    let mut doc = String::from("<html><body><h1>Benchmark</h1>");
    for i in 0..paragraphs {
        let class = if i % 5 == 0 { " class=\"note\"" } else { "" };
        doc.push_str(&format!(
            "<p{class}>Paragraph {i} sets a few lines of <b>running</b> text so \
             that line breaking and justification have something to chew on.</p>"
        ));
        if i % 10 == 9 {
            doc.push_str("<ul><li>first item</li><li>second item</li></ul>");
        }
    }
    doc.push_str("</body></html>");
    doc
}

/// Benchmark: one cascade lookup on a deep node (inheriting, so it climbs)
fn bench_resolve_inherited(c: &mut Criterion) {
    let sheet = sheet();
    let text = document(1);
    let doc = XmlDocument::parse(&text).expect("well-formed");
    let html = doc.root().children()[0];
    let body = html.children()[0];
    let p = body.children()[1];
    let b = p.children()[1];

    c.bench_function("resolve_inherited_color", |bench| {
        bench.iter(|| sheet.resolve(black_box(b), "color", ""));
    });
}

/// Benchmark: parse and lay out documents of N paragraphs
fn bench_layout_document(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_document");
    let sheet = sheet();
    let shape = Shape::rectangle(px(480));

    for count in [10, 100] {
        let text = document(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &text, |bench, text| {
            bench.iter(|| {
                let doc = XmlDocument::parse(text).expect("well-formed");
                layout_document(doc.root(), &sheet, &shape).expect("layout")
            });
        });
    }

    group.finish();
}

fn bench_save_layout(c: &mut Criterion) {
    let sheet = sheet();
    let text = document(100);
    let doc = XmlDocument::parse(&text).expect("well-formed");
    let layout = layout_document(doc.root(), &sheet, &Shape::rectangle(px(480))).expect("layout");

    c.bench_function("save_layout_100", |bench| {
        bench.iter(|| save_layout(black_box(&layout)).expect("serializable"));
    });
}

criterion_group!(
    benches,
    bench_resolve_inherited,
    bench_layout_document,
    bench_save_layout
);
criterion_main!(benches);
