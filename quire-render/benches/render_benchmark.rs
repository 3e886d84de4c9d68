//! Benchmarks for quire-render atlas passes and quad generation.

use std::hint::black_box;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use quire_core::{px, Color, Fixed};
use quire_render::{LayoutRenderer, QuadInstance, RenderTarget};
use quire_text::{
    FontCache, FontResource, LayoutCommand, SubPixelArrangement, SyntheticBackend, TextLayout,
};

/// Target that only touches the data it is handed.
struct NullTarget {
    bytes: usize,
}

impl RenderTarget for NullTarget {
    fn upload_atlas(&mut self, data: &[u8], _size: u32) {
        self.bytes += data.len();
    }

    fn draw_quads(&mut self, quads: &[QuadInstance]) {
        self.bytes += bytemuck::cast_slice::<QuadInstance, u8>(quads).len();
    }

    fn draw_image(&mut self, _x: f32, _y: f32, _w: f32, _h: f32, url: &str) {
        self.bytes += url.len();
    }
}

/// `n` glyphs cycling through the alphabet, with an underline every line.
fn make_layout(n: usize) -> TextLayout {
    let cache = FontCache::new(SyntheticBackend::new());
    let face = cache
        .face(&FontResource::new("box"), 1024)
        .expect("synthetic face");
    let mut layout = TextLayout::new();
    for i in 0..n {
        let x = (i % 80) as Fixed * 512;
        let y = (i / 80) as Fixed * 1023 + 819;
        let ch = char::from(b'a' + (i % 26) as u8);
        layout.push(
            LayoutCommand::Glyph {
                x,
                y,
                face: Rc::clone(&face),
                glyph: ch as u32,
                color: Color::BLACK,
                blur: 0,
            },
            x,
            x + 512,
        );
        if i % 80 == 79 {
            layout.push(LayoutCommand::rect(0, y + 100, px(640), 64, Color::BLACK), 0, px(640));
        }
    }
    layout
}

fn bench_show_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("show_layout");
    for &count in &[100, 1_000, 10_000] {
        let layout = make_layout(count);
        let mut renderer = LayoutRenderer::new(1024, SubPixelArrangement::None);
        group.bench_with_input(BenchmarkId::from_parameter(count), &layout, |b, layout| {
            b.iter(|| {
                let mut target = NullTarget { bytes: 0 };
                let stats = renderer
                    .show_layout(black_box(layout), 0, 0, &mut target)
                    .expect("render");
                black_box((stats, target.bytes))
            });
        });
    }
    group.finish();
}

/// Every frame starts from an atlas too small for the text, forcing clears.
fn bench_show_layout_thrashing(c: &mut Criterion) {
    let layout = make_layout(1_000);
    c.bench_function("show_layout_small_atlas", |b| {
        b.iter(|| {
            let mut renderer = LayoutRenderer::new(48, SubPixelArrangement::Rgb);
            let mut target = NullTarget { bytes: 0 };
            black_box(renderer.show_layout(&layout, 0, 0, &mut target).expect("render"))
        });
    });
}

criterion_group!(benches, bench_show_layout, bench_show_layout_thrashing);
criterion_main!(benches);
