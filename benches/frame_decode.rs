use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use seedrender::RenderFrame;
use tempfile::TempDir;

fn write_gradient(dir: &TempDir, size: u32) -> std::path::PathBuf {
    let path = dir.path().join(format!("frame_{size}.png"));
    let img = image::RgbaImage::from_fn(size, size, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    });
    img.save(&path).expect("write bench image");
    path
}

fn bench_frame_decode(c: &mut Criterion) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut group = c.benchmark_group("frame_decode");
    group.sample_size(20);

    // Poll ticks re-read the whole image, so decode cost bounds the useful refresh rate
    for &size in &[64u32, 512, 1920] {
        let path = write_gradient(&dir, size);
        group.bench_with_input(BenchmarkId::new("png", size), &path, |b, path| {
            b.iter(|| {
                let frame = RenderFrame::load(black_box(path)).unwrap();
                black_box(frame.pixels().len())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_frame_decode);
criterion_main!(benches);
