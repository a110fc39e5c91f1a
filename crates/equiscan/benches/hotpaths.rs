use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use equiscan::backproject::back_project_all;
use equiscan::face::render_face;
use equiscan::{BoundingBox, Detection, FaceLayout, FaceOrientation, Interpolation, Panorama};

fn make_panorama(w: u32, h: u32, seed: u64) -> Panorama {
    let mut rng = StdRng::seed_from_u64(seed);
    let img = RgbImage::from_fn(w, h, |_, _| Rgb([rng.gen(), rng.gen(), rng.gen()]));
    Panorama::new(img).expect("non-empty panorama")
}

fn make_detections(layout: &FaceLayout, n: usize, seed: u64) -> Vec<Detection> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let face_id = rng.gen_range(0..layout.len());
            let size = layout.get(face_id).expect("face").orientation.width() as f64;
            let x0 = rng.gen_range(0.0..size * 0.8);
            let y0 = rng.gen_range(0.0..size * 0.8);
            let bw = rng.gen_range(4.0..size * 0.2);
            let bh = rng.gen_range(4.0..size * 0.2);
            Detection {
                face_id,
                bbox: BoundingBox::new(x0, y0, x0 + bw, y0 + bh),
                class_id: (i % 6) as u32,
                label: String::new(),
                confidence: 0.5,
            }
        })
        .collect()
}

fn bench_render_face(c: &mut Criterion) {
    let pano = make_panorama(4096, 2048, 7);
    let front = FaceOrientation::from_degrees(0.0, 0.0, 90.0, 90.0, 1024, 1024).expect("face");
    let tilted = FaceOrientation::from_degrees(170.0, 35.0, 90.0, 90.0, 1024, 1024).expect("face");

    c.bench_function("render_face_1024_bilinear", |b| {
        b.iter(|| {
            let img = render_face(black_box(&pano), black_box(&front), Interpolation::Bilinear);
            black_box(img.width())
        })
    });

    c.bench_function("render_face_1024_seam_nearest", |b| {
        b.iter(|| {
            let img = render_face(black_box(&pano), black_box(&tilted), Interpolation::Nearest);
            black_box(img.width())
        })
    });
}

fn bench_back_project(c: &mut Criterion) {
    let layout = FaceLayout::tree_survey(30.0, 1024).expect("layout");
    let detections = make_detections(&layout, 2000, 11);

    c.bench_function("back_project_2000_detections", |b| {
        b.iter(|| {
            let out = back_project_all(black_box(&detections), &layout, 8192, 4096);
            black_box(out.len())
        })
    });
}

criterion_group!(hotpaths, bench_render_face, bench_back_project);
criterion_main!(hotpaths);
