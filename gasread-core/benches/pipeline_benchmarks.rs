//! Pipeline Performance Benchmarks
//!
//! Covers the pieces that run on every request:
//! - Metric extraction over short and long printouts
//! - Each preprocessing variant at typical phone-photo sizes
//! - A full `perform_ocr_blocking` run over the mock engine
//!
//! Run with: `cargo bench --bench pipeline_benchmarks`

use base64::Engine as _;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gasread::metrics::extract_from_text;
use gasread::ocr::MockOcrProvider;
use gasread::preprocess::{Preprocessor, VariantKind};
use gasread::{OcrMode, OcrPipeline, OcrRequest, PipelineConfig};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

const PRINTOUT: &str = "ABL90 FLEX\nPatient report\npH(T) 7.318\npCcO(T) 25.9 mmHg\npO2 95 mmHg\n\
cHCO3-(P,st)c 22.1 mmol/L\ncBase(Ecf) -4.2 mmol/L\ncNa+ 138 mmol/L\ncK+ 4.2 mmol/L\n\
cCl- 104 mmol/L\ncCa2+ 1.21 mmol/L\nctHb 13.8 g/dL\nsO2 97.5 %\ncGlu 5.6 mmol/L\ncLac 1.2 mmol/L\n\
FO2Hb 96.1 %\nFCOHb 1.2 %\nFMetHb 0.8 %";

fn synthetic_page(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
        if y % 28 < 5 && (x / 9) % 4 != 0 {
            Luma([30])
        } else {
            Luma([228])
        }
    }))
}

fn benchmark_extraction(c: &mut Criterion) {
    let short = "pH 7.40 pCO2 40 mmHg pO2 95 mmHg HCO3 24";
    c.bench_function("extract_short", |b| b.iter(|| extract_from_text(black_box(short))));
    c.bench_function("extract_full_printout", |b| {
        b.iter(|| extract_from_text(black_box(PRINTOUT)))
    });

    let noise = "lorem ipsum dolor sit amet 12.5 ".repeat(200);
    c.bench_function("extract_no_metrics", |b| {
        b.iter(|| extract_from_text(black_box(&noise)))
    });
}

fn benchmark_preprocessing(c: &mut Criterion) {
    let preprocessor = Preprocessor::default();
    let mut group = c.benchmark_group("preprocess_variant");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    for (width, height) in [(640, 480), (1280, 960)] {
        let page = synthetic_page(width, height);
        for kind in VariantKind::ALL {
            group.bench_with_input(
                BenchmarkId::new(kind.name(), format!("{width}x{height}")),
                &page,
                |b, page| b.iter(|| preprocessor.build(black_box(page), kind)),
            );
        }
    }
    group.finish();
}

fn benchmark_pipeline(c: &mut Criterion) {
    let pipeline = OcrPipeline::new(
        Arc::new(MockOcrProvider::new()),
        PipelineConfig::default().with_workers(1),
    )
    .expect("pipeline");

    let mut bytes = Vec::new();
    synthetic_page(800, 600)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode PNG");
    let payload = base64::engine::general_purpose::STANDARD.encode(bytes);

    let mut group = c.benchmark_group("perform_ocr");
    group.sample_size(10);
    for mode in [OcrMode::Fast, OcrMode::Enhanced] {
        let request = OcrRequest::new(payload.clone()).with_mode(mode);
        group.bench_with_input(BenchmarkId::from_parameter(mode), &request, |b, request| {
            b.iter(|| pipeline.perform_ocr_blocking(black_box(request)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_extraction,
    benchmark_preprocessing,
    benchmark_pipeline
);
criterion_main!(benches);
