use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use futures::stream;
use std::hint::black_box;
use std::time::Duration;
use stow_storage::{Storage, sanitize};
use tempfile::TempDir;

// ============================================================================
// Benchmark: Filename Sanitization
// ============================================================================

fn bench_sanitize(c: &mut Criterion) {
    let mut group = c.benchmark_group("sanitize");

    let long = format!("{}.png", "long name ".repeat(40));
    let inputs = [
        ("plain", "photo.png"),
        ("traversal", "../../etc/../some/filename.png"),
        ("cyrillic", "супер пупер домумент.docx"),
        ("long", long.as_str()),
    ];

    for (name, raw) in inputs {
        group.bench_with_input(BenchmarkId::from_parameter(name), raw, |b, raw| {
            b.iter(|| black_box(sanitize(black_box(raw))));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Save Throughput
// ============================================================================

fn bench_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("save");
    group.measurement_time(Duration::from_secs(10));

    let temp = TempDir::new().unwrap();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let storage = rt.block_on(async {
        Storage::builder()
            .root(temp.path())
            .allowed_extensions(["bin"])
            .max_size(16 * 1024 * 1024)
            .connect()
            .await
            .unwrap()
    });

    let sizes = [("4KB", 4 * 1024), ("64KB", 64 * 1024), ("1MB", 1024 * 1024)];

    for (name, size) in sizes {
        let chunk = Bytes::from(vec![0xA5u8; 16 * 1024]);
        let chunk_count = size / chunk.len().min(size);
        let chunk = chunk.slice(..chunk.len().min(size));

        group.throughput(Throughput::Bytes(u64::try_from(size).unwrap_or(u64::MAX)));
        group.bench_function(BenchmarkId::new("stream", name), |b| {
            b.to_async(&rt).iter(|| {
                let storage = storage.clone();
                let body = stream::iter(
                    std::iter::repeat_n(chunk.clone(), chunk_count).map(Ok::<_, std::io::Error>),
                );
                async move {
                    let saved = storage.save("payload.bin", body).await.unwrap();
                    storage.delete(&saved.name).await.unwrap();
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sanitize, bench_save);
criterion_main!(benches);
