//! Benchmarks for trajectory encode/decode and frame scanning.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

use xtraj::{Frame, TrajectoryReader, TrajectoryWriter, WriterConfig, scan_frames};

const BOX: [[f32; 3]; 3] = [[10.0, 0.0, 0.0], [0.0, 10.0, 0.0], [0.0, 0.0, 10.0]];

fn random_frame(rng: &mut StdRng, step: i32, atoms: usize) -> Frame {
    let coords = (0..atoms)
        .map(|_| {
            [
                rng.gen_range(-5.0f32..5.0),
                rng.gen_range(-5.0f32..5.0),
                rng.gen_range(-5.0f32..5.0),
            ]
        })
        .collect();
    Frame::new(step, step as f32 * 0.002, BOX, coords)
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_frame");

    for atoms in [100usize, 1_000, 10_000] {
        let mut rng = StdRng::seed_from_u64(42);
        let frame = random_frame(&mut rng, 0, atoms);
        let dir = tempdir().unwrap();
        let path = dir.path().join("bench.xtc");

        group.bench_with_input(BenchmarkId::from_parameter(atoms), &atoms, |b, _| {
            b.iter(|| {
                let mut writer =
                    TrajectoryWriter::create(&path, atoms as u32, WriterConfig::default()).unwrap();
                writer.write_frame(black_box(&frame)).unwrap();
                writer.finalize().unwrap()
            });
        });
    }
    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_frame");

    for atoms in [100usize, 1_000, 10_000] {
        let mut rng = StdRng::seed_from_u64(42);
        let dir = tempdir().unwrap();
        let path = dir.path().join("bench.xtc");
        let mut writer =
            TrajectoryWriter::create(&path, atoms as u32, WriterConfig::default()).unwrap();
        writer.write_frame(&random_frame(&mut rng, 0, atoms)).unwrap();
        writer.finalize().unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(atoms), &atoms, |b, _| {
            b.iter(|| {
                let mut reader = TrajectoryReader::open(&path).unwrap();
                black_box(reader.read_frame().unwrap())
            });
        });
    }
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_frames");

    for frames in [10usize, 100, 1_000] {
        let mut rng = StdRng::seed_from_u64(42);
        let dir = tempdir().unwrap();
        let path = dir.path().join("bench.xtc");
        let mut writer = TrajectoryWriter::create(&path, 500, WriterConfig::default()).unwrap();
        for step in 0..frames {
            writer
                .write_frame(&random_frame(&mut rng, step as i32, 500))
                .unwrap();
        }
        writer.finalize().unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(frames), &frames, |b, _| {
            b.iter(|| black_box(scan_frames(&path).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_write, bench_read, bench_scan);
criterion_main!(benches);
