use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal::Decimal;

use lootpool_core::{CharacterId, Rate};
use lootpool_shares::{calculate_participation, ParticipantStake};

fn fleet_stakes(count: u32) -> Vec<ParticipantStake> {
    (0..count)
        .map(|i| ParticipantStake {
            character: CharacterId::new(),
            share_quantity: 1 + i % 4,
            flat_percent_cut: if i == 0 {
                Rate::from_percent(Decimal::from(5)).unwrap()
            } else {
                Rate::zero()
            },
        })
        .collect()
}

fn bench_participation(c: &mut Criterion) {
    let small = fleet_stakes(10);
    let large = fleet_stakes(200);

    c.bench_function("participation_10", |b| {
        b.iter(|| calculate_participation(black_box(8_500_000_000), black_box(&small)))
    });
    c.bench_function("participation_200", |b| {
        b.iter(|| calculate_participation(black_box(8_500_000_000), black_box(&large)))
    });
}

criterion_group!(benches, bench_participation);
criterion_main!(benches);
