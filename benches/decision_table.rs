use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec2;

use rust_wargame::army::{Profile, TroopType, Unit};
use rust_wargame::core::{GameState, PlayerId, UnitId};
use rust_wargame::lifecycle::UnitStatus;
use rust_wargame::resolution::{resolve_attacks, AttackRequest, SeededDice};
use rust_wargame::rules::RuleCatalog;
use rust_wargame::tables::{facts, FactVector};

fn battle() -> (GameState, UnitId, UnitId) {
    let mut state = GameState::new(PlayerId::A);
    let mut ids = Vec::new();
    for (owner, x) in [(PlayerId::A, 0.0), (PlayerId::B, 1.0)] {
        let mut unit = Unit::new(
            UnitId::new(0),
            "Spearmen",
            owner,
            TroopType::Infantry,
            Profile::line([4, 3, 3, 3, 3, 1, 3, 1, 7]),
            20,
            5,
        );
        unit.position = Vec2::new(x, 0.0);
        unit.placed = true;
        unit.status = UnitStatus::Active;
        ids.push(state.add_unit(unit).expect("unit added"));
    }
    (state, ids[0], ids[1])
}

fn bench_table_lookup(c: &mut Criterion) {
    let catalog = RuleCatalog::standard().expect("standard catalog");
    let input = FactVector::new()
        .with_int(facts::ATTACKER_WS, 4)
        .with_int(facts::DEFENDER_WS, 3)
        .with_int(facts::FIXED_TO_HIT, 0);

    c.bench_function("to_hit_lookup", |b| {
        b.iter(|| catalog.evaluate("to_hit_melee", black_box(&input)))
    });
}

fn bench_attack_sequence(c: &mut Criterion) {
    let catalog = RuleCatalog::standard().expect("standard catalog");
    let (state, a, b) = battle();
    let request = AttackRequest::melee(a, b, 10);
    let mut dice = SeededDice::new(7);

    c.bench_function("attack_sequence_10", |bench| {
        bench.iter(|| resolve_attacks(&state, &catalog, black_box(&request), &mut dice))
    });
}

fn bench_state_snapshot(c: &mut Criterion) {
    let (state, _, _) = battle();
    c.bench_function("state_clone", |b| b.iter(|| black_box(state.clone())));
}

criterion_group!(benches, bench_table_lookup, bench_attack_sequence, bench_state_snapshot);
criterion_main!(benches);
