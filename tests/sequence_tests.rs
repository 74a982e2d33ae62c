//! Turn sequence integration tests.
//!
//! These tests drive whole turns through a `GameSession`, feeding each
//! action exactly the dice it should consume.

mod common;

use common::{request, Battle};
use rust_wargame::army::SpellId;
use rust_wargame::core::{Action, ErrorKind, PlayerId, Reaction};
use rust_wargame::lifecycle::{CombatState, Milestone, UnitStatus};
use rust_wargame::sequencer::{outstanding, OutcomeDetail, Phase};

// =============================================================================
// Turn Order
// =============================================================================

/// Deployment leads into the first player's Strategy phase, and the
/// phases then follow in order.
#[test]
fn test_phase_order_and_turn_handover() {
    let mut battle = Battle::new(false);

    let outcome = battle.advance(PlayerId::A, &[3, 4]);
    let OutcomeDetail::PhaseAdvanced(change) = outcome.detail else {
        panic!("expected a phase change");
    };
    assert_eq!(change.to.round, 1);
    assert_eq!(change.to.phase, Phase::Strategy);
    assert_eq!(change.winds.unwrap().draws.as_slice(), &[3, 4]);

    let snapshot = battle.session.snapshot();
    assert_eq!(snapshot.unit(battle.a).unwrap().status, UnitStatus::Active);
    assert_eq!(snapshot.unit(battle.b).unwrap().status, UnitStatus::Active);

    for phase in [Phase::Movement, Phase::Shooting, Phase::Combat] {
        battle.advance(PlayerId::A, &[]);
        assert_eq!(battle.session.snapshot().phase(), phase);
    }

    // Second half of the round belongs to B.
    battle.advance(PlayerId::A, &[2, 2]);
    let snapshot = battle.session.snapshot();
    assert_eq!(snapshot.round(), 1);
    assert_eq!(snapshot.active_player(), PlayerId::B);
    assert_eq!(snapshot.phase(), Phase::Strategy);

    for _ in 0..3 {
        battle.advance(PlayerId::B, &[]);
    }
    battle.advance(PlayerId::B, &[1, 5]);
    let snapshot = battle.session.snapshot();
    assert_eq!(snapshot.round(), 2);
    assert_eq!(snapshot.active_player(), PlayerId::A);
}

/// The player not taking the turn cannot end the phase.
#[test]
fn test_only_active_player_advances() {
    let battle = Battle::new(false);
    common::step(&battle.session, request(PlayerId::A, Action::AdvancePhase), &[3, 3]);

    let response = battle.session.apply(request(PlayerId::B, Action::AdvancePhase));
    assert!(!response.success);
    assert_eq!(response.error.unwrap().code, ErrorKind::NotActivePlayer);
    assert_eq!(response.state.phase(), Phase::Strategy);
}

// =============================================================================
// Charges
// =============================================================================

/// A declared charge keeps the Movement phase open until it is rolled.
#[test]
fn test_declared_charge_blocks_phase_end() {
    let mut battle = Battle::new(false);
    battle.advance(PlayerId::A, &[3, 4]);
    battle.advance(PlayerId::A, &[]);
    battle.act(
        request(
            PlayerId::A,
            Action::DeclareCharge {
                unit: battle.a,
                target: battle.b,
            },
        ),
        &[],
    );

    assert_eq!(outstanding(&battle.session.snapshot()).len(), 1);
    let check = battle.session.check_action(&request(PlayerId::A, Action::AdvancePhase));
    assert!(!check.allowed);
    assert_eq!(check.reasons[0].code, ErrorKind::MandatoryTestsOutstanding);
}

/// Charge, hold, fight a round, and hand the turn over.
#[test]
fn test_charge_and_fight() {
    let mut battle = Battle::new(false);
    battle.advance(PlayerId::A, &[3, 4]);
    battle.advance(PlayerId::A, &[]);

    let declared = battle.act(
        request(
            PlayerId::A,
            Action::DeclareCharge {
                unit: battle.a,
                target: battle.b,
            },
        ),
        &[],
    );
    let OutcomeDetail::ChargeDeclared { range, .. } = declared.detail else {
        panic!("expected a declared charge");
    };
    assert_eq!((range.min, range.max), (6, 16));
    assert!(declared.milestones.contains(&Milestone::FirstCharge {
        unit: battle.a,
        target: battle.b
    }));

    battle.act(
        request(
            PlayerId::B,
            Action::DeclareReaction {
                unit: battle.b,
                reaction: Reaction::Hold,
            },
        ),
        &[],
    );

    // 4 + 4 + 3 = 11 against the 9 inches between the units.
    let resolved = battle.act(request(PlayerId::A, Action::ResolveCharge { unit: battle.a }), &[4, 3]);
    let OutcomeDetail::ChargeResolved(charge) = resolved.detail else {
        panic!("expected a resolved charge");
    };
    assert!(charge.roll.as_ref().unwrap().success);
    let combat = charge.combat.expect("combat opened");

    battle.advance(PlayerId::A, &[]);
    battle.advance(PlayerId::A, &[]);
    assert_eq!(
        battle.session.snapshot().combat(combat).unwrap().state,
        CombatState::Engaged
    );
    assert!(battle
        .session
        .legal_actions(PlayerId::A)
        .contains(&Action::FightCombat { combat }));

    // Every die a 2: all attacks miss, the charge decides it, and the
    // loser passes its break test.
    let fought = battle.act(request(PlayerId::A, Action::FightCombat { combat }), &[2; 40]);
    let OutcomeDetail::Combat(round) = fought.detail else {
        panic!("expected a combat round");
    };
    assert_eq!(round.score.as_ref().unwrap().winner, Some(PlayerId::A));
    assert!(!round.ended);
    assert!(round.break_tests.iter().all(|t| t.passed));

    let snapshot = battle.session.snapshot();
    assert_eq!(snapshot.combat(combat).unwrap().state, CombatState::ResolvedThisRound);
    assert_eq!(snapshot.unit(battle.a).unwrap().models, 10);

    battle.advance(PlayerId::A, &[5, 1]);
    assert_eq!(battle.session.snapshot().active_player(), PlayerId::B);
}

/// A unit that flees and is caught is destroyed for good.
#[test]
fn test_fleeing_unit_caught() {
    let mut battle = Battle::new(false);
    battle.advance(PlayerId::A, &[3, 4]);
    battle.advance(PlayerId::A, &[]);
    battle.act(
        request(
            PlayerId::A,
            Action::DeclareCharge {
                unit: battle.a,
                target: battle.b,
            },
        ),
        &[],
    );
    battle.act(
        request(
            PlayerId::B,
            Action::DeclareReaction {
                unit: battle.b,
                reaction: Reaction::Flee,
            },
        ),
        &[],
    );

    // Flee 2 inches, then charge 16 against 11.
    let resolved = battle.act(
        request(PlayerId::A, Action::ResolveCharge { unit: battle.a }),
        &[1, 1, 6, 6],
    );
    let OutcomeDetail::ChargeResolved(charge) = &resolved.detail else {
        panic!("expected a resolved charge");
    };
    assert_eq!(charge.flee.as_ref().unwrap().distance, 2);
    assert!(charge.caught);
    assert!(charge.combat.is_none());
    assert!(resolved.milestones.contains(&Milestone::Fled { unit: battle.b }));
    assert!(resolved.milestones.contains(&Milestone::Destroyed { unit: battle.b }));
    assert_eq!(resolved.draws, vec![1, 1, 6, 6]);

    let snapshot = battle.session.snapshot();
    assert_eq!(snapshot.unit(battle.b).unwrap().status, UnitStatus::Destroyed);

    // Nothing brings it back.
    let mut copy = (*snapshot).clone();
    for status in [UnitStatus::Active, UnitStatus::Fleeing, UnitStatus::Rallied, UnitStatus::Deployed] {
        assert!(copy.set_status(battle.b, status).is_err());
    }
    assert_eq!(copy, *snapshot);
}

// =============================================================================
// Magic
// =============================================================================

/// Cast, dispel, and the phase stays blocked until the dispel is taken.
#[test]
fn test_cast_then_dispel() {
    let mut battle = Battle::new(true);
    // A gets 9 casting dice, B gets 5 dispel dice.
    battle.advance(PlayerId::A, &[4, 5]);
    let snapshot = battle.session.snapshot();
    assert_eq!(snapshot.pools().casting[PlayerId::A], 9);
    assert_eq!(snapshot.pools().dispel[PlayerId::B], 5);

    let caster = battle.caster();
    let cast = battle.act(
        request(
            PlayerId::A,
            Action::CastSpell {
                caster,
                spell: SpellId::new("iron_skin"),
                target: battle.a,
                dice: 2,
            },
        ),
        &[4, 4],
    );
    assert!(matches!(cast.detail, OutcomeDetail::Cast { effect: None, .. }));

    let blocked = battle.session.check_action(&request(PlayerId::A, Action::AdvancePhase));
    assert!(!blocked.allowed);
    assert_eq!(battle.session.legal_actions(PlayerId::A), Vec::new());

    // 6 + 5 + 1 = 12 beats 4 + 4 + 2 = 10.
    let dispel = battle.act(request(PlayerId::B, Action::Dispel { dice: 2 }), &[6, 5]);
    let OutcomeDetail::Dispel { attempt, effect } = dispel.detail else {
        panic!("expected a dispel");
    };
    assert!(attempt.dispelled);
    assert!(effect.is_none());

    let snapshot = battle.session.snapshot();
    assert_eq!(snapshot.effects().count(), 0);
    assert!(snapshot.pending_cast().is_none());
    assert!(battle.session.check_action(&request(PlayerId::A, Action::AdvancePhase)).allowed);
}

/// Explanations cite the rules behind a ruling.
#[test]
fn test_outcome_explanation() {
    let mut battle = Battle::new(true);
    battle.advance(PlayerId::A, &[4, 5]);
    let caster = battle.caster();
    let cast = battle.act(
        request(
            PlayerId::A,
            Action::CastSpell {
                caster,
                spell: SpellId::new("iron_skin"),
                target: battle.a,
                dice: 2,
            },
        ),
        &[4, 4],
    );

    let trace = battle.session.trace(cast.id).expect("trace recorded");
    assert!(!trace.is_empty());
    assert_eq!(trace.draws(), vec![4, 4]);
    let citations = battle.session.explain(cast.id).unwrap();
    assert!(citations.iter().any(|c| c.source == "Core Rules"));
}
