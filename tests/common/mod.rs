//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use glam::Vec2;

use rust_wargame::army::{
    Character, DurationClass, Profile, Spell, SpellCategory, SpellEffectSpec, TroopType, Unit,
};
use rust_wargame::core::{Action, ActionRequest, CharacterId, GameState, PlayerId, UnitId};
use rust_wargame::explain::Citation;
use rust_wargame::resolution::ScriptedDice;
use rust_wargame::rules::{RuleCatalog, RuleId, RuleScope, SpecialRule, TestCategory};
use rust_wargame::sequencer::{GameSession, Outcome};
use rust_wargame::tables::facts;

/// Standard tables plus a small lore and a few unit rules.
pub fn catalog() -> Arc<RuleCatalog> {
    let cite = |page| Citation::new("Lore of Metal", page);
    let catalog = RuleCatalog::builder()
        .rule(
            SpecialRule::new("iron_skin", "Iron Skin", RuleScope::SpellEffect, cite(3))
                .applies_to(TestCategory::ArmourSave)
                .add(facts::ARMOUR, -1),
        )
        .rule(
            SpecialRule::new("swift", "Swift", RuleScope::Unit, Citation::new("Army Book", 12))
                .applies_to(TestCategory::ChargeRange)
                .add(facts::CHARGE_BONUS, 3),
        )
        .spell(
            Spell::new(
                "iron_skin",
                "Iron Skin",
                "Metal",
                6,
                SpellCategory::Enchantment,
                12.0,
                SpellEffectSpec::Augment {
                    rules: vec![RuleId::new("iron_skin")],
                },
                cite(3),
            )
            .lasting(DurationClass::RemainsInPlay),
        )
        .build()
        .expect("test catalog builds");
    Arc::new(catalog)
}

/// Ten spearmen, five wide.
pub fn spearmen(owner: PlayerId) -> Unit {
    Unit::new(
        UnitId::new(0),
        "Spearmen",
        owner,
        TroopType::Infantry,
        Profile::line([4, 3, 3, 3, 3, 1, 3, 1, 7]),
        10,
        5,
    )
}

/// A wizard of `level` who knows Iron Skin.
pub fn wizard(level: u8) -> Character {
    Character::new(CharacterId::new(0), "Wizard", Profile::line([4, 3, 3, 3, 3, 2, 3, 1, 7]))
        .wizard(level, ["iron_skin"])
}

pub fn request(player: PlayerId, action: Action) -> ActionRequest {
    ActionRequest::new(player, action)
}

pub fn deploy(player: PlayerId, unit: UnitId, x: f32) -> ActionRequest {
    request(
        player,
        Action::DeployUnit {
            unit,
            position: Vec2::new(x, 0.0),
            facing: 0.0,
        },
    )
}

/// Apply `request` with exactly the scripted draws; panics on rejection.
pub fn step(session: &GameSession, request: ActionRequest, draws: &[u8]) -> Outcome {
    let mut dice = ScriptedDice::new(draws.to_vec());
    match session.apply_with_dice(request.clone(), &mut dice).into_result() {
        Ok(outcome) => outcome,
        Err(err) => panic!("{:?} rejected: {} ({:?})", request.action, err.message, err.code),
    }
}

/// Two units facing each other ten inches apart, deployed, first turn
/// about to begin. Side A may carry a level 2 wizard and side B a level 1.
pub struct Battle {
    pub session: GameSession,
    pub initial: GameState,
    pub a: UnitId,
    pub b: UnitId,
    pub log: Vec<(ActionRequest, Outcome)>,
}

impl Battle {
    pub fn new(with_wizards: bool) -> Self {
        let mut state = GameState::new(PlayerId::A);
        let mut a = spearmen(PlayerId::A);
        let mut b = spearmen(PlayerId::B);
        if with_wizards {
            a = a.with_character(wizard(2));
            b = b.with_character(wizard(1));
        }
        let a = state.add_unit(a).expect("unit a");
        let b = state.add_unit(b).expect("unit b");
        let initial = state.clone();
        let mut battle = Self {
            session: GameSession::new(state, catalog(), ScriptedDice::default()),
            initial,
            a,
            b,
            log: Vec::new(),
        };
        battle.act(deploy(PlayerId::A, a, 0.0), &[]);
        battle.act(deploy(PlayerId::B, b, 10.0), &[]);
        battle
    }

    /// Apply and log an action.
    pub fn act(&mut self, request: ActionRequest, draws: &[u8]) -> Outcome {
        let outcome = step(&self.session, request.clone(), draws);
        self.log.push((request, outcome.clone()));
        outcome
    }

    pub fn advance(&mut self, player: PlayerId, draws: &[u8]) -> Outcome {
        self.act(request(player, Action::AdvancePhase), draws)
    }

    pub fn caster(&self) -> CharacterId {
        self.session.snapshot().unit(self.a).expect("unit a").characters[0].id
    }
}
