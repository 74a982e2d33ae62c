//! Game state.
//!
//! `GameState` is the single root of everything that changes during a
//! game: turn position, units, combats, active spell effects, terrain,
//! magic pools and the interactions waiting to be resolved.
//!
//! ## Copy-on-write
//!
//! Collections are `im` persistent structures, so cloning a state is O(1)
//! and unchanged parts stay shared. The sequencer applies every action to
//! a clone of the committed state and swaps it in only when the whole
//! action succeeded.
//!
//! ## Primitives
//!
//! `set_unit_position`, `apply_spell_effect`, `remove_spell_effect`,
//! `add_casualties` and `set_status` are the only ways handlers change
//! units and effects. `set_status` enforces the unit lifecycle table.

use glam::Vec2;
use im::{OrdMap, Vector};
use serde::{Deserialize, Serialize};

use super::entity::{CharacterId, CombatId, EffectId, IdAllocator, TerrainId, UnitId};
use super::error::{Result, RulesError};
use super::player::{PlayerId, PlayerMap};
use crate::army::{CasualtyReport, Character, TerrainFeature, Unit};
use crate::lifecycle::{status, Combat, DeclaredCharge, UnitStatus};
use crate::magic::{ActiveSpellEffect, MagicPools, PendingCast};
use crate::rules::RuleId;
use crate::sequencer::Phase;

/// The authoritative state of one game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    round: u32,
    active_player: PlayerId,
    first_player: PlayerId,
    phase: Phase,

    units: OrdMap<UnitId, Unit>,
    combats: OrdMap<CombatId, Combat>,
    effects: OrdMap<EffectId, ActiveSpellEffect>,
    terrain: OrdMap<TerrainId, TerrainFeature>,
    army_rules: PlayerMap<Vec<RuleId>>,

    pools: MagicPools,
    pending_cast: Option<PendingCast>,
    charges: Vector<DeclaredCharge>,
    rally_queue: Vector<UnitId>,

    ids: IdAllocator,
}

impl GameState {
    /// A game in the deployment phase.
    #[must_use]
    pub fn new(first_player: PlayerId) -> Self {
        Self {
            round: 0,
            active_player: first_player,
            first_player,
            phase: Phase::Deployment,
            units: OrdMap::new(),
            combats: OrdMap::new(),
            effects: OrdMap::new(),
            terrain: OrdMap::new(),
            army_rules: PlayerMap::default(),
            pools: MagicPools::default(),
            pending_cast: None,
            charges: Vector::new(),
            rally_queue: Vector::new(),
            ids: IdAllocator::default(),
        }
    }

    // === Setup ===

    /// Add a unit. A unit id of 0 is replaced by a fresh one.
    ///
    /// Character ids of 0 are likewise replaced.
    pub fn add_unit(&mut self, mut unit: Unit) -> Result<UnitId> {
        if unit.id.raw() == 0 {
            unit.id = self.ids.unit();
        } else if self.units.contains_key(&unit.id) {
            return Err(RulesError::InvalidAction(format!("{} already exists", unit.id)));
        } else {
            self.ids.observe_unit(unit.id);
        }
        for character in &mut unit.characters {
            if character.id.raw() == 0 {
                character.id = self.ids.character();
            } else {
                self.ids.observe_character(character.id);
            }
        }
        unit.flags.models_at_phase_start = unit.model_count();
        let id = unit.id;
        self.units.insert(id, unit);
        Ok(id)
    }

    /// Add a terrain feature. A terrain id of 0 is replaced by a fresh one.
    pub fn add_terrain(&mut self, mut feature: TerrainFeature) -> TerrainId {
        if feature.id.raw() == 0 {
            feature.id = self.ids.terrain();
        } else {
            self.ids.observe_terrain(feature.id);
        }
        let id = feature.id;
        self.terrain.insert(id, feature);
        id
    }

    /// Set the army-wide rules of a side.
    pub fn set_army_rules(&mut self, player: PlayerId, rules: Vec<RuleId>) {
        self.army_rules[player] = rules;
    }

    // === Turn position ===

    /// Current round (0 during deployment).
    #[must_use]
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Player whose turn it is.
    #[must_use]
    pub fn active_player(&self) -> PlayerId {
        self.active_player
    }

    /// Player who takes the first turn of each round.
    #[must_use]
    pub fn first_player(&self) -> PlayerId {
        self.first_player
    }

    /// Move to a new turn position. Positions only move forward.
    pub(crate) fn set_turn(&mut self, round: u32, player: PlayerId, phase: Phase) -> Result<()> {
        let key = |r: u32, p: PlayerId, ph: Phase| {
            let turn = if p == self.first_player { 0 } else { 1 };
            (r, turn, ph.order())
        };
        if key(round, player, phase) <= key(self.round, self.active_player, self.phase) {
            return Err(RulesError::InvalidAction(format!(
                "turn position cannot go back to round {} {} {}",
                round, player, phase
            )));
        }
        self.round = round;
        self.active_player = player;
        self.phase = phase;
        Ok(())
    }

    // === Units ===

    /// Look up a unit, destroyed ones included.
    pub fn unit(&self, id: UnitId) -> Result<&Unit> {
        self.units.get(&id).ok_or(RulesError::UnknownUnit(id))
    }

    /// Look up a unit mutably. Crate-internal so that status only ever
    /// changes through [`GameState::set_status`].
    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit> {
        self.units.get_mut(&id).ok_or(RulesError::UnknownUnit(id))
    }

    /// Every unit in id order, destroyed ones included.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values()
    }

    /// Units on the table and not destroyed, in id order.
    pub fn live_units(&self) -> impl Iterator<Item = &Unit> {
        self.units.values().filter(|u| u.is_on_table())
    }

    /// Live units of one side.
    pub fn live_units_of(&self, player: PlayerId) -> impl Iterator<Item = &Unit> {
        self.live_units().filter(move |u| u.owner == player)
    }

    /// Ids of every unit, in order.
    #[must_use]
    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.units.keys().copied().collect()
    }

    /// Find a character and the unit it belongs to.
    pub fn character(&self, id: CharacterId) -> Result<(&Unit, &Character)> {
        self.units
            .values()
            .find_map(|u| u.character(id).map(|c| (u, c)))
            .ok_or(RulesError::UnknownCharacter(id))
    }

    /// Distance between two unit centres.
    pub fn distance(&self, a: UnitId, b: UnitId) -> Result<f32> {
        Ok(self.unit(a)?.position.distance(self.unit(b)?.position))
    }

    /// Set a unit's position.
    pub fn set_unit_position(&mut self, id: UnitId, position: Vec2) -> Result<()> {
        self.unit_mut(id)?.position = position;
        Ok(())
    }

    /// Apply wounds to a unit. Does not change its status.
    pub fn add_casualties(&mut self, id: UnitId, wounds: u32) -> Result<CasualtyReport> {
        let unit = self.unit_mut(id)?;
        if unit.status == UnitStatus::Destroyed {
            return Err(RulesError::InvalidTarget {
                target: id,
                reason: "unit is destroyed".to_string(),
            });
        }
        Ok(unit.take_wounds(wounds))
    }

    /// Change a unit's status, following the lifecycle table.
    ///
    /// Returns the previous status. An illegal transition fails with
    /// `IllegalStateTransition` and leaves the unit untouched.
    ///
    /// Units on the table cannot be mutated any other way:
    ///
    /// ```compile_fail
    /// use rust_wargame::core::{GameState, PlayerId, UnitId};
    /// use rust_wargame::lifecycle::UnitStatus;
    ///
    /// let mut state = GameState::new(PlayerId::A);
    /// state.unit_mut(UnitId::new(1)).unwrap().status = UnitStatus::Active;
    /// ```
    pub fn set_status(&mut self, id: UnitId, to: UnitStatus) -> Result<UnitStatus> {
        let unit = self.unit_mut(id)?;
        let from = unit.status;
        if !status::can_transition(from, to) {
            return Err(RulesError::IllegalStateTransition { unit: id, from, to });
        }
        unit.status = to;
        Ok(from)
    }

    // === Terrain and army rules ===

    /// Every terrain feature.
    pub fn terrain(&self) -> impl Iterator<Item = &TerrainFeature> {
        self.terrain.values()
    }

    /// Terrain features containing a point.
    pub fn terrain_at(&self, p: Vec2) -> impl Iterator<Item = &TerrainFeature> {
        self.terrain.values().filter(move |t| t.bounds.contains(p))
    }

    /// Army-wide rules of a side.
    #[must_use]
    pub fn army_rules(&self, player: PlayerId) -> &[RuleId] {
        &self.army_rules[player]
    }

    // === Combats ===

    /// Look up a combat.
    pub fn combat(&self, id: CombatId) -> Result<&Combat> {
        self.combats.get(&id).ok_or(RulesError::UnknownCombat(id))
    }

    /// Look up a combat mutably.
    pub fn combat_mut(&mut self, id: CombatId) -> Result<&mut Combat> {
        self.combats.get_mut(&id).ok_or(RulesError::UnknownCombat(id))
    }

    /// Every combat in id order.
    pub fn combats(&self) -> impl Iterator<Item = &Combat> {
        self.combats.values()
    }

    /// Register a new combat and allocate its id.
    pub(crate) fn insert_combat(&mut self, mut combat: Combat) -> CombatId {
        combat.id = self.ids.combat();
        let id = combat.id;
        self.combats.insert(id, combat);
        id
    }

    /// Remove a combat.
    pub(crate) fn remove_combat(&mut self, id: CombatId) -> Result<Combat> {
        self.combats.remove(&id).ok_or(RulesError::UnknownCombat(id))
    }

    // === Spell effects ===

    /// Look up an active spell effect.
    pub fn effect(&self, id: EffectId) -> Result<&ActiveSpellEffect> {
        self.effects.get(&id).ok_or(RulesError::UnknownEffect(id))
    }

    /// Every active spell effect in id order.
    pub fn effects(&self) -> impl Iterator<Item = &ActiveSpellEffect> {
        self.effects.values()
    }

    /// Effects targeting a unit.
    pub fn effects_on(&self, unit: UnitId) -> impl Iterator<Item = &ActiveSpellEffect> {
        self.effects.values().filter(move |e| e.target == unit)
    }

    /// Register an active spell effect and allocate its id.
    pub fn apply_spell_effect(&mut self, mut effect: ActiveSpellEffect) -> EffectId {
        effect.id = self.ids.effect();
        let id = effect.id;
        self.effects.insert(id, effect);
        id
    }

    /// Remove an active spell effect.
    pub fn remove_spell_effect(&mut self, id: EffectId) -> Result<ActiveSpellEffect> {
        self.effects.remove(&id).ok_or(RulesError::UnknownEffect(id))
    }

    // === Magic and pending interactions ===

    /// Casting and dispel pools.
    #[must_use]
    pub fn pools(&self) -> &MagicPools {
        &self.pools
    }

    /// Casting and dispel pools, mutably.
    pub fn pools_mut(&mut self) -> &mut MagicPools {
        &mut self.pools
    }

    /// The cast waiting for a dispel attempt, if any.
    #[must_use]
    pub fn pending_cast(&self) -> Option<&PendingCast> {
        self.pending_cast.as_ref()
    }

    pub(crate) fn set_pending_cast(&mut self, cast: Option<PendingCast>) {
        self.pending_cast = cast;
    }

    pub(crate) fn take_pending_cast(&mut self) -> Option<PendingCast> {
        self.pending_cast.take()
    }

    /// Declared charges not yet resolved, in declaration order.
    pub fn charges(&self) -> impl Iterator<Item = &DeclaredCharge> {
        self.charges.iter()
    }

    /// The declared charge of a unit.
    #[must_use]
    pub fn charge_of(&self, charger: UnitId) -> Option<&DeclaredCharge> {
        self.charges.iter().find(|c| c.charger == charger)
    }

    pub(crate) fn charges_mut(&mut self) -> &mut Vector<DeclaredCharge> {
        &mut self.charges
    }

    /// Units that still owe a rally test.
    pub fn rally_queue(&self) -> impl Iterator<Item = &UnitId> {
        self.rally_queue.iter()
    }

    pub(crate) fn rally_queue_mut(&mut self) -> &mut Vector<UnitId> {
        &mut self.rally_queue
    }

    // === Snapshots ===

    /// Encode the state with bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| RulesError::Snapshot(e.to_string()))
    }

    /// Decode a state produced by [`GameState::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| RulesError::Snapshot(e.to_string()))
    }
}
