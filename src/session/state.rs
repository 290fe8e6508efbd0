//! Combat session state machine
//!
//! `active -> ended`. Turn order is fixed at creation. Every handler runs to
//! completion (action, turn advance, any round transition) and returns the
//! events it produced, in order.

use ahash::AHashMap;

use crate::combat::combatant::Combatant;
use crate::combat::constants::FLANKING_BONUS_DICE;
use crate::combat::dice::DiceSource;
use crate::combat::effects::{ExpiredEffect, StatusKind};
use crate::combat::resolution::{resolve_attack, AttackContext, AttackResult};
use crate::combat::wounds::{assess_wounds, WoundAssessment};
use crate::core::config::CombatConfig;
use crate::core::error::{SessionError, SessionResult as Result};
use crate::core::types::{CharacterId, SessionId, Team};
use crate::session::actions::{Action, ActionReport};
use crate::session::events::{BleedTick, CombatEvent, SkipReason};
use crate::session::turn_order::initiative_order;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Ended,
}

pub struct CombatSession {
    pub id: SessionId,
    pub region: String,
    pub status: SessionStatus,
    pub round: u32,
    pub winning_team: Option<Team>,
    pub wound_assessments: Vec<WoundAssessment>,
    combatants: AHashMap<CharacterId, Combatant>,
    turn_order: Vec<CharacterId>,
    turn_index: usize,
    config: CombatConfig,
    dice: Box<dyn DiceSource + Send>,
}

impl std::fmt::Debug for CombatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatSession")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("round", &self.round)
            .field("turn_order", &self.turn_order)
            .field("current_turn", &self.current_turn())
            .finish()
    }
}

impl CombatSession {
    /// Build a session; both teams need at least one standing combatant
    pub fn new(
        id: SessionId,
        region: impl Into<String>,
        combatants: Vec<Combatant>,
        config: CombatConfig,
        dice: Box<dyn DiceSource + Send>,
    ) -> Result<Self> {
        let standing = |team: Team| combatants.iter().any(|c| c.team == team && c.is_standing());
        if !standing(Team::One) || !standing(Team::Two) {
            return Err(SessionError::NotEnoughCombatants);
        }

        let turn_order = initiative_order(&combatants);
        let combatants = combatants.into_iter().map(|c| (c.id, c)).collect();

        Ok(Self {
            id,
            region: region.into(),
            status: SessionStatus::Active,
            round: 1,
            winning_team: None,
            wound_assessments: Vec::new(),
            combatants,
            turn_order,
            turn_index: 0,
            config,
            dice,
        })
    }

    /// Open the fight: announce the roster and hand the first turn out
    pub fn start(&mut self) -> Vec<CombatEvent> {
        let mut events = Vec::new();
        let first_ready = self
            .combatant(self.turn_order[0])
            .is_some_and(|c| c.is_standing());
        if !first_ready {
            self.advance_turn(&mut events);
        }

        let mut opening = vec![CombatEvent::SessionStart {
            session_id: self.id,
            combatants: self.roster(),
            turn_order: self.turn_order.clone(),
            current_turn_character_id: self.current_turn(),
            round: self.round,
        }];
        if first_ready {
            opening.push(self.turn_start_event());
        }
        opening.extend(events);
        opening
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Character whose turn it is, while the session is active
    pub fn current_turn(&self) -> Option<CharacterId> {
        if !self.is_active() {
            return None;
        }
        self.turn_order.get(self.turn_index).copied()
    }

    pub fn turn_order(&self) -> &[CharacterId] {
        &self.turn_order
    }

    pub fn combatant(&self, id: CharacterId) -> Option<&Combatant> {
        self.combatants.get(&id)
    }

    pub fn combatants(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.values()
    }

    /// Combatants cloned in turn order, for event payloads
    pub fn roster(&self) -> Vec<Combatant> {
        self.turn_order
            .iter()
            .filter_map(|id| self.combatants.get(id).cloned())
            .collect()
    }

    /// Mark a combatant as driven by the NPC scheduler
    pub fn set_autonomous(&mut self, id: CharacterId, autonomous: bool) {
        if let Some(c) = self.combatants.get_mut(&id) {
            c.autonomous = autonomous;
        }
    }

    /// Someone other than `id` currently protects them
    pub fn protector_of(&self, id: CharacterId) -> Option<CharacterId> {
        self.combatants
            .values()
            .find(|c| c.id != id && c.is_standing() && c.protecting == Some(id))
            .map(|c| c.id)
    }

    /// Standing enemies of `id`
    pub fn enemies_of(&self, id: CharacterId) -> Vec<&Combatant> {
        let Some(me) = self.combatants.get(&id) else {
            return Vec::new();
        };
        let mut enemies: Vec<&Combatant> = self
            .combatants
            .values()
            .filter(|c| c.team != me.team && c.is_standing())
            .collect();
        enemies.sort_by_key(|c| c.id);
        enemies
    }

    /// Validate and apply an action for the combatant holding the turn
    pub fn process_action(
        &mut self,
        actor: CharacterId,
        action: Action,
    ) -> Result<Vec<CombatEvent>> {
        if action == Action::Yield {
            return self.handle_yield(actor);
        }
        self.validate_turn(actor)?;

        let mut events = Vec::new();
        let report = match action {
            Action::Skip | Action::Yield => return self.skip_turn(actor),
            Action::Attack { target } => self.attack(actor, target, &mut events)?,
            Action::Protect { target } => {
                self.validate_ally(actor, target)?;
                if let Some(c) = self.combatants.get_mut(&actor) {
                    c.protecting = Some(target);
                }
                ActionReport::Protect { actor, target }
            }
            Action::Brace => {
                if let Some(c) = self.combatants.get_mut(&actor) {
                    c.bracing = true;
                }
                ActionReport::Brace { actor }
            }
            Action::Disengage => self.disengage(actor, &mut events),
        };

        tracing::debug!("Session {}: {} used {}", self.id, actor, action.name());

        let mut ordered = vec![CombatEvent::ActionResult {
            session_id: self.id,
            result: report,
            combatants: self.roster(),
        }];
        ordered.append(&mut events);

        if !self.check_end(&mut ordered) {
            self.advance_turn(&mut ordered);
        }
        Ok(ordered)
    }

    /// Forfeit the current turn
    pub fn skip_turn(&mut self, actor: CharacterId) -> Result<Vec<CombatEvent>> {
        self.validate_turn(actor)?;
        let mut events = vec![CombatEvent::TurnSkipped {
            session_id: self.id,
            character_id: actor,
            reason: SkipReason::Voluntary,
        }];
        self.advance_turn(&mut events);
        Ok(events)
    }

    /// Leave the fight without dying; allowed at any time
    pub fn handle_yield(&mut self, actor: CharacterId) -> Result<Vec<CombatEvent>> {
        if !self.is_active() {
            return Err(SessionError::SessionEnded);
        }
        let combatant = self
            .combatants
            .get_mut(&actor)
            .ok_or(SessionError::NotInSession(actor))?;
        if !combatant.alive {
            return Err(SessionError::ActorDefeated(actor));
        }
        if combatant.yielded {
            return Err(SessionError::ActorYielded(actor));
        }
        combatant.yielded = true;
        combatant.protecting = None;
        combatant.bracing = false;
        self.drop_engagements(actor);

        tracing::info!("Session {}: {} yielded", self.id, actor);

        let had_turn = self.turn_order.get(self.turn_index) == Some(&actor);
        let mut events = vec![CombatEvent::CombatantYielded {
            session_id: self.id,
            character_id: actor,
        }];
        if !self.check_end(&mut events) && had_turn {
            self.advance_turn(&mut events);
        }
        Ok(events)
    }

    /// A lost connection counts as a yield
    pub fn handle_disconnect(&mut self, character: CharacterId) -> Result<Vec<CombatEvent>> {
        self.handle_yield(character)
    }

    fn validate_turn(&self, actor: CharacterId) -> Result<()> {
        if !self.is_active() {
            return Err(SessionError::SessionEnded);
        }
        let combatant = self
            .combatants
            .get(&actor)
            .ok_or(SessionError::NotInSession(actor))?;
        if !combatant.alive {
            return Err(SessionError::ActorDefeated(actor));
        }
        if combatant.yielded {
            return Err(SessionError::ActorYielded(actor));
        }
        if self.current_turn() != Some(actor) {
            return Err(SessionError::NotYourTurn(actor));
        }
        Ok(())
    }

    fn validate_ally(&self, actor: CharacterId, target: CharacterId) -> Result<()> {
        let team = self.combatants.get(&actor).map(|c| c.team);
        match self.combatants.get(&target) {
            Some(t) if t.id != actor && Some(t.team) == team && t.is_standing() => Ok(()),
            _ => Err(SessionError::InvalidTarget(target)),
        }
    }

    fn standing_engaged_enemies(&self, id: CharacterId) -> usize {
        let Some(me) = self.combatants.get(&id) else {
            return 0;
        };
        me.engaged_to
            .iter()
            .filter_map(|other| self.combatants.get(other))
            .filter(|c| c.team != me.team && c.is_standing())
            .count()
    }

    fn attack_context(&self, attacker: &Combatant, defender: &Combatant) -> AttackContext {
        let flanked = defender.engaged_to.iter().any(|other| {
            *other != attacker.id
                && self
                    .combatants
                    .get(other)
                    .is_some_and(|c| c.team == attacker.team && c.is_standing())
        });
        let protected = self.protector_of(defender.id).is_some();

        AttackContext {
            attacker_pressured: self.standing_engaged_enemies(attacker.id) >= 2,
            defender_pressured: self.standing_engaged_enemies(defender.id) >= 2,
            grapple_penalty: defender.effects.stacks(StatusKind::Entangled) as i32,
            brace_bonus: if defender.bracing {
                self.config.brace_bonus
            } else {
                0
            },
            protect_bonus: if protected {
                self.config.protect_bonus
            } else {
                0
            },
            bonus_attack_dice: if flanked { FLANKING_BONUS_DICE } else { 0 },
            always_hit: false,
        }
    }

    fn attack(
        &mut self,
        actor: CharacterId,
        target: CharacterId,
        events: &mut Vec<CombatEvent>,
    ) -> Result<ActionReport> {
        let valid_target = match (self.combatants.get(&actor), self.combatants.get(&target)) {
            (Some(a), Some(t)) => t.id != a.id && t.team != a.team && t.is_standing(),
            _ => false,
        };
        if !valid_target {
            return Err(SessionError::InvalidTarget(target));
        }

        let ctx = match (self.combatants.get(&actor), self.combatants.get(&target)) {
            (Some(a), Some(t)) => self.attack_context(a, t),
            _ => return Err(SessionError::InvalidTarget(target)),
        };
        let result = self.strike(actor, target, &ctx)?;
        self.engage(actor, target);
        self.record_strike_deaths(&result, events);

        tracing::debug!(
            "Session {}: {} -> {} hit={} damage={}",
            self.id,
            actor,
            target,
            result.hit,
            result.total_damage_to_defender()
        );

        Ok(ActionReport::Attack {
            actor,
            target,
            result,
        })
    }

    fn disengage(&mut self, actor: CharacterId, events: &mut Vec<CombatEvent>) -> ActionReport {
        let engaged: Vec<CharacterId> = self
            .combatants
            .get(&actor)
            .map(|me| {
                me.engaged_to
                    .iter()
                    .copied()
                    .filter(|other| {
                        self.combatants
                            .get(other)
                            .is_some_and(|c| c.team != me.team && c.is_standing())
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut opportunity_strikes = Vec::new();
        for enemy in engaged {
            if !self.combatants.get(&actor).is_some_and(|c| c.alive) {
                break;
            }
            if let Ok(result) = self.strike(enemy, actor, &AttackContext::opportunity()) {
                self.record_strike_deaths(&result, events);
                opportunity_strikes.push(result);
            }
        }
        self.drop_engagements(actor);

        ActionReport::Disengage {
            actor,
            opportunity_strikes,
        }
    }

    /// Resolve a strike on the live combatant map
    fn strike(
        &mut self,
        attacker_id: CharacterId,
        defender_id: CharacterId,
        ctx: &AttackContext,
    ) -> Result<AttackResult> {
        let mut attacker = self
            .combatants
            .remove(&attacker_id)
            .ok_or(SessionError::NotInSession(attacker_id))?;
        let Some(mut defender) = self.combatants.remove(&defender_id) else {
            self.combatants.insert(attacker_id, attacker);
            return Err(SessionError::InvalidTarget(defender_id));
        };

        let result = resolve_attack(&mut attacker, &mut defender, ctx, &mut *self.dice);

        self.combatants.insert(attacker_id, attacker);
        self.combatants.insert(defender_id, defender);
        Ok(result)
    }

    fn record_strike_deaths(&mut self, result: &AttackResult, events: &mut Vec<CombatEvent>) {
        if result.defender_defeated {
            self.defeat(result.defender_id, Some(result.attacker_id), events);
        }
        if result.attacker_defeated() {
            self.defeat(result.attacker_id, Some(result.defender_id), events);
        }
    }

    fn defeat(
        &mut self,
        id: CharacterId,
        killed_by: Option<CharacterId>,
        events: &mut Vec<CombatEvent>,
    ) {
        if let Some(c) = self.combatants.get_mut(&id) {
            c.protecting = None;
            c.bracing = false;
        }
        self.drop_engagements(id);
        tracing::info!("Session {}: {} defeated", self.id, id);
        events.push(CombatEvent::CombatantDefeated {
            session_id: self.id,
            character_id: id,
            killed_by,
        });
    }

    fn engage(&mut self, a: CharacterId, b: CharacterId) {
        if let Some(c) = self.combatants.get_mut(&a) {
            if !c.engaged_to.contains(&b) {
                c.engaged_to.push(b);
            }
        }
        if let Some(c) = self.combatants.get_mut(&b) {
            if !c.engaged_to.contains(&a) {
                c.engaged_to.push(a);
            }
        }
    }

    fn drop_engagements(&mut self, id: CharacterId) {
        for c in self.combatants.values_mut() {
            if c.id == id {
                c.engaged_to.clear();
            } else {
                c.engaged_to.retain(|other| *other != id);
            }
        }
    }

    fn turn_start_event(&self) -> CombatEvent {
        CombatEvent::TurnStart {
            session_id: self.id,
            character_id: self.turn_order[self.turn_index],
            round: self.round,
        }
    }

    /// Move the pointer to the next standing combatant, skipping stunned
    /// ones and running round transitions on wrap.
    fn advance_turn(&mut self, events: &mut Vec<CombatEvent>) {
        while self.is_active() {
            self.turn_index += 1;
            if self.turn_index >= self.turn_order.len() {
                self.turn_index = 0;
                self.round += 1;
                if self.start_round(events) {
                    return;
                }
            }

            let id = self.turn_order[self.turn_index];
            let Some(c) = self.combatants.get_mut(&id) else {
                continue;
            };
            if !c.is_standing() {
                continue;
            }
            if c.effects.consume_stun() {
                events.push(CombatEvent::TurnSkipped {
                    session_id: self.id,
                    character_id: id,
                    reason: SkipReason::Stunned,
                });
                continue;
            }

            c.bracing = false;
            c.protecting = None;
            events.push(self.turn_start_event());
            return;
        }
    }

    /// Round boundary: bleed ticks, effect expiry, deaths. Returns true if
    /// the session ended.
    fn start_round(&mut self, events: &mut Vec<CombatEvent>) -> bool {
        let per_stack = self.config.bleed_damage_per_stack;
        let mut bleeding_damage = Vec::new();
        let mut expired_effects = Vec::new();
        let mut deaths = Vec::new();

        for id in self.turn_order.clone() {
            let Some(c) = self.combatants.get_mut(&id) else {
                continue;
            };
            if !c.alive {
                continue;
            }

            if let Some(bleed) = c.effects.get(StatusKind::Bleeding) {
                let damage = bleed.stacks as i32 * per_stack;
                let source = bleed.source;
                if damage > 0 {
                    let fatal = c.take_damage(damage);
                    bleeding_damage.push(BleedTick {
                        character_id: id,
                        damage,
                        health: c.health,
                    });
                    if fatal {
                        deaths.push((id, source));
                        continue;
                    }
                }
            }

            for kind in c.effects.tick_round() {
                expired_effects.push(ExpiredEffect {
                    character_id: id,
                    kind,
                });
            }
        }

        for (id, _) in &deaths {
            if let Some(c) = self.combatants.get_mut(id) {
                c.effects.clear();
            }
            self.drop_engagements(*id);
        }

        events.push(CombatEvent::RoundStart {
            session_id: self.id,
            round: self.round,
            bleeding_damage,
            expired_effects,
            deaths: deaths.iter().map(|(id, _)| *id).collect(),
            combatants: self.roster(),
        });
        for (id, source) in deaths {
            self.defeat(id, Some(source), events);
        }

        self.check_end(events)
    }

    /// End the session if a team has nobody standing
    fn check_end(&mut self, events: &mut Vec<CombatEvent>) -> bool {
        if !self.is_active() {
            return true;
        }
        let standing = |team: Team| {
            self.combatants
                .values()
                .any(|c| c.team == team && c.is_standing())
        };
        let (one, two) = (standing(Team::One), standing(Team::Two));
        if one && two {
            return false;
        }

        self.status = SessionStatus::Ended;
        self.winning_team = match (one, two) {
            (true, false) => Some(Team::One),
            (false, true) => Some(Team::Two),
            _ => None,
        };
        self.wound_assessments = self
            .roster()
            .iter()
            .filter(|c| c.alive)
            .map(|c| assess_wounds(c.id, c.health, c.max_health, c.is_bleeding()))
            .collect();

        tracing::info!(
            "Session {} ended after {} rounds, winner: {:?}",
            self.id,
            self.round,
            self.winning_team
        );

        events.push(CombatEvent::SessionEnd {
            session_id: self.id,
            winning_team: self.winning_team,
        });
        events.push(CombatEvent::WoundAssessment {
            session_id: self.id,
            results: self.wound_assessments.clone(),
        });
        true
    }
}
