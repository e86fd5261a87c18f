//! Rival proxy reconciliation.
//!
//! Maps each remote participant id to a local, input-less mirror
//! instance and a display slot. Front-row "rival" slots are allocated
//! first, background "mini" slots after that, in the order ids are
//! first seen (which follows roster join order, since updates start
//! flowing in heartbeat order after game start). A front slot vacated
//! by a crash is filled by promoting the earliest surviving background
//! proxy, at most once per slot per session.

use std::collections::{HashMap, HashSet};

use tracing::debug;
use uuid::Uuid;

use crate::ws::protocol::PlayerUpdate;

use super::runner::{EngineFactory, GameInstance};

/// Where one proxy is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplaySlot {
    /// Front-row rival lane
    Rival(usize),
    /// Background mini tile
    Mini(usize),
}

/// Reconciliation outcomes, surfaced so the embedding UI can react.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    ProxyCreated { id: Uuid, slot: DisplaySlot },
    ProxyCrashed { id: Uuid, slot: DisplaySlot },
    /// A crashed proxy reported alive again: out-of-order delivery,
    /// not a respawn.
    ProxyRevived { id: Uuid },
    Promoted { id: Uuid, from: DisplaySlot, to: DisplaySlot },
}

/// One remote participant's local mirror.
pub struct RivalProxy {
    pub id: Uuid,
    pub slot: DisplaySlot,
    pub instance: GameInstance,
    pub last: PlayerUpdate,
}

/// All rival proxies of one session.
pub struct RivalBoard {
    seed: u32,
    /// Front slots by index; `None` until first claimed.
    front: Vec<Option<Uuid>>,
    /// Mini slots by index; entries are cleared on promotion swaps.
    minis: Vec<Option<Uuid>>,
    /// Proxy creation order, used as promotion priority.
    order: Vec<Uuid>,
    proxies: HashMap<Uuid, RivalProxy>,
    /// Front slot indices already filled by a promotion.
    promoted: HashSet<usize>,
}

impl RivalBoard {
    pub fn new(seed: u32, front_slots: usize) -> Self {
        Self {
            seed,
            front: vec![None; front_slots],
            minis: Vec::new(),
            order: Vec::new(),
            proxies: HashMap::new(),
            promoted: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&RivalProxy> {
        self.proxies.get(id)
    }

    /// True when every known proxy has crashed (vacuously true with no
    /// proxies).
    pub fn all_crashed(&self) -> bool {
        self.proxies.values().all(|p| p.last.crashed)
    }

    /// (name, score, crashed) per proxy, in creation order.
    pub fn standings(&self) -> Vec<(String, u32, bool)> {
        self.order
            .iter()
            .filter_map(|id| self.proxies.get(id))
            .map(|p| (p.instance.name.clone(), p.last.score, p.last.crashed))
            .collect()
    }

    /// Apply one RIVAL_UPDATE, creating the proxy lazily for an unseen
    /// id. Returns the reconciliation events in application order.
    pub fn apply_update(
        &mut self,
        id: Uuid,
        state: PlayerUpdate,
        engines: &dyn EngineFactory,
    ) -> Vec<BoardEvent> {
        let mut events = Vec::new();

        if !self.proxies.contains_key(&id) {
            let slot = self.allocate_slot(id);
            let name = if state.name.is_empty() {
                format!("Rival {}", self.order.len() + 1)
            } else {
                state.name.clone()
            };
            let mut engine = engines.create(&name, self.seed);
            engine.activate();
            let instance = GameInstance::remote(name, engine);

            self.order.push(id);
            self.proxies.insert(
                id,
                RivalProxy {
                    id,
                    slot,
                    instance,
                    last: PlayerUpdate::default(),
                },
            );
            debug!(rival = %id, ?slot, "Rival proxy created");
            events.push(BoardEvent::ProxyCreated { id, slot });
        }

        // Mirror the snapshot onto the local instance.
        let Some(proxy) = self.proxies.get_mut(&id) else {
            return events;
        };
        let (crashed_now, slot) = {
            if state.crashed {
                let newly_crashed = !proxy.last.crashed;
                if newly_crashed {
                    proxy.instance.engine.set_crashed(true);
                    events.push(BoardEvent::ProxyCrashed {
                        id,
                        slot: proxy.slot,
                    });
                }
                proxy.last = state;
                (newly_crashed, proxy.slot)
            } else {
                if proxy.last.crashed {
                    proxy.instance.engine.set_crashed(false);
                    events.push(BoardEvent::ProxyRevived { id });
                }
                proxy.instance.engine.set_score(state.score);
                if state.jumping && !proxy.last.jumping {
                    proxy.instance.engine.trigger_jump();
                }
                if state.ducking != proxy.last.ducking {
                    proxy.instance.engine.trigger_duck(state.ducking);
                }
                proxy.last = state;
                (false, proxy.slot)
            }
        };

        if crashed_now {
            if let DisplaySlot::Rival(front_idx) = slot {
                if let Some(event) = self.promote_into(front_idx) {
                    events.push(event);
                }
            }
        }

        events
    }

    /// Next free slot, front row first, then background.
    fn allocate_slot(&mut self, id: Uuid) -> DisplaySlot {
        for (idx, occupant) in self.front.iter_mut().enumerate() {
            if occupant.is_none() {
                *occupant = Some(id);
                return DisplaySlot::Rival(idx);
            }
        }
        self.minis.push(Some(id));
        DisplaySlot::Mini(self.minis.len() - 1)
    }

    /// Promote the earliest surviving background proxy into a vacated
    /// front slot. Each front slot is promoted into at most once.
    fn promote_into(&mut self, front_idx: usize) -> Option<BoardEvent> {
        if self.promoted.contains(&front_idx) {
            return None;
        }

        let candidate = self.order.iter().copied().find(|cid| {
            self.proxies
                .get(cid)
                .map(|p| matches!(p.slot, DisplaySlot::Mini(_)) && !p.last.crashed)
                .unwrap_or(false)
        })?;

        let crashed_occupant = self.front[front_idx];
        let from = {
            let proxy = self.proxies.get_mut(&candidate)?;
            let from = proxy.slot;
            proxy.slot = DisplaySlot::Rival(front_idx);
            from
        };

        // Swap the crashed occupant into the vacated mini tile so the
        // board stays fully rendered.
        if let DisplaySlot::Mini(mini_idx) = from {
            self.minis[mini_idx] = crashed_occupant;
            if let Some(occupant) = crashed_occupant.and_then(|o| self.proxies.get_mut(&o)) {
                occupant.slot = from;
            }
        }
        self.front[front_idx] = Some(candidate);
        self.promoted.insert(front_idx);

        debug!(rival = %candidate, slot = front_idx, "Background proxy promoted");
        Some(BoardEvent::Promoted {
            id: candidate,
            from,
            to: DisplaySlot::Rival(front_idx),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::runner::HeadlessFactory;

    fn update(name: &str, score: u32, crashed: bool) -> PlayerUpdate {
        PlayerUpdate {
            score,
            crashed,
            jumping: false,
            ducking: false,
            name: name.to_string(),
        }
    }

    #[test]
    fn proxies_fill_front_slots_then_minis_in_arrival_order() {
        let mut board = RivalBoard::new(1, 2);
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();

        for (i, id) in ids.iter().enumerate() {
            let events = board.apply_update(*id, update(&format!("P{i}"), 0, false), &HeadlessFactory);
            assert!(matches!(events[0], BoardEvent::ProxyCreated { .. }));
        }

        assert_eq!(board.get(&ids[0]).unwrap().slot, DisplaySlot::Rival(0));
        assert_eq!(board.get(&ids[1]).unwrap().slot, DisplaySlot::Rival(1));
        assert_eq!(board.get(&ids[2]).unwrap().slot, DisplaySlot::Mini(0));
        assert_eq!(board.get(&ids[3]).unwrap().slot, DisplaySlot::Mini(1));
        assert_eq!(board.len(), 4);
    }

    #[test]
    fn at_most_one_proxy_per_id() {
        let mut board = RivalBoard::new(1, 2);
        let id = Uuid::new_v4();
        board.apply_update(id, update("Ann", 10, false), &HeadlessFactory);
        let events = board.apply_update(id, update("Ann", 20, false), &HeadlessFactory);
        assert!(events.is_empty(), "no creation on repeat update: {events:?}");
        assert_eq!(board.len(), 1);
        assert_eq!(board.get(&id).unwrap().last.score, 20);
    }

    #[test]
    fn crash_marks_once_and_promotes_exactly_one_survivor() {
        // 1 front slot, background proxies A and B both alive.
        let mut board = RivalBoard::new(1, 1);
        let front = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        board.apply_update(front, update("Front", 5, false), &HeadlessFactory);
        board.apply_update(a, update("A", 3, false), &HeadlessFactory);
        board.apply_update(b, update("B", 4, false), &HeadlessFactory);

        let events = board.apply_update(front, update("Front", 5, true), &HeadlessFactory);
        assert_eq!(
            events,
            vec![
                BoardEvent::ProxyCrashed {
                    id: front,
                    slot: DisplaySlot::Rival(0)
                },
                BoardEvent::Promoted {
                    id: a,
                    from: DisplaySlot::Mini(0),
                    to: DisplaySlot::Rival(0)
                },
            ]
        );
        assert_eq!(board.get(&a).unwrap().slot, DisplaySlot::Rival(0));
        // The crashed occupant takes the vacated mini tile.
        assert_eq!(board.get(&front).unwrap().slot, DisplaySlot::Mini(0));
        assert_eq!(board.get(&b).unwrap().slot, DisplaySlot::Mini(1));

        // Repeated crash reports do not re-mark or re-promote.
        let events = board.apply_update(front, update("Front", 5, true), &HeadlessFactory);
        assert!(events.is_empty(), "duplicate crash must be a no-op: {events:?}");
    }

    #[test]
    fn a_slot_is_never_promoted_into_twice() {
        let mut board = RivalBoard::new(1, 1);
        let front = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        board.apply_update(front, update("Front", 0, false), &HeadlessFactory);
        board.apply_update(a, update("A", 0, false), &HeadlessFactory);
        board.apply_update(b, update("B", 0, false), &HeadlessFactory);

        board.apply_update(front, update("Front", 0, true), &HeadlessFactory);
        assert_eq!(board.get(&a).unwrap().slot, DisplaySlot::Rival(0));

        // The promoted occupant crashes too: nobody moves again.
        let events = board.apply_update(a, update("A", 0, true), &HeadlessFactory);
        assert_eq!(
            events,
            vec![BoardEvent::ProxyCrashed {
                id: a,
                slot: DisplaySlot::Rival(0)
            }]
        );
        assert_eq!(board.get(&b).unwrap().slot, DisplaySlot::Mini(1));
    }

    #[test]
    fn out_of_order_alive_report_reverts_a_crash() {
        let mut board = RivalBoard::new(1, 2);
        let id = Uuid::new_v4();
        board.apply_update(id, update("Ann", 50, false), &HeadlessFactory);
        board.apply_update(id, update("Ann", 50, true), &HeadlessFactory);
        assert!(board.all_crashed());

        let events = board.apply_update(id, update("Ann", 52, false), &HeadlessFactory);
        assert_eq!(events, vec![BoardEvent::ProxyRevived { id }]);
        assert!(!board.all_crashed());
        assert_eq!(board.get(&id).unwrap().last.score, 52);
    }

    #[test]
    fn score_and_motion_mirror_onto_the_instance() {
        let mut board = RivalBoard::new(1, 2);
        let id = Uuid::new_v4();
        board.apply_update(id, update("Ann", 0, false), &HeadlessFactory);

        let mut jumping = update("Ann", 99, false);
        jumping.jumping = true;
        board.apply_update(id, jumping, &HeadlessFactory);

        let proxy = board.get(&id).unwrap();
        assert_eq!(proxy.instance.engine.score(), 99);
        assert!(proxy.instance.engine.jumping());
    }

    #[test]
    fn standings_follow_creation_order() {
        let mut board = RivalBoard::new(1, 1);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        board.apply_update(a, update("A", 10, false), &HeadlessFactory);
        board.apply_update(b, update("B", 20, true), &HeadlessFactory);

        assert_eq!(
            board.standings(),
            vec![("A".to_string(), 10, false), ("B".to_string(), 20, true)]
        );
    }
}
