//! The game stage chain: one turn per roster member, alternating draw
//! and guess, linked by forward references.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use scrawl_protocol::{GameSnapshot, Player, StageId, StageKind, StageSnapshot};

use crate::words;

/// One turn of the chain.
///
/// Holds an owned copy of the assigned player, not a roster reference —
/// a mid-game leave or disconnect cannot invalidate a stage.
#[derive(Debug, Clone)]
pub struct Stage {
    pub kind: StageKind,
    pub player: Player,
    /// Remaining seconds; counted down by the room's stage timer while
    /// this stage is active.
    pub ttl: u32,
    pub word: Option<String>,
    pub canvas: Option<String>,
    /// `None` only on the terminal stage.
    pub next_stage: Option<StageId>,
}

impl Stage {
    /// A draw stage: gets a freshly drawn random subject at construction.
    fn draw(player: Player, ttl: u32) -> Self {
        Self {
            kind: StageKind::Draw,
            player,
            ttl,
            word: Some(words::random_subject().to_string()),
            canvas: None,
            next_stage: None,
        }
    }

    /// A guess stage: its word arrives later, carried forward from the
    /// previous stage at advance time.
    fn guess(player: Player, ttl: u32) -> Self {
        Self {
            kind: StageKind::Guess,
            player,
            ttl,
            word: None,
            canvas: None,
            next_stage: None,
        }
    }

    fn snapshot(&self) -> StageSnapshot {
        StageSnapshot {
            kind: self.kind,
            player: self.player.clone(),
            ttl: self.ttl,
            word: self.word.clone(),
            canvas: self.canvas.clone(),
            next_stage: self.next_stage,
        }
    }
}

/// Outcome of [`Game::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advanced {
    /// Moved to the next stage; the room should re-arm its timer with
    /// this TTL.
    Next { ttl: u32 },
    /// The active stage was terminal — the game is over.
    Finished,
}

/// The turn chain of a started room.
///
/// Invariants: stages form a singly linked, acyclic chain visiting every
/// participant exactly once; exactly one stage is active; only the
/// terminal stage has no forward reference.
#[derive(Debug, Clone)]
pub struct Game {
    stages: HashMap<StageId, Stage>,
    active_stage: StageId,
}

impl Game {
    /// Builds the chain for a fresh game.
    ///
    /// The owner always draws first, with a random subject and the
    /// configured draw duration. The remaining members are visited in a
    /// uniformly random permutation, alternating guess, draw, guess, …
    /// each with the duration matching its kind. The active pointer
    /// starts at the owner's stage; an owner-only room yields a
    /// one-stage, immediately terminal chain.
    pub fn new(
        owner: Player,
        mut others: Vec<Player>,
        draw_seconds: u32,
        guess_seconds: u32,
    ) -> Self {
        let mut stages = HashMap::new();
        let first_id = StageId::generate();
        stages.insert(first_id, Stage::draw(owner, draw_seconds));

        others.shuffle(&mut rand::rng());

        let mut prev_id = first_id;
        let mut kind = StageKind::Guess;
        for player in others {
            let id = StageId::generate();
            let stage = match kind {
                StageKind::Guess => Stage::guess(player, guess_seconds),
                StageKind::Draw => Stage::draw(player, draw_seconds),
            };
            if let Some(prev) = stages.get_mut(&prev_id) {
                prev.next_stage = Some(id);
            }
            stages.insert(id, stage);
            prev_id = id;
            kind = match kind {
                StageKind::Guess => StageKind::Draw,
                StageKind::Draw => StageKind::Guess,
            };
        }

        Self {
            stages,
            active_stage: first_id,
        }
    }

    /// Merges the caller-supplied guess/canvas into the active stage,
    /// then moves the active pointer forward.
    ///
    /// On a non-terminal advance, a supplied guess is also copied into
    /// the new active stage's word and a supplied canvas into its canvas
    /// — this is how the prompt and drawing are handed to the next
    /// participant without a central store.
    pub fn advance(
        &mut self,
        guess: Option<String>,
        canvas: Option<String>,
    ) -> Advanced {
        let current = self
            .stages
            .get_mut(&self.active_stage)
            .expect("active stage is in the chain");

        if let Some(g) = &guess {
            current.word = Some(g.clone());
        }
        if let Some(c) = &canvas {
            current.canvas = Some(c.clone());
        }

        let Some(next_id) = current.next_stage else {
            return Advanced::Finished;
        };

        self.active_stage = next_id;
        let next = self
            .stages
            .get_mut(&next_id)
            .expect("forward reference points into the chain");
        if let Some(g) = guess {
            next.word = Some(g);
        }
        if let Some(c) = canvas {
            next.canvas = Some(c);
        }

        Advanced::Next { ttl: next.ttl }
    }

    /// The id of the single active stage.
    pub fn active_stage_id(&self) -> StageId {
        self.active_stage
    }

    pub fn active(&self) -> &Stage {
        self.stages
            .get(&self.active_stage)
            .expect("active stage is in the chain")
    }

    /// Overwrites the active stage's remaining TTL (timer tick).
    pub fn set_active_ttl(&mut self, ttl: u32) {
        if let Some(stage) = self.stages.get_mut(&self.active_stage) {
            stage.ttl = ttl;
        }
    }

    pub fn get(&self, id: &StageId) -> Option<&Stage> {
        self.stages.get(id)
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            stages: self
                .stages
                .iter()
                .map(|(id, stage)| (*id, stage.snapshot()))
                .collect(),
            active_stage: self.active_stage,
        }
    }
}
