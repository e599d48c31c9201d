//! Room membership: a capacity-bounded, id-keyed player collection.

use std::collections::HashMap;

use scrawl_protocol::{ConnId, Player, PlayerId};

use crate::RoomError;

/// The players currently in a room, keyed by player id.
///
/// Iteration order is irrelevant everywhere except ownership transfer,
/// which needs a deterministic pick — see [`Roster::next_owner`].
#[derive(Debug, Clone)]
pub struct Roster {
    players: HashMap<PlayerId, Player>,
    capacity: usize,
}

impl Roster {
    /// Creates an empty roster holding at most `capacity` players.
    pub fn new(capacity: usize) -> Self {
        Self {
            players: HashMap::new(),
            capacity,
        }
    }

    /// Adds a player.
    ///
    /// Fails with [`RoomError::PlayerAlreadyInRoom`] if the id is
    /// present and [`RoomError::MaxPlayersReached`] if the roster is at
    /// capacity; the roster is unchanged on failure.
    pub fn add(&mut self, player: Player) -> Result<(), RoomError> {
        if self.players.contains_key(&player.id) {
            return Err(RoomError::PlayerAlreadyInRoom(player.id.clone()));
        }
        if self.players.len() + 1 > self.capacity {
            return Err(RoomError::MaxPlayersReached);
        }
        self.players.insert(player.id.clone(), player);
        Ok(())
    }

    /// Removes a player by id. No-op if absent. Returns the removed
    /// player (if any) and whether the roster is now empty.
    pub fn remove(&mut self, id: &PlayerId) -> (Option<Player>, bool) {
        let removed = self.players.remove(id);
        (removed, self.players.is_empty())
    }

    /// Finds the member using the given transport connection, if any.
    pub fn find_by_conn(&self, conn: &ConnId) -> Option<&Player> {
        self.players
            .values()
            .find(|p| p.conn_id.as_ref() == Some(conn))
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.contains_key(id)
    }

    /// Flips a member's ready flag and returns the new value.
    pub fn toggle_ready(&mut self, id: &PlayerId) -> Result<bool, RoomError> {
        let player = self
            .players
            .get_mut(id)
            .ok_or_else(|| RoomError::PlayerNotFound(id.clone()))?;
        player.ready = !player.ready;
        Ok(player.ready)
    }

    /// The ownership-transfer target: the remaining member with the
    /// lexicographically smallest player id. Any fixed rule would do;
    /// this one keeps owner reassignment reproducible across runs.
    pub fn next_owner(&self) -> Option<&Player> {
        self.players
            .values()
            .min_by(|a, b| a.id.cmp(&b.id))
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All members, in no particular order.
    pub fn members(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// The roster as the id-keyed map used in snapshots.
    pub fn to_map(&self) -> HashMap<PlayerId, Player> {
        self.players.clone()
    }
}
