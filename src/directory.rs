//! Player directory traits and implementations
//!
//! Players are owned by an external identity system. The engine only needs
//! to know whether an id exists and what to display for it.

use crate::error::Result;
use crate::types::{Player, PlayerId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Lookup of players by id
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    /// Get a single player, if known
    async fn player(&self, player_id: &str) -> Result<Option<Player>>;

    /// Display names for the given players; unknown ids are omitted
    async fn display_names(&self, player_ids: &[PlayerId]) -> Result<BTreeMap<PlayerId, String>>;
}

/// Directory backed by a fixed in-memory player list
#[derive(Debug, Default)]
pub struct StaticPlayerDirectory {
    players: RwLock<BTreeMap<PlayerId, Player>>,
}

impl StaticPlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory from a player list
    pub fn with_players(players: impl IntoIterator<Item = Player>) -> Self {
        let directory = Self::new();
        for player in players {
            directory.insert(player);
        }
        directory
    }

    /// Add or replace a player
    pub fn insert(&self, player: Player) {
        self.write().insert(player.id.clone(), player);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Each write is a single map insert, so a poisoned map is still consistent
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<PlayerId, Player>> {
        self.players.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<PlayerId, Player>> {
        self.players.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PlayerDirectory for StaticPlayerDirectory {
    async fn player(&self, player_id: &str) -> Result<Option<Player>> {
        Ok(self.read().get(player_id).cloned())
    }

    async fn display_names(&self, player_ids: &[PlayerId]) -> Result<BTreeMap<PlayerId, String>> {
        let players = self.read();

        Ok(player_ids
            .iter()
            .filter_map(|id| {
                players
                    .get(id)
                    .map(|player| (id.clone(), player.display_name.clone()))
            })
            .collect())
    }
}
