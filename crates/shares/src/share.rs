use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lootpool_core::{CharacterId, Entity, LootGroupId, LootShareId, Rate};

use crate::participation::ParticipantStake;

/// A participant known to the engine.
///
/// Identity management is external; this row only carries what transfer
/// rendering needs - a stable id and a mentionable name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    id: CharacterId,
    name: String,
}

impl Character {
    pub fn new(id: CharacterId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id_typed(&self) -> CharacterId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Entity for Character {
    type Id = CharacterId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A pool of items recovered together, subject to one profit split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootGroup {
    id: LootGroupId,
    name: String,
    created_at: DateTime<Utc>,
}

impl LootGroup {
    pub fn new(id: LootGroupId, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            created_at,
        }
    }

    pub fn id_typed(&self) -> LootGroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for LootGroup {
    type Id = LootGroupId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// One character's weighted claim against a loot group's proceeds.
///
/// The flat cut comes off gross profit before the weighted split; the cap of
/// 100% across a group is enforced at computation time, not here, so admins
/// can stage edits in any order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootShare {
    id: LootShareId,
    loot_group: LootGroupId,
    character: CharacterId,
    share_quantity: u32,
    flat_percent_cut: Rate,
}

impl LootShare {
    pub fn new(
        id: LootShareId,
        loot_group: LootGroupId,
        character: CharacterId,
        share_quantity: u32,
        flat_percent_cut: Rate,
    ) -> Self {
        Self {
            id,
            loot_group,
            character,
            share_quantity,
            flat_percent_cut,
        }
    }

    pub fn id_typed(&self) -> LootShareId {
        self.id
    }

    pub fn loot_group(&self) -> LootGroupId {
        self.loot_group
    }

    pub fn character(&self) -> CharacterId {
        self.character
    }

    pub fn share_quantity(&self) -> u32 {
        self.share_quantity
    }

    pub fn flat_percent_cut(&self) -> Rate {
        self.flat_percent_cut
    }

    pub fn to_stake(&self) -> ParticipantStake {
        ParticipantStake {
            character: self.character,
            share_quantity: self.share_quantity,
            flat_percent_cut: self.flat_percent_cut,
        }
    }
}

impl Entity for LootShare {
    type Id = LootShareId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
