//! Block type values stored in chunk slots

use serde::{Deserialize, Serialize};

/// Raw slot value reserved for air (no block)
pub const AIR_ID: u8 = 0;

/// Concrete block type. Air is not a variant: an empty slot is `None`.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockType {
    Stone = 1,
    Dirt = 2,
    Grass = 3,
    Sand = 4,
    Water = 5,
    Bedrock = 6,
    Gravel = 7,
    Wood = 8,
    Leaves = 9,
}

impl BlockType {
    /// Every block type, in id order
    pub const ALL: [BlockType; 9] = [
        BlockType::Stone,
        BlockType::Dirt,
        BlockType::Grass,
        BlockType::Sand,
        BlockType::Water,
        BlockType::Bedrock,
        BlockType::Gravel,
        BlockType::Wood,
        BlockType::Leaves,
    ];

    /// Raw id stored in a chunk slot (never `AIR_ID`)
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Decode a raw slot value. `AIR_ID` and unknown ids decode to `None`.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(BlockType::Stone),
            2 => Some(BlockType::Dirt),
            3 => Some(BlockType::Grass),
            4 => Some(BlockType::Sand),
            5 => Some(BlockType::Water),
            6 => Some(BlockType::Bedrock),
            7 => Some(BlockType::Gravel),
            8 => Some(BlockType::Wood),
            9 => Some(BlockType::Leaves),
            _ => None,
        }
    }

    /// Whether a raw slot value is either air or a known block type
    pub fn is_valid_id(id: u8) -> bool {
        id == AIR_ID || Self::from_id(id).is_some()
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockType::Stone => "stone",
            BlockType::Dirt => "dirt",
            BlockType::Grass => "grass",
            BlockType::Sand => "sand",
            BlockType::Water => "water",
            BlockType::Bedrock => "bedrock",
            BlockType::Gravel => "gravel",
            BlockType::Wood => "wood",
            BlockType::Leaves => "leaves",
        }
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
