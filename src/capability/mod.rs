//! External capability interface
//!
//! The engine decides *what* primitive action to invoke and in what order;
//! the collaborator behind this trait decides *how* a single action happens
//! (pathing, block interaction, protocol traffic). Calls are synchronous from
//! the engine's perspective and return outcome values rather than panicking;
//! a capability that cannot act reports a zero/false outcome or an error.

mod sim;

pub use sim::SimWorld;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    #[error("world interaction failed: {0}")]
    Interaction(String),
}

pub type CapResult<T> = Result<T, CapabilityError>;

/// A block position in the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0, y: 0, z: 0 };

    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Manhattan distance from the agent's reference point
    pub fn manhattan(&self, other: &Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) + self.z.abs_diff(other.z)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Result of a physical collection attempt; `acquired` may fall short of the
/// requested quantity (partial success)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatherOutcome {
    pub acquired: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CraftOutcome {
    pub crafted: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmeltOutcome {
    pub produced: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeOutcome {
    pub acquired: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOutcome {
    pub placed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositOutcome {
    pub stored: u32,
}

/// The primitive actions the engine can invoke
///
/// Implementations may be asynchronous internally; the engine does not move
/// to the next subtask until a call resolves.
pub trait Capabilities {
    /// Attempt physical collection of `quantity` units of `item`
    fn gather(&mut self, item: &str, quantity: u32) -> CapResult<GatherOutcome>;

    /// Craft `quantity` of `item` from owned materials
    fn craft(&mut self, item: &str, quantity: u32) -> CapResult<CraftOutcome>;

    /// Smelt `input` into `quantity` of `output`, consuming held fuel
    fn smelt(&mut self, input: &str, output: &str, quantity: u32) -> CapResult<SmeltOutcome>;

    /// Acquire the named tool by whatever means the collaborator has
    fn upgrade_tool(&mut self, tool: &str) -> CapResult<UpgradeOutcome>;

    /// Containers within `radius` of the agent, with their contents
    fn scan_storage(&mut self, radius: u32)
        -> CapResult<HashMap<Position, HashMap<String, u32>>>;

    /// Place an owned container block at `position`
    fn place_container(&mut self, position: Position) -> CapResult<PlaceOutcome>;

    /// Move held items into the container at `position`
    fn deposit(
        &mut self,
        position: Position,
        items: &HashMap<String, u32>,
    ) -> CapResult<DepositOutcome>;

    /// Current item counts
    fn inventory_snapshot(&self) -> HashMap<String, u32>;

    /// Free inventory slots remaining
    fn empty_capacity(&self) -> u32;

    /// Run the opaque action behind a direct task; true on success
    fn perform_direct(&mut self, label: &str) -> CapResult<bool>;

    /// Convenience: current count of a single item
    fn count_of(&self, item: &str) -> u32 {
        self.inventory_snapshot()
            .get(item)
            .copied()
            .unwrap_or(0)
    }
}
