//! Outbound actions.
//!
//! A response answers exactly one request. It is encoded as a keyed map:
//!
//! ```text
//! { "base": "NOP", "units": [ { "id": 7, "action": "MOVE" }, ... ] }
//! ```
//!
//! Actions travel as upper-case symbol strings.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

use crate::message::{Message, UnitId};

/// Unknown action symbol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action symbol {0:?}")]
pub struct ParseActionError(pub String);

/// Action for the base entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BaseAction {
    /// Spawn a new unit
    Spawn,
    /// Do nothing
    #[default]
    Nop,
}

impl BaseAction {
    /// Wire symbol.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spawn => "SPAWN",
            Self::Nop => "NOP",
        }
    }
}

impl FromStr for BaseAction {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SPAWN" => Ok(Self::Spawn),
            "NOP" => Ok(Self::Nop),
            other => Err(ParseActionError(other.to_owned())),
        }
    }
}

/// Action for a single unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnitCommand {
    /// Move forward
    Move,
    /// Rotate left
    TurnLeft,
    /// Rotate right
    TurnRight,
    /// Attack
    Attack,
    /// Do nothing
    #[default]
    Nop,
}

impl UnitCommand {
    /// Wire symbol.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "MOVE",
            Self::TurnLeft => "TURN_LEFT",
            Self::TurnRight => "TURN_RIGHT",
            Self::Attack => "ATTACK",
            Self::Nop => "NOP",
        }
    }
}

impl FromStr for UnitCommand {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MOVE" => Ok(Self::Move),
            "TURN_LEFT" => Ok(Self::TurnLeft),
            "TURN_RIGHT" => Ok(Self::TurnRight),
            "ATTACK" => Ok(Self::Attack),
            "NOP" => Ok(Self::Nop),
            other => Err(ParseActionError(other.to_owned())),
        }
    }
}

macro_rules! symbol_serde {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let symbol = String::deserialize(deserializer)?;
                symbol.parse().map_err(de::Error::custom)
            }
        }
    };
}

symbol_serde!(BaseAction);
symbol_serde!(UnitCommand);

/// Action for one unit, keyed by its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitAction {
    /// Id copied from the request
    pub id: UnitId,
    /// What the unit should do
    pub action: UnitCommand,
}

impl UnitAction {
    /// Pair an id with an action.
    pub fn new(id: UnitId, action: UnitCommand) -> Self {
        Self { id, action }
    }
}

/// Reply to one [`Message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Action for the base
    pub base: BaseAction,
    /// One action per unit, in request order
    pub units: Vec<UnitAction>,
}

impl Response {
    /// Create a response.
    pub fn new(base: BaseAction, units: Vec<UnitAction>) -> Self {
        Self { base, units }
    }

    /// True when there is exactly one action per unit of `message`, with the
    /// same ids in the same order.
    pub fn covers(&self, message: &Message) -> bool {
        self.units.len() == message.units.len()
            && self.units.iter().map(|a| &a.id).eq(message.unit_ids())
    }
}
