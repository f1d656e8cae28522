//! Decision policy.
//!
//! The server does not decide anything itself. Each decoded [`Message`] is
//! handed to a [`DecisionPolicy`], and whatever [`Response`] it returns is
//! sent back. A conforming policy returns one action per unit, with the
//! unit's id, in request order.

use sensorlink_proto::{BaseAction, Message, Response, UnitAction, UnitCommand};

/// Maps a request to its response.
///
/// Shared by every connection, so it must be callable concurrently. Closures
/// of the right shape implement it.
pub trait DecisionPolicy: Send + Sync + 'static {
    /// Produce the response for `message`. Must not fail.
    fn decide(&self, message: &Message) -> Response;
}

impl<F> DecisionPolicy for F
where
    F: Fn(&Message) -> Response + Send + Sync + 'static,
{
    fn decide(&self, message: &Message) -> Response {
        self(message)
    }
}

/// Answers every request with the same base action and the same unit action.
///
/// The default answers `NOP` for the base and `MOVE` for every unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPolicy {
    /// Action for the base
    pub base: BaseAction,
    /// Action for every unit
    pub unit: UnitCommand,
}

impl Default for FixedPolicy {
    fn default() -> Self {
        Self { base: BaseAction::Nop, unit: UnitCommand::Move }
    }
}

impl DecisionPolicy for FixedPolicy {
    fn decide(&self, message: &Message) -> Response {
        let units =
            message.unit_ids().map(|id| UnitAction::new(id.clone(), self.unit)).collect();
        Response::new(self.base, units)
    }
}
