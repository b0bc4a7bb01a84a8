//! Broadcast messages pushed to listening contexts.
//!
//! Every successful state mutation is pushed on a broadcast channel in
//! addition to the store's own change notification, to cut propagation
//! latency between surfaces that are already awake.

use serde::{Deserialize, Serialize};

use crate::state::TimerState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Broadcast {
    #[serde(rename = "timer.broadcastState")]
    State { state: TimerState },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_tag_is_broadcast_state() {
        let msg = Broadcast::State {
            state: TimerState::default(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "timer.broadcastState");
        assert_eq!(json["state"]["running"], false);
    }
}
