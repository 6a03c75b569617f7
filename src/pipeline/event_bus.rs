// src/pipeline/event_bus.rs
//
// The controller publishes what happened during a tick; the driver drains
// and routes it (goals to navigation, the rest to logs and metrics).

use crate::approach::Phase;
use crate::types::GoalPose;
use std::collections::VecDeque;
use tracing::warn;

const DEFAULT_MAX_PENDING: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    PhaseChanged { from: Phase, to: Phase },
    GoalEmitted(GoalPose),
    TargetLost,
    ApproachStalled { origin_distance: f64 },
    AwaitingArrival,
    TickFailed { reason: String },
}

pub struct EventBus {
    events: VecDeque<ControllerEvent>,
    max_pending: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING)
    }
}

impl EventBus {
    pub fn new(max_pending: usize) -> Self {
        let max_pending = max_pending.max(1);
        Self {
            events: VecDeque::with_capacity(max_pending),
            max_pending,
        }
    }

    /// Drops the oldest non-goal event when full; goals are never dropped.
    pub fn publish(&mut self, event: ControllerEvent) {
        if self.events.len() >= self.max_pending {
            let victim = self
                .events
                .iter()
                .position(|e| !matches!(e, ControllerEvent::GoalEmitted(_)));
            match victim {
                Some(idx) => {
                    warn!(
                        "Event bus full ({} events), dropping oldest",
                        self.max_pending
                    );
                    self.events.remove(idx);
                }
                None => warn!("Event bus holds only goals, growing past {}", self.max_pending),
            }
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<ControllerEvent> {
        self.events.drain(..).collect()
    }
}
