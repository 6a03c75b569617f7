// src/approach/hooks.rs
//
// Extension points for behaviour the controller deliberately leaves out:
// searching for a lost target, re-acquiring after a stalled approach and
// detecting arrival at the goal. Every method defaults to a no-op.

use crate::types::GoalPose;

pub trait ApproachHooks: Send {
    /// DETECTING tick without a detection.
    fn target_lost(&mut self) {}

    /// Approach abandoned after the closing verdict; back to DETECTING.
    fn approach_stalled(&mut self, _origin_distance: f64) {}

    /// Every tick spent in AWAITING_ARRIVAL. `goal` is the last goal emitted.
    fn awaiting_arrival(&mut self, _goal: Option<&GoalPose>) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl ApproachHooks for NoopHooks {}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    pub enum HookCall {
        TargetLost,
        ApproachStalled(f64),
        AwaitingArrival(Option<GoalPose>),
    }

    /// Test double that records every hook invocation.
    #[derive(Debug, Default, Clone)]
    pub struct RecordingHooks {
        pub calls: Arc<Mutex<Vec<HookCall>>>,
    }

    impl RecordingHooks {
        pub fn take(&self) -> Vec<HookCall> {
            std::mem::take(&mut *self.calls.lock().unwrap())
        }
    }

    impl ApproachHooks for RecordingHooks {
        fn target_lost(&mut self) {
            self.calls.lock().unwrap().push(HookCall::TargetLost);
        }

        fn approach_stalled(&mut self, origin_distance: f64) {
            self.calls
                .lock()
                .unwrap()
                .push(HookCall::ApproachStalled(origin_distance));
        }

        fn awaiting_arrival(&mut self, goal: Option<&GoalPose>) {
            self.calls
                .lock()
                .unwrap()
                .push(HookCall::AwaitingArrival(goal.cloned()));
        }
    }
}
