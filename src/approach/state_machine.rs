// src/approach/state_machine.rs
//
// Approach phases as a value type. `step` never mutates; it returns the next
// state plus the side effect the caller has to carry out.

use crate::detection::DistanceEstimate;
use serde::Serialize;

/// Ticks spent in APPROACHING before the closing verdict is taken.
pub const CLOSING_VERDICT_TICK: u32 = 4;

/// Ticks after entering APPROACHING whose distance is not compared against
/// the origin; one sample right after the goal is sent is not a trend.
pub const TREND_WARMUP_TICKS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Detecting,
    Approaching,
    AwaitingArrival,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Detecting => "DETECTING",
            Phase::Approaching => "APPROACHING",
            Phase::AwaitingArrival => "AWAITING_ARRIVAL",
        }
    }

    /// AWAITING_ARRIVAL does not look at detections.
    pub fn consumes_detections(&self) -> bool {
        !matches!(self, Phase::AwaitingArrival)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller must do after a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    None,
    /// DETECTING -> APPROACHING: compose and emit exactly one goal.
    StartApproach { distance: f64, lateral_offset: f64 },
    /// DETECTING with no detection. Search manoeuvre extension point.
    TargetLost,
    /// APPROACHING -> DETECTING: distance did not close.
    ApproachStalled { origin_distance: f64 },
    /// APPROACHING -> AWAITING_ARRIVAL.
    ApproachConfirmed,
    /// Holding in AWAITING_ARRIVAL. Arrival detection extension point.
    AwaitingArrival,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: ControllerState,
    pub action: Action,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerState {
    phase: Phase,
    tick_counter: u32,
    origin_distance: f64,
    closing_flag: bool,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Detecting,
            tick_counter: 0,
            origin_distance: 0.0,
            closing_flag: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tick_counter(&self) -> u32 {
        self.tick_counter
    }

    /// Only meaningful while approaching.
    pub fn origin_distance(&self) -> Option<f64> {
        (self.phase == Phase::Approaching).then_some(self.origin_distance)
    }

    pub fn closing_flag(&self) -> bool {
        self.closing_flag
    }

    fn enter(phase: Phase, origin_distance: f64) -> Self {
        Self {
            phase,
            tick_counter: 0,
            origin_distance,
            closing_flag: false,
        }
    }

    /// Advance by one tick. `estimate` is ignored in AWAITING_ARRIVAL.
    pub fn step(&self, estimate: DistanceEstimate) -> Transition {
        match self.phase {
            Phase::Detecting => match estimate {
                DistanceEstimate::Invalid => Transition {
                    state: *self,
                    action: Action::TargetLost,
                },
                DistanceEstimate::Valid {
                    distance,
                    lateral_offset,
                } => Transition {
                    state: Self::enter(Phase::Approaching, distance),
                    action: Action::StartApproach {
                        distance,
                        lateral_offset,
                    },
                },
            },

            Phase::Approaching => {
                let tick_counter = self.tick_counter + 1;
                let mut closing_flag = self.closing_flag;

                if let Some(distance) = estimate.distance() {
                    if tick_counter > TREND_WARMUP_TICKS && self.origin_distance >= distance {
                        closing_flag = true;
                    }
                }

                if tick_counter == CLOSING_VERDICT_TICK {
                    return if closing_flag {
                        Transition {
                            state: Self::enter(Phase::AwaitingArrival, 0.0),
                            action: Action::ApproachConfirmed,
                        }
                    } else {
                        Transition {
                            state: Self::enter(Phase::Detecting, 0.0),
                            action: Action::ApproachStalled {
                                origin_distance: self.origin_distance,
                            },
                        }
                    };
                }

                Transition {
                    state: Self {
                        tick_counter,
                        closing_flag,
                        ..*self
                    },
                    action: Action::None,
                }
            }

            Phase::AwaitingArrival => Transition {
                state: *self,
                action: Action::AwaitingArrival,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid(distance: f64) -> DistanceEstimate {
        DistanceEstimate::Valid {
            distance,
            lateral_offset: 0.0,
        }
    }

    fn approaching(origin: f64) -> ControllerState {
        let t = ControllerState::new().step(valid(origin));
        assert_eq!(t.state.phase(), Phase::Approaching);
        t.state
    }

    fn run(mut state: ControllerState, estimates: &[DistanceEstimate]) -> Vec<Transition> {
        estimates
            .iter()
            .map(|e| {
                let t = state.step(*e);
                state = t.state;
                t
            })
            .collect()
    }

    #[test]
    fn test_initial_state() {
        let state = ControllerState::new();
        assert_eq!(state.phase(), Phase::Detecting);
        assert_eq!(state.tick_counter(), 0);
        assert!(!state.closing_flag());
        assert_eq!(state.origin_distance(), None);
    }

    #[test]
    fn test_detecting_without_detection_stays_put() {
        let state = ControllerState::new();
        let t = state.step(DistanceEstimate::Invalid);
        assert_eq!(t.state, state);
        assert_eq!(t.action, Action::TargetLost);
    }

    #[test]
    fn test_detecting_with_detection_starts_approach() {
        let t = ControllerState::new().step(DistanceEstimate::Valid {
            distance: 5.0,
            lateral_offset: -0.4,
        });
        assert_eq!(t.state.phase(), Phase::Approaching);
        assert_eq!(t.state.origin_distance(), Some(5.0));
        assert_eq!(t.state.tick_counter(), 0);
        assert!(!t.state.closing_flag());
        assert_eq!(
            t.action,
            Action::StartApproach {
                distance: 5.0,
                lateral_offset: -0.4
            }
        );
    }

    #[test]
    fn test_closing_trend_confirms_on_fourth_tick() {
        let transitions = run(
            approaching(5.0),
            &[valid(5.0), valid(4.0), valid(3.5), valid(3.0)],
        );

        for t in &transitions[..3] {
            assert_eq!(t.state.phase(), Phase::Approaching);
            assert_eq!(t.action, Action::None);
        }
        // first tick is warm-up even though 5.0 >= 5.0
        assert!(!transitions[0].state.closing_flag());
        assert!(transitions[1].state.closing_flag());

        let last = transitions[3];
        assert_eq!(last.state.phase(), Phase::AwaitingArrival);
        assert_eq!(last.action, Action::ApproachConfirmed);
        assert_eq!(last.state.tick_counter(), 0);
        assert!(!last.state.closing_flag());
    }

    #[test]
    fn test_non_closing_trend_returns_to_detecting() {
        let transitions = run(
            approaching(3.0),
            &[valid(4.0), valid(4.5), valid(5.0), valid(5.5)],
        );

        assert!(transitions.iter().all(|t| !t.state.closing_flag()));
        let last = transitions[3];
        assert_eq!(last.state.phase(), Phase::Detecting);
        assert_eq!(
            last.action,
            Action::ApproachStalled {
                origin_distance: 3.0
            }
        );
        assert_eq!(last.state.tick_counter(), 0);
        assert!(!last.state.closing_flag());
    }

    #[test]
    fn test_warmup_sample_alone_is_not_a_trend() {
        // Only tick 1 is closer; the rest are lost.
        let transitions = run(
            approaching(5.0),
            &[
                valid(1.0),
                DistanceEstimate::Invalid,
                DistanceEstimate::Invalid,
                DistanceEstimate::Invalid,
            ],
        );
        assert_eq!(transitions[3].state.phase(), Phase::Detecting);
    }

    #[test]
    fn test_counter_advances_without_detection() {
        let transitions = run(
            approaching(5.0),
            &[DistanceEstimate::Invalid, DistanceEstimate::Invalid],
        );
        assert_eq!(transitions[0].state.tick_counter(), 1);
        assert_eq!(transitions[1].state.tick_counter(), 2);
    }

    #[test]
    fn test_single_closer_sample_is_enough() {
        let transitions = run(
            approaching(5.0),
            &[valid(6.0), valid(6.0), DistanceEstimate::Invalid, valid(4.9)],
        );
        assert_eq!(transitions[3].state.phase(), Phase::AwaitingArrival);
    }

    #[test]
    fn test_awaiting_arrival_is_a_holding_phase() {
        let state = run(
            approaching(5.0),
            &[valid(5.0), valid(4.0), valid(4.0), valid(4.0)],
        )[3]
        .state;
        assert_eq!(state.phase(), Phase::AwaitingArrival);

        for estimate in [DistanceEstimate::Invalid, valid(0.5)] {
            let t = state.step(estimate);
            assert_eq!(t.state, state);
            assert_eq!(t.action, Action::AwaitingArrival);
        }
        assert!(!state.phase().consumes_detections());
    }

    #[test]
    fn test_only_detecting_to_approaching_starts_an_approach() {
        // Mixed sequence: count StartApproach actions vs DETECTING->APPROACHING edges.
        let mut state = ControllerState::new();
        let inputs = [
            DistanceEstimate::Invalid,
            valid(3.0),
            valid(4.0),
            valid(4.0),
            valid(4.0),
            valid(4.0), // stalled -> DETECTING
            valid(2.0), // restart
            valid(2.0),
            valid(1.5),
            DistanceEstimate::Invalid,
            valid(1.0), // confirmed
            valid(0.5),
        ];

        let mut goals = 0;
        let mut entries = 0;
        for e in inputs {
            let t = state.step(e);
            if state.phase() == Phase::Detecting && t.state.phase() == Phase::Approaching {
                entries += 1;
            }
            if matches!(t.action, Action::StartApproach { .. }) {
                goals += 1;
            }
            state = t.state;
        }
        assert_eq!(entries, 2);
        assert_eq!(goals, entries);
        assert_eq!(state.phase(), Phase::AwaitingArrival);
    }
}
