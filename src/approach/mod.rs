// src/approach/mod.rs
//
// Signal flow per tick:
//   latest Frame -> Detector -> DistanceEstimator ─┐
//                                                  ├→ ControllerState::step → Action
//   latest PoseSnapshot ───────────────────────────┘        │
//                                        StartApproach → GoalComposer → GoalPose
//
// Driven by pipeline::TickDriver.

mod controller;
mod goal_composer;
mod hooks;
mod state_machine;

pub use controller::{ApproachController, TickReport};
pub use state_machine::Phase;
