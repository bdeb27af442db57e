// Tincan - anonymous one-on-one pairing chat engine
//
// Pairs visitors into ephemeral two-seat chat rooms against a remote
// document store with push-style change notifications, and keeps each
// client's local mirror of room, message, and counterpart state consistent
// in real time. The store and the authentication provider are external
// collaborators behind the traits in `kernel`.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::*;
