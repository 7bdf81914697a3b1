// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod aggregate;
pub mod auth;
pub mod generator;
pub mod leaderboard;
pub mod moderation;
pub mod notify;
pub mod outbox;
pub mod progression;
pub mod roast;
pub mod session;
pub mod storage;

pub use auth::AuthClient;
pub use generator::{GeneratorClient, GeneratorError};
pub use outbox::{spawn_outbox, SideEffect, SideEffects};
pub use roast::RoastService;
pub use session::{AuthEvent, GateState, SessionGate};
pub use storage::{BlobStore, HttpBlobStore, MemoryBlobStore};
