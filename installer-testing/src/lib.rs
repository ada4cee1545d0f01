// SPDX-License-Identifier: GPL-3.0-only

//! Deterministic stand-ins for the host collaborators
//!
//! [`FakeRunner`] records every command and answers from a script,
//! [`FakeTree`] is an in-memory `/sys` and `/dev`, and [`FakeMounter`]
//! records mount and unmount calls. A runner built with
//! [`FakeRunner::with_tree`] can make device nodes appear when a scripted
//! command succeeds, which is what partition creation looks like to the
//! settle loop.

pub mod fixtures;
pub mod mounter;
pub mod runner;
pub mod tree;

pub use fixtures::{PartedDisk, PartedEntry};
pub use mounter::{FakeMounter, MountEvent};
pub use runner::{FakeRunner, Reply};
pub use tree::FakeTree;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
