//! Owner-thread affinity.
//!
//! Tree mutation, synchronization and lookup all happen on one thread. A
//! `ThreadToken` is minted on that thread and cannot leave it (it is neither
//! `Send` nor `Sync`); entry points take one and assert it belongs to the
//! tree's owner. A mismatch is a programming error and panics.

use std::marker::PhantomData;
use std::thread::{self, ThreadId};

#[derive(Debug)]
pub struct ThreadToken {
    owner: ThreadId,
    _not_send: PhantomData<*const ()>,
}

impl ThreadToken {
    /// Mint a token for the calling thread.
    pub fn current() -> Self {
        Self {
            owner: thread::current().id(),
            _not_send: PhantomData,
        }
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Panic unless this token belongs to `owner` and we are running on it.
    #[track_caller]
    pub fn verify(&self, owner: ThreadId) {
        assert_eq!(
            self.owner, owner,
            "thread token belongs to a different thread than the tree"
        );
        assert_eq!(
            thread::current().id(),
            owner,
            "tree accessed off its owner thread"
        );
    }
}
