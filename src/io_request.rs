//! Per-submission context carried across the kernel round trip via
//! `user_data`.
//!
//! Spec §3 describes two equally valid encodings for the `user_data`
//! cookie: a raw pointer into an arena, or an index into a slot table.
//! We take the slot-table route the design notes call out as "safer and
//! avoids pointer provenance concerns" — `slab::Slab` is already the
//! teacher's tool of choice for exactly this job (see its
//! `Slab<Connection>` in the original `io_thread.rs`), just reused here
//! for `IoRequest` instead of connections.

use std::os::unix::io::RawFd;

use slab::Slab;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoOp {
    Accept,
    Recv,
    Send,
    Close,
}

/// One in-flight submission's context. `buffer_index` is `0` and
/// meaningless for `Accept`/`Close`.
#[derive(Debug, Clone, Copy)]
pub struct IoRequest {
    pub op: IoOp,
    pub fd: RawFd,
    pub buffer_index: u16,
}

/// Slot table of in-flight `IoRequest`s, keyed by slab slot. `user_data`
/// submitted to the kernel is the slot index; a slot is only freed by
/// `take`, once its CQE has actually been consumed.
///
/// Submission and completion straddle loop iterations (a request posted
/// in iteration N's submit phase typically completes in iteration N+1's
/// drain phase), so there is no point at which every outstanding slot is
/// known to be free — entries are never dropped en masse. `slab`
/// reclaims a slot's storage for reuse as soon as `take` removes it,
/// which is the only discipline consistent with spec §3's requirement
/// that a request pointer remain valid until its CQE is consumed.
pub struct IoRequestArena {
    slots: Slab<IoRequest>,
}

impl IoRequestArena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Slab::with_capacity(capacity),
        }
    }

    /// Insert a new request, returning the `user_data` cookie to stamp
    /// onto its SQE. Offset by 1 so that slot 0 never produces a cookie
    /// of 0 — the server loop's dispatch treats a zero `user_data` as
    /// the defensive "no cookie" sentinel (spec §4.4), and a fresh slab
    /// hands out slot 0 on its very first insert.
    pub fn insert(&mut self, req: IoRequest) -> u64 {
        self.slots.insert(req) as u64 + 1
    }

    /// Remove and return the request for a completed `user_data`. Panics
    /// if the cookie is stale — a sign that `take` was already called
    /// for this `user_data`, i.e. its CQE was consumed twice.
    pub fn take(&mut self, user_data: u64) -> IoRequest {
        self.slots.remove((user_data - 1) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_take_round_trips() {
        let mut arena = IoRequestArena::with_capacity(4);
        let ud = arena.insert(IoRequest {
            op: IoOp::Recv,
            fd: 7,
            buffer_index: 3,
        });
        let req = arena.take(ud);
        assert_eq!(req.fd, 7);
        assert_eq!(req.buffer_index, 3);
        assert_eq!(req.op, IoOp::Recv);
    }

    #[test]
    fn slots_survive_across_iteration_boundaries_until_taken() {
        // Mirrors the server loop: an accept is inserted before the loop
        // starts, and is only taken once its CQE arrives on a later
        // iteration. No reset happens in between.
        let mut arena = IoRequestArena::with_capacity(4);
        let accept_ud = arena.insert(IoRequest {
            op: IoOp::Accept,
            fd: 3,
            buffer_index: 0,
        });

        // A second request submitted "next iteration" must not disturb
        // the still-outstanding first one.
        let recv_ud = arena.insert(IoRequest {
            op: IoOp::Recv,
            fd: 9,
            buffer_index: 1,
        });
        assert_ne!(accept_ud, recv_ud);

        let accept_req = arena.take(accept_ud);
        assert_eq!(accept_req.fd, 3);
        let recv_req = arena.take(recv_ud);
        assert_eq!(recv_req.fd, 9);
    }

    #[test]
    #[should_panic]
    fn take_same_cookie_twice_panics() {
        let mut arena = IoRequestArena::with_capacity(4);
        let ud = arena.insert(IoRequest {
            op: IoOp::Close,
            fd: 2,
            buffer_index: 0,
        });
        let _ = arena.take(ud);
        let _ = arena.take(ud);
    }
}
