#[cfg(feature = "metrics")]
mod imp {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    // Backpressure (cumulative counts).
    static SQ_FULL: AtomicU64 = AtomicU64::new(0);
    static POOL_EXHAUSTED: AtomicU64 = AtomicU64::new(0);
    // Throughput (cumulative).
    static ACCEPTS: AtomicU64 = AtomicU64::new(0);
    static RECVS: AtomicU64 = AtomicU64::new(0);
    static SENDS: AtomicU64 = AtomicU64::new(0);
    static CLOSES: AtomicU64 = AtomicU64::new(0);
    // Parser outcomes.
    static REQUESTS_PARSED: AtomicU64 = AtomicU64::new(0);
    static PARSE_ERRORS: AtomicU64 = AtomicU64::new(0);
    // Per-CQE faults.
    static CQE_ERRORS: AtomicU64 = AtomicU64::new(0);

    #[derive(Clone, Copy)]
    pub struct MetricsSnapshot {
        pub sq_full: u64,
        pub pool_exhausted: u64,
        pub accepts: u64,
        pub recvs: u64,
        pub sends: u64,
        pub closes: u64,
        pub requests_parsed: u64,
        pub parse_errors: u64,
        pub cqe_errors: u64,
    }

    pub fn inc_sq_full() {
        SQ_FULL.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_pool_exhausted() {
        POOL_EXHAUSTED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_accepts() {
        ACCEPTS.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_recvs() {
        RECVS.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_sends() {
        SENDS.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_closes() {
        CLOSES.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_requests_parsed() {
        REQUESTS_PARSED.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_parse_errors() {
        PARSE_ERRORS.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cqe_errors() {
        CQE_ERRORS.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot() -> MetricsSnapshot {
        MetricsSnapshot {
            sq_full: SQ_FULL.load(Ordering::Relaxed),
            pool_exhausted: POOL_EXHAUSTED.load(Ordering::Relaxed),
            accepts: ACCEPTS.load(Ordering::Relaxed),
            recvs: RECVS.load(Ordering::Relaxed),
            sends: SENDS.load(Ordering::Relaxed),
            closes: CLOSES.load(Ordering::Relaxed),
            requests_parsed: REQUESTS_PARSED.load(Ordering::Relaxed),
            parse_errors: PARSE_ERRORS.load(Ordering::Relaxed),
            cqe_errors: CQE_ERRORS.load(Ordering::Relaxed),
        }
    }

    pub fn spawn_reporter() {
        const INTERVAL_SECS: u64 = 10;
        std::thread::spawn(|| {
            let mut last = snapshot();
            loop {
                std::thread::sleep(Duration::from_secs(INTERVAL_SECS));
                let snap = snapshot();
                println!(
                    "metrics delta {}s: accepts={} recvs={} sends={} closes={} | parsed={} parse_errors={} | stalls: sq_full={} pool_exhausted={} | cqe_errors={}",
                    INTERVAL_SECS,
                    snap.accepts.saturating_sub(last.accepts),
                    snap.recvs.saturating_sub(last.recvs),
                    snap.sends.saturating_sub(last.sends),
                    snap.closes.saturating_sub(last.closes),
                    snap.requests_parsed.saturating_sub(last.requests_parsed),
                    snap.parse_errors.saturating_sub(last.parse_errors),
                    snap.sq_full.saturating_sub(last.sq_full),
                    snap.pool_exhausted.saturating_sub(last.pool_exhausted),
                    snap.cqe_errors.saturating_sub(last.cqe_errors),
                );
                last = snap;
            }
        });
    }
}

#[cfg(not(feature = "metrics"))]
#[allow(dead_code)]
mod imp {
    #[derive(Clone, Copy)]
    pub struct MetricsSnapshot {
        pub sq_full: u64,
        pub pool_exhausted: u64,
        pub accepts: u64,
        pub recvs: u64,
        pub sends: u64,
        pub closes: u64,
        pub requests_parsed: u64,
        pub parse_errors: u64,
        pub cqe_errors: u64,
    }

    pub fn inc_sq_full() {}
    pub fn inc_pool_exhausted() {}
    pub fn inc_accepts() {}
    pub fn inc_recvs() {}
    pub fn inc_sends() {}
    pub fn inc_closes() {}
    pub fn inc_requests_parsed() {}
    pub fn inc_parse_errors() {}
    pub fn inc_cqe_errors() {}
    pub fn snapshot() -> MetricsSnapshot {
        MetricsSnapshot {
            sq_full: 0,
            pool_exhausted: 0,
            accepts: 0,
            recvs: 0,
            sends: 0,
            closes: 0,
            requests_parsed: 0,
            parse_errors: 0,
            cqe_errors: 0,
        }
    }
    pub fn spawn_reporter() {}
}

pub use imp::*;
