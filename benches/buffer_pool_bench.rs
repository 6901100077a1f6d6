use ringd::buffer_pool::BufferPool;
use std::hint::black_box;

const BUFFER_SIZE: usize = 16 * 1024;
const BUFFER_COUNT: usize = 1024;
const ITERATIONS: usize = 10_000_000;

fn bench_acquire_release(pool: &BufferPool) {
    // Warm up.
    for _ in 0..10_000 {
        let idx = pool.acquire().unwrap();
        black_box(idx);
        pool.release(idx);
    }

    let start = std::time::Instant::now();
    for _ in 0..ITERATIONS {
        let idx = pool.acquire().unwrap();
        black_box(idx);
        pool.release(idx);
    }
    let elapsed = start.elapsed();

    let ns_per_op = elapsed.as_nanos() as f64 / ITERATIONS as f64;
    let ops_per_sec = ITERATIONS as f64 / elapsed.as_secs_f64();
    eprintln!(
        "acquire+release          {:8.2} ns/op  {:12.0} ops/sec",
        ns_per_op, ops_per_sec
    );
}

fn bench_churn(pool: &BufferPool, held: usize) {
    let mut ring: Vec<u16> = (0..held).map(|_| pool.acquire().unwrap()).collect();

    let start = std::time::Instant::now();
    for i in 0..ITERATIONS {
        pool.release(ring[i % held]);
        ring[i % held] = pool.acquire().unwrap();
    }
    let elapsed = start.elapsed();

    let ns_per_op = elapsed.as_nanos() as f64 / ITERATIONS as f64;
    eprintln!(
        "churn (held={:4})        {:8.2} ns/op", held, ns_per_op
    );

    for idx in ring {
        pool.release(idx);
    }
}

fn main() {
    eprintln!(
        "buffer pool: {} buffers x {} bytes",
        BUFFER_COUNT, BUFFER_SIZE
    );
    let pool = BufferPool::new(BUFFER_COUNT, BUFFER_SIZE);
    bench_acquire_release(&pool);
    bench_churn(&pool, BUFFER_COUNT / 2);
    bench_churn(&pool, BUFFER_COUNT - 1);
}
