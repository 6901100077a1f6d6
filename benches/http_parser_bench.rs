use ringd::http::{parse_head, ParseResult};
use std::hint::black_box;

const ITERATIONS: usize = 1_000_000;

fn bench(label: &str, input: &[u8]) {
    // Warm up.
    for _ in 0..10_000 {
        black_box(parse_head(input));
    }

    let start = std::time::Instant::now();
    for _ in 0..ITERATIONS {
        match parse_head(input) {
            ParseResult::Complete(req) => {
                black_box(req.num_headers());
            }
            other => {
                black_box(other);
            }
        }
    }
    let elapsed = start.elapsed();

    let ns_per_op = elapsed.as_nanos() as f64 / ITERATIONS as f64;
    let ops_per_sec = ITERATIONS as f64 / elapsed.as_secs_f64();
    eprintln!(
        "{:28} {:8.2} ns/op  {:12.0} ops/sec",
        label, ns_per_op, ops_per_sec
    );
}

fn main() {
    bench("minimal GET", b"GET / HTTP/1.1\r\nHost: a\r\n\r\n");

    let mut many_headers = String::from("GET /resource/path?query=1 HTTP/1.1\r\n");
    for i in 0..16 {
        many_headers.push_str(&format!("X-Header-{}: value-{}\r\n", i, i));
    }
    many_headers.push_str("\r\n");
    bench("16 headers", many_headers.as_bytes());

    bench("incomplete head", b"GET / HTTP/1.1\r\nHost: a\r\n");
}
