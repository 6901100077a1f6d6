use clap::Parser;

use ringd::config::{
    ServerConfig, DEFAULT_BUFFER_COUNT, DEFAULT_BUFFER_SIZE, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_QUEUE_DEPTH,
};
use ringd::metrics;
use ringd::server::Server;

#[derive(Parser)]
#[command(about = "HTTP/1.x echo server driven directly by io_uring")]
struct Args {
    /// Address to bind
    #[arg(long, default_value_t = DEFAULT_HOST.to_string())]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Submission queue depth (must be a power of two)
    #[arg(long, default_value_t = DEFAULT_QUEUE_DEPTH)]
    queue_depth: u32,

    /// Per-buffer size in the pool, in bytes
    #[arg(long, default_value_t = DEFAULT_BUFFER_SIZE)]
    buffer_size: usize,

    /// Number of buffers in the pool (buffer indices are u16)
    #[arg(long, default_value_t = DEFAULT_BUFFER_COUNT)]
    buffer_count: usize,
}

fn main() {
    let args = Args::parse();

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        queue_depth: args.queue_depth,
        buffer_size: args.buffer_size,
        buffer_count: args.buffer_count,
    };
    if let Err(e) = config.validate() {
        eprintln!("ringd: invalid configuration: {}", e);
        std::process::exit(1);
    }

    eprintln!(
        "ringd: listening on {}:{} (queue_depth={}, buffer_count={}, buffer_size={})",
        config.host, config.port, config.queue_depth, config.buffer_count, config.buffer_size
    );

    metrics::spawn_reporter();

    let mut server = Server::new(&config).unwrap_or_else(|e| {
        eprintln!("ringd: failed to start: {}", e);
        std::process::exit(1);
    });

    server.run();
}
