//! Single-threaded event loop and I/O op state machine.
//!
//! Drives accept → recv → parse → send → close through the ring,
//! exactly as spec §4.4 lays out. Grounded on the teacher's
//! `IoThread::run`/`handle_*` split in `io_thread.rs`, generalized from
//! a multi-op binary-protocol dispatcher to the HTTP accept/recv/send/
//! close state machine and stripped of the cross-thread disruptor hop
//! (this loop never leaves its own thread — see DESIGN.md).

use std::net::{Ipv4Addr, SocketAddrV4};
use std::os::unix::io::{AsRawFd, IntoRawFd, RawFd};

use socket2::{Domain, Protocol, Socket, Type};

use crate::buffer_pool::BufferPool;
use crate::config::{ServerConfig, LISTEN_BACKLOG};
use crate::connection::ConnectionTable;
use crate::constants::opcode;
use crate::http::{self, ParseResult};
use crate::io_request::{IoOp, IoRequest, IoRequestArena};
use crate::metrics;
use crate::response;
use crate::ring::Ring;

/// Bind, set `SO_REUSEADDR`, and start listening. Non-blocking mode is
/// unnecessary: all I/O happens through the ring (spec §6).
fn create_listener(host: &str, port: u16) -> std::io::Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    let addr: Ipv4Addr = host
        .parse()
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid host"))?;
    socket.bind(&SocketAddrV4::new(addr, port).into())?;
    socket.listen(LISTEN_BACKLOG)?;
    Ok(socket)
}

/// Outcome of feeding one `recv` chunk through the parser.
enum RecvAction {
    NeedMore,
    Reject,
    Respond(Vec<u8>),
}

/// Owns the ring, buffer pool, connection table, and in-flight I/O
/// request slot table, and drives the event loop.
pub struct Server {
    ring: Ring,
    pool: BufferPool,
    connections: ConnectionTable,
    arena: IoRequestArena,
    listen_fd: RawFd,
    running: bool,
}

impl Server {
    pub fn new(config: &ServerConfig) -> std::io::Result<Self> {
        let listener = create_listener(&config.host, config.port)?;
        let listen_fd = listener.into_raw_fd();
        let ring = Ring::new(config.queue_depth)?;
        let pool = BufferPool::new(config.buffer_count, config.buffer_size);
        // Sized generously above sq_entries: one accept, one recv per
        // connection, plus sends/closes in flight, all bounded by the
        // ring's own backlog limit in `get_sqe`.
        let arena_capacity = (config.queue_depth as usize) * 4;
        Ok(Self {
            ring,
            pool,
            connections: ConnectionTable::new(),
            arena: IoRequestArena::with_capacity(arena_capacity),
            listen_fd,
            running: true,
        })
    }

    /// Stop accepting new work. In-flight operations complete normally;
    /// the loop exits at the top of the next iteration (spec §4.4).
    pub fn stop(&mut self) {
        self.running = false;
        unsafe {
            libc::close(self.listen_fd);
        }
    }

    /// Run until `stop()` is called (or, in practice, forever).
    pub fn run(&mut self) {
        self.post_accept();
        let _ = self.ring.submit();

        while self.running || !self.connections.is_empty() {
            if let Err(e) = self.ring.submit_and_wait(1) {
                eprintln!("ringd: submit_and_wait failed: {}", e);
                continue;
            }

            let cqes = self.ring.drain_cqes();
            for cqe in cqes {
                self.dispatch(cqe.user_data, cqe.res);
            }

            if let Err(e) = self.ring.submit() {
                eprintln!("ringd: submit failed: {}", e);
            }
        }
    }

    fn dispatch(&mut self, user_data: u64, res: i32) {
        if user_data == 0 {
            eprintln!("ringd: warning: CQE with zero user_data, skipping");
            return;
        }
        let req = self.arena.take(user_data);

        if res < 0 {
            metrics::inc_cqe_errors();
            eprintln!(
                "ringd: {:?} on fd {} failed: {}",
                req.op,
                req.fd,
                std::io::Error::from_raw_os_error(-res)
            );
            if matches!(req.op, IoOp::Recv | IoOp::Send) {
                self.pool.release(req.buffer_index);
            }
            if self.connections.contains(req.fd) {
                self.post_close(req.fd);
            }
            return;
        }

        match req.op {
            IoOp::Accept => self.on_accept(res),
            IoOp::Recv => self.on_recv(req.fd, req.buffer_index, res as usize),
            IoOp::Send => self.on_send(req.fd, req.buffer_index),
            IoOp::Close => self.on_close(req.fd),
        }
    }

    fn on_accept(&mut self, client_fd: i32) {
        metrics::inc_accepts();
        self.connections
            .insert(crate::connection::ClientConnection::new(client_fd));
        self.post_recv(client_fd);
        if self.running {
            self.post_accept();
        }
        let _ = self.ring.submit();
    }

    fn on_recv(&mut self, fd: RawFd, buffer_index: u16, bytes_read: usize) {
        metrics::inc_recvs();
        if bytes_read == 0 {
            self.pool.release(buffer_index);
            self.post_close(fd);
            return;
        }

        // Safety: the recv CQE we just processed guarantees the kernel
        // has finished writing into this slot.
        let chunk = unsafe { self.pool.slot_slice(buffer_index, bytes_read) }.to_vec();
        self.pool.release(buffer_index);

        // Scoped so the mutable borrow of `self.connections` ends
        // before the arms below need `&mut self` again.
        let action = {
            let conn = match self.connections.get_mut(fd) {
                Some(c) => c,
                None => return,
            };
            conn.reassembly.extend_from_slice(&chunk);
            match http::parse_head(&conn.reassembly) {
                ParseResult::Incomplete => RecvAction::NeedMore,
                ParseResult::Error(_) => RecvAction::Reject,
                ParseResult::Complete(req) => {
                    let body = response::success_response(&req, &conn.reassembly);
                    RecvAction::Respond(body)
                }
            }
        };

        match action {
            RecvAction::NeedMore => self.post_recv(fd),
            RecvAction::Reject => {
                metrics::inc_parse_errors();
                self.post_send(fd, response::bad_request_response());
            }
            RecvAction::Respond(body) => {
                metrics::inc_requests_parsed();
                self.post_send(fd, &body);
            }
        }
    }

    fn on_send(&mut self, fd: RawFd, buffer_index: u16) {
        metrics::inc_sends();
        self.pool.release(buffer_index);
        self.connections.remove(fd);
        self.post_close(fd);
    }

    fn on_close(&mut self, fd: RawFd) {
        metrics::inc_closes();
        self.connections.remove(fd);
    }

    fn post_accept(&mut self) {
        let sqe = match self.ring.get_sqe() {
            Ok(sqe) => sqe,
            Err(_) => {
                metrics::inc_sq_full();
                eprintln!("ringd: SQ full, dropping accept re-arm");
                return;
            }
        };
        let user_data = self.arena.insert(IoRequest {
            op: IoOp::Accept,
            fd: self.listen_fd,
            buffer_index: 0,
        });
        sqe.opcode = opcode::ACCEPT;
        sqe.fd = self.listen_fd;
        sqe.addr = 0;
        sqe.off = 0;
        sqe.len = 0;
        sqe.user_data = user_data;
    }

    fn post_recv(&mut self, fd: RawFd) {
        let buffer_index = match self.pool.acquire() {
            Ok(idx) => idx,
            Err(_) => {
                eprintln!("ringd: buffer pool exhausted, dropping recv for fd {}", fd);
                return;
            }
        };
        let sqe = match self.ring.get_sqe() {
            Ok(sqe) => sqe,
            Err(_) => {
                metrics::inc_sq_full();
                self.pool.release(buffer_index);
                eprintln!("ringd: SQ full, dropping recv for fd {}", fd);
                return;
            }
        };
        let (ptr, len) = self.pool.slot_ptr_mut(buffer_index);
        let user_data = self.arena.insert(IoRequest {
            op: IoOp::Recv,
            fd,
            buffer_index,
        });
        sqe.opcode = opcode::RECV;
        sqe.fd = fd;
        sqe.addr = ptr as u64;
        sqe.len = len;
        sqe.user_data = user_data;
    }

    /// Queue a send of `data`. If `data` is larger than one pool buffer,
    /// it is truncated to fit — the core loop only ever emits bounded
    /// echo responses, but a pathological client that drip-feeds an
    /// enormous head could otherwise produce one larger than
    /// `buffer_size`; this is a documented limitation (DESIGN.md), not
    /// a spec'd chunked-send path.
    fn post_send(&mut self, fd: RawFd, data: &[u8]) {
        let buffer_index = match self.pool.acquire() {
            Ok(idx) => idx,
            Err(_) => {
                eprintln!("ringd: buffer pool exhausted, dropping send for fd {}", fd);
                return;
            }
        };
        let sqe = match self.ring.get_sqe() {
            Ok(sqe) => sqe,
            Err(_) => {
                metrics::inc_sq_full();
                self.pool.release(buffer_index);
                eprintln!("ringd: SQ full, dropping send for fd {}", fd);
                return;
            }
        };
        let (ptr, cap) = self.pool.slot_ptr_mut(buffer_index);
        let n = data.len().min(cap as usize);
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, n);
        }
        let user_data = self.arena.insert(IoRequest {
            op: IoOp::Send,
            fd,
            buffer_index,
        });
        sqe.opcode = opcode::SEND;
        sqe.fd = fd;
        sqe.addr = ptr as u64;
        sqe.len = n as u32;
        sqe.user_data = user_data;
    }

    fn post_close(&mut self, fd: RawFd) {
        let sqe = match self.ring.get_sqe() {
            Ok(sqe) => sqe,
            Err(_) => {
                metrics::inc_sq_full();
                eprintln!("ringd: SQ full, dropping close for fd {}", fd);
                return;
            }
        };
        let user_data = self.arena.insert(IoRequest {
            op: IoOp::Close,
            fd,
            buffer_index: 0,
        });
        sqe.opcode = opcode::CLOSE;
        sqe.fd = fd;
        sqe.user_data = user_data;
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.connections.drain().for_each(|(fd, _)| unsafe {
            libc::close(fd);
        });
    }
}

impl AsRawFd for Server {
    fn as_raw_fd(&self) -> RawFd {
        self.listen_fd
    }
}
