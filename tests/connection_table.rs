//! Exercises the fd-reuse invariant end to end: the table must never
//! confuse a new connection for an old one that happened to get the same
//! fd back from the kernel.

use ringd::connection::{ClientConnection, ConnectionTable};

#[test]
fn a_closed_fd_leaves_no_stale_reassembly_state() {
    let mut table = ConnectionTable::new();

    table.insert(ClientConnection::new(11));
    table
        .get_mut(11)
        .unwrap()
        .reassembly
        .extend_from_slice(b"GET / HTTP/1.1\r\n");

    // Connection closes; table entry is removed.
    table.remove(11);
    assert!(!table.contains(11));

    // Kernel hands the same fd number back to a new accept.
    table.insert(ClientConnection::new(11));
    assert_eq!(table.get_mut(11).unwrap().reassembly.len(), 0);
}

#[test]
fn distinct_fds_do_not_share_reassembly_buffers() {
    let mut table = ConnectionTable::new();
    table.insert(ClientConnection::new(3));
    table.insert(ClientConnection::new(4));

    table.get_mut(3).unwrap().reassembly.extend_from_slice(b"A");
    table.get_mut(4).unwrap().reassembly.extend_from_slice(b"B");

    assert_eq!(table.get_mut(3).unwrap().reassembly, b"A");
    assert_eq!(table.get_mut(4).unwrap().reassembly, b"B");
}

#[test]
fn draining_empties_the_table() {
    let mut table = ConnectionTable::new();
    table.insert(ClientConnection::new(1));
    table.insert(ClientConnection::new(2));
    assert_eq!(table.len(), 2);

    let drained: Vec<_> = table.drain().map(|(fd, _)| fd).collect();
    assert_eq!(drained.len(), 2);
    assert!(table.is_empty());
}
