use super::{Arena, RecordId};
use std::mem;

#[derive(Debug, PartialEq)]
struct Header {
    tag: u64,
}

fn cost(payload: usize) -> usize {
    Arena::<Header>::record_cost(payload)
}

#[test]
fn test_record_cost_includes_header_and_alignment() {
    assert_eq!(cost(0), mem::size_of::<Header>());
    assert_eq!(cost(1), 16);
    assert_eq!(cost(8), 16);
    assert_eq!(cost(9), 24);
}

#[test]
fn test_small_records_share_one_chunk() {
    let mut arena = Arena::<Header>::new(4096);
    let a = arena.allocate(Header { tag: 1 }, 10).unwrap();
    let b = arena.allocate(Header { tag: 2 }, 20).unwrap();

    assert_eq!(a, RecordId::Chunk { chunk: 0, slot: 0 });
    assert_eq!(b, RecordId::Chunk { chunk: 0, slot: 1 });

    let stats = arena.stats();
    assert_eq!(stats.chunks, 1);
    assert_eq!(stats.chunk_bytes, 4096);
    assert_eq!(stats.used_bytes, cost(10) + cost(20));
    assert_eq!(stats.dedicated_blocks, 0);
}

#[test]
fn test_payload_is_writable_and_sized_exactly() {
    let mut arena = Arena::<Header>::new(4096);
    let id = arena.allocate(Header { tag: 7 }, 5).unwrap();

    let (header, payload) = arena.record_mut(id).unwrap();
    header.tag = 8;
    payload.copy_from_slice(b"hello");

    assert_eq!(arena.payload(id).unwrap(), b"hello");
    assert_eq!(arena.header(id).unwrap(), &Header { tag: 8 });
}

#[test]
fn test_allocation_never_straddles_chunks() {
    let mut arena = Arena::<Header>::new(256);
    // Each record costs 96 bytes; two fit, the third opens a new chunk.
    let payload = 88;
    assert_eq!(cost(payload), 96);

    let first = arena.allocate(Header { tag: 1 }, payload).unwrap();
    let second = arena.allocate(Header { tag: 2 }, payload).unwrap();
    let third = arena.allocate(Header { tag: 3 }, payload).unwrap();

    assert_eq!(first, RecordId::Chunk { chunk: 0, slot: 0 });
    assert_eq!(second, RecordId::Chunk { chunk: 0, slot: 1 });
    assert_eq!(third, RecordId::Chunk { chunk: 1, slot: 0 });
    assert_eq!(arena.stats().chunks, 2);
}

#[test]
fn test_half_chunk_records_get_dedicated_blocks() {
    let mut arena = Arena::<Header>::new(256);
    // 2 * cost == chunk size is not strictly smaller, so it must be dedicated.
    let payload = 128 - mem::size_of::<Header>();
    let id = arena.allocate(Header { tag: 1 }, payload).unwrap();

    assert_eq!(
        id,
        RecordId::Dedicated {
            block: 0,
            generation: 0
        }
    );
    let stats = arena.stats();
    assert_eq!(stats.chunks, 0);
    assert_eq!(stats.dedicated_blocks, 1);
    assert_eq!(stats.dedicated_bytes, payload);
}

#[test]
fn test_release_frees_only_dedicated_blocks() {
    let mut arena = Arena::<Header>::new(256);
    let small = arena.allocate(Header { tag: 1 }, 4).unwrap();
    let large = arena.allocate(Header { tag: 2 }, 1000).unwrap();

    assert!(!arena.release(small));
    assert!(arena.contains(small));

    assert!(arena.release(large));
    assert!(!arena.contains(large));
    assert!(arena.payload(large).is_none());
    assert!(!arena.release(large), "second release is a no-op");
    assert_eq!(arena.stats().dedicated_blocks, 0);
}

#[test]
fn test_bulk_block_takes_records_of_any_size() {
    let budget = cost(3000) + cost(10);
    let mut arena = Arena::<Header>::with_bulk_capacity(4096, budget).unwrap();

    let big = arena.allocate(Header { tag: 1 }, 3000).unwrap();
    let small = arena.allocate(Header { tag: 2 }, 10).unwrap();
    assert_eq!(big, RecordId::Chunk { chunk: 0, slot: 0 });
    assert_eq!(small, RecordId::Chunk { chunk: 0, slot: 1 });

    let stats = arena.stats();
    assert_eq!(stats.chunks, 1);
    assert_eq!(stats.used_bytes, stats.chunk_bytes);

    // Once the bulk block is full, the regular rules apply again.
    let after = arena.allocate(Header { tag: 3 }, 10).unwrap();
    assert_eq!(after, RecordId::Chunk { chunk: 1, slot: 0 });
    let oversized = arena.allocate(Header { tag: 4 }, 3000).unwrap();
    assert_eq!(
        oversized,
        RecordId::Dedicated {
            block: 0,
            generation: 0
        }
    );
}

#[test]
fn test_empty_bulk_capacity_opens_nothing() {
    let arena = Arena::<Header>::with_bulk_capacity(4096, 0).unwrap();
    assert_eq!(arena.stats().chunks, 0);
}

#[test]
fn test_unknown_ids_are_rejected() {
    let arena = Arena::<Header>::default();
    assert!(arena.header(RecordId::Chunk { chunk: 3, slot: 0 }).is_none());
    assert!(arena
        .header(RecordId::Dedicated {
            block: 9,
            generation: 0
        })
        .is_none());
    assert_eq!(arena.chunk_size(), super::DEFAULT_CHUNK_SIZE);
}

#[test]
fn test_released_block_slots_are_reused_without_reviving_old_ids() {
    let mut arena = Arena::<Header>::new(256);
    let first = arena.allocate(Header { tag: 1 }, 1000).unwrap();
    assert!(arena.release(first));

    let second = arena.allocate(Header { tag: 2 }, 500).unwrap();
    assert_eq!(
        second,
        RecordId::Dedicated {
            block: 0,
            generation: 1
        }
    );
    assert!(arena.header(first).is_none());
    assert!(!arena.release(first), "stale id must not free the new record");
    assert_eq!(arena.header(second).unwrap(), &Header { tag: 2 });
    assert_eq!(arena.stats().dedicated_blocks, 1);
}
