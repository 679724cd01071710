use std::collections::HashSet;
use std::io;
use std::mem::size_of;

use bytes::{Buf, Bytes};

use proxy_resp::{type_label, AllocConfig, Resp, RespAlloc, RespArena, RespRef, RespType};

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

fn read_line(input: &mut Bytes) -> io::Result<Bytes> {
    let pos = input
        .windows(2)
        .position(|w| w == b"\r\n")
        .ok_or_else(|| invalid("missing crlf"))?;
    let line = input.split_to(pos);
    input.advance(2);
    Ok(line)
}

fn parse_i64(data: &[u8]) -> io::Result<i64> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| invalid("bad length"))
}

// Minimal reader following the codec contract: one node per value, one
// `alloc_array(n)` per array, children filled in order.
fn decode<'a>(alloc: &mut RespAlloc<'a>, input: &mut Bytes) -> io::Result<&'a Resp<'a>> {
    let line = read_line(input)?;
    let marker = *line.first().ok_or_else(|| invalid("empty line"))?;
    let ty = RespType::try_from(marker)
        .map_err(|err| invalid(format!("{} {}", err, type_label(marker))))?;

    let node = alloc.alloc_node();
    match ty {
        RespType::String => *node = Resp::String(line.slice(1..)),
        RespType::Error => *node = Resp::Error(line.slice(1..)),
        RespType::Int => *node = Resp::Int(line.slice(1..)),
        RespType::BulkBytes => {
            let len = parse_i64(&line[1..])?;
            if len < 0 {
                *node = Resp::null_bulk_bytes();
            } else {
                let len = len as usize;
                if input.len() < len + 2 || &input[len..len + 2] != b"\r\n" {
                    return Err(invalid("truncated bulk"));
                }
                let data = input.split_to(len);
                input.advance(2);
                *node = Resp::BulkBytes(Some(data));
            }
        }
        RespType::Array => {
            let len = parse_i64(&line[1..])?;
            if len < 0 {
                *node = Resp::null_array();
            } else {
                let slots = alloc.alloc_array(len as usize);
                for slot in slots.iter_mut() {
                    *slot = Some(decode(alloc, input)?);
                }
                *node = Resp::new_array(slots);
            }
        }
    }
    Ok(node)
}

fn child<'a>(resp: &Resp<'a>, idx: usize) -> &'a Resp<'a> {
    resp.array().expect("array")[idx].expect("populated slot")
}

#[test]
fn decodes_array_of_bulk_and_int() {
    let arena = RespArena::new();
    let mut alloc = arena.allocator();
    let mut input = Bytes::from_static(b"*2\r\n$3\r\nfoo\r\n:42\r\n");

    let resp = decode(&mut alloc, &mut input).expect("decode");
    assert!(input.is_empty());
    assert!(resp.is_array());
    assert_eq!(resp.array().map(<[_]>::len), Some(2));

    let first = child(resp, 0);
    let second = child(resp, 1);
    assert!(first.is_bulk_bytes());
    assert_eq!(first.value().map(|v| &v[..]), Some(&b"foo"[..]));
    assert!(second.is_int());
    assert_eq!(second.value().map(|v| &v[..]), Some(&b"42"[..]));

    let stats = alloc.stats();
    assert_eq!(stats.nodes, 3);
    assert_eq!(stats.pooled_arrays, 1);
    assert_eq!(stats.direct_arrays, 0);
}

#[test]
fn decodes_nulls_and_empties_distinctly() {
    let arena = RespArena::new();
    let mut alloc = arena.allocator();
    let mut input = Bytes::from_static(b"*4\r\n*-1\r\n*0\r\n$-1\r\n$0\r\n\r\n");

    let resp = decode(&mut alloc, &mut input).expect("decode");
    let null_array = child(resp, 0);
    let empty_array = child(resp, 1);
    let null_bulk = child(resp, 2);
    let empty_bulk = child(resp, 3);

    assert!(null_array.is_null_array());
    assert_eq!(null_array.array(), None);
    assert!(!empty_array.is_null_array());
    assert_eq!(empty_array.array().map(<[_]>::len), Some(0));
    assert!(null_bulk.is_null());
    assert!(!empty_bulk.is_null());
    assert_eq!(empty_bulk.value().map(Bytes::len), Some(0));
}

#[test]
fn decodes_nested_arrays() {
    let arena = RespArena::new();
    let mut alloc = arena.allocator();
    let mut input = Bytes::from_static(b"*2\r\n*2\r\n+OK\r\n-ERR x\r\n:7\r\n");

    let resp = decode(&mut alloc, &mut input).expect("decode");
    let inner = child(resp, 0);
    assert_eq!(inner.len(), 2);
    assert!(child(inner, 0).is_string());
    assert!(child(inner, 1).is_error());
    assert_eq!(child(inner, 1).value().map(|v| &v[..]), Some(&b"ERR x"[..]));
    assert!(child(resp, 1).is_int());
    assert_eq!(alloc.stats().pooled_arrays, 2);
}

#[test]
fn reader_rejects_unknown_type_byte() {
    let arena = RespArena::new();
    let mut alloc = arena.allocator();
    let mut input = Bytes::from_static(b"%1\r\n");

    let err = decode(&mut alloc, &mut input).expect_err("unknown marker");
    assert!(err.to_string().contains("<unknown-0x25>"));
    assert_eq!(alloc.stats().nodes, 0);
}

#[test]
fn nodes_are_distinct_and_batched() {
    let arena = RespArena::new();
    let mut alloc = arena.allocator();

    let ptrs: Vec<*const Resp> = (0..33).map(|_| alloc.alloc_node() as *const Resp).collect();
    let unique: HashSet<usize> = ptrs.iter().map(|p| *p as usize).collect();
    assert_eq!(unique.len(), 33);

    for idx in 0..15 {
        assert_eq!(ptrs[idx].wrapping_add(1), ptrs[idx + 1]);
    }

    let stats = alloc.stats();
    assert_eq!(stats.nodes, 33);
    assert_eq!(stats.node_batches, 3);
    assert_eq!(alloc.remaining_nodes(), 15);
}

#[test]
fn small_arrays_are_disjoint_and_exact() {
    let arena = RespArena::new();
    let mut alloc = arena.allocator();

    let first = alloc.alloc_array(10);
    let second = alloc.alloc_array(10);
    assert_eq!(first.len(), 10);
    assert_eq!(second.len(), 10);
    assert!(first.iter().all(Option::is_none));
    assert_eq!(first.as_ptr().wrapping_add(10), second.as_ptr());

    let value = alloc.alloc(Resp::new_string("OK"));
    first[9] = Some(value);
    assert!(second[0].is_none());
    assert_eq!(alloc.stats().array_batches, 1);
}

#[test]
fn large_arrays_skip_the_pool() {
    let arena = RespArena::new();
    let mut alloc = arena.allocator();

    let pooled = alloc.alloc_array(10);
    let large = alloc.alloc_array(40);
    let after = alloc.alloc_array(10);

    assert_eq!(large.len(), 40);
    assert_eq!(pooled.as_ptr().wrapping_add(10), after.as_ptr());

    let slot = size_of::<RespRef>();
    let batch_start = pooled.as_ptr() as usize;
    let batch_end = batch_start + 512 * slot;
    let large_start = large.as_ptr() as usize;
    let large_end = large_start + 40 * slot;
    assert!(large_end <= batch_start || large_start >= batch_end);

    let stats = alloc.stats();
    assert_eq!(stats.direct_arrays, 1);
    assert_eq!(stats.pooled_arrays, 2);
    assert_eq!(alloc.remaining_slots(), 512 - 20);
}

#[test]
fn zero_length_array_is_not_null() {
    let arena = RespArena::new();
    let mut alloc = arena.allocator();

    let slots = alloc.alloc_array(0);
    assert!(slots.is_empty());
    let empty = alloc.alloc(Resp::new_array(slots));
    let null = alloc.alloc(Resp::null_array());

    assert!(!empty.is_null_array());
    assert_eq!(empty.array().map(<[_]>::len), Some(0));
    assert!(null.is_null_array());
    assert_ne!(empty, null);
}

#[test]
fn arena_arrays_can_reference_outside_values() {
    let outside = Resp::new_bulk_bytes("shared");
    let arena = RespArena::new();
    let mut alloc = arena.allocator();

    let slots = alloc.alloc_array(2);
    slots[0] = Some(&outside);
    slots[1] = Some(alloc.alloc(Resp::new_int("1")));
    let array = alloc.alloc(Resp::new_array(slots));

    assert!(std::ptr::eq(child(array, 0), &outside));
    assert!(child(array, 1).is_int());
}

#[test]
fn custom_config_changes_batching() {
    let config = AllocConfig { node_batch: 2, array_batch: 4, array_threshold: 3 };
    let arena = RespArena::with_config(config).expect("config");
    let mut alloc = arena.allocator();

    for _ in 0..5 {
        alloc.alloc_node();
    }
    alloc.alloc_array(2);
    alloc.alloc_array(2);
    alloc.alloc_array(3);

    let stats = alloc.stats();
    assert_eq!(stats.node_batches, 3);
    assert_eq!(stats.array_batches, 1);
    assert_eq!(stats.direct_arrays, 1);
    assert_eq!(arena.config(), &config);
}

#[test]
fn allocators_on_one_arena_keep_separate_batches() {
    let arena = RespArena::new();
    let mut left = arena.allocator();
    let mut right = arena.allocator();

    let a = left.alloc(Resp::new_string("a"));
    let b = right.alloc(Resp::new_string("b"));
    assert!(!std::ptr::eq(a, b));
    assert_eq!(left.stats().node_batches, 1);
    assert_eq!(right.stats().node_batches, 1);
    assert_eq!(a.value().map(|v| &v[..]), Some(&b"a"[..]));
    assert_eq!(b.value().map(|v| &v[..]), Some(&b"b"[..]));
}

#[test]
fn node_batches_group_cursor_without_overlap() {
    let config = AllocConfig { node_batch: 4, ..AllocConfig::default() };
    let arena = RespArena::with_config(config).expect("config");
    let mut alloc = arena.allocator();

    let ptrs: Vec<*const Resp> = (0..12).map(|_| alloc.alloc_node() as *const Resp).collect();
    for group in ptrs.chunks(4) {
        for pair in group.windows(2) {
            assert_eq!(pair[0].wrapping_add(1), pair[1]);
        }
    }
    let unique: HashSet<usize> = ptrs.iter().map(|p| *p as usize).collect();
    assert_eq!(unique.len(), 12);
    assert_eq!(alloc.stats().node_batches, 3);
    assert_eq!(alloc.remaining_nodes(), 0);
}
