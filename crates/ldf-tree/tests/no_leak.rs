//! Failed parses must not leave anything allocated.
//!
//! A counting global allocator tracks live allocations per thread, so the
//! test harness running other tests in parallel does not disturb the count.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use ldf_tree::{ParseErrorKind, parse};

struct Counting;

thread_local! {
    static LIVE: Cell<isize> = const { Cell::new(0) };
}

fn bump(delta: isize) {
    let _ = LIVE.try_with(|live| live.set(live.get() + delta));
}

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            bump(1);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        bump(-1);
    }
}

#[global_allocator]
static GLOBAL: Counting = Counting;

fn live() -> isize {
    LIVE.with(Cell::get)
}

/// Net allocations left behind by running `f`.
///
/// `f` runs once beforehand so lazily initialized statics are not counted.
fn leaked<T>(mut f: impl FnMut() -> T) -> isize {
    drop(f());
    let before = live();
    let out = f();
    let after = live();
    drop(out);
    after - before
}

#[test]
fn test_failed_parses_release_everything() {
    let deep_items = format!(
        "#({} (:k \"v\" :l #(1 2 3",
        (0..50).map(|n| format!("\"item{n}\"")).collect::<Vec<_>>().join(" ")
    );
    let cases = [
        ("(:a 1) #(x y) (:b", ParseErrorKind::UnexpectedEof),
        ("(:a #(1 2 (:b \"x\" :c #(y z", ParseErrorKind::UnexpectedEof),
        ("(:a 1 :b 2 3)", ParseErrorKind::UnexpectedToken),
        ("#(\"a\" \"b\" sym `)", ParseErrorKind::UnexpectedChar),
        ("(:s \"never closed", ParseErrorKind::UnexpectedEof),
        ("#(1 2) #3", ParseErrorKind::UnexpectedToken),
        (deep_items.as_str(), ParseErrorKind::UnexpectedEof),
    ];

    for (source, kind) in cases {
        let net = leaked(|| {
            let err = parse(source).unwrap_err();
            assert_eq!(err.kind, kind, "{source}");
        });
        assert_eq!(net, 0, "{source} leaked {net} allocations");
    }
}

#[test]
fn test_release_after_success() {
    let source = "(:name \"ldf\" :tags #(a b c) :nested (:x #((:y 1))))";
    let net = leaked(|| parse(source).unwrap().release());
    assert_eq!(net, 0);
}
