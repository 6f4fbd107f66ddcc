use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use strata::{
    Allocator, AllocatorExt, FreeListAllocator, LinearAllocator, PoolAllocator, ProxyAllocator,
    StackAllocator,
};

const BATCH_SIZE: usize = 1000;
const ARENA_BYTES: usize = 256 * 1024;

fn arena() -> Vec<u8> {
    vec![0u8; ARENA_BYTES]
}

fn bench_alloc_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("Batch Allocation 1000");

    group.bench_function("Box::new", |b| {
        b.iter(|| {
            let mut v = Vec::with_capacity(BATCH_SIZE);
            for i in 0..BATCH_SIZE {
                v.push(Box::new(i as u64));
            }
            black_box(v);
        })
    });

    let mut memory = arena();
    group.bench_function("LinearAllocator", |b| {
        let mut linear = LinearAllocator::new(&mut memory);
        b.iter(|| {
            for i in 0..BATCH_SIZE {
                black_box(linear.new_value(i as u64).unwrap());
            }
            linear.clear();
        })
    });

    let mut memory = arena();
    group.bench_function("StackAllocator", |b| {
        let stack = StackAllocator::new(&mut memory);
        let mut held = Vec::with_capacity(BATCH_SIZE);
        b.iter(|| {
            for i in 0..BATCH_SIZE {
                held.push(stack.new_value(i as u64).unwrap());
            }
            while let Some(p) = held.pop() {
                unsafe { stack.delete_value(black_box(p)) };
            }
        })
    });

    let mut memory = arena();
    group.bench_function("FreeListAllocator", |b| {
        let list = FreeListAllocator::new(&mut memory);
        let mut held = Vec::with_capacity(BATCH_SIZE);
        b.iter(|| {
            for i in 0..BATCH_SIZE {
                held.push(list.new_value(i as u64).unwrap());
            }
            for p in held.drain(..) {
                unsafe { list.delete_value(black_box(p)) };
            }
        })
    });

    let mut memory = arena();
    group.bench_function("PoolAllocator", |b| {
        let pool = PoolAllocator::for_type::<u64>(&mut memory);
        let mut held = Vec::with_capacity(BATCH_SIZE);
        b.iter(|| {
            for i in 0..BATCH_SIZE {
                held.push(pool.new_value(i as u64).unwrap());
            }
            for p in held.drain(..) {
                unsafe { pool.delete_value(black_box(p)) };
            }
        })
    });

    group.finish();
}

fn bench_alloc_reuse(c: &mut Criterion) {
    let mut group = c.benchmark_group("Interleaved Reuse 1000");

    group.bench_function("Box::new", |b| {
        b.iter_batched(
            || Vec::<Box<[u8; 48]>>::with_capacity(64),
            |mut held| {
                for i in 0..BATCH_SIZE {
                    if i % 3 == 2 {
                        held.swap_remove(i % held.len());
                    } else {
                        held.push(Box::new([i as u8; 48]));
                    }
                }
                black_box(held);
            },
            BatchSize::SmallInput,
        )
    });

    let mut memory = arena();
    group.bench_function("FreeListAllocator", |b| {
        let list = FreeListAllocator::new(&mut memory);
        let mut held = Vec::with_capacity(BATCH_SIZE);
        b.iter(|| {
            for i in 0..BATCH_SIZE {
                if i % 3 == 2 {
                    let p = held.swap_remove(i % held.len());
                    unsafe { list.deallocate(p) };
                } else {
                    let size = 16 + (i % 7) * 24;
                    held.push(list.allocate(black_box(size), 8).unwrap());
                }
            }
            for p in held.drain(..) {
                unsafe { list.deallocate(p) };
            }
        })
    });

    let mut memory = arena();
    group.bench_function("ProxyAllocator<PoolAllocator>", |b| {
        let pool = PoolAllocator::new(&mut memory, 48, 16);
        let proxy = ProxyAllocator::new(&pool);
        let mut held = Vec::with_capacity(BATCH_SIZE);
        b.iter(|| {
            for i in 0..BATCH_SIZE {
                if i % 3 == 2 {
                    let p = held.swap_remove(i % held.len());
                    unsafe { proxy.deallocate(p) };
                } else {
                    held.push(proxy.allocate(48, 16).unwrap());
                }
            }
            for p in held.drain(..) {
                unsafe { proxy.deallocate(p) };
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_alloc_batch, bench_alloc_reuse);
criterion_main!(benches);
