//! Benchmark: list reconciliation (append, reverse, truncate)

use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use strand_core::components::For;
use strand_core::dom::Document;
use strand_core::reactive::ReactiveVec;

type Item = Rc<usize>;

fn mounted(len: usize) -> (Document, ReactiveVec<Item>, For<Item>) {
    let doc = Document::new();
    let ul = doc.create_element("ul");
    doc.append_child(doc.root(), ul).unwrap();

    let each = ReactiveVec::from_vec((0..len).map(Rc::new).collect());
    let list = For::new(&doc, each.clone(), |doc, item: &Item, _| {
        let li = doc.create_element("li");
        doc.append_child(li, doc.create_text(item.to_string()))?;
        Ok(li)
    })
    .unwrap();
    doc.append_child(ul, list.anchor()).unwrap();
    doc.flush_microtasks();
    (doc, each, list)
}

fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");
    for size in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || mounted(0),
                |(doc, each, list)| {
                    for i in 0..size {
                        each.push(Rc::new(i)).unwrap();
                    }
                    black_box((doc, list))
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_reverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("reverse");
    for size in [10, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || mounted(size),
                |(doc, each, list)| {
                    let mut items = each.to_vec_untracked();
                    items.reverse();
                    each.assign(items).unwrap();
                    black_box((doc, list))
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_truncate(c: &mut Criterion) {
    c.bench_function("truncate_1000_to_10", |b| {
        b.iter_batched(
            || mounted(1000),
            |(doc, each, list)| {
                each.truncate(10).unwrap();
                black_box((doc, list))
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_append, bench_reverse, bench_truncate);
criterion_main!(benches);
