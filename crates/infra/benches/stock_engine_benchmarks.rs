use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use std::sync::Arc;
use std::thread;

use stockmaster_core::UserId;
use stockmaster_infra::services::{NewReceipt, NewTransfer};
use stockmaster_infra::store::LedgerFilter;
use stockmaster_infra::{InMemoryCatalog, InMemoryStockStore, StockEngine};
use stockmaster_inventory::{ProductId, RequestedLine, WarehouseId, ledger};

type Engine = StockEngine<Arc<InMemoryStockStore>, Arc<InMemoryCatalog>>;

fn setup(products: usize) -> (Engine, Vec<ProductId>, WarehouseId, WarehouseId) {
    let catalog = Arc::new(InMemoryCatalog::new());
    let product_ids = (0..products)
        .map(|i| catalog.add_product(&format!("Product {i}"), &format!("SKU-{i}"), 5))
        .collect();
    let wh_a = catalog.add_warehouse("WH-A");
    let wh_b = catalog.add_warehouse("WH-B");
    let engine = StockEngine::new(Arc::new(InMemoryStockStore::new()), catalog);
    (engine, product_ids, wh_a, wh_b)
}

fn bench_single_operation_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_operation_latency");
    let user = UserId::new();

    group.bench_function("adjust", |b| {
        let (engine, products, wh_a, _) = setup(1);
        b.iter(|| {
            engine
                .adjust(black_box(products[0]), wh_a, 1, user, None)
                .unwrap()
        });
    });

    group.bench_function("receipt_create_and_validate", |b| {
        let (engine, products, wh_a, _) = setup(1);
        b.iter(|| {
            let receipt = engine
                .create_receipt(
                    NewReceipt {
                        supplier: "Acme".into(),
                        warehouse_id: wh_a,
                        lines: vec![RequestedLine {
                            product_id: products[0],
                            quantity: 3,
                        }],
                        notes: None,
                    },
                    user,
                )
                .unwrap();
            engine.validate_receipt(receipt.id_typed(), user).unwrap()
        });
    });

    group.bench_function("transfer_create_and_complete", |b| {
        let (engine, products, wh_a, wh_b) = setup(1);
        engine.adjust(products[0], wh_a, 1_000_000_000, user, None).unwrap();
        b.iter(|| {
            let transfer = engine
                .create_transfer(
                    NewTransfer {
                        product_id: products[0],
                        from_warehouse_id: wh_a,
                        to_warehouse_id: wh_b,
                        quantity: 1,
                        notes: None,
                    },
                    user,
                )
                .unwrap();
            engine.complete_transfer(transfer.id_typed(), user).unwrap()
        });
    });

    group.finish();
}

/// Adjustments from several threads, all on one key versus one key each.
fn bench_contended_vs_disjoint_keys(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_vs_disjoint_keys");
    let user = UserId::new();
    let per_thread = 50;

    for threads in [2usize, 4, 8] {
        group.throughput(Throughput::Elements((threads * per_thread) as u64));

        group.bench_with_input(BenchmarkId::new("same_key", threads), &threads, |b, &threads| {
            let (engine, products, wh_a, _) = setup(1);
            b.iter(|| {
                thread::scope(|s| {
                    for _ in 0..threads {
                        s.spawn(|| {
                            for _ in 0..per_thread {
                                engine.adjust(products[0], wh_a, 1, user, None).unwrap();
                            }
                        });
                    }
                });
            });
        });

        group.bench_with_input(BenchmarkId::new("disjoint_keys", threads), &threads, |b, &threads| {
            let (engine, products, wh_a, _) = setup(threads);
            b.iter(|| {
                thread::scope(|s| {
                    for product_id in &products {
                        let engine = &engine;
                        s.spawn(move || {
                            for _ in 0..per_thread {
                                engine.adjust(*product_id, wh_a, 1, user, None).unwrap();
                            }
                        });
                    }
                });
            });
        });
    }

    group.finish();
}

fn bench_ledger_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_replay");
    let user = UserId::new();

    for entry_count in [100usize, 1_000, 10_000] {
        let (engine, products, wh_a, _) = setup(10);
        for i in 0..entry_count {
            engine
                .adjust(products[i % products.len()], wh_a, 1, user, None)
                .unwrap();
        }
        let entries = engine.ledger(&LedgerFilter::default()).unwrap();

        group.throughput(Throughput::Elements(entry_count as u64));
        group.bench_with_input(BenchmarkId::new("replay", entry_count), &entries, |b, entries| {
            b.iter(|| ledger::replay(black_box(entries)));
        });
        group.bench_with_input(BenchmarkId::new("reconcile", entry_count), &engine, |b, engine| {
            b.iter(|| engine.reconcile().unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_operation_latency,
    bench_contended_vs_disjoint_keys,
    bench_ledger_replay
);
criterion_main!(benches);
