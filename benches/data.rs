use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use yangdb::context::Context;
use yangdb::datastore::Datastore;
use yangdb::db::{KvStore, MemStore};

static INTERFACES: &str = r###"
    module interfaces {
        namespace "urn:example:interfaces";
        prefix if;

        container interfaces {
            list interface {
                key "name";
                leaf name { type string; }
                leaf mtu { type uint16; default "1500"; }
                leaf enabled { type boolean; default "true"; }
            }
        }
    }"###;

fn store_generate(interfaces: u32) -> Datastore<MemStore> {
    let mut store = MemStore::new();

    for i in 1..=interfaces {
        let pairs = [
            (format!("/interfaces/interface/eth{}", i), None),
            (
                format!("/interfaces/interface/eth{}/name", i),
                Some(format!("eth{}", i)),
            ),
            (
                format!("/interfaces/interface/eth{}/mtu", i),
                Some("9000".to_owned()),
            ),
        ];

        for (key, value) in &pairs {
            store
                .set(key, value.as_deref())
                .expect("Failed to populate store");
        }
    }

    Datastore::new(store)
}

fn criterion_benchmark(c: &mut Criterion) {
    let store_sizes = [256, 1024, 4096, 16 * 1024];

    // Initialize context.
    let mut ctx = Context::new();
    ctx.load_module_str(INTERFACES)
        .expect("Failed to load module");

    // Prepare Datastore.get() benchmark.
    let mut group = c.benchmark_group("Datastore.get() / store size");
    for size in &store_sizes {
        let store = store_generate(*size);

        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            size,
            |b, _| {
                b.iter(|| {
                    store.get(&ctx, None).expect("Failed to read datastore");
                });
            },
        );
    }
    group.finish();

    // Prepare Datastore.get() + XPath filter benchmark.
    let mut group = c.benchmark_group("Datastore.get() xpath / store size");
    for size in &store_sizes {
        let store = store_generate(*size);

        group.bench_with_input(
            BenchmarkId::from_parameter(size),
            size,
            |b, _| {
                b.iter(|| {
                    store
                        .get(&ctx, Some("/interfaces/interface[name='eth1']"))
                        .expect("Failed to read datastore");
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
