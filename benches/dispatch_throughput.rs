use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use tokio::runtime::Runtime;

use eventweave::dispatch::dispatch;
use eventweave::handler::{HandlerError, handler_fn};
use eventweave::registry::HandlerEntry;

const FAN_OUT: &[usize] = &[1, 4, 16];
const BATCH: usize = 1024;

fn entries(fan_out: usize) -> Vec<HandlerEntry<u64>> {
    (0..fan_out)
        .map(|_| HandlerEntry::new(handler_fn(|_: u64| async { Ok::<(), HandlerError>(()) })))
        .collect()
}

fn dispatch_throughput(c: &mut Criterion) {
    let runtime = Runtime::new().expect("runtime");
    let mut group = c.benchmark_group("dispatch_fan_out");

    for &fan_out in FAN_OUT {
        group.throughput(Throughput::Elements((BATCH * fan_out) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(fan_out),
            &fan_out,
            |b, &fan_out| {
                b.to_async(&runtime).iter(|| async move {
                    let entries = entries(fan_out);
                    for item in 0..BATCH as u64 {
                        dispatch(item, &entries).await.expect("dispatch");
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, dispatch_throughput);
criterion_main!(benches);
