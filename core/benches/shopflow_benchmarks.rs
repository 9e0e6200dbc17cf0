use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use shopflow::{ContextData, FlowError, Pipeline, PipelineControl, Registry};
use tokio::runtime::Runtime;

#[derive(Debug, Default)]
struct LedgerContext {
  stock: i64,
  lines: u64,
}

fn adjusting_handler(delta: i64) -> shopflow::Handler<LedgerContext, FlowError> {
  Box::new(move |ctx: ContextData<LedgerContext>| {
    Box::pin(async move {
      ctx.update(|data| {
        data.stock += delta;
        data.lines += 1;
      });
      Ok(PipelineControl::Continue)
    })
  })
}

fn build_pipeline(num_steps: usize) -> Pipeline<LedgerContext, FlowError> {
  let names: Vec<String> = (0..num_steps).map(|i| format!("step_{}", i)).collect();
  let defs: Vec<(&str, bool, Option<shopflow::SkipCondition<LedgerContext>>)> =
    names.iter().map(|n| (n.as_str(), false, None)).collect();
  let mut pipeline = Pipeline::new(&defs);
  for (i, name) in names.iter().enumerate() {
    let delta = if i % 2 == 0 { -1 } else { 1 };
    pipeline.on_root(name, adjusting_handler(delta));
  }
  pipeline
}

fn bench_direct_run(c: &mut Criterion) {
  let rt = Runtime::new().expect("tokio runtime");
  let mut group = c.benchmark_group("pipeline_run");
  for num_steps in [1usize, 4, 16] {
    let pipeline = build_pipeline(num_steps);
    group.bench_with_input(BenchmarkId::from_parameter(num_steps), &num_steps, |b, _| {
      b.to_async(&rt).iter(|| async {
        let ctx = ContextData::new(LedgerContext { stock: 100, lines: 0 });
        pipeline.run(ctx).await.expect("run")
      });
    });
  }
  group.finish();
}

fn bench_registry_dispatch(c: &mut Criterion) {
  let rt = Runtime::new().expect("tokio runtime");
  let registry = Registry::<FlowError>::new();
  registry.register_pipeline(build_pipeline(4));

  c.bench_function("registry_dispatch_4_steps", |b| {
    b.to_async(&rt).iter(|| async {
      let ctx = ContextData::new(LedgerContext { stock: 100, lines: 0 });
      registry.run(ctx).await.expect("run")
    });
  });
}

criterion_group!(benches, bench_direct_run, bench_registry_dispatch);
criterion_main!(benches);
