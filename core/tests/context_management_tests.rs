// tests/context_management_tests.rs
mod common;

use common::*;
use serial_test::serial;
use shopflow::{ContextData, Pipeline, PipelineControl};
use std::time::Duration;

#[tokio::test]
#[serial]
async fn later_steps_see_earlier_writes() {
  setup_tracing();
  let mut pipeline = Pipeline::<TestContext, TestError>::new(&[("price", false, None), ("total", false, None)]);

  pipeline.on_root("price", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.update(|data| data.units_reserved = 3);
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });
  pipeline.on_root("total", |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let units = ctx.with(|data| data.units_reserved);
      // Suspension point with no guard held.
      tokio::time::sleep(Duration::from_millis(1)).await;
      ctx.update(|data| data.trail.push(format!("total={}", units * 250)));
      Ok::<_, TestError>(PipelineControl::Continue)
    })
  });

  let ctx = ContextData::new(TestContext::default());
  pipeline.run(ctx.clone()).await.unwrap();
  assert_eq!(ctx.read().trail, vec!["total=750"]);
}

#[tokio::test]
#[serial]
async fn clones_share_the_same_data() {
  setup_tracing();
  let original = ContextData::new(TestContext::default());
  let clone = original.clone();

  original.write().units_reserved = 5;
  assert_eq!(clone.read().units_reserved, 5);

  clone.update(|data| data.units_reserved -= 2);
  assert_eq!(original.with(|data| data.units_reserved), 3);
}

#[test]
fn try_into_inner_requires_last_handle() {
  let ctx = ContextData::new(TestContext {
    units_reserved: 7,
    ..Default::default()
  });
  let extra = ctx.clone();

  let ctx = match ctx.try_into_inner() {
    Ok(_) => panic!("a second handle is still alive"),
    Err(ctx) => ctx,
  };
  drop(extra);

  let data = ctx.try_into_inner().expect("sole handle");
  assert_eq!(data.units_reserved, 7);
}
