// stepwise/examples/basic_pipeline.rs

use stepwise::{pipe, Context, Handler, Key, Pipeline, StepDecl, StepOutput, StepwiseError};
use tracing::info;

const GREETING: Key<String> = Key::new("greeting");
const SHOUTED: Key<String> = Key::new("shouted");
const LENGTH: Key<usize> = Key::new("length");

#[tokio::main]
async fn main() -> Result<(), StepwiseError> {
  tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

  // 1. Declared pipeline: every step names what it reads and produces.
  let mut pipeline = Pipeline::<StepwiseError>::new(&[
    StepDecl::new("shout").reads(&[GREETING.name()]).produces(&[SHOUTED.name()]),
    StepDecl::new("measure").reads(&[SHOUTED.name()]).produces(&[LENGTH.name()]),
    StepDecl::new("report"),
  ]);

  pipeline.on("shout", |ctx: Context| async move {
    let greeting = ctx.require(GREETING)?;
    Ok::<_, StepwiseError>(Context::new().with(SHOUTED, greeting.to_uppercase()))
  });
  pipeline.on("measure", |ctx: Context| async move {
    let shouted = ctx.require(SHOUTED)?;
    Ok::<_, StepwiseError>(Context::new().with(LENGTH, shouted.len()))
  });
  pipeline.observe("report", |ctx| {
    info!(shouted = ?ctx.get(SHOUTED), length = ?ctx.get(LENGTH), "Pipeline context");
  });

  let final_ctx = pipeline
    .run(Context::new().with(GREETING, "gm, citadel".to_string()))
    .await?;
  info!("Final keys: {:?}", final_ctx.keys().collect::<Vec<_>>());

  // 2. The same flow as a bare composition of handlers.
  let shout: Handler<StepwiseError> = Box::new(|ctx: Context| {
    Box::pin(async move {
      let greeting = ctx.require(GREETING)?;
      Ok::<_, StepwiseError>(StepOutput::Merge(Context::new().with(SHOUTED, greeting.to_uppercase())))
    })
  });
  let composed = pipe(Context::new().with(GREETING, "gn".to_string()), vec![shout]).await?;
  info!(shouted = ?composed.get(SHOUTED), "Composed result");

  Ok(())
}
