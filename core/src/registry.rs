// stepwise/src/registry.rs

//! Defines `Registry<E>`, a name-keyed collection of pipelines ("scenarios").
//! Pipelines are `crate::pipeline::definition::Pipeline<PipelineHandlerError>`;
//! the registry returns results with an application-level error type `E`.

use crate::core::context::Context;
use crate::error::StepwiseError;
use crate::pipeline::definition::Pipeline as CorePipeline;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Type-erased runner so pipelines with different handler error types can
/// share one registry.
#[async_trait]
trait AnyPipelineRunner<ApplicationError>: Send + Sync
where
  ApplicationError: std::error::Error + Send + Sync + 'static,
{
  async fn run_erased(&self, initial: Context) -> Result<Context, ApplicationError>;

  fn step_names(&self) -> Vec<String>;
}

struct PipelineWrapper<PipelineHandlerError, ApplicationError>
where
  PipelineHandlerError: std::error::Error + From<StepwiseError> + Send + Sync + 'static,
  ApplicationError: std::error::Error + From<PipelineHandlerError> + From<StepwiseError> + Send + Sync + 'static,
{
  pipeline: Arc<CorePipeline<PipelineHandlerError>>,
  _phantom_app_err: PhantomData<fn() -> ApplicationError>,
}

#[async_trait]
impl<PipelineHandlerError, ApplicationError> AnyPipelineRunner<ApplicationError>
  for PipelineWrapper<PipelineHandlerError, ApplicationError>
where
  PipelineHandlerError: std::error::Error + From<StepwiseError> + Send + Sync + 'static,
  ApplicationError: std::error::Error + From<PipelineHandlerError> + From<StepwiseError> + Send + Sync + 'static,
{
  async fn run_erased(&self, initial: Context) -> Result<Context, ApplicationError> {
    self.pipeline.run(initial).await.map_err(ApplicationError::from)
  }

  fn step_names(&self) -> Vec<String> {
    self.pipeline.step_names().into_iter().map(str::to_string).collect()
  }
}

/// Scenario registry.
///
/// `ApplicationError` must be constructible from `StepwiseError` to report
/// registry-level failures such as an unknown scenario name.
pub struct Registry<ApplicationError = StepwiseError>
where
  ApplicationError: std::error::Error + From<StepwiseError> + Send + Sync + 'static,
{
  pipelines: RwLock<BTreeMap<String, Arc<dyn AnyPipelineRunner<ApplicationError>>>>,
}

impl<ApplicationError> Default for Registry<ApplicationError>
where
  ApplicationError: std::error::Error + From<StepwiseError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<ApplicationError> Registry<ApplicationError>
where
  ApplicationError: std::error::Error + From<StepwiseError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      pipelines: RwLock::new(BTreeMap::new()),
    }
  }

  /// Registers `pipeline` under `name`, replacing any previous registration.
  pub fn register_pipeline<PipelineHandlerError>(&self, name: impl Into<String>, pipeline: CorePipeline<PipelineHandlerError>)
  where
    PipelineHandlerError: std::error::Error + From<StepwiseError> + Send + Sync + 'static,
    ApplicationError: From<PipelineHandlerError>,
  {
    let name = name.into();
    event!(Level::DEBUG, scenario = %name, steps = pipeline.len(), "Registering pipeline.");
    let wrapper = PipelineWrapper::<PipelineHandlerError, ApplicationError> {
      pipeline: Arc::new(pipeline),
      _phantom_app_err: PhantomData,
    };
    self.pipelines.write().insert(name, Arc::new(wrapper));
  }

  /// Runs the scenario registered under `name`.
  #[instrument(name = "Registry::run", skip(self, initial), err(Display))]
  pub async fn run(&self, name: &str, initial: Context) -> Result<Context, ApplicationError> {
    let runner = self.pipelines.read().get(name).cloned().ok_or_else(|| {
      event!(Level::ERROR, "No pipeline registered under this name.");
      ApplicationError::from(StepwiseError::ConfigurationError {
        scope: "Registry::run".to_string(),
        message: format!("no pipeline registered under '{}'", name),
      })
    })?;
    runner.run_erased(initial).await
  }

  pub fn contains(&self, name: &str) -> bool {
    self.pipelines.read().contains_key(name)
  }

  /// Registered scenario names, sorted.
  pub fn names(&self) -> Vec<String> {
    self.pipelines.read().keys().cloned().collect()
  }

  /// Step names of a registered scenario, in execution order.
  pub fn describe(&self, name: &str) -> Option<Vec<String>> {
    self.pipelines.read().get(name).map(|runner| runner.step_names())
  }
}
