use crate::config::{keys, Config, Value};
use crate::demo::{make_demo, Demo, DemoKind};
use crate::error::RunnerError;
use crate::output::{Output, Tone};

use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  Execute,
  Describe,
}

/// Owns one instance of every demo, all sharing one configuration handle.
pub struct Runner {
  config: Config,
  output: Arc<Output>,
  demos: BTreeMap<DemoKind, Box<dyn Demo>>,
}

impl Runner {
  pub fn new(config: Config, output: Arc<Output>) -> Self {
    let demos = DemoKind::ALL
      .iter()
      .map(|kind| (*kind, make_demo(*kind, config.clone(), output.clone())))
      .collect();
    Runner {
      config,
      output,
      demos,
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn output(&self) -> &Output {
    &self.output
  }

  pub fn demos(&self) -> impl Iterator<Item = DemoKind> + '_ {
    self.demos.keys().copied()
  }

  pub fn invoke(&self, name: &str, action: Action) -> Result<(), RunnerError> {
    let kind: DemoKind = name.parse()?;
    let demo = self
      .demos
      .get(&kind)
      .ok_or_else(|| RunnerError::UnknownDemo(name.to_owned()))?;
    self.output.set_colors(self.config.flag(keys::USE_COLORS));
    match action {
      Action::Execute => {
        log::info!("running {}", kind);
        demo.execute();
        log::info!("{} finished", kind);
      }
      Action::Describe => self.output.line(Tone::Plain, demo.describe()),
    }
    Ok(())
  }

  /// Validates and stores a setting. Every demo sees it on its next run.
  pub fn update_config(&self, key: &str, raw: &str) -> Result<Value, RunnerError> {
    Ok(self.config.update(key, raw)?)
  }
}
