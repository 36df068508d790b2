//! Live, shared configuration.
//!
//! A [`Config`] is a handle: clones point at the same store, so the harness
//! can change a setting and every demo sees the new value on its next read.
//! Reads never fail. A missing key, or a stored value of the wrong type,
//! resolves to the key's default.
use crate::error::ConfigError;

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

pub mod keys {
  pub const MESSAGE_COUNT: &str = "message_count";
  pub const DELAY_BETWEEN_MESSAGES: &str = "delay_between_messages";
  pub const MAX_THREADS: &str = "max_threads";
  pub const NUM_THREADS: &str = "num_threads";
  pub const DELAY_BETWEEN_STAGES: &str = "delay_between_stages";
  pub const ARRAY_SIZE: &str = "array_size";
  pub const NUM_PROCESSES: &str = "num_processes";
  pub const NUM_ARRAYS: &str = "num_arrays";
  pub const WORDS_TO_COUNT: &str = "words_to_count";
  pub const FILE_PREFIX: &str = "file_prefix";
  pub const START_NUMBER: &str = "start_number";
  pub const END_NUMBER: &str = "end_number";
  pub const NUM_FILES: &str = "num_files";
  pub const USE_COLORS: &str = "use_colors";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
  Bool(bool),
  Int(i64),
  Float(f64),
  Text(String),
  List(Vec<String>),
}

impl Display for Value {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      Value::Bool(value) => write!(f, "{}", value),
      Value::Int(value) => write!(f, "{}", value),
      Value::Float(value) => write!(f, "{}", value),
      Value::Text(value) => write!(f, "{}", value),
      Value::List(values) => write!(f, "[{}]", values.join(", ")),
    }
  }
}

impl Value {
  /// Best guess for keys without a declared kind.
  fn infer(raw: &str) -> Value {
    let raw = raw.trim();
    match raw.to_ascii_lowercase().as_str() {
      "true" => return Value::Bool(true),
      "false" => return Value::Bool(false),
      _ => (),
    }
    if let Ok(value) = raw.parse::<i64>() {
      Value::Int(value)
    } else if let Ok(value) = raw.parse::<f64>() {
      Value::Float(value)
    } else {
      Value::Text(raw.to_owned())
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kind {
  /// Non-negative integer: message, thread and file counts.
  Count,
  Int,
  /// Non-negative number of seconds, fractional values allowed.
  Seconds,
  Flag,
  Text,
  /// Comma separated on input, a list once stored.
  Words,
}

impl Kind {
  fn expected(&self) -> &'static str {
    match self {
      Kind::Count => "a non-negative integer",
      Kind::Int => "an integer",
      Kind::Seconds => "a non-negative number of seconds",
      Kind::Flag => "true or false",
      Kind::Text => "text",
      Kind::Words => "a comma-separated list of words",
    }
  }

  fn accepts(&self, value: &Value) -> bool {
    match (self, value) {
      (Kind::Count, Value::Int(n)) => *n >= 0,
      (Kind::Int, Value::Int(_)) => true,
      (Kind::Seconds, Value::Int(n)) => *n >= 0,
      (Kind::Seconds, Value::Float(n)) => Duration::try_from_secs_f64(*n).is_ok(),
      (Kind::Flag, Value::Bool(_)) => true,
      (Kind::Text, Value::Text(_)) => true,
      (Kind::Words, Value::List(_)) => true,
      _ => false,
    }
  }

  fn parse(&self, key: &str, raw: &str) -> Result<Value, ConfigError> {
    let trimmed = raw.trim();
    let parsed = match self {
      Kind::Count | Kind::Int => trimmed.parse::<i64>().ok().map(Value::Int),
      Kind::Seconds => trimmed
        .parse::<i64>()
        .map(Value::Int)
        .or_else(|_| trimmed.parse::<f64>().map(Value::Float))
        .ok(),
      Kind::Flag => match trimmed.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(Value::Bool(true)),
        "false" | "no" | "off" | "0" => Some(Value::Bool(false)),
        _ => None,
      },
      Kind::Text => Some(Value::Text(raw.to_owned())),
      Kind::Words => {
        let words: Vec<String> = trimmed
          .split(',')
          .map(str::trim)
          .filter(|word| !word.is_empty())
          .map(str::to_owned)
          .collect();
        if words.is_empty() {
          None
        } else {
          Some(Value::List(words))
        }
      }
    };
    match parsed {
      Some(value) if self.accepts(&value) => Ok(value),
      _ => Err(ConfigError::InvalidValue {
        key: key.to_owned(),
        value: raw.to_owned(),
        expected: self.expected(),
      }),
    }
  }
}

struct Setting {
  kind: Kind,
  default: Value,
}

lazy_static! {
  static ref SETTINGS: BTreeMap<&'static str, Setting> = {
    let words = ["python", "multiprocessing", "example"];
    let mut settings: BTreeMap<&'static str, Setting> = BTreeMap::new();
    let mut declare = |key: &'static str, kind: Kind, default: Value| {
      settings.insert(key, Setting { kind, default });
    };
    declare(keys::MESSAGE_COUNT, Kind::Count, Value::Int(5));
    declare(keys::DELAY_BETWEEN_MESSAGES, Kind::Seconds, Value::Int(2));
    declare(keys::MAX_THREADS, Kind::Count, Value::Int(10));
    declare(keys::NUM_THREADS, Kind::Count, Value::Int(4));
    declare(keys::DELAY_BETWEEN_STAGES, Kind::Seconds, Value::Int(1));
    declare(keys::ARRAY_SIZE, Kind::Count, Value::Int(1_000_000));
    declare(keys::NUM_PROCESSES, Kind::Count, Value::Int(4));
    declare(keys::NUM_ARRAYS, Kind::Count, Value::Int(100));
    declare(
      keys::WORDS_TO_COUNT,
      Kind::Words,
      Value::List(words.iter().map(|word| word.to_string()).collect()),
    );
    declare(keys::FILE_PREFIX, Kind::Text, Value::Text("text".to_owned()));
    declare(keys::START_NUMBER, Kind::Int, Value::Int(2));
    declare(keys::END_NUMBER, Kind::Int, Value::Int(100_000));
    declare(keys::NUM_FILES, Kind::Count, Value::Int(5));
    declare(keys::USE_COLORS, Kind::Flag, Value::Bool(true));
    settings
  };
}

/// The kind declared for `key`, if it is a recognised setting.
pub fn kind_of(key: &str) -> Option<Kind> {
  SETTINGS.get(key).map(|setting| setting.kind)
}

/// The built-in default for `key`, if it is a recognised setting.
pub fn default_of(key: &str) -> Option<Value> {
  SETTINGS.get(key).map(|setting| setting.default.clone())
}

fn default_values() -> BTreeMap<String, Value> {
  SETTINGS
    .iter()
    .map(|(key, setting)| (key.to_string(), setting.default.clone()))
    .collect()
}

fn write_values(path: &Path, values: &BTreeMap<String, Value>) -> Result<(), ConfigError> {
  let encoded = serde_json::to_string_pretty(values)?;
  fs::write(path, encoded).map_err(|source| ConfigError::Io {
    path: path.to_owned(),
    source,
  })
}

struct ConfigInner {
  values: BTreeMap<String, Value>,
  path: Option<PathBuf>,
}

#[derive(Clone)]
pub struct Config {
  inner: Arc<RwLock<ConfigInner>>,
}

impl Default for Config {
  fn default() -> Self {
    Self::in_memory()
  }
}

impl Config {
  /// Configuration that only ever lives in memory, starting from defaults.
  pub fn in_memory() -> Self {
    Self::with_values(BTreeMap::new(), None)
  }

  fn with_values(values: BTreeMap<String, Value>, path: Option<PathBuf>) -> Self {
    Config {
      inner: Arc::new(RwLock::new(ConfigInner { values, path })),
    }
  }

  /// Loads the JSON file at `path` and writes every later change back to it.
  ///
  /// A missing file is created with the defaults. A file that is not valid
  /// JSON is left untouched and the defaults are used until the next update.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
    let path = path.into();
    let values = match fs::read_to_string(&path) {
      Ok(text) => match serde_json::from_str::<BTreeMap<String, Value>>(&text) {
        Ok(values) => values,
        Err(error) => {
          log::error!(
            "config file {} is not valid JSON ({}), using default configuration",
            path.display(),
            error
          );
          BTreeMap::new()
        }
      },
      Err(error) if error.kind() == ErrorKind::NotFound => {
        log::warn!(
          "config file {} not found, writing default configuration",
          path.display()
        );
        let defaults = default_values();
        write_values(&path, &defaults)?;
        defaults
      }
      Err(source) => return Err(ConfigError::Io { path, source }),
    };
    Ok(Self::with_values(values, Some(path)))
  }

  fn read(&self) -> RwLockReadGuard<'_, ConfigInner> {
    self.inner.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, ConfigInner> {
    self.inner.write().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn path(&self) -> Option<PathBuf> {
    self.read().path.clone()
  }

  /// The stored value for `key`, else its default.
  pub fn lookup(&self, key: &str) -> Option<Value> {
    self.read().values.get(key).cloned().or_else(|| default_of(key))
  }

  /// Defaults overlaid with stored values, ordered by key.
  pub fn entries(&self) -> Vec<(String, Value)> {
    let mut merged = default_values();
    merged.extend(self.read().values.clone());
    merged.into_iter().collect()
  }

  /// Parses `raw` according to the kind of `key` and stores it.
  pub fn update(&self, key: &str, raw: &str) -> Result<Value, ConfigError> {
    let value = match kind_of(key) {
      Some(kind) => kind.parse(key, raw)?,
      None => Value::infer(raw),
    };
    self.store(key, value.clone())?;
    Ok(value)
  }

  /// Stores an already typed value, rejecting one that does not fit the kind
  /// of `key`.
  pub fn set(&self, key: &str, value: Value) -> Result<(), ConfigError> {
    if let Some(kind) = kind_of(key) {
      if !kind.accepts(&value) {
        return Err(ConfigError::InvalidValue {
          key: key.to_owned(),
          value: value.to_string(),
          expected: kind.expected(),
        });
      }
    }
    self.store(key, value)
  }

  fn store(&self, key: &str, value: Value) -> Result<(), ConfigError> {
    let mut inner = self.write();
    log::debug!("config '{}' = {}", key, value);
    inner.values.insert(key.to_owned(), value);
    match &inner.path {
      Some(path) => write_values(path, &inner.values),
      None => Ok(()),
    }
  }

  fn typed<T, F>(&self, key: &str, extract: F) -> T
  where
    T: Default,
    F: Fn(&Value) -> Option<T>,
  {
    if let Some(value) = self.read().values.get(key) {
      if let Some(typed) = extract(value) {
        return typed;
      }
      log::warn!("config '{}' has unexpected value {}, using default", key, value);
    }
    SETTINGS
      .get(key)
      .and_then(|setting| extract(&setting.default))
      .unwrap_or_default()
  }

  pub fn count(&self, key: &str) -> usize {
    self.typed(key, |value| match value {
      Value::Int(n) => usize::try_from(*n).ok(),
      _ => None,
    })
  }

  pub fn int(&self, key: &str) -> i64 {
    self.typed(key, |value| match value {
      Value::Int(n) => Some(*n),
      _ => None,
    })
  }

  pub fn seconds(&self, key: &str) -> Duration {
    self.typed(key, |value| match value {
      Value::Int(n) => u64::try_from(*n).ok().map(Duration::from_secs),
      Value::Float(n) => Duration::try_from_secs_f64(*n).ok(),
      _ => None,
    })
  }

  pub fn flag(&self, key: &str) -> bool {
    self.typed(key, |value| match value {
      Value::Bool(flag) => Some(*flag),
      _ => None,
    })
  }

  pub fn text(&self, key: &str) -> String {
    self.typed(key, |value| match value {
      Value::Text(text) => Some(text.clone()),
      _ => None,
    })
  }

  pub fn words(&self, key: &str) -> Vec<String> {
    self.typed(key, |value| match value {
      Value::List(words) => Some(words.clone()),
      _ => None,
    })
  }
}
