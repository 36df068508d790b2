use super::{Demo, DemoKind};
use crate::config::{keys, Config};
use crate::output::{Output, Tone};
use crate::sync::pool::{WorkerPool, WorkerPoolBuilder};

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Written to every input file that does not exist yet.
pub const PLACEHOLDER_TEXT: &str =
  "This is a default text for file creation. Use Python, multiprocessing, example.";

pub type WordCounts = BTreeMap<String, usize>;

/// Counts non-overlapping substring occurrences of each word in the
/// lowercased text. "example" also counts inside "examples".
pub fn count_occurrences(text: &str, words: &[String]) -> WordCounts {
  let text = text.to_lowercase();
  words
    .iter()
    .map(|word| {
      let needle = word.to_lowercase();
      let count = if needle.is_empty() {
        0
      } else {
        text.matches(needle.as_str()).count()
      };
      (word.clone(), count)
    })
    .collect()
}

/// Creates `path` with [`PLACEHOLDER_TEXT`] unless it already exists.
/// Returns whether the file was created.
pub fn ensure_file(path: &Path) -> io::Result<bool> {
  match OpenOptions::new().write(true).create_new(true).open(path) {
    Ok(mut file) => {
      file.write_all(PLACEHOLDER_TEXT.as_bytes())?;
      Ok(true)
    }
    Err(error) if error.kind() == ErrorKind::AlreadyExists => Ok(false),
    Err(error) => Err(error),
  }
}

pub fn count_words(path: &Path, words: &[String]) -> io::Result<WordCounts> {
  ensure_file(path)?;
  let text = fs::read_to_string(path)?;
  Ok(count_occurrences(&text, words))
}

/// Adds up the counts of matching words.
pub fn merge<I>(partials: I) -> WordCounts
where
  I: IntoIterator<Item = WordCounts>,
{
  let mut total = WordCounts::new();
  for partial in partials {
    for (word, count) in partial {
      *total.entry(word).or_insert(0) += count;
    }
  }
  total
}

#[derive(Debug)]
pub struct WordReport {
  pub workers: usize,
  pub files: Vec<PathBuf>,
  pub counts: WordCounts,
  /// Files that could not be counted, with the reason.
  pub failures: Vec<(PathBuf, String)>,
  pub elapsed: Duration,
}

/// Counts words across files, one file per pool task.
pub fn count_files(
  pool: &WorkerPool,
  files: Vec<PathBuf>,
  words: Vec<String>,
) -> (WordCounts, Vec<(PathBuf, String)>) {
  let results = pool.map(files.clone(), move |path| count_words(&path, &words));
  let mut partials = Vec::with_capacity(results.len());
  let mut failures = Vec::new();
  for (path, result) in files.into_iter().zip(results) {
    match result {
      Ok(Ok(counts)) => partials.push(counts),
      Ok(Err(error)) => failures.push((path, error.to_string())),
      Err(error) => failures.push((path, error.to_string())),
    }
  }
  (merge(partials), failures)
}

pub struct WordCountDemo {
  config: Config,
  output: Arc<Output>,
}

impl WordCountDemo {
  pub fn new(config: Config, output: Arc<Output>) -> Self {
    WordCountDemo { config, output }
  }

  fn prepare(&self, files: &[PathBuf]) {
    for path in files {
      match ensure_file(path) {
        Ok(true) => self.output.line(
          Tone::Notice,
          format!("File {} not found. Creating default file.", path.display()),
        ),
        Ok(false) => (),
        Err(error) => self.output.line(
          Tone::Alert,
          format!("Could not create {}: {}", path.display(), error),
        ),
      }
    }
  }

  pub fn run(&self) -> WordReport {
    let prefix = self.config.text(keys::FILE_PREFIX);
    let mut seen = BTreeSet::new();
    let mut words = self.config.words(keys::WORDS_TO_COUNT);
    words.retain(|word| seen.insert(word.clone()));
    let mut files = Vec::new();
    for i in 0..self.config.count(keys::NUM_FILES) {
      files.push(PathBuf::from(format!("{}_{}.txt", prefix, i)));
    }
    self.prepare(&files);
    let pool = WorkerPoolBuilder::named("word-count")
      .size(self.config.count(keys::NUM_PROCESSES))
      .build();

    let started = Instant::now();
    let (counts, failures) = count_files(&pool, files.clone(), words.clone());
    let report = WordReport {
      workers: pool.size(),
      files,
      counts,
      failures,
      elapsed: started.elapsed(),
    };
    drop(pool);

    let mut lines = vec![
      (
        Tone::Narration,
        "Blueprint: This simulation demonstrates how a worker pool can handle both I/O and CPU-bound tasks by counting words across multiple files."
          .to_owned(),
      ),
      (Tone::Info, "Word Count Results:".to_owned()),
      (Tone::Info, format!("- Number of workers used: {}", report.workers)),
      (Tone::Info, format!("- Number of files processed: {}", report.files.len())),
      (Tone::Info, format!("- Words counted: {}", words.join(", "))),
      (
        Tone::Info,
        format!("- Time taken: {:.4} seconds", report.elapsed.as_secs_f64()),
      ),
    ];
    for word in &words {
      let count = report.counts.get(word).copied().unwrap_or(0);
      lines.push((Tone::Plain, format!("  - {}: {}", word, count)));
    }
    for (path, reason) in &report.failures {
      lines.push((
        Tone::Alert,
        format!("Could not count {}: {}", path.display(), reason),
      ));
    }
    self.output.block(&lines);
    report
  }
}

impl Demo for WordCountDemo {
  fn kind(&self) -> DemoKind {
    DemoKind::WordCount
  }

  fn execute(&self) {
    let report = self.run();
    log::info!(
      "word count: {} files, {} failures",
      report.files.len(),
      report.failures.len()
    );
  }

  fn describe(&self) -> &'static str {
    include_str!("word_count.rs")
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::utils::testing::deadline;

  fn targets() -> Vec<String> {
    ["python", "multiprocessing", "example"]
      .iter()
      .map(|word| word.to_string())
      .collect()
  }

  #[test]
  fn placeholder_counts_test() {
    let counts = count_occurrences(PLACEHOLDER_TEXT, &targets());
    assert_eq!(counts["python"], 1);
    assert_eq!(counts["multiprocessing"], 1);
    assert_eq!(counts["example"], 1);
  }

  #[test]
  fn substring_and_case_test() {
    let counts = count_occurrences("Examples of EXAMPLE, an example", &["example".to_owned()]);
    assert_eq!(counts["example"], 3);
    let counts = count_occurrences("aaaa", &["aa".to_owned()]);
    assert_eq!(counts["aa"], 2);
  }

  #[test]
  fn merge_sums_matching_keys_test() {
    let a: WordCounts = [("x".to_owned(), 1), ("y".to_owned(), 2)].into_iter().collect();
    let b: WordCounts = [("y".to_owned(), 3), ("z".to_owned(), 4)].into_iter().collect();
    let total = merge(vec![a, b]);
    assert_eq!(total["x"], 1);
    assert_eq!(total["y"], 5);
    assert_eq!(total["z"], 4);
  }

  #[test]
  fn missing_file_is_synthesized_test() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.txt");
    let counts = count_words(&path, &targets()).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), PLACEHOLDER_TEXT);
    assert_eq!(counts["python"], 1);
    assert!(!ensure_file(&path).unwrap());
  }

  #[test]
  fn repeated_words_are_reported_once_test() {
    deadline(Duration::from_secs(10), || {
      let dir = tempfile::tempdir().unwrap();
      let config = Config::in_memory();
      config
        .update(keys::FILE_PREFIX, dir.path().join("text").to_str().unwrap())
        .unwrap();
      config.update(keys::NUM_FILES, "1").unwrap();
      config.update(keys::NUM_PROCESSES, "1").unwrap();
      config
        .update(keys::WORDS_TO_COUNT, "python, example, python")
        .unwrap();
      let output = Arc::new(Output::capture());
      let report = WordCountDemo::new(config, output.clone()).run();
      assert_eq!(report.counts.len(), 2);
      let lines = output.captured();
      let python = lines.iter().filter(|line| *line == "  - python: 1").count();
      assert_eq!(python, 1);
      assert!(lines.contains(&"- Words counted: python, example".to_owned()));
    });
  }

  #[test]
  fn run_merges_all_files_test() {
    deadline(Duration::from_secs(10), || {
      let dir = tempfile::tempdir().unwrap();
      let prefix = dir.path().join("text");
      fs::write(
        dir.path().join("text_0.txt"),
        "Python python PYTHON and one example",
      )
      .unwrap();

      let config = Config::in_memory();
      config
        .update(keys::FILE_PREFIX, prefix.to_str().unwrap())
        .unwrap();
      config.update(keys::NUM_FILES, "3").unwrap();
      config.update(keys::NUM_PROCESSES, "2").unwrap();
      let output = Arc::new(Output::capture());
      let report = WordCountDemo::new(config, output.clone()).run();

      assert!(report.failures.is_empty());
      assert_eq!(report.counts["python"], 3 + 2);
      assert_eq!(report.counts["multiprocessing"], 2);
      assert_eq!(report.counts["example"], 1 + 2);
      let created = output
        .captured()
        .iter()
        .filter(|line| line.ends_with("not found. Creating default file."))
        .count();
      assert_eq!(created, 2);
      assert!(dir.path().join("text_2.txt").exists());
    });
  }
}
