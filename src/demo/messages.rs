use super::{join_worker, spawn_worker, Demo, DemoKind};
use crate::config::{keys, Config};
use crate::output::{Output, Tone};
use crate::sync::queue::{MessageQueue, QueueError};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How long the consumer blocks on an empty queue before reporting and
/// retrying.
pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct MessageReport {
  pub sent: usize,
  pub received: Vec<String>,
  pub timeouts: usize,
  /// Messages still queued once both threads are done.
  pub remaining: usize,
}

/// Marks the producer as finished when dropped, even when it unwinds.
struct Finished<'a>(&'a AtomicBool);

impl Drop for Finished<'_> {
  fn drop(&mut self) {
    self.0.store(true, Ordering::Release);
  }
}

/// One producer and one consumer sharing a queue.
pub struct MessagesDemo {
  config: Config,
  output: Arc<Output>,
  receive_timeout: Duration,
  crash_after: Option<usize>,
}

impl MessagesDemo {
  pub fn new(config: Config, output: Arc<Output>) -> Self {
    MessagesDemo {
      config,
      output,
      receive_timeout: RECEIVE_TIMEOUT,
      crash_after: None,
    }
  }

  pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
    self.receive_timeout = timeout;
    self
  }

  /// Makes the producer panic once it has sent `sent` messages, leaving the
  /// consumer short.
  pub fn with_producer_crash_after(mut self, sent: usize) -> Self {
    self.crash_after = Some(sent);
    self
  }

  fn produce(&self, queue: &MessageQueue<String>, count: usize, delay: Duration) -> usize {
    for i in 0..count {
      if self.crash_after == Some(i) {
        panic!("producer crashed after {} messages", i);
      }
      thread::sleep(delay);
      queue.put(format!("Message {}", i));
      self.output.block(&[
        (Tone::Info, format!("Producer: Sent message {}", i)),
        (
          Tone::Narration,
          "Blueprint: Imagine the producer as a chef sending dishes to a kitchen window.".to_owned(),
        ),
      ]);
    }
    count
  }

  fn consume(
    &self,
    queue: &MessageQueue<String>,
    count: usize,
    delay: Duration,
    producer_done: &AtomicBool,
  ) -> (Vec<String>, usize) {
    let mut received = Vec::new();
    let mut timeouts = 0;
    while received.len() < count {
      match queue.get_timeout(self.receive_timeout) {
        Ok(message) => {
          thread::sleep(delay);
          self.output.block(&[
            (Tone::Alert, format!("Consumer: Received {}", message)),
            (
              Tone::Narration,
              "Blueprint: The consumer is like a waiter picking up dishes from the window."
                .to_owned(),
            ),
          ]);
          received.push(message);
        }
        Err(QueueError::Timeout(waited)) => {
          timeouts += 1;
          if producer_done.load(Ordering::Acquire) && queue.is_empty() {
            self.output.line(
              Tone::Alert,
              format!(
                "Consumer: Producer stopped early, giving up after {} of {} messages",
                received.len(),
                count
              ),
            );
            break;
          }
          self.output.line(
            Tone::Notice,
            format!("Consumer: No message available after {:?}, retrying", waited),
          );
        }
      }
    }
    (received, timeouts)
  }

  pub fn run(&self) -> MessageReport {
    let count = self.config.count(keys::MESSAGE_COUNT);
    let delay = self.config.seconds(keys::DELAY_BETWEEN_MESSAGES);
    let queue = MessageQueue::new();
    let producer_done = AtomicBool::new(false);
    self.output.line(
      Tone::Narration,
      "Blueprint: This simulation demonstrates message passing between threads using a queue.",
    );

    let (sent, (received, timeouts)) = thread::scope(|s| {
      let producer = spawn_worker(s, &self.output, "Producer".to_owned(), || {
        let _finished = Finished(&producer_done);
        self.produce(&queue, count, delay)
      });
      if producer.is_none() {
        producer_done.store(true, Ordering::Release);
      }
      let consumer = spawn_worker(s, &self.output, "Consumer".to_owned(), || {
        self.consume(&queue, count, delay, &producer_done)
      });
      let sent = producer
        .and_then(|handle| join_worker(&self.output, handle))
        .unwrap_or(0);
      let consumed = consumer
        .and_then(|handle| join_worker(&self.output, handle))
        .unwrap_or_default();
      (sent, consumed)
    });

    self.output.line(
      Tone::Info,
      format!("Consumer received {} of {} messages.", received.len(), count),
    );
    MessageReport {
      sent,
      received,
      timeouts,
      remaining: queue.len(),
    }
  }
}

impl Demo for MessagesDemo {
  fn kind(&self) -> DemoKind {
    DemoKind::Messages
  }

  fn execute(&self) {
    let report = self.run();
    log::info!(
      "messages: sent {}, received {}, {} timeouts",
      report.sent,
      report.received.len(),
      report.timeouts
    );
  }

  fn describe(&self) -> &'static str {
    include_str!("messages.rs")
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::utils::testing::deadline;

  fn demo(message_count: &str, delay: &str) -> (MessagesDemo, Arc<Output>) {
    let config = Config::in_memory();
    config.update(keys::MESSAGE_COUNT, message_count).unwrap();
    config.update(keys::DELAY_BETWEEN_MESSAGES, delay).unwrap();
    let output = Arc::new(Output::capture());
    (MessagesDemo::new(config, output.clone()), output)
  }

  #[test]
  fn consumer_receives_every_message_test() {
    deadline(Duration::from_secs(10), || {
      let (demo, output) = demo("3", "0");
      let report = demo.run();
      assert_eq!(report.sent, 3);
      assert_eq!(report.received, ["Message 0", "Message 1", "Message 2"]);
      assert_eq!(report.remaining, 0);
      let lines = output.captured();
      for i in 0..3 {
        assert!(lines.contains(&format!("Producer: Sent message {}", i)));
        assert!(lines.contains(&format!("Consumer: Received Message {}", i)));
      }
    });
  }

  #[test]
  fn zero_messages_test() {
    deadline(Duration::from_secs(10), || {
      let (demo, _) = demo("0", "0");
      let report = demo.run();
      assert_eq!(report.sent, 0);
      assert!(report.received.is_empty());
      assert_eq!(report.timeouts, 0);
      assert_eq!(report.remaining, 0);
    });
  }

  #[test]
  fn timeout_is_retried_test() {
    deadline(Duration::from_secs(10), || {
      let (demo, output) = demo("2", "0.2");
      let demo = demo.with_receive_timeout(Duration::from_millis(20));
      let report = demo.run();
      assert_eq!(report.received.len(), 2);
      assert!(report.timeouts > 0);
      assert!(output
        .captured()
        .iter()
        .any(|line| line.starts_with("Consumer: No message available")));
    });
  }

  #[test]
  fn consumer_gives_up_on_crashed_producer_test() {
    deadline(Duration::from_secs(10), || {
      let (demo, output) = demo("5", "0");
      let demo = demo
        .with_receive_timeout(Duration::from_millis(20))
        .with_producer_crash_after(2);
      let report = demo.run();
      assert_eq!(report.received, ["Message 0", "Message 1"]);
      assert_eq!(report.remaining, 0);
      let lines = output.captured();
      assert!(lines.contains(&"Producer: stopped by a panic".to_owned()));
      assert!(lines
        .contains(&"Consumer: Producer stopped early, giving up after 2 of 5 messages".to_owned()));
      assert!(lines.contains(&"Consumer received 2 of 5 messages.".to_owned()));
    });
  }

  #[test]
  fn huge_message_count_does_not_preallocate_test() {
    deadline(Duration::from_secs(10), || {
      let (demo, _) = demo("1000000000000", "0");
      let demo = demo
        .with_receive_timeout(Duration::from_millis(20))
        .with_producer_crash_after(3);
      assert_eq!(demo.run().received.len(), 3);
    });
  }

  #[test]
  fn repeated_runs_start_fresh_test() {
    deadline(Duration::from_secs(10), || {
      let (demo, _) = demo("2", "0");
      assert_eq!(demo.run().received.len(), 2);
      assert_eq!(demo.run().received.len(), 2);
    });
  }
}
