/// Routes panics on any thread through the logger.
///
/// The process keeps running: a panicking worker is reported and its demo
/// carries on with the remaining workers.
#[cfg(not(test))]
pub fn log_panics() {
  let original_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |panic_info| {
    let current = std::thread::current();
    let name = current.name().unwrap_or("unknown");
    if log::log_enabled!(log::Level::Error) {
      log::error!("panic on thread '{}': {}", name, panic_info);
    } else {
      original_hook(panic_info);
    }
  }));
}

#[cfg(test)]
pub fn log_panics() {}
