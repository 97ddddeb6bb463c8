//! Fake queue coordinator: accepts connections and records each decoded command.

use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use fanout_core::config::CoordinatorConfig;
use fanout_core::queue::{read_message, QueueMessage, DEFAULT_HEADER_SIZE};

#[derive(Clone)]
pub struct FakeCoordinator {
    addr: String,
    messages: Arc<Mutex<Vec<QueueMessage>>>,
}

impl FakeCoordinator {
    pub fn config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            addr: self.addr.clone(),
            header_size: DEFAULT_HEADER_SIZE,
        }
    }

    pub fn messages(&self) -> Vec<QueueMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Paths from every PostFilenames received, in arrival order.
    pub fn posted_paths(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                QueueMessage::PostFilenames { ordered_paths } => Some(ordered_paths),
                QueueMessage::Stop { .. } => None,
            })
            .flatten()
            .collect()
    }

    /// Wait until a Stop arrives and return its count.
    pub fn wait_for_stop(&self, timeout: Duration) -> Option<usize> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let stop = self.messages().into_iter().find_map(|m| match m {
                QueueMessage::Stop { final_count } => Some(final_count),
                QueueMessage::PostFilenames { .. } => None,
            });
            if stop.is_some() {
                return stop;
            }
            thread::sleep(Duration::from_millis(10));
        }
        None
    }
}

/// Start a coordinator on an ephemeral port using the default header width.
pub fn start() -> FakeCoordinator {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().unwrap().to_string();
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&messages);
    thread::spawn(move || {
        for mut stream in listener.incoming().flatten() {
            let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
            if let Ok(msg) = read_message(&mut stream, DEFAULT_HEADER_SIZE) {
                sink.lock().unwrap().push(msg);
            }
        }
    });
    FakeCoordinator { addr, messages }
}
