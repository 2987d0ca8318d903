use std::io::{self, BufRead, BufReader};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

#[derive(Debug, PartialEq, Eq)]
pub enum InputEvent {
    Line(String),
    Tick,
    Closed,
}

/// Reads input lines on a background thread and yields a `Tick` whenever
/// no line arrives within the tick interval.
pub struct EventHandler {
    rx: mpsc::Receiver<String>,
    tick_rate: Duration,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        Self::from_reader(BufReader::new(io::stdin()), tick_rate)
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R, tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for line in reader.lines() {
                let Ok(line) = line else {
                    return;
                };
                if tx.send(line).is_err() {
                    return;
                }
            }
        });

        Self { rx, tick_rate }
    }

    pub fn next(&self) -> InputEvent {
        match self.rx.recv_timeout(self.tick_rate) {
            Ok(line) => InputEvent::Line(line),
            Err(RecvTimeoutError::Timeout) => InputEvent::Tick,
            Err(RecvTimeoutError::Disconnected) => InputEvent::Closed,
        }
    }

    /// Block until a full line arrives, ignoring ticks. `None` once input is closed.
    pub fn next_line(&self) -> Option<String> {
        loop {
            match self.next() {
                InputEvent::Line(line) => return Some(line),
                InputEvent::Tick => continue,
                InputEvent::Closed => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_lines_then_closed() {
        let events = EventHandler::from_reader(Cursor::new("1\np\n"), Duration::from_millis(500));
        assert_eq!(events.next_line().as_deref(), Some("1"));
        assert_eq!(events.next_line().as_deref(), Some("p"));
        assert_eq!(events.next_line(), None);
        assert_eq!(events.next(), InputEvent::Closed);
    }
}
