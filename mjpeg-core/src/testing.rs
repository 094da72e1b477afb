// Scripted collaborators shared by the unit tests
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::frame::{FrameBuffer, FrameSource};
use crate::transport::{LivenessProbe, Pacer, StreamTransport};

#[derive(Debug)]
pub struct TestFrame {
    pub seq: u64,
    pub data: Vec<u8>,
}

impl FrameBuffer for TestFrame {
    fn data(&self) -> &[u8] {
        &self.data
    }

    fn timestamp(&self) -> Option<Duration> {
        Some(Duration::from_millis(1000 * self.seq))
    }

    fn sequence(&self) -> Option<u64> {
        Some(self.seq)
    }
}

#[derive(Default)]
struct SourceLog {
    script: VecDeque<Option<usize>>,
    next_seq: u64,
    pulls: u32,
    released: Vec<u64>,
    outstanding: usize,
    max_outstanding: usize,
}

/// Frame source that plays back a list of frame sizes; `None` is a failed
/// capture and an exhausted script fails every pull
pub struct ScriptedSource {
    log: Mutex<SourceLog>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Option<usize>>) -> Self {
        Self {
            log: Mutex::new(SourceLog {
                script: script.into(),
                ..Default::default()
            }),
        }
    }

    pub fn pulls(&self) -> u32 {
        self.log.lock().unwrap().pulls
    }

    pub fn released(&self) -> Vec<u64> {
        self.log.lock().unwrap().released.clone()
    }

    pub fn outstanding(&self) -> usize {
        self.log.lock().unwrap().outstanding
    }

    pub fn max_outstanding(&self) -> usize {
        self.log.lock().unwrap().max_outstanding
    }
}

impl FrameSource for ScriptedSource {
    type Frame = TestFrame;

    fn pull(&self) -> Option<TestFrame> {
        let mut log = self.log.lock().unwrap();
        log.pulls += 1;
        let size = log.script.pop_front().flatten()?;
        log.next_seq += 1;
        log.outstanding += 1;
        log.max_outstanding = log.max_outstanding.max(log.outstanding);
        let seq = log.next_seq;
        Some(TestFrame {
            seq,
            data: vec![seq as u8; size],
        })
    }

    fn release(&self, frame: TestFrame) {
        let mut log = self.log.lock().unwrap();
        log.outstanding -= 1;
        log.released.push(frame.seq);
    }
}

/// Records every chunk and fails the n-th `send` call (0-based) if asked
#[derive(Default)]
pub struct RecordingTransport {
    pub headers: Vec<(String, String)>,
    pub begun: u32,
    pub chunks: Vec<Vec<u8>>,
    pub fail_begin: bool,
    pub fail_send_at: Option<usize>,
    sends: usize,
}

impl RecordingTransport {
    pub fn failing_at(send_index: usize) -> Self {
        Self {
            fail_send_at: Some(send_index),
            ..Default::default()
        }
    }

    pub fn failing_begin() -> Self {
        Self {
            fail_begin: true,
            ..Default::default()
        }
    }

    pub fn wire(&self) -> Vec<u8> {
        self.chunks.concat()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

impl StreamTransport for RecordingTransport {
    type Error = &'static str;

    fn begin(&mut self, headers: &[(&str, &str)]) -> Result<(), Self::Error> {
        self.begun += 1;
        if self.fail_begin {
            return Err("httpd_resp_set_type failed");
        }
        self.headers = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        let index = self.sends;
        self.sends += 1;
        if self.fail_send_at == Some(index) {
            return Err("connection reset");
        }
        self.chunks.push(bytes.to_vec());
        Ok(())
    }
}

/// Answers liveness checks from a script; alive once the script runs out
#[derive(Default)]
pub struct ScriptedProbe {
    answers: RefCell<VecDeque<bool>>,
    pub checks: Cell<u32>,
}

impl ScriptedProbe {
    pub fn new(answers: Vec<bool>) -> Self {
        Self {
            answers: RefCell::new(answers.into()),
            checks: Cell::new(0),
        }
    }
}

impl<T> LivenessProbe<T> for ScriptedProbe {
    fn peer_alive(&self, _transport: &T) -> bool {
        self.checks.set(self.checks.get() + 1);
        self.answers.borrow_mut().pop_front().unwrap_or(true)
    }
}

#[derive(Default)]
pub struct RecordingPacer {
    pub pauses: Vec<Duration>,
}

impl Pacer for RecordingPacer {
    fn pause(&mut self, interval: Duration) {
        self.pauses.push(interval);
    }
}

/// Split a recorded stream into (header block, payload) pairs
pub fn parse_parts(wire: &[u8]) -> Vec<(String, Vec<u8>)> {
    let boundary = crate::multipart::PART_BOUNDARY;
    let mut parts = Vec::new();
    let mut rest = wire;

    while rest.starts_with(boundary) {
        rest = &rest[boundary.len()..];
        let end = rest
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("header terminator")
            + 4;
        let header = String::from_utf8(rest[..end].to_vec()).expect("ascii header");
        let length: usize = header
            .lines()
            .find_map(|line| line.strip_prefix("Content-Length: "))
            .expect("content length")
            .trim()
            .parse()
            .expect("numeric length");
        rest = &rest[end..];
        let take = length.min(rest.len());
        parts.push((header, rest[..take].to_vec()));
        rest = &rest[take..];
    }

    assert!(rest.is_empty(), "trailing bytes after last part");
    parts
}
