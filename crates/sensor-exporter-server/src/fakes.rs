//! In-memory collaborators for unit tests.
//!
//! Every fake appends to a shared event log so tests can assert on the order
//! in which the exporter talks to its collaborators.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::Ipv4Addr;
use std::rc::Rc;
use std::time::Duration;

use chrono::NaiveDate;
use sensor_exporter_core::{
    Bssid, ClimateReading, Connection, Delay, LinkError, Listener, LocalTime, SensorError, Sensors,
    TimeError, TimeSource, WifiCredentials, WifiInfo, WifiLink,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Reset,
    Begin(String),
    Poll(bool),
    Delay(Duration),
    Configure(String, String),
    ReadClock,
    ReadClimate,
    Accept,
}

pub type Log = Rc<RefCell<Vec<Event>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn count(log: &Log, pred: impl Fn(&Event) -> bool) -> usize {
    log.borrow().iter().filter(|e| pred(e)).count()
}

pub struct FakeLink {
    log: Log,
    up: bool,
    /// Polls answered "down" before the association completes.
    polls_until_up: u32,
    /// Number of upcoming `begin` calls that fail.
    failing_begins: u32,
}

impl FakeLink {
    pub fn new(log: &Log, polls_until_up: u32) -> Self {
        Self {
            log: log.clone(),
            up: false,
            polls_until_up,
            failing_begins: 0,
        }
    }

    pub fn failing_begins(mut self, count: u32) -> Self {
        self.failing_begins = count;
        self
    }

    /// Simulate losing the access point.
    pub fn drop_link(&mut self, polls_until_up: u32) {
        self.up = false;
        self.polls_until_up = polls_until_up;
    }
}

impl WifiLink for FakeLink {
    fn reset(&mut self) -> Result<(), LinkError> {
        self.log.borrow_mut().push(Event::Reset);
        self.up = false;
        Ok(())
    }

    fn begin(&mut self, credentials: &WifiCredentials) -> Result<(), LinkError> {
        self.log
            .borrow_mut()
            .push(Event::Begin(credentials.ssid.clone()));
        if self.failing_begins > 0 {
            self.failing_begins -= 1;
            return Err(LinkError::Driver("radio busy".to_string()));
        }
        Ok(())
    }

    fn is_connected(&mut self) -> bool {
        if !self.up {
            if self.polls_until_up == 0 {
                self.up = true;
            } else {
                self.polls_until_up -= 1;
            }
        }
        self.log.borrow_mut().push(Event::Poll(self.up));
        self.up
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.up.then(|| Ipv4Addr::new(192, 168, 1, 50))
    }

    fn info(&self) -> WifiInfo {
        WifiInfo {
            ssid: "TestNet".to_string(),
            bssid: Bssid([0x24, 0x0a, 0xc4, 0x00, 0x00, 0x01]),
            rssi: -55,
        }
    }
}

#[derive(Clone)]
pub struct FakeDelay {
    log: Log,
}

impl FakeDelay {
    pub fn new(log: &Log) -> Self {
        Self { log: log.clone() }
    }
}

impl Delay for FakeDelay {
    fn delay(&mut self, duration: Duration) {
        self.log.borrow_mut().push(Event::Delay(duration));
    }
}

pub struct FakeClock {
    log: Log,
    fail: bool,
}

impl FakeClock {
    pub fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn time() -> LocalTime {
        LocalTime {
            datetime: NaiveDate::from_ymd_opt(2024, 5, 4)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            zone: "CEST".to_string(),
        }
    }
}

impl TimeSource for FakeClock {
    fn configure(&mut self, timezone_rule: &str, ntp_host: &str) -> Result<(), TimeError> {
        self.log.borrow_mut().push(Event::Configure(
            timezone_rule.to_string(),
            ntp_host.to_string(),
        ));
        if self.fail {
            return Err(TimeError::Unavailable("no route to host".to_string()));
        }
        Ok(())
    }

    fn local_time(&self) -> LocalTime {
        self.log.borrow_mut().push(Event::ReadClock);
        if self.fail {
            LocalTime::unsynchronized()
        } else {
            Self::time()
        }
    }
}

pub struct FakeSensors {
    log: Log,
    pub shock_pin: Rc<Cell<bool>>,
    pub climate_fails: bool,
    pub climate_reads: Rc<Cell<u32>>,
}

impl FakeSensors {
    pub fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            shock_pin: Rc::new(Cell::new(false)),
            climate_fails: false,
            climate_reads: Rc::new(Cell::new(0)),
        }
    }
}

impl Sensors for FakeSensors {
    fn climate(&mut self) -> Result<ClimateReading, SensorError> {
        self.log.borrow_mut().push(Event::ReadClimate);
        self.climate_reads.set(self.climate_reads.get() + 1);
        if self.climate_fails {
            return Err(SensorError::Timeout("response low"));
        }
        Ok(ClimateReading {
            temperature: 21.5,
            humidity: 40.0,
        })
    }

    fn shock_active(&mut self) -> Result<bool, SensorError> {
        Ok(self.shock_pin.get())
    }

    fn infrared_level(&mut self) -> Result<f32, SensorError> {
        Ok(0.25)
    }

    fn sound_level(&mut self) -> Result<f32, SensorError> {
        Err(SensorError::Hardware("adc busy".to_string()))
    }
}

pub struct FakeConnection {
    input: VecDeque<io::Result<Vec<u8>>>,
    /// Served forever once `input` runs dry.
    trickle: Option<Vec<u8>>,
    pub output: Rc<RefCell<Vec<u8>>>,
    pub closed: Rc<Cell<bool>>,
    pub read_timeouts: Rc<RefCell<Vec<Option<Duration>>>>,
    fail_writes: bool,
}

impl FakeConnection {
    pub fn new(chunks: &[&[u8]]) -> Self {
        Self {
            input: chunks.iter().map(|c| Ok(c.to_vec())).collect(),
            trickle: None,
            output: Rc::new(RefCell::new(Vec::new())),
            closed: Rc::new(Cell::new(false)),
            read_timeouts: Rc::new(RefCell::new(Vec::new())),
            fail_writes: false,
        }
    }

    /// Connection whose reads time out after the given chunks.
    pub fn stalled(chunks: &[&[u8]]) -> Self {
        let mut conn = Self::new(chunks);
        conn.input
            .push_back(Err(io::Error::from(io::ErrorKind::WouldBlock)));
        conn
    }

    /// Connection that sends the given chunks, then `byte` every millisecond,
    /// never completing its request.
    pub fn trickling(chunks: &[&[u8]], byte: u8) -> Self {
        let mut conn = Self::new(chunks);
        conn.trickle = Some(vec![byte]);
        conn
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }
}

impl Read for FakeConnection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.input.is_empty() {
            if let Some(trickle) = &self.trickle {
                std::thread::sleep(Duration::from_millis(1));
                self.input.push_back(Ok(trickle.clone()));
            }
        }
        match self.input.pop_front() {
            None => Ok(0),
            Some(Err(e)) => Err(e),
            Some(Ok(mut chunk)) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                if n < chunk.len() {
                    self.input.push_front(Ok(chunk.split_off(n)));
                }
                Ok(n)
            }
        }
    }
}

impl Write for FakeConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.output.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Connection for FakeConnection {
    fn close(&mut self) -> io::Result<()> {
        self.closed.set(true);
        Ok(())
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.read_timeouts.borrow_mut().push(timeout);
        Ok(())
    }
}

pub struct FakeListener {
    log: Log,
    pub pending: VecDeque<FakeConnection>,
    pub started: bool,
}

impl FakeListener {
    pub fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            pending: VecDeque::new(),
            started: false,
        }
    }
}

impl Listener for FakeListener {
    type Connection = FakeConnection;

    fn begin(&mut self) -> io::Result<()> {
        self.started = true;
        Ok(())
    }

    fn accept(&mut self) -> io::Result<Option<FakeConnection>> {
        self.log.borrow_mut().push(Event::Accept);
        Ok(self.pending.pop_front())
    }
}
