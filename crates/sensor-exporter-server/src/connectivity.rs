//! Wi-Fi connectivity management.
//!
//! The manager brings the link up at boot, synchronizes the clock once, and
//! re-checks the link on every loop iteration. Recovery is level-triggered:
//! whenever the link reports down, the stored credentials are used to
//! associate again and the caller blocks until that succeeds.
//!
//! Retries poll at a fixed interval with no backoff. With the default
//! unbounded `RetryPolicy` the manager never gives up and never returns an
//! error; a bounded policy turns exhaustion into `ConnectivityError`.

use std::net::Ipv4Addr;

use thiserror::Error;
use tracing::{debug, info, warn};

use sensor_exporter_core::{
    Delay, LocalTime, RetryPolicy, TimeConfig, TimeSource, WifiCredentials, WifiLink,
};
use sensor_exporter_protocol::format_datetime;

/// Errors surfaced by the connectivity manager.
#[derive(Debug, Error)]
pub enum ConnectivityError {
    /// Recovery was requested before any credentials were stored.
    #[error("No Wi-Fi credentials stored, connect was never called")]
    NotConfigured,

    /// A bounded retry policy ran out of attempts.
    #[error("Wi-Fi '{ssid}' not associated after {attempts} retries")]
    RetriesExhausted { ssid: String, attempts: u32 },
}

/// Last observed link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Down,
    Up,
}

/// Result of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkHealth {
    /// The link was up.
    Healthy,
    /// The link was down and has been re-established.
    Restored,
}

/// Owns the Wi-Fi link and its recovery policy.
pub struct ConnectivityManager<W, D> {
    link: W,
    delay: D,
    policy: RetryPolicy,
    credentials: Option<WifiCredentials>,
    state: LinkState,
    recoveries: u64,
}

impl<W: WifiLink, D: Delay> ConnectivityManager<W, D> {
    pub fn new(link: W, delay: D, policy: RetryPolicy) -> Self {
        Self {
            link,
            delay,
            policy,
            credentials: None,
            state: LinkState::Down,
            recoveries: 0,
        }
    }

    /// Associate with the given network, blocking until the link is up.
    ///
    /// The credentials are stored for later recovery. Returns the assigned
    /// address when the link reports one.
    pub fn connect(
        &mut self,
        credentials: WifiCredentials,
    ) -> Result<Option<Ipv4Addr>, ConnectivityError> {
        info!("Connecting to WiFi '{}'", credentials.ssid);
        if let Err(e) = self.link.reset() {
            warn!("Failed to reset Wi-Fi interface: {}", e);
        }
        self.credentials = Some(credentials);
        self.associate()
    }

    /// Apply the timezone rule and sync against the NTP host, once.
    ///
    /// Failures are logged and otherwise ignored; the returned time may be
    /// the epoch if the clock never synchronized.
    pub fn sync_time<T: TimeSource>(&mut self, clock: &mut T, config: &TimeConfig) -> LocalTime {
        if let Err(e) = clock.configure(&config.timezone_rule, &config.ntp_host) {
            warn!("Time sync against {} failed: {}", config.ntp_host, e);
        }
        let now = clock.local_time();
        info!("It's currently {}", format_datetime(&now));
        now
    }

    /// Check the link and re-associate with the stored credentials if it is down.
    ///
    /// Called on every loop iteration, before any client is served.
    pub fn ensure_connected(&mut self) -> Result<LinkHealth, ConnectivityError> {
        if self.link.is_connected() {
            self.state = LinkState::Up;
            return Ok(LinkHealth::Healthy);
        }

        self.state = LinkState::Down;
        if self.credentials.is_none() {
            return Err(ConnectivityError::NotConfigured);
        }

        warn!("Reconnecting to WiFi");
        self.associate()?;
        self.recoveries += 1;
        Ok(LinkHealth::Restored)
    }

    fn associate(&mut self) -> Result<Option<Ipv4Addr>, ConnectivityError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(ConnectivityError::NotConfigured)?;

        let mut started = false;
        let mut attempts = 0u32;
        loop {
            if !started {
                match self.link.begin(credentials) {
                    Ok(()) => started = true,
                    Err(e) => warn!("Failed to start association: {}", e),
                }
            }

            if started && self.link.is_connected() {
                break;
            }

            if !self.policy.allows(attempts) {
                self.state = LinkState::Down;
                return Err(ConnectivityError::RetriesExhausted {
                    ssid: credentials.ssid.clone(),
                    attempts,
                });
            }
            attempts += 1;
            debug!(attempt = attempts, "Waiting for association");
            self.delay.delay(self.policy.interval);
        }

        self.state = LinkState::Up;
        let ip = self.link.local_ip();
        match ip {
            Some(ip) => info!("Connected as {}", ip),
            None => info!("Connected, no address assigned yet"),
        }
        Ok(ip)
    }

    /// Whether the last check saw the link up.
    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Up
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Number of times the link was re-established after a loss.
    pub fn recoveries(&self) -> u64 {
        self.recoveries
    }

    pub fn link(&self) -> &W {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut W {
        &mut self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{count, new_log, Event, FakeClock, FakeDelay, FakeLink};
    use std::time::Duration;

    fn creds() -> WifiCredentials {
        WifiCredentials::new("TestNet", "secret")
    }

    #[test]
    fn test_connect_polls_until_associated() {
        let log = new_log();
        let policy = RetryPolicy::unbounded(Duration::from_secs(1));
        let mut manager =
            ConnectivityManager::new(FakeLink::new(&log, 3), FakeDelay::new(&log), policy);

        let ip = manager.connect(creds()).unwrap();

        assert_eq!(ip, Some(Ipv4Addr::new(192, 168, 1, 50)));
        assert!(manager.is_connected());
        assert_eq!(count(&log, |e| matches!(e, Event::Begin(_))), 1);
        assert_eq!(count(&log, |e| *e == Event::Poll(false)), 3);
        assert_eq!(
            count(&log, |e| *e == Event::Delay(Duration::from_secs(1))),
            3
        );
        // The interface is reset before the first association attempt.
        assert_eq!(log.borrow()[0], Event::Reset);
    }

    #[test]
    fn test_bounded_policy_gives_up() {
        let log = new_log();
        let policy = RetryPolicy::bounded(Duration::from_millis(10), 2);
        let mut manager =
            ConnectivityManager::new(FakeLink::new(&log, 100), FakeDelay::new(&log), policy);

        let err = manager.connect(creds()).unwrap_err();

        match err {
            ConnectivityError::RetriesExhausted { ssid, attempts } => {
                assert_eq!(ssid, "TestNet");
                assert_eq!(attempts, 2);
            }
            other => panic!("Expected RetriesExhausted, got {other:?}"),
        }
        assert!(!manager.is_connected());
        assert_eq!(count(&log, |e| matches!(e, Event::Delay(_))), 2);
    }

    #[test]
    fn test_begin_failure_is_retried() {
        let log = new_log();
        let policy = RetryPolicy::unbounded(Duration::from_millis(10));
        let link = FakeLink::new(&log, 0).failing_begins(2);
        let mut manager = ConnectivityManager::new(link, FakeDelay::new(&log), policy);

        manager.connect(creds()).unwrap();

        assert_eq!(count(&log, |e| matches!(e, Event::Begin(_))), 3);
        assert!(manager.is_connected());
    }

    #[test]
    fn test_ensure_connected_when_healthy() {
        let log = new_log();
        let mut manager = ConnectivityManager::new(
            FakeLink::new(&log, 0),
            FakeDelay::new(&log),
            RetryPolicy::default(),
        );
        manager.connect(creds()).unwrap();

        assert_eq!(manager.ensure_connected().unwrap(), LinkHealth::Healthy);
        assert_eq!(manager.recoveries(), 0);
    }

    #[test]
    fn test_ensure_connected_recovers_with_stored_credentials() {
        let log = new_log();
        let mut manager = ConnectivityManager::new(
            FakeLink::new(&log, 0),
            FakeDelay::new(&log),
            RetryPolicy::default(),
        );
        manager.connect(creds()).unwrap();
        log.borrow_mut().clear();

        manager.link_mut().drop_link(2);
        let health = manager.ensure_connected().unwrap();

        assert_eq!(health, LinkHealth::Restored);
        assert_eq!(manager.recoveries(), 1);
        assert!(manager.is_connected());
        assert!(log.borrow().contains(&Event::Begin("TestNet".to_string())));
    }

    #[test]
    fn test_ensure_connected_without_credentials() {
        let log = new_log();
        let mut manager = ConnectivityManager::new(
            FakeLink::new(&log, 5),
            FakeDelay::new(&log),
            RetryPolicy::default(),
        );

        assert!(matches!(
            manager.ensure_connected(),
            Err(ConnectivityError::NotConfigured)
        ));
        assert_eq!(manager.state(), LinkState::Down);
    }

    #[test]
    fn test_sync_time_configures_clock() {
        let log = new_log();
        let mut manager = ConnectivityManager::new(
            FakeLink::new(&log, 0),
            FakeDelay::new(&log),
            RetryPolicy::default(),
        );
        let mut clock = FakeClock::new(&log);

        let now = manager.sync_time(&mut clock, &TimeConfig::default());

        assert_eq!(now, FakeClock::time());
        assert!(log.borrow().contains(&Event::Configure(
            "CET-1CEST-2,M3.5.0/02:00:00,M10.5.0/03:00:00".to_string(),
            "es.pool.ntp.org".to_string(),
        )));
    }

    #[test]
    fn test_sync_time_failure_is_silent() {
        let log = new_log();
        let mut manager = ConnectivityManager::new(
            FakeLink::new(&log, 0),
            FakeDelay::new(&log),
            RetryPolicy::default(),
        );
        let mut clock = FakeClock::new(&log).failing();

        let now = manager.sync_time(&mut clock, &TimeConfig::default());

        assert_eq!(now, LocalTime::unsynchronized());
    }
}
