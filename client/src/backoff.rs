use std::time::Duration;

/// Fixed upper bound on the reconnect wait.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Reconnect delay that doubles on every failure, up to a ceiling.
///
/// It is never reset by a successful connection: the wait only grows across
/// the lifetime of a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    current: Duration,
    ceiling: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, ceiling: Duration) -> Self {
        Self {
            current: initial.min(ceiling),
            ceiling,
        }
    }

    /// Wait to use for the next reconnect.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Return the current wait and double it for the failure after.
    pub fn schedule_retry(&mut self) -> Duration {
        let wait = self.current;
        self.current = self.current.saturating_mul(2).min(self.ceiling);
        wait
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), MAX_BACKOFF)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// `Disconnected -> Connecting -> Connected`, with any failure returning to
/// `Disconnected` and scheduling a retry.
#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    backoff: Backoff,
    failures: u32,
}

impl ConnectionMachine {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            backoff,
            failures: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Total failures seen so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Start an attempt. Returns `false` (and changes nothing) unless the
    /// machine is disconnected.
    pub fn begin_connect(&mut self) -> bool {
        if self.state != ConnectionState::Disconnected {
            return false;
        }
        self.state = ConnectionState::Connecting;
        true
    }

    pub fn opened(&mut self) {
        if self.state == ConnectionState::Connecting {
            self.state = ConnectionState::Connected;
        }
    }

    /// Record a failure and return how long to wait before reconnecting.
    pub fn failed(&mut self) -> Duration {
        self.state = ConnectionState::Disconnected;
        self.failures += 1;
        self.backoff.schedule_retry()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_grows_as_w_times_two_to_the_k() {
        let w = 5_000u64;
        let mut backoff = Backoff::new(Duration::from_millis(w), MAX_BACKOFF);
        for k in 0..10u32 {
            let expected = (w * 2u64.pow(k)).min(60_000);
            assert_eq!(
                backoff.schedule_retry(),
                Duration::from_millis(expected),
                "after {} earlier failures",
                k
            );
        }
    }

    #[test]
    fn ceiling_holds() {
        let mut backoff = Backoff::new(Duration::from_secs(40), MAX_BACKOFF);
        assert_eq!(backoff.schedule_retry(), Duration::from_secs(40));
        assert_eq!(backoff.schedule_retry(), MAX_BACKOFF);
        assert_eq!(backoff.schedule_retry(), MAX_BACKOFF);
    }

    #[test]
    fn initial_above_ceiling_is_clamped() {
        let backoff = Backoff::new(Duration::from_secs(600), MAX_BACKOFF);
        assert_eq!(backoff.current(), MAX_BACKOFF);
    }

    #[test]
    fn state_machine_cycle() {
        let mut machine = ConnectionMachine::new(Backoff::new(
            Duration::from_millis(100),
            MAX_BACKOFF,
        ));
        assert_eq!(machine.state(), ConnectionState::Disconnected);

        assert!(machine.begin_connect());
        assert!(!machine.begin_connect());
        assert_eq!(machine.state(), ConnectionState::Connecting);

        machine.opened();
        assert_eq!(machine.state(), ConnectionState::Connected);

        assert_eq!(machine.failed(), Duration::from_millis(100));
        assert_eq!(machine.state(), ConnectionState::Disconnected);
        assert_eq!(machine.failures(), 1);
    }

    #[test]
    fn successful_connection_does_not_reset_backoff() {
        let mut machine = ConnectionMachine::new(Backoff::new(
            Duration::from_millis(100),
            MAX_BACKOFF,
        ));
        machine.begin_connect();
        machine.failed();
        machine.begin_connect();
        machine.opened();
        assert_eq!(machine.failed(), Duration::from_millis(200));
    }

    #[test]
    fn opened_is_ignored_unless_connecting() {
        let mut machine = ConnectionMachine::new(Backoff::default());
        machine.opened();
        assert_eq!(machine.state(), ConnectionState::Disconnected);
    }
}
