use std::time::Duration;

mod clock;
mod dump_source;
mod error;
mod thread_dump;
mod thread_info;

pub use clock::{Clock, SystemClock};
pub use dump_source::{DumpOptions, DumpSource, DumpTool, JdkDumpSource};
pub use error::{AcquireError, Error};
pub use thread_dump::ThreadDump;
pub use thread_info::ThreadInfo;

pub type Pid = u32;

/// What to sample and how often. Fixed for the life of a [`Sampler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleConfig {
    pid: Pid,
    count: u32,
    delay: Duration,
}

impl SampleConfig {
    pub fn new(pid: Pid, count: u32, delay_millis: u64) -> Result<Self, Error> {
        if count < 1 {
            return Err(Error::MalformedInput(format!(
                "sample count must be at least 1, got {}",
                count
            )));
        }

        Ok(Self {
            pid,
            count,
            delay: Duration::from_millis(delay_millis),
        })
    }

    pub fn get_pid(&self) -> Pid {
        self.pid
    }

    pub fn get_count(&self) -> u32 {
        self.count
    }

    pub fn get_delay(&self) -> Duration {
        self.delay
    }
}

/// Takes a fixed number of thread dumps from one process, one per call to
/// [`Sampler::generate`].
///
/// The time spent acquiring a dump is subtracted from the pause that follows it,
/// so that dumps start roughly `delay` apart no matter how slow the target is.
pub struct Sampler<S, C = SystemClock> {
    config: SampleConfig,
    options: DumpOptions,
    source: S,
    clock: C,
    iterations_completed: u32,
    last_acquisition: Duration,
    failed: bool,
}

impl<S: DumpSource> Sampler<S> {
    pub fn new(config: SampleConfig, source: S) -> Self {
        Self::with_clock(config, source, SystemClock::new())
    }
}

impl<S: DumpSource, C: Clock> Sampler<S, C> {
    pub fn with_clock(config: SampleConfig, source: S, clock: C) -> Self {
        Self {
            config,
            options: DumpOptions::default(),
            source,
            clock,
            iterations_completed: 0,
            last_acquisition: Duration::ZERO,
            failed: false,
        }
    }

    pub fn with_options(mut self, options: DumpOptions) -> Self {
        self.options = options;
        self
    }

    /// Take the next dump. `Ok(None)` means the target produced no output.
    ///
    /// A failed acquisition is not retried and does not count as a sample.
    /// It ends the session: every later call returns [`Error::Aborted`].
    pub fn generate(&mut self) -> Result<Option<ThreadDump>, Error> {
        if self.failed {
            return Err(Error::Aborted(self.config.pid));
        }
        if self.is_done() {
            return Err(Error::Exhausted(self.config.count));
        }

        let pid = self.config.pid;
        let start = self.clock.now();
        let result = self.source.acquire(pid, &self.options);
        let elapsed = self.clock.now().saturating_sub(start);
        self.last_acquisition = Duration::from_millis(elapsed.as_millis() as u64);

        log::debug!(
            "dump {}/{} of pid {} took {}ms",
            self.iterations_completed + 1,
            self.config.count,
            pid,
            self.last_acquisition.as_millis()
        );

        let raw = result.map_err(|source| {
            self.failed = true;
            Error::Acquisition { pid, source }
        })?;
        self.iterations_completed += 1;

        Ok(raw.map(|raw| ThreadDump::parse(&raw)))
    }

    pub fn is_done(&self) -> bool {
        self.iterations_completed >= self.config.count
    }

    /// How long [`Sampler::sleep_between_iterations`] will wait.
    pub fn pacing_wait(&self) -> Duration {
        self.config.delay.saturating_sub(self.last_acquisition)
    }

    pub fn sleep_between_iterations(&self) {
        let wait = self.pacing_wait();
        if !wait.is_zero() {
            log::trace!("sleeping {}ms before the next dump", wait.as_millis());
            self.clock.sleep(wait);
        }
    }

    /// Take all remaining dumps, pausing between them but not after the last one.
    /// Stops at the first failure, and refuses to run once a sample has failed.
    pub fn collect_all(&mut self) -> Result<Vec<Option<ThreadDump>>, Error> {
        let mut dumps = Vec::with_capacity((self.config.count - self.iterations_completed) as usize);
        while !self.is_done() {
            dumps.push(self.generate()?);
            if !self.is_done() {
                self.sleep_between_iterations();
            }
        }
        Ok(dumps)
    }

    pub fn get_config(&self) -> &SampleConfig {
        &self.config
    }

    pub fn get_iterations_completed(&self) -> u32 {
        self.iterations_completed
    }

    pub fn get_last_acquisition_duration(&self) -> Duration {
        self.last_acquisition
    }
}

/// Yields every remaining dump, pacing itself between them.
/// Ends after the last sample or right after the first error.
impl<S: DumpSource, C: Clock> Iterator for Sampler<S, C> {
    type Item = Result<Option<ThreadDump>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.is_done() {
            return None;
        }
        if self.iterations_completed > 0 {
            self.sleep_between_iterations();
        }
        Some(self.generate())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;

    const DUMP: &str = "Full thread dump\n\n\"main\" #1 prio=5 runnable\n\tat Main.main(Main.java:1)\n";

    #[derive(Clone, Default)]
    struct FakeClock {
        now: Rc<Cell<Duration>>,
        sleeps: Rc<RefCell<Vec<Duration>>>,
    }

    impl FakeClock {
        fn advance(&self, duration: Duration) {
            self.now.set(self.now.get() + duration);
        }

        fn rewind(&self, duration: Duration) {
            self.now.set(self.now.get().saturating_sub(duration));
        }

        fn sleeps(&self) -> Vec<u64> {
            self.sleeps
                .borrow()
                .iter()
                .map(|d| d.as_millis() as u64)
                .collect()
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Duration {
            self.now.get()
        }

        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
            self.advance(duration);
        }
    }

    enum Outcome {
        Dump(&'static str),
        Empty,
        Fail,
    }

    /// Plays back one outcome per acquisition, each taking the given time.
    /// A negative time steps the clock backwards.
    struct ScriptedDumpSource {
        clock: FakeClock,
        script: VecDeque<(i64, Outcome)>,
        calls: Rc<RefCell<Vec<(Pid, DumpOptions)>>>,
    }

    impl ScriptedDumpSource {
        fn new(clock: &FakeClock, script: Vec<(i64, Outcome)>) -> Self {
            Self {
                clock: clock.clone(),
                script: script.into(),
                calls: Rc::default(),
            }
        }
    }

    impl DumpSource for ScriptedDumpSource {
        fn acquire(&mut self, pid: Pid, options: &DumpOptions) -> Result<Option<String>, AcquireError> {
            self.calls.borrow_mut().push((pid, *options));
            let (millis, outcome) = self.script.pop_front().expect("acquisition not scripted");
            let step = Duration::from_millis(millis.unsigned_abs());
            if millis < 0 {
                self.clock.rewind(step);
            } else {
                self.clock.advance(step);
            }
            match outcome {
                Outcome::Dump(text) => Ok(Some(text.to_string())),
                Outcome::Empty => Ok(None),
                Outcome::Fail => Err(AcquireError::Spawn {
                    tool: "jcmd".to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                }),
            }
        }
    }

    fn sampler(
        count: u32,
        delay_millis: u64,
        script: Vec<(i64, Outcome)>,
    ) -> (Sampler<ScriptedDumpSource, FakeClock>, FakeClock) {
        let clock = FakeClock::default();
        let config = SampleConfig::new(1234, count, delay_millis).unwrap();
        let source = ScriptedDumpSource::new(&clock, script);
        (Sampler::with_clock(config, source, clock.clone()), clock)
    }

    #[test]
    fn test_zero_count_is_rejected() {
        assert!(matches!(
            SampleConfig::new(1, 0, 5000),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn test_generate_until_done() {
        let (mut sampler, _) = sampler(
            3,
            1000,
            vec![(10, Outcome::Dump(DUMP)), (10, Outcome::Dump(DUMP)), (10, Outcome::Dump(DUMP))],
        );

        for expected in 1..=3 {
            assert!(!sampler.is_done());
            let dump = sampler.generate().unwrap().unwrap();
            assert_eq!(dump.get_threads()[0].get_name(), "main");
            assert_eq!(sampler.get_iterations_completed(), expected);
        }
        assert!(sampler.is_done());
        assert!(matches!(sampler.generate(), Err(Error::Exhausted(3))));
        assert_eq!(sampler.get_iterations_completed(), 3);
    }

    #[test]
    fn test_acquires_with_locks_by_default() {
        let (mut sampler, _) = sampler(1, 0, vec![(0, Outcome::Empty)]);
        let calls = sampler.source.calls.clone();

        sampler.generate().unwrap();
        assert_eq!(*calls.borrow(), [(1234, DumpOptions { locks: true })]);
    }

    #[test]
    fn test_empty_dump_counts_as_sample() {
        let (mut sampler, _) = sampler(1, 0, vec![(5, Outcome::Empty)]);

        assert_eq!(sampler.generate().unwrap(), None);
        assert!(sampler.is_done());
    }

    #[test]
    fn test_pacing_wait_subtracts_acquisition_time() {
        let (mut sampler, clock) = sampler(
            2,
            5000,
            vec![(1200, Outcome::Empty), (6000, Outcome::Empty)],
        );

        sampler.generate().unwrap();
        assert_eq!(sampler.get_last_acquisition_duration(), Duration::from_millis(1200));
        assert_eq!(sampler.pacing_wait(), Duration::from_millis(3800));
        sampler.sleep_between_iterations();

        sampler.generate().unwrap();
        assert_eq!(sampler.pacing_wait(), Duration::ZERO);
        sampler.sleep_between_iterations();

        assert_eq!(clock.sleeps(), [3800]);
    }

    #[test]
    fn test_clock_going_backwards_counts_as_instant() {
        let (mut sampler, clock) = sampler(
            2,
            1000,
            vec![(300, Outcome::Empty), (-200, Outcome::Empty)],
        );

        sampler.generate().unwrap();
        assert_eq!(sampler.get_last_acquisition_duration(), Duration::from_millis(300));

        sampler.generate().unwrap();
        assert_eq!(clock.now(), Duration::from_millis(100));
        assert_eq!(sampler.get_last_acquisition_duration(), Duration::ZERO);
        assert_eq!(sampler.pacing_wait(), Duration::from_millis(1000));
    }

    #[test]
    fn test_collect_all() {
        let (mut sampler, clock) = sampler(
            3,
            1000,
            vec![
                (100, Outcome::Dump(DUMP)),
                (1100, Outcome::Empty),
                (50, Outcome::Dump(DUMP)),
            ],
        );

        let dumps = sampler.collect_all().unwrap();
        assert_eq!(dumps.len(), 3);
        assert!(dumps[0].is_some());
        assert!(dumps[1].is_none());
        assert!(dumps[2].is_some());
        assert_eq!(clock.sleeps(), [900]);
        assert!(sampler.is_done());
        assert!(sampler.collect_all().unwrap().is_empty());
    }

    #[test]
    fn test_collect_all_fails_fast() {
        let (mut sampler, clock) = sampler(
            3,
            1000,
            vec![(100, Outcome::Dump(DUMP)), (20, Outcome::Fail)],
        );

        let error = sampler.collect_all().unwrap_err();
        assert!(matches!(error, Error::Acquisition { pid: 1234, .. }));
        assert_eq!(sampler.get_iterations_completed(), 1);
        assert_eq!(sampler.get_last_acquisition_duration(), Duration::from_millis(20));
        assert_eq!(clock.sleeps(), [900]);
    }

    #[test]
    fn test_failed_session_cannot_resume() {
        let (mut sampler, _) = sampler(
            2,
            0,
            vec![(0, Outcome::Fail), (0, Outcome::Dump(DUMP)), (0, Outcome::Dump(DUMP))],
        );
        let calls = sampler.source.calls.clone();

        assert!(matches!(sampler.generate(), Err(Error::Acquisition { .. })));
        assert!(matches!(sampler.generate(), Err(Error::Aborted(1234))));
        assert!(matches!(sampler.collect_all(), Err(Error::Aborted(1234))));
        assert_eq!(sampler.get_iterations_completed(), 0);
        assert!(!sampler.is_done());
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_iterator_paces_and_stops() {
        let (sampler, clock) = sampler(
            3,
            1000,
            vec![
                (100, Outcome::Dump(DUMP)),
                (1100, Outcome::Dump(DUMP)),
                (50, Outcome::Empty),
            ],
        );

        let dumps: Vec<_> = sampler.collect();
        assert_eq!(dumps.len(), 3);
        assert!(dumps.iter().all(Result::is_ok));
        assert_eq!(clock.sleeps(), [900]);
    }

    #[test]
    fn test_iterator_ends_after_error() {
        let (mut sampler, _) = sampler(
            3,
            0,
            vec![(0, Outcome::Fail), (0, Outcome::Dump(DUMP))],
        );

        assert!(matches!(sampler.next(), Some(Err(Error::Acquisition { .. }))));
        assert!(sampler.next().is_none());
        assert!(!sampler.is_done());
    }
}
