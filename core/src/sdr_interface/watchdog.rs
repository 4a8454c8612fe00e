use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use crate::prelude::{Complex32, DeviceConfig, DeviceOperation, MonitorError, MonitorResult};
use crate::sdr_interface::source::SampleSource;
use crate::telemetry::log::LogManager;

/// Lower bound on how long `configure` may take; tuning a dongle is slower
/// than a single read.
pub const CONFIGURE_TIMEOUT: Duration = Duration::from_secs(5);

enum Request {
    Configure(DeviceConfig),
    Read(usize),
}

type Reply = MonitorResult<Vec<Complex32>>;

/// Runs a blocking source on its own reader thread so that every call has a
/// deadline.
///
/// A read that misses `read_timeout` fails with a `read_samples` device
/// error while the driver call is still in flight. The source is then
/// treated as stalled: later reads fail immediately and the inner source is
/// closed by the reader thread once the stuck call returns.
pub struct WatchdogSource {
    requests: Option<Sender<Request>>,
    replies: Receiver<Reply>,
    finished: Receiver<()>,
    read_timeout: Duration,
    stalled: bool,
    logger: LogManager,
}

impl WatchdogSource {
    pub fn spawn<S>(source: S, read_timeout: Duration) -> MonitorResult<Self>
    where
        S: SampleSource + Send + 'static,
    {
        let (request_tx, request_rx) = bounded::<Request>(1);
        let (reply_tx, reply_rx) = bounded::<Reply>(1);
        let (finished_tx, finished_rx) = bounded::<()>(0);

        thread::Builder::new()
            .name("sample-reader".into())
            .spawn(move || serve(source, request_rx, reply_tx, finished_tx))
            .map_err(|err| {
                MonitorError::device(
                    DeviceOperation::Configure,
                    format!("unable to start reader thread: {err}"),
                )
            })?;

        Ok(Self {
            requests: Some(request_tx),
            replies: reply_rx,
            finished: finished_rx,
            read_timeout,
            stalled: false,
            logger: LogManager::new("watchdog"),
        })
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// True once `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.requests.is_none()
    }

    fn call(
        &mut self,
        operation: DeviceOperation,
        request: Request,
        deadline: Duration,
    ) -> MonitorResult<Vec<Complex32>> {
        if self.stalled {
            return Err(MonitorError::device(
                operation,
                "reader thread is still blocked in an earlier call",
            ));
        }
        let requests = self
            .requests
            .as_ref()
            .ok_or_else(|| MonitorError::device(operation, "device already closed"))?;
        requests
            .send(request)
            .map_err(|_| MonitorError::device(operation, "reader thread exited"))?;

        match self.replies.recv_timeout(deadline) {
            Ok(reply) => reply,
            Err(RecvTimeoutError::Timeout) => {
                self.stalled = true;
                self.logger.error(&format!(
                    "{operation} did not return within {deadline:?}; abandoning the reader"
                ));
                Err(MonitorError::device(
                    operation,
                    format!("no response within the {deadline:?} timeout"),
                ))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(MonitorError::device(operation, "reader thread exited"))
            }
        }
    }
}

impl SampleSource for WatchdogSource {
    fn configure(&mut self, config: &DeviceConfig) -> MonitorResult<()> {
        let deadline = self.read_timeout.max(CONFIGURE_TIMEOUT);
        self.call(
            DeviceOperation::Configure,
            Request::Configure(config.clone()),
            deadline,
        )
        .map(|_| ())
    }

    fn read_samples(&mut self, count: usize) -> MonitorResult<Vec<Complex32>> {
        self.call(DeviceOperation::Read, Request::Read(count), self.read_timeout)
    }

    /// Asks the reader to close the source and waits up to one read timeout
    /// for it to finish.
    fn close(&mut self) {
        if self.requests.take().is_none() {
            return;
        }
        match self.finished.recv_timeout(self.read_timeout) {
            Err(RecvTimeoutError::Timeout) => self
                .logger
                .warn("reader still blocked; the device closes when its call returns"),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                self.logger.debug("reader thread closed the device")
            }
        }
    }
}

impl Drop for WatchdogSource {
    fn drop(&mut self) {
        self.close();
    }
}

fn serve<S: SampleSource>(
    mut source: S,
    requests: Receiver<Request>,
    replies: Sender<Reply>,
    finished: Sender<()>,
) {
    for request in requests.iter() {
        let reply = match request {
            Request::Configure(config) => source.configure(&config).map(|()| Vec::new()),
            Request::Read(count) => source.read_samples(count),
        };
        if replies.send(reply).is_err() {
            break;
        }
    }
    source.close();
    drop(finished);
}
