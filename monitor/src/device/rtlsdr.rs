use crate::device::tuning::{driver_args, driver_error, TunerSettings};
use log::{info, warn};
use powercore::prelude::{Complex32, DeviceConfig, DeviceOperation, MonitorError, MonitorResult};
use powercore::SampleSource;
use seify::Direction::Rx;
use seify::{Args, Device, DeviceTrait, GenericDevice, RxStreamer};
use std::time::Duration;

const CHANNEL: usize = 0;

/// RTL2832U dongle driven through seify.
///
/// The device is opened eagerly; `configure` tunes it and starts the RX
/// stream, `close` stops the stream.
pub struct RtlSdrSource {
    device: Device<GenericDevice>,
    stream: Option<Box<dyn RxStreamer>>,
    read_timeout_us: i64,
    closed: bool,
}

impl RtlSdrSource {
    pub fn open(index: usize, read_timeout: Duration) -> MonitorResult<Self> {
        let device = Device::from_args(driver_args(index).as_str())
            .map_err(|err| driver_error(DeviceOperation::Configure, err))?;
        info!("[rtlsdr] opened device #{index}");
        Ok(Self {
            device,
            stream: None,
            read_timeout_us: i64::try_from(read_timeout.as_micros()).unwrap_or(i64::MAX),
            closed: false,
        })
    }

    fn tune(&self, settings: &TunerSettings) -> Result<(), seify::Error> {
        self.device.set_sample_rate(Rx, CHANNEL, settings.sample_rate_hz)?;
        self.device
            .set_frequency(Rx, CHANNEL, settings.frequency_hz, Args::new())?;
        self.device.enable_agc(Rx, CHANNEL, settings.agc)?;
        if let Some(gain_db) = settings.gain_db {
            self.device.set_gain(Rx, CHANNEL, gain_db)?;
        }
        Ok(())
    }
}

impl SampleSource for RtlSdrSource {
    fn configure(&mut self, config: &DeviceConfig) -> MonitorResult<()> {
        if self.closed {
            return Err(MonitorError::device(
                DeviceOperation::Configure,
                "device already closed",
            ));
        }
        let settings = TunerSettings::from_config(config);
        self.tune(&settings)
            .map_err(|err| driver_error(DeviceOperation::Configure, err))?;

        let mut stream = self
            .device
            .rx_stream(&[CHANNEL])
            .map_err(|err| driver_error(DeviceOperation::Configure, err))?;
        stream
            .activate(None)
            .map_err(|err| driver_error(DeviceOperation::Configure, err))?;
        self.stream = Some(stream);
        info!(
            "[rtlsdr] tuned to {:.6} MHz at {:.3} MS/s, agc {}",
            settings.frequency_hz / 1e6,
            settings.sample_rate_hz / 1e6,
            settings.agc
        );
        Ok(())
    }

    fn read_samples(&mut self, count: usize) -> MonitorResult<Vec<Complex32>> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            MonitorError::device(DeviceOperation::Read, "stream not active; configure first")
        })?;
        let mut samples = vec![Complex32::new(0.0, 0.0); count];
        let mut filled = 0;
        while filled < count {
            let read = stream
                .read(&mut [&mut samples[filled..]], self.read_timeout_us)
                .map_err(|err| driver_error(DeviceOperation::Read, err))?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        samples.truncate(filled);
        Ok(samples)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(mut stream) = self.stream.take() {
            if let Err(err) = stream.deactivate(None) {
                warn!("[rtlsdr] failed to stop RX stream: {err}");
            }
        }
        info!("[rtlsdr] device closed");
    }
}
