use crate::{
    codec::Value,
    config::ScannerConfig,
    frame::Frame,
    image::{AssemblyPolicy, Image, ImageAssembler},
    options::{OptionInfo, OptionRegistry, ScannerOptions, Type},
    parameters::Parameters,
    result::{Result, SaneError},
    transport::Transport,
};
use bstr::{BStr, BString};
use std::{fmt, io, sync::Arc, thread, time::Duration};

/// Bytes requested from the device per read unless configured otherwise.
pub const DEFAULT_READ_WINDOW: usize = 128 * 1024;

/// Upper bound for memory reserved up front from the advertised frame size.
const MAX_FRAME_HINT: usize = 256 * 1024 * 1024;

/// Longest pause between reads that returned no bytes.
const MAX_IDLE_BACKOFF: Duration = Duration::from_millis(10);

/// An open connection to one device.
///
/// At most one acquisition is in flight at a time: [`Scanner::start`] borrows
/// the scanner mutably for as long as the returned [`FrameReader`] lives.
/// Closing the connection is dropping the scanner.
pub struct Scanner {
    transport: Arc<dyn Transport>,
    registry: OptionRegistry,
    read_window: usize,
    assembly: AssemblyPolicy,
}

impl Scanner {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            registry: OptionRegistry::default(),
            read_window: DEFAULT_READ_WINDOW,
            assembly: AssemblyPolicy::default(),
        }
    }

    pub fn options(&mut self) -> &ScannerOptions {
        self.registry.options(self.transport.as_ref())
    }

    pub fn get_option<N>(&mut self, name: N) -> Result<Value>
    where
        N: AsRef<[u8]>,
    {
        self.registry
            .get(self.transport.as_ref(), BStr::new(&name))
    }

    pub fn set_option<N>(&mut self, name: N, value: &Value) -> Result<OptionInfo>
    where
        N: AsRef<[u8]>,
    {
        self.registry
            .set(self.transport.as_ref(), BStr::new(&name), value)
    }

    /// Geometry of the next frame. Only exact between [`Scanner::start`] and
    /// the end of that frame; otherwise a best-effort estimate.
    pub fn parameters(&self) -> Result<Parameters> {
        self.transport.parameters()?.try_into()
    }

    pub fn read_window(&self) -> usize {
        self.read_window
    }

    pub fn set_read_window(&mut self, read_window: usize) {
        self.read_window = read_window.max(1);
    }

    pub fn assembly_policy(&self) -> AssemblyPolicy {
        self.assembly
    }

    pub fn set_assembly_policy(&mut self, policy: AssemblyPolicy) {
        self.assembly = policy;
    }

    /// Starts one acquisition cycle. The device is told to cancel when the
    /// returned reader is dropped, and also right away if it refuses to start.
    pub fn start(&mut self) -> Result<FrameReader<'_>> {
        if let Err(err) = self.transport.start() {
            log::debug!("Device refused to start acquisition: {err}");
            self.transport.cancel();
            return Err(err);
        }

        Ok(FrameReader {
            scanner: self,
            state: AcquisitionState::Started,
        })
    }

    /// Runs a full acquisition cycle and returns the frame it produced.
    pub fn read_frame(&mut self) -> Result<Frame> {
        self.start()?.read_frame()
    }

    /// Runs as many cycles as the configured [`AssemblyPolicy`] needs to
    /// complete one image.
    pub fn read_image(&mut self) -> Result<Image> {
        let mut assembler = ImageAssembler::new(self.assembly);

        loop {
            let frame = match self.read_frame() {
                Err(SaneError::NoDocs) if !assembler.is_empty() => {
                    return Err(SaneError::ProtocolViolation(
                        "document feeder ran out in the middle of an image".into(),
                    ));
                }
                frame => frame?,
            };

            log::debug!(
                "Acquired {:?} frame {}x{} at depth {} (last: {})",
                frame.format(),
                frame.width(),
                frame.height(),
                frame.depth(),
                frame.is_last(),
            );

            if assembler.push(frame)? {
                break;
            }
        }

        assembler.finish()
    }

    /// Images one after another until the source runs out of documents.
    ///
    /// An empty feeder ends the iteration normally. Any other error is yielded
    /// once and ends it too. A flatbed never runs out, so take what you need.
    pub fn pages(&mut self) -> Pages<'_> {
        Pages {
            scanner: self,
            done: false,
        }
    }

    pub fn canceller(&self) -> Canceller {
        Canceller(Arc::clone(&self.transport))
    }

    /// Requests cancellation of the current acquisition, if any. Never blocks.
    pub fn cancel(&self) {
        log::trace!("Request acquisition cancel");
        self.transport.cancel();
    }

    pub fn close(self) {
        log::debug!("Close scanner");
    }

    /// Applies the reading settings and option presets of `config`.
    ///
    /// Options are visited in device order, so presets that activate other
    /// options take effect before those are set. Nothing stops half-way: every
    /// option that could not be set is logged and returned with its error.
    pub fn apply_config(&mut self, config: &ScannerConfig) -> Vec<(BString, SaneError)> {
        self.set_read_window(config.read_window);
        self.set_assembly_policy(config.assembly);

        let mut failures = Vec::new();

        let names: Vec<BString> = self
            .options()
            .iter()
            .map(|option| option.name.clone())
            .collect();

        let mut unknown: Vec<&BString> = config
            .options
            .keys()
            .filter(|name| !names.contains(*name))
            .collect();
        unknown.sort();

        for name in unknown {
            log::warn!("No option '{name}' on this device, skip preset");
            failures.push((name.clone(), SaneError::NotFound(name.clone())));
        }

        for name in names {
            if name.is_empty() {
                log::debug!("Skip unnamed option");
                continue;
            }

            // Earlier presets may have reloaded the option list.
            let Some(option) = self.options().find(&name).cloned() else {
                log::debug!("Option '{name}' disappeared after reload, skip");
                continue;
            };

            let number = option.number;

            if let Some(text) = config.options.get(&name) {
                let result = Value::parse_for(&option, BStr::new(text))
                    .and_then(|value| self.set_option(&name, &value));

                match result {
                    Ok(info) => log::debug!(
                        "Successfully set value '{text}' for option '{name}' (#{number}), {info:?}"
                    ),
                    Err(err) => {
                        log::warn!(
                            "Failed to set '{text}' value for option '{name}' (#{number}): {err}"
                        );
                        failures.push((name, err));
                    }
                }

                continue;
            }

            if !config.auto_defaults || matches!(option.ty, Type::Button | Type::Group) {
                continue;
            }

            if !option.is_active() {
                log::debug!("Option '{name}' (#{number}) is inactive, skip");
                continue;
            }

            if !option.is_auto_settable() {
                log::debug!("Option '{name}' (#{number}) does not support auto value, skip");
                continue;
            }

            match self.set_option(&name, &Value::Auto) {
                Ok(_) => {
                    log::debug!("Successfully set automatic value for option '{name}' (#{number})")
                }
                Err(err) => {
                    log::warn!("Failed to auto configure option '{name}' (#{number}): {err}");
                    failures.push((name, err));
                }
            }
        }

        failures
    }
}

impl fmt::Debug for Scanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("registry", &self.registry)
            .field("read_window", &self.read_window)
            .field("assembly", &self.assembly)
            .finish_non_exhaustive()
    }
}

/// Cancels the acquisition of the scanner it was taken from. May be used from
/// any thread, including while another one is blocked reading.
#[derive(Clone)]
pub struct Canceller(Arc<dyn Transport>);

impl Canceller {
    pub fn cancel(&self) {
        log::trace!("Request acquisition cancel from canceller");
        self.0.cancel();
    }
}

impl fmt::Debug for Canceller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canceller").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionState {
    Started,
    Streaming,
    Completed,
    Cancelled,
    Failed(SaneError),
}

/// One acquisition cycle in progress.
pub struct FrameReader<'s> {
    scanner: &'s mut Scanner,
    state: AcquisitionState,
}

impl FrameReader<'_> {
    pub fn state(&self) -> &AcquisitionState {
        &self.state
    }

    /// Exact geometry of the frame being acquired.
    pub fn parameters(&self) -> Result<Parameters> {
        self.scanner.parameters()
    }

    /// Reads the next chunk of the frame into `buf`.
    ///
    /// Returns `Ok(0)` once the frame is complete. Reading after an error
    /// returns that error again.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(SaneError::Inval);
        }

        match &self.state {
            AcquisitionState::Completed => return Ok(0),
            AcquisitionState::Cancelled => return Err(SaneError::Cancelled),
            AcquisitionState::Failed(err) => return Err(err.clone()),
            AcquisitionState::Started | AcquisitionState::Streaming => {}
        }

        self.state = AcquisitionState::Streaming;

        let mut idle = Duration::ZERO;

        loop {
            log::trace!("Read up to {} bytes", buf.len());

            match self.scanner.transport.read(buf) {
                // Nothing yet, but the frame goes on.
                Ok(0) => {
                    idle = (idle + Duration::from_millis(1)).min(MAX_IDLE_BACKOFF);
                    log::trace!("Device returned no data, retry in {idle:?}");
                    thread::sleep(idle);
                }
                Ok(count) => return Ok(count),
                Err(SaneError::EOF) => {
                    self.state = AcquisitionState::Completed;
                    return Ok(0);
                }
                Err(SaneError::Cancelled) => {
                    self.state = AcquisitionState::Cancelled;
                    return Err(SaneError::Cancelled);
                }
                Err(err) => {
                    self.state = AcquisitionState::Failed(err.clone());
                    return Err(err);
                }
            }
        }
    }

    /// Requests cancellation. A blocked or following read then fails with
    /// [`SaneError::Cancelled`].
    pub fn cancel(&self) {
        self.scanner.cancel();
    }

    /// Reads the whole frame.
    pub fn read_frame(mut self) -> Result<Frame> {
        let parameters = self.parameters()?;

        if !matches!(parameters.depth, 1 | 8 | 16) {
            return Err(SaneError::UnsupportedDepth(parameters.depth));
        }

        log::debug!("Start frame with parameters {parameters:?}");

        let expected = parameters
            .lines
            .and_then(|lines| lines.checked_mul(parameters.bytes_per_line));

        // Advertised sizes are unreliable, so they only size the first reservation.
        let mut data = Vec::new();
        if let Some(size) = expected {
            let hint = size.min(MAX_FRAME_HINT);
            if data.try_reserve(hint).is_err() {
                log::debug!("Failed to reserve {hint} bytes for frame, grow while reading");
            }
        }

        let mut window = vec![0u8; self.scanner.read_window];

        loop {
            let read = self.read_bytes(&mut window)?;
            if read == 0 {
                break;
            }

            data.extend_from_slice(&window[..read]);

            match expected {
                Some(size) => log::trace!(
                    "Scan progress {} of {size} bytes ({:.1}%)",
                    data.len(),
                    data.len() as f64 / size as f64 * 100.
                ),
                None => log::trace!("Scan progress {} bytes", data.len()),
            }
        }

        log::debug!("Frame done, received {} bytes", data.len());

        Frame::new(&parameters, data)
    }
}

impl io::Read for FrameReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Err(io::ErrorKind::InvalidInput.into());
        }

        match self.read_bytes(buf) {
            Ok(count) => Ok(count),
            Err(SaneError::EOF) => Ok(0),
            Err(SaneError::IO) => Err(io::ErrorKind::BrokenPipe.into()),
            Err(SaneError::NoMem) => Err(io::ErrorKind::OutOfMemory.into()),
            Err(SaneError::AccessDenied) => Err(io::ErrorKind::PermissionDenied.into()),
            Err(err) => Err(io::Error::other(err)),
        }
    }
}

impl fmt::Debug for FrameReader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameReader")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Drop for FrameReader<'_> {
    fn drop(&mut self) {
        log::trace!("End acquisition cycle in state {:?}", self.state);
        self.scanner.transport.cancel();
    }
}

/// Iterator returned by [`Scanner::pages`].
#[derive(Debug)]
pub struct Pages<'s> {
    scanner: &'s mut Scanner,
    done: bool,
}

impl Iterator for Pages<'_> {
    type Item = Result<Image>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.scanner.read_image() {
            Ok(image) => Some(Ok(image)),
            Err(SaneError::NoDocs) => {
                log::debug!("Document feeder is empty, batch done");
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
