//! In-process device behind the [`Transport`] interface, modelled on the
//! reference `test` backend that ships with the scanner protocol.
//!
//! Frames carry a generated picture whose pixel values are known in advance
//! (see [`TestPicture::level`]), so callers can check every decoded sample.

use crate::{
    codec::{fixed_to_float, float_to_fixed, WORD_SIZE},
    options::{Capabilities, OptionInfo, Type, Unit},
    parameters::FrameFormat,
    result::{Result, SaneError},
    transport::{Action, OptionDescriptor, RawConstraint, RawParameters, Transport},
};
use bstr::{BStr, BString, ByteSlice};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Condvar, Mutex, MutexGuard, PoisonError,
};

/// Pages in the document feeder after selecting it as source.
pub const FEEDER_PAGES: usize = 10;

const FEEDER: &str = "Automatic Document Feeder";

const MM_PER_INCH: f64 = 25.4;

const THREE_PASS_ORDERS: [&str; 6] = ["RGB", "RBG", "GBR", "GRB", "BRG", "BGR"];

const READ_RETURN_VALUES: [&str; 11] = [
    "Default",
    "SANE_STATUS_UNSUPPORTED",
    "SANE_STATUS_CANCELLED",
    "SANE_STATUS_DEVICE_BUSY",
    "SANE_STATUS_INVAL",
    "SANE_STATUS_JAMMED",
    "SANE_STATUS_NO_DOCS",
    "SANE_STATUS_COVER_OPEN",
    "SANE_STATUS_IO_ERROR",
    "SANE_STATUS_NO_MEM",
    "SANE_STATUS_ACCESS_DENIED",
];

const WORD_LIST: [i32; 9] = [-42, -8, 0, 17, 42, 256, 65536, 16777216, 1073741824];

/// Picture selected with the `test-picture` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestPicture {
    SolidBlack,
    SolidWhite,
    ColorPattern,
}

impl TestPicture {
    /// 8-bit level of the pixel at `(x, y)`, for the gray picture when
    /// `channel` is `None` or for one of the R, G, B channels otherwise.
    ///
    /// The color pattern is made of 4x4 areas one pixel apart, on a 0x55
    /// background. Even rows of areas ramp up from black, odd rows ramp down
    /// from white. In color only one channel is lit: rows 0 and 1 are red,
    /// 2 and 3 green, 4 and 5 blue, then again.
    pub fn level(self, x: usize, y: usize, channel: Option<usize>) -> u8 {
        match self {
            Self::SolidBlack => 0x00,
            Self::SolidWhite => 0xFF,
            Self::ColorPattern => {
                if x % 5 == 0 || y % 5 == 0 {
                    return 0x55;
                }

                let (column, row) = (x / 5, y / 5);
                let ramp = (column % 0xFF) as u8;
                let level = if row % 2 == 0 { ramp } else { 0xFF - ramp };

                match channel {
                    None => level,
                    Some(channel) if channel == (row % 6) / 2 => level,
                    Some(_) => 0x00,
                }
            }
        }
    }

    fn from_name(name: &BStr) -> Self {
        match name.as_bytes() {
            b"Solid white" => Self::SolidWhite,
            b"Color pattern" => Self::ColorPattern,
            _ => Self::SolidBlack,
        }
    }
}

#[derive(Debug)]
pub struct SimulatedDevice {
    state: Mutex<State>,
    cancel_requested: Mutex<bool>,
    wakeup: Condvar,
    descriptor_queries: AtomicUsize,
    control_calls: AtomicUsize,
    read_limit: usize,
    stall: bool,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::new()),
            cancel_requested: Mutex::new(false),
            wakeup: Condvar::new(),
            descriptor_queries: AtomicUsize::new(0),
            control_calls: AtomicUsize::new(0),
            read_limit: usize::MAX,
            stall: false,
        }
    }

    /// Returns at most `limit` bytes per read.
    pub fn with_read_limit(mut self, limit: usize) -> Self {
        self.read_limit = limit.max(1);
        self
    }

    /// Makes every read block until cancellation is requested.
    pub fn with_stalled_reads(mut self) -> Self {
        self.stall = true;
        self
    }

    pub fn descriptor_queries(&self) -> usize {
        self.descriptor_queries.load(Ordering::SeqCst)
    }

    pub fn control_calls(&self) -> usize {
        self.control_calls.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancel_requested(&self) -> MutexGuard<'_, bool> {
        self.cancel_requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for SimulatedDevice {
    fn option_descriptor(&self, index: usize) -> Option<OptionDescriptor> {
        self.descriptor_queries.fetch_add(1, Ordering::SeqCst);
        log::trace!("Describe option #{index}");

        self.state()
            .slots
            .get(index)
            .map(|slot| slot.descriptor.clone())
    }

    fn control_option(&self, index: usize, action: Action, value: &mut [u8]) -> Result<OptionInfo> {
        self.control_calls.fetch_add(1, Ordering::SeqCst);
        log::trace!("Control option #{index}: {action:?} with {} bytes", value.len());

        self.state().control(index, action, value)
    }

    fn start(&self) -> Result<()> {
        log::trace!("Start acquisition");
        *self.cancel_requested() = false;

        let mut state = self.state();
        if state.acquisition.is_some() {
            return Err(SaneError::DeviceBusy);
        }

        let settings = state.settings();

        if state.frame_in_image == 0 && settings.feeder {
            if state.pages_left == 0 {
                return Err(SaneError::NoDocs);
            }

            state.pages_left -= 1;
        }

        let parameters = settings.parameters(state.frame_in_image);
        state.acquisition = Some(Acquisition {
            data: settings.render(parameters.format),
            cursor: 0,
            status: settings.read_status,
            last_frame: parameters.last_frame,
        });

        Ok(())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Err(SaneError::Inval);
        }

        if self.stall {
            let mut requested = self.cancel_requested();
            while !*requested {
                requested = self
                    .wakeup
                    .wait(requested)
                    .unwrap_or_else(PoisonError::into_inner);
            }

            return Err(SaneError::Cancelled);
        }

        if *self.cancel_requested() {
            return Err(SaneError::Cancelled);
        }

        let mut state = self.state();
        let State {
            acquisition,
            frame_in_image,
            ..
        } = &mut *state;

        let Some(current) = acquisition.as_mut() else {
            return Err(SaneError::Inval);
        };

        if let Some(status) = &current.status {
            return Err(status.clone());
        }

        let remaining = &current.data[current.cursor..];
        if remaining.is_empty() {
            *frame_in_image = if current.last_frame {
                0
            } else {
                *frame_in_image + 1
            };
            *acquisition = None;

            return Err(SaneError::EOF);
        }

        let count = remaining.len().min(buf.len()).min(self.read_limit);
        buf[..count].copy_from_slice(&remaining[..count]);
        current.cursor += count;

        Ok(count)
    }

    fn cancel(&self) {
        log::trace!("Cancel acquisition");

        *self.cancel_requested() = true;
        self.wakeup.notify_all();

        let mut state = self.state();
        if state.acquisition.take().is_some() {
            log::debug!("Acquisition aborted, next start begins a new image");
            state.frame_in_image = 0;
        }
    }

    fn parameters(&self) -> Result<RawParameters> {
        let state = self.state();
        Ok(state.settings().parameters(state.frame_in_image))
    }
}

#[derive(Debug)]
struct State {
    slots: Vec<Slot>,
    acquisition: Option<Acquisition>,
    /// Position of the next frame within a three-pass image.
    frame_in_image: usize,
    pages_left: usize,
}

#[derive(Debug)]
struct Acquisition {
    data: Vec<u8>,
    cursor: usize,
    /// Forced read status, from `read-return-value`.
    status: Option<SaneError>,
    last_frame: bool,
}

impl State {
    fn new() -> Self {
        Self {
            slots: slots(),
            acquisition: None,
            frame_in_image: 0,
            pages_left: FEEDER_PAGES,
        }
    }

    fn find(&self, name: &str) -> Option<&Slot> {
        self.slots
            .iter()
            .find(|slot| slot.descriptor.name.as_ref().is_some_and(|n| n == name))
    }

    fn word(&self, name: &str) -> i32 {
        self.find(name)
            .and_then(|slot| slot.words().first().copied())
            .unwrap_or_default()
    }

    fn text(&self, name: &str) -> &BStr {
        self.find(name).map_or(BStr::new(""), Slot::text)
    }

    fn settings(&self) -> Settings {
        let dpi = fixed_to_float(self.word("resolution"));
        let pixels = |mm: i32| ((fixed_to_float(mm) * dpi / MM_PER_INCH) as usize).max(1);

        let mut order = [FrameFormat::Red, FrameFormat::Green, FrameFormat::Blue];
        for (format, byte) in order.iter_mut().zip(self.text("three-pass-order").bytes()) {
            *format = match byte {
                b'G' => FrameFormat::Green,
                b'B' => FrameFormat::Blue,
                _ => FrameFormat::Red,
            };
        }

        Settings {
            color: self.text("mode") == "Color",
            depth: usize::try_from(self.word("depth")).unwrap_or(8),
            feeder: self.text("source") == FEEDER,
            width: pixels(self.word("br-x")),
            height: pixels(self.word("br-y")),
            picture: TestPicture::from_name(self.text("test-picture")),
            three_pass: self.word("three-pass") != 0,
            order,
            hand_scanner: self.word("hand-scanner") != 0,
            ppl_loss: usize::try_from(self.word("ppl-loss")).unwrap_or_default(),
            fuzzy: self.word("fuzzy-parameters") != 0,
            read_status: read_status(self.text("read-return-value")),
        }
    }

    fn control(&mut self, index: usize, action: Action, value: &mut [u8]) -> Result<OptionInfo> {
        let slot = self.slots.get(index).ok_or(SaneError::Inval)?;
        let capabilities = slot.descriptor.capabilities;

        if slot.descriptor.ty == Type::Group || capabilities.contains(Capabilities::Inactive) {
            return Err(SaneError::Inval);
        }

        let (raw, inexact) = match action {
            Action::GetValue => {
                if !capabilities.contains(Capabilities::SoftDetect) {
                    return Err(SaneError::Inval);
                }

                let target = value.get_mut(..slot.value.len()).ok_or(SaneError::Inval)?;
                target.copy_from_slice(&slot.value);

                return Ok(OptionInfo::empty());
            }
            Action::SetValue => {
                if !capabilities.contains(Capabilities::SoftSelect) {
                    return Err(SaneError::Inval);
                }

                if slot.descriptor.ty == Type::Button {
                    log::debug!("Button '{}' pressed", slot.text_name());
                    return Ok(OptionInfo::empty());
                }

                if value.len() != slot.value.len() {
                    return Err(SaneError::Inval);
                }

                slot.constrain(value)?
            }
            Action::SetAuto => {
                if !capabilities.contains(Capabilities::SoftSelect | Capabilities::Automatic) {
                    return Err(SaneError::Inval);
                }

                (slot.default.clone(), false)
            }
        };

        let mut info = slot.info;
        if inexact {
            info |= OptionInfo::Inexact;
        }

        self.slots[index].value = raw;
        self.after_set(index);

        Ok(info)
    }

    fn after_set(&mut self, index: usize) {
        let slot = &self.slots[index];
        let Some(name) = slot.descriptor.name.clone() else {
            return;
        };

        if slot.descriptor.ty == Type::Bool {
            let active = slot.words().first().is_some_and(|word| *word != 0);

            for other in &mut self.slots {
                if other.activated_by.is_some_and(|by| name == by) {
                    other.descriptor.capabilities.set(Capabilities::Inactive, !active);
                }
            }
        }

        if name == "source" && self.text("source") == FEEDER {
            log::debug!("Feeder loaded with {FEEDER_PAGES} pages");
            self.pages_left = FEEDER_PAGES;
        }
    }
}

/// Snapshot of the options that shape acquisition.
#[derive(Debug)]
struct Settings {
    color: bool,
    depth: usize,
    feeder: bool,
    width: usize,
    height: usize,
    picture: TestPicture,
    three_pass: bool,
    order: [FrameFormat; 3],
    hand_scanner: bool,
    ppl_loss: usize,
    fuzzy: bool,
    read_status: Option<SaneError>,
}

impl Settings {
    fn is_three_pass(&self) -> bool {
        self.color && self.three_pass
    }

    fn format(&self, frame_in_image: usize) -> FrameFormat {
        match (self.color, self.three_pass) {
            (false, _) => FrameFormat::Gray,
            (true, false) => FrameFormat::RGB,
            (true, true) => self.order[frame_in_image.min(2)],
        }
    }

    fn bytes_per_line(&self, channels: usize) -> usize {
        match self.depth {
            1 => channels * self.width.div_ceil(8),
            16 => 2 * channels * self.width,
            _ => channels * self.width,
        }
    }

    fn parameters(&self, frame_in_image: usize) -> RawParameters {
        let format = self.format(frame_in_image);

        let lines = if self.hand_scanner {
            -1
        } else if self.fuzzy {
            (self.height * 3 / 2 + 1) as i32
        } else {
            self.height as i32
        };

        RawParameters {
            format,
            last_frame: !self.is_three_pass() || frame_in_image >= 2,
            bytes_per_line: self.bytes_per_line(format.channels()) as i32,
            pixels_per_line: self.width.saturating_sub(self.ppl_loss) as i32,
            lines,
            depth: self.depth as i32,
        }
    }

    /// Full frame in device layout. Lines always span the whole width, so
    /// pixels lost to `ppl-loss` become padding.
    fn render(&self, format: FrameFormat) -> Vec<u8> {
        let channels = format.channels();
        let roles: &[Option<usize>] = match format {
            FrameFormat::Gray => &[None],
            FrameFormat::RGB => &[Some(0), Some(1), Some(2)],
            FrameFormat::Red => &[Some(0)],
            FrameFormat::Green => &[Some(1)],
            FrameFormat::Blue => &[Some(2)],
        };

        let bytes_per_line = self.bytes_per_line(channels);
        let mut data = vec![0u8; bytes_per_line * self.height];

        for (y, line) in data.chunks_exact_mut(bytes_per_line).enumerate() {
            for x in 0..self.width {
                for (channel, role) in roles.iter().enumerate() {
                    let level = self.picture.level(x, y, *role);

                    match self.depth {
                        1 => {
                            // Gray sets the bit for black, color for full intensity.
                            let set = match format {
                                FrameFormat::Gray => level < 0x80,
                                _ => level >= 0x80,
                            };

                            if set {
                                line[channels * (x / 8) + channel] |= 1 << (x % 8);
                            }
                        }
                        16 => {
                            let i = 2 * (channels * x + channel);
                            let sample = u16::from(level) * 0x0101;
                            line[i..i + 2].copy_from_slice(&sample.to_le_bytes());
                        }
                        _ => line[channels * x + channel] = level,
                    }
                }
            }
        }

        data
    }
}

fn read_status(name: &BStr) -> Option<SaneError> {
    match name.as_bytes() {
        b"SANE_STATUS_UNSUPPORTED" => Some(SaneError::Unsupported),
        b"SANE_STATUS_CANCELLED" => Some(SaneError::Cancelled),
        b"SANE_STATUS_DEVICE_BUSY" => Some(SaneError::DeviceBusy),
        b"SANE_STATUS_INVAL" => Some(SaneError::Inval),
        b"SANE_STATUS_JAMMED" => Some(SaneError::Jammed),
        b"SANE_STATUS_NO_DOCS" => Some(SaneError::NoDocs),
        b"SANE_STATUS_COVER_OPEN" => Some(SaneError::CoverOpen),
        b"SANE_STATUS_IO_ERROR" => Some(SaneError::IO),
        b"SANE_STATUS_NO_MEM" => Some(SaneError::NoMem),
        b"SANE_STATUS_ACCESS_DENIED" => Some(SaneError::AccessDenied),
        _ => None,
    }
}

#[derive(Debug, Clone)]
struct Slot {
    descriptor: OptionDescriptor,
    value: Vec<u8>,
    default: Vec<u8>,
    /// Side effects reported whenever the option is set.
    info: OptionInfo,
    /// Boolean option that makes this one active.
    activated_by: Option<&'static str>,
}

impl Slot {
    fn new(name: &str, title: &str, ty: Type, unit: Unit, size: usize) -> Self {
        Self {
            descriptor: OptionDescriptor {
                name: Some(name.into()),
                title: title.into(),
                description: BString::default(),
                ty,
                unit,
                size,
                capabilities: Capabilities::SoftSelect | Capabilities::SoftDetect,
                constraint: RawConstraint::None,
            },
            value: vec![0; size],
            default: vec![0; size],
            info: OptionInfo::empty(),
            activated_by: None,
        }
    }

    fn group(title: &str) -> Self {
        let mut slot = Self::new("", title, Type::Group, Unit::None, 0);
        slot.descriptor.name = None;
        slot.descriptor.capabilities = Capabilities::empty();
        slot
    }

    fn scalar(name: &str, title: &str, ty: Type, unit: Unit) -> Self {
        Self::new(name, title, ty, unit, WORD_SIZE)
    }

    fn array(name: &str, title: &str, ty: Type, unit: Unit, length: usize) -> Self {
        Self::new(name, title, ty, unit, length * WORD_SIZE)
    }

    fn string(name: &str, title: &str, size: usize) -> Self {
        Self::new(name, title, Type::String, Unit::None, size)
    }

    fn range(mut self, min: i32, max: i32, quant: i32) -> Self {
        self.descriptor.constraint = RawConstraint::Range { min, max, quant };
        self
    }

    fn word_list(mut self, words: &[i32]) -> Self {
        let mut list = vec![words.len() as i32];
        list.extend_from_slice(words);

        self.descriptor.constraint = RawConstraint::WordList(list);
        self
    }

    fn string_list(mut self, strings: &[&str]) -> Self {
        let strings = strings.iter().map(|s| BString::from(*s)).collect();

        self.descriptor.constraint = RawConstraint::StringList(strings);
        self
    }

    fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.descriptor.capabilities = capabilities;
        self
    }

    fn reloads(mut self, info: OptionInfo) -> Self {
        self.info = info;
        self
    }

    fn activated_by(mut self, name: &'static str) -> Self {
        self.activated_by = Some(name);
        self.descriptor.capabilities |= Capabilities::Inactive;
        self
    }

    /// Sets the default and current value. A shorter list repeats to fill
    /// the whole vector.
    fn words_default(mut self, words: &[i32]) -> Self {
        let raw: Vec<u8> = words
            .iter()
            .cycle()
            .take(self.value.len() / WORD_SIZE)
            .flat_map(|word| word.to_ne_bytes())
            .collect();

        self.value.clone_from(&raw);
        self.default = raw;
        self
    }

    fn text_default(mut self, text: &str) -> Self {
        let len = text.len().min(self.value.len().saturating_sub(1));

        let mut raw = vec![0; self.value.len()];
        raw[..len].copy_from_slice(&text.as_bytes()[..len]);

        self.value.clone_from(&raw);
        self.default = raw;
        self
    }

    fn words(&self) -> Vec<i32> {
        self.value
            .chunks_exact(WORD_SIZE)
            .map(|chunk| i32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn text(&self) -> &BStr {
        let end = self.value.find_byte(0).unwrap_or(self.value.len());
        self.value[..end].as_bstr()
    }

    fn text_name(&self) -> &BStr {
        self.descriptor
            .name
            .as_ref()
            .map_or(BStr::new(""), |name| name.as_bstr())
    }

    /// Checks a new raw value against the constraint. Range values off the
    /// quantization grid snap to it, which makes the result inexact.
    fn constrain(&self, value: &[u8]) -> Result<(Vec<u8>, bool)> {
        let constraint = &self.descriptor.constraint;

        match self.descriptor.ty {
            Type::String => {
                let end = value.find_byte(0).unwrap_or(value.len());
                let text = &value[..end];

                if let RawConstraint::StringList(list) = constraint {
                    if !list.iter().any(|item| item.as_slice() == text) {
                        return Err(SaneError::Inval);
                    }
                }

                let len = text.len().min(value.len().saturating_sub(1));
                let mut raw = vec![0; value.len()];
                raw[..len].copy_from_slice(&text[..len]);

                Ok((raw, false))
            }
            Type::Bool | Type::Int | Type::Fixed => {
                let mut inexact = false;
                let mut words = Vec::with_capacity(value.len() / WORD_SIZE);

                for chunk in value.chunks_exact(WORD_SIZE) {
                    let mut word = i32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);

                    if self.descriptor.ty == Type::Bool && !matches!(word, 0 | 1) {
                        return Err(SaneError::Inval);
                    }

                    match constraint {
                        RawConstraint::None => {}
                        RawConstraint::Range { min, max, quant } => {
                            if word < *min || word > *max {
                                return Err(SaneError::Inval);
                            }

                            if *quant > 0 {
                                let (min, max, quant) =
                                    (i64::from(*min), i64::from(*max), i64::from(*quant));
                                let steps = (i64::from(word) - min + quant / 2) / quant;
                                let snapped = (min + steps * quant).min(max) as i32;

                                if snapped != word {
                                    word = snapped;
                                    inexact = true;
                                }
                            }
                        }
                        RawConstraint::WordList(list) => {
                            if !list.get(1..).unwrap_or_default().contains(&word) {
                                return Err(SaneError::Inval);
                            }
                        }
                        RawConstraint::StringList(_) => return Err(SaneError::Inval),
                    }

                    words.push(word);
                }

                let raw = words.iter().flat_map(|word| word.to_ne_bytes()).collect();
                Ok((raw, inexact))
            }
            Type::Button | Type::Group | Type::Unsupported => Err(SaneError::Inval),
        }
    }
}

fn fixed(value: f64) -> i32 {
    float_to_fixed(value)
}

fn slots() -> Vec<Slot> {
    use Capabilities as C;

    let params = OptionInfo::ReloadParams;
    let both = OptionInfo::ReloadOptions | OptionInfo::ReloadParams;
    let advanced = C::SoftSelect | C::SoftDetect | C::Advanced;

    let mut slots = vec![
        Slot::scalar("", "Number of options", Type::Int, Unit::None).capabilities(C::SoftDetect),
        Slot::group("Scan Mode"),
        Slot::string("mode", "Scan mode", 16)
            .string_list(&["Gray", "Color"])
            .text_default("Gray")
            .reloads(params),
        Slot::scalar("depth", "Bit depth", Type::Int, Unit::Bit)
            .word_list(&[1, 8, 16])
            .words_default(&[8])
            .reloads(params),
        Slot::string("source", "Scan source", 32)
            .string_list(&["Flatbed", FEEDER])
            .text_default("Flatbed")
            .reloads(params),
        Slot::scalar("resolution", "Scan resolution", Type::Fixed, Unit::Dpi)
            .range(fixed(1.0), fixed(1200.0), 0)
            .words_default(&[fixed(50.0)])
            .reloads(params),
        Slot::group("Geometry"),
        Slot::scalar("br-x", "Bottom-right x", Type::Fixed, Unit::Mm)
            .range(fixed(1.0), fixed(200.0), 0)
            .words_default(&[fixed(40.0)])
            .reloads(params),
        Slot::scalar("br-y", "Bottom-right y", Type::Fixed, Unit::Mm)
            .range(fixed(1.0), fixed(200.0), 0)
            .words_default(&[fixed(20.0)])
            .reloads(params),
        Slot::group("Special Options"),
        Slot::string("test-picture", "Select the test picture", 16)
            .string_list(&["Solid black", "Solid white", "Color pattern"])
            .text_default("Solid black")
            .reloads(params),
        Slot::scalar("three-pass", "Three-pass simulation", Type::Bool, Unit::None)
            .reloads(both),
        Slot::string("three-pass-order", "Set the order of frames", 4)
            .string_list(&THREE_PASS_ORDERS)
            .text_default("RGB")
            .activated_by("three-pass")
            .reloads(params),
        Slot::scalar("hand-scanner", "Hand-scanner simulation", Type::Bool, Unit::None)
            .reloads(params),
        Slot::scalar("ppl-loss", "Pixels lost per line", Type::Int, Unit::Pixel)
            .range(0, 128, 0)
            .reloads(params),
        Slot::scalar("fuzzy-parameters", "Fuzzy parameters", Type::Bool, Unit::None)
            .reloads(params),
        Slot::string("read-return-value", "Return value of read", 32)
            .string_list(&READ_RETURN_VALUES)
            .text_default("Default"),
        Slot::scalar("enable-test-options", "Enable test options", Type::Bool, Unit::None)
            .capabilities(advanced)
            .reloads(OptionInfo::ReloadOptions),
        Slot::group("Test Options"),
    ];

    let tests = [
        Slot::scalar(
            "bool-soft-select-soft-detect",
            "(1/6) Bool soft select soft detect",
            Type::Bool,
            Unit::None,
        )
        .capabilities(advanced),
        Slot::scalar(
            "bool-hard-select-soft-detect",
            "(2/6) Bool hard select soft detect",
            Type::Bool,
            Unit::None,
        )
        .capabilities(C::HardSelect | C::SoftDetect | C::Advanced),
        Slot::scalar("bool-hard-select", "(3/6) Bool hard select", Type::Bool, Unit::None)
            .capabilities(C::HardSelect | C::Advanced),
        Slot::scalar("bool-soft-detect", "(4/6) Bool soft detect", Type::Bool, Unit::None)
            .capabilities(C::SoftDetect | C::Advanced),
        Slot::scalar(
            "bool-soft-select-soft-detect-auto",
            "(5/6) Bool soft select soft detect auto",
            Type::Bool,
            Unit::None,
        )
        .capabilities(advanced | C::Automatic),
        Slot::scalar(
            "bool-soft-select-soft-detect-emulated",
            "(6/6) Bool soft select soft detect emulated",
            Type::Bool,
            Unit::None,
        )
        .capabilities(advanced | C::Emulated),
        Slot::scalar("int", "(1/6) Int", Type::Int, Unit::None)
            .capabilities(advanced)
            .words_default(&[42]),
        Slot::scalar("int-constraint-range", "(2/6) Int constraint range", Type::Int, Unit::Pixel)
            .capabilities(advanced)
            .range(4, 192, 2)
            .words_default(&[26]),
        Slot::scalar(
            "int-constraint-word-list",
            "(3/6) Int constraint word list",
            Type::Int,
            Unit::Bit,
        )
        .capabilities(advanced)
        .word_list(&WORD_LIST)
        .words_default(&[42]),
        Slot::array("int-constraint-array", "(4/6) Int constraint array", Type::Int, Unit::Mm, 6)
            .capabilities(advanced),
        Slot::array(
            "int-constraint-array-constraint-range",
            "(5/6) Int constraint array constraint range",
            Type::Int,
            Unit::Dpi,
            6,
        )
        .capabilities(advanced)
        .range(4, 192, 2)
        .words_default(&[48, 6, 4, 92, 190, 16]),
        Slot::array(
            "int-constraint-array-constraint-word-list",
            "(6/6) Int constraint array constraint word list",
            Type::Int,
            Unit::Percent,
            6,
        )
        .capabilities(advanced)
        .word_list(&WORD_LIST)
        .words_default(&[-42, 0, -8, 17, 42, 42]),
        Slot::scalar("fixed", "(1/3) Fixed", Type::Fixed, Unit::None)
            .capabilities(advanced)
            .words_default(&[fixed(42.0)]),
        Slot::scalar(
            "fixed-constraint-range",
            "(2/3) Fixed constraint range",
            Type::Fixed,
            Unit::Microsecond,
        )
        .capabilities(advanced)
        .range(fixed(-42.17), fixed(32767.9999), fixed(2.0))
        .words_default(&[fixed(41.83)]),
        Slot::scalar(
            "fixed-constraint-word-list",
            "(3/3) Fixed constraint word list",
            Type::Fixed,
            Unit::None,
        )
        .capabilities(advanced)
        .word_list(&[fixed(-32.7), fixed(12.1), fixed(42.0), fixed(129.5)])
        .words_default(&[fixed(42.0)]),
        Slot::string("string", "(1/2) String", 64)
            .text_default("This is the contents of a string option."),
        Slot::string("string-constraint-string-list", "(2/2) String constraint string list", 96)
            .string_list(&[
                "First entry",
                "Second entry",
                "This is the very long third entry. Maybe the frontend has an idea how to display it",
            ])
            .text_default("First entry"),
        Slot::new("button", "(1/1) Button", Type::Button, Unit::None, 0),
    ];

    slots.extend(
        tests
            .into_iter()
            .map(|slot| slot.activated_by("enable-test-options")),
    );

    let count = slots.len() as i32;
    slots[0] = slots[0].clone().words_default(&[count]);

    slots
}
