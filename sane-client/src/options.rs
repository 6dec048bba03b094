use crate::{
    codec::{self, Value, WORD_SIZE},
    result::{Result, SaneError},
    transport::{Action, OptionDescriptor, RawConstraint, Transport},
};
use bitflags::bitflags;
use bstr::{BStr, BString};
use std::ops;

#[repr(transparent)]
#[derive(Debug, Clone, Default)]
pub struct ScannerOptions(Vec<ScannerOption>);

#[derive(Debug, Clone, PartialEq)]
pub struct ScannerOption {
    /// Index of the option on the device.
    pub number: usize,
    pub name: BString,
    /// Title of the nearest preceding group, empty before the first one.
    pub group: BString,
    pub title: BString,
    pub description: BString,
    pub ty: Type,
    pub unit: Unit,
    /// Size of the raw value in bytes.
    pub size: usize,
    /// Number of elements. Only numeric options can be vectors.
    pub length: usize,
    pub capabilities: Capabilities,
    pub constraint: Constraint,
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Bool,
    Int,
    Fixed,
    String,
    Button,
    Group,
    Unsupported,
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    None,
    Pixel,
    Bit,
    Mm,
    Dpi,
    Percent,
    Microsecond,
    Unsupported,
}

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        const SoftSelect = 1 << 0;
        const HardSelect = 1 << 1;
        const SoftDetect = 1 << 2;
        const Emulated = 1 << 3;
        const Automatic = 1 << 4;
        const Inactive = 1 << 5;
        const Advanced = 1 << 6;

        const _ = !0;
    }
}

bitflags! {
    /// Side effects reported by a set operation.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct OptionInfo: u32 {
        const Inexact = 1 << 0;
        const ReloadOptions = 1 << 1;
        const ReloadParams = 1 << 2;

        const _ = !0;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    None,
    /// Bounds and step share the option's numeric type. A zero step means
    /// any value in the range.
    Range {
        min: Value,
        max: Value,
        quant: Value,
    },
    List(Vec<Value>),
}

impl ScannerOptions {
    fn fetch(transport: &dyn Transport) -> Self {
        let mut options = Vec::new();
        let mut group = BString::default();

        // Option 0 is the option count, not a real option.
        for number in 1.. {
            let Some(desc) = transport.option_descriptor(number) else {
                break;
            };

            if desc.ty == Type::Group {
                group = desc.title;
                continue;
            }

            options.push(ScannerOption::new(number, desc, group.clone()));
        }

        log::debug!("Fetched {} options", options.len());

        Self(options)
    }

    pub fn find<N>(&self, name: N) -> Option<&ScannerOption>
    where
        N: AsRef<[u8]>,
    {
        let name = BStr::new(&name);
        self.0.iter().find(|option| option.name == name)
    }
}

impl ops::Deref for ScannerOptions {
    type Target = [ScannerOption];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoIterator for ScannerOptions {
    type Item = ScannerOption;
    type IntoIter = std::vec::IntoIter<ScannerOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ScannerOptions {
    type Item = &'a ScannerOption;
    type IntoIter = std::slice::Iter<'a, ScannerOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl ScannerOption {
    pub fn new(number: usize, desc: OptionDescriptor, group: BString) -> Self {
        let name = desc.name.unwrap_or_default();

        let length = match desc.ty {
            Type::Int | Type::Fixed => desc.size / WORD_SIZE,
            _ => 1,
        };

        let constraint = Constraint::new(desc.constraint, desc.ty).unwrap_or_else(|err| {
            log::warn!("Ignore malformed constraint of option '{name}' (#{number}): {err}");
            Constraint::None
        });

        Self {
            number,
            name,
            group,
            title: desc.title,
            description: desc.description,
            ty: desc.ty,
            unit: desc.unit,
            size: desc.size,
            length,
            capabilities: desc.capabilities,
            constraint,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.capabilities.contains(Capabilities::Inactive)
    }

    pub fn is_settable(&self) -> bool {
        self.capabilities.contains(Capabilities::SoftSelect)
    }

    pub fn is_detectable(&self) -> bool {
        self.capabilities.contains(Capabilities::SoftDetect)
    }

    pub fn is_auto_settable(&self) -> bool {
        self.capabilities.contains(Capabilities::Automatic)
    }

    pub fn is_emulated(&self) -> bool {
        self.capabilities.contains(Capabilities::Emulated)
    }

    pub fn is_advanced(&self) -> bool {
        self.capabilities.contains(Capabilities::Advanced)
    }
}

impl Constraint {
    fn new(constraint: RawConstraint, ty: Type) -> Result<Self> {
        match constraint {
            RawConstraint::None => Ok(Self::None),
            RawConstraint::Range { min, max, quant } => Ok(Self::Range {
                min: codec::decode_word(min, ty)?,
                max: codec::decode_word(max, ty)?,
                quant: codec::decode_word(quant, ty)?,
            }),
            RawConstraint::WordList(words) => {
                let Some((&count, words)) = words.split_first() else {
                    return Err(SaneError::ProtocolViolation("empty word list".into()));
                };

                let words = usize::try_from(count)
                    .ok()
                    .and_then(|count| words.get(..count))
                    .ok_or_else(|| {
                        SaneError::ProtocolViolation(format!(
                            "word list announces {count} words, has {}",
                            words.len()
                        ))
                    })?;

                let values = words
                    .iter()
                    .map(|word| codec::decode_word(*word, ty))
                    .collect::<Result<_>>()?;

                Ok(Self::List(values))
            }
            RawConstraint::StringList(strings) => {
                if ty != Type::String {
                    return Err(SaneError::Inval);
                }

                Ok(Self::List(strings.into_iter().map(Value::String).collect()))
            }
        }
    }
}

/// Connection-scoped cache of the device's options.
#[derive(Debug, Default)]
pub struct OptionRegistry {
    cache: Option<ScannerOptions>,
}

impl OptionRegistry {
    pub fn options(&mut self, transport: &dyn Transport) -> &ScannerOptions {
        self.cache
            .get_or_insert_with(|| ScannerOptions::fetch(transport))
    }

    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    pub fn get(&mut self, transport: &dyn Transport, name: &BStr) -> Result<Value> {
        let option = self.lookup(transport, name)?;

        // These types carry no value to read.
        if matches!(option.ty, Type::Button | Type::Group | Type::Unsupported) {
            return Err(SaneError::Inval);
        }

        let mut raw = vec![0u8; option.size];
        transport.control_option(option.number, Action::GetValue, &mut raw)?;

        codec::decode(&raw, option.ty, option.length)
    }

    pub fn set(
        &mut self,
        transport: &dyn Transport,
        name: &BStr,
        value: &Value,
    ) -> Result<OptionInfo> {
        let option = self.lookup(transport, name)?;

        let info = match value {
            Value::Auto => {
                if !option.automatic {
                    return Err(SaneError::Inval);
                }

                transport.control_option(option.number, Action::SetAuto, &mut [])?
            }
            value => {
                let mut raw = codec::encode(value, option.ty, option.length, option.size)?;
                transport.control_option(option.number, Action::SetValue, &mut raw)?
            }
        };

        if info.contains(OptionInfo::ReloadOptions) {
            log::debug!("Setting option '{name}' reloads options, drop cached list");
            self.invalidate();
        }

        Ok(info)
    }

    fn lookup(&mut self, transport: &dyn Transport, name: &BStr) -> Result<Slot> {
        let option = self
            .options(transport)
            .find(name)
            .ok_or_else(|| SaneError::NotFound(name.to_owned()))?;

        Ok(Slot {
            number: option.number,
            ty: option.ty,
            length: option.length,
            size: option.size,
            automatic: option.is_auto_settable(),
        })
    }
}

/// Everything needed to talk to one option once it has been looked up.
struct Slot {
    number: usize,
    ty: Type,
    length: usize,
    size: usize,
    automatic: bool,
}

impl OptionInfo {
    pub fn inexact(self) -> bool {
        self.contains(Self::Inexact)
    }

    pub fn reload_options(self) -> bool {
        self.contains(Self::ReloadOptions)
    }

    pub fn reload_params(self) -> bool {
        self.contains(Self::ReloadParams)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parameters::FrameFormat, transport::RawParameters};
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    /// Two options behind a group, with a scripted reply for control calls.
    struct Device {
        descriptors: Vec<OptionDescriptor>,
        reply: Result<OptionInfo>,
        queries: AtomicUsize,
        controls: Mutex<Vec<(usize, Action, Vec<u8>)>>,
    }

    fn descriptor(
        name: &str,
        ty: Type,
        size: usize,
        constraint: RawConstraint,
    ) -> OptionDescriptor {
        OptionDescriptor {
            name: Some(name.into()),
            title: name.into(),
            description: BString::default(),
            ty,
            unit: Unit::None,
            size,
            capabilities: Capabilities::SoftSelect | Capabilities::SoftDetect,
            constraint,
        }
    }

    impl Device {
        fn new(reply: Result<OptionInfo>) -> Self {
            let mut auto = descriptor("brightness", Type::Fixed, 4, RawConstraint::None);
            auto.capabilities |= Capabilities::Automatic;

            Self {
                descriptors: vec![
                    descriptor("", Type::Int, 4, RawConstraint::None),
                    descriptor("Standard", Type::Group, 0, RawConstraint::None),
                    descriptor(
                        "mode",
                        Type::String,
                        8,
                        RawConstraint::StringList(vec!["Gray".into(), "Color".into()]),
                    ),
                    descriptor(
                        "gamma",
                        Type::Int,
                        12,
                        RawConstraint::WordList(vec![3, 1, 2, 4, 99]),
                    ),
                    descriptor("Enhancement", Type::Group, 0, RawConstraint::None),
                    auto,
                    descriptor(
                        "x",
                        Type::Fixed,
                        4,
                        RawConstraint::Range {
                            min: 0,
                            max: 10 << 16,
                            quant: 1 << 15,
                        },
                    ),
                ],
                reply,
                queries: AtomicUsize::new(0),
                controls: Mutex::default(),
            }
        }

        fn controls(&self) -> Vec<(usize, Action, Vec<u8>)> {
            self.controls.lock().unwrap().clone()
        }
    }

    impl Transport for Device {
        fn option_descriptor(&self, index: usize) -> Option<OptionDescriptor> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.descriptors.get(index).cloned()
        }

        fn control_option(
            &self,
            index: usize,
            action: Action,
            value: &mut [u8],
        ) -> Result<OptionInfo> {
            if action == Action::GetValue {
                value.fill(0);
                value[..4].copy_from_slice(&7i32.to_ne_bytes());
            }

            self.controls
                .lock()
                .unwrap()
                .push((index, action, value.to_vec()));

            self.reply.clone()
        }

        fn start(&self) -> Result<()> {
            Err(SaneError::Unsupported)
        }

        fn read(&self, _buf: &mut [u8]) -> Result<usize> {
            Err(SaneError::Unsupported)
        }

        fn cancel(&self) {}

        fn parameters(&self) -> Result<RawParameters> {
            Ok(RawParameters {
                format: FrameFormat::Gray,
                last_frame: true,
                bytes_per_line: 1,
                pixels_per_line: 1,
                lines: 1,
                depth: 8,
            })
        }
    }

    #[test]
    fn groups_label_following_options() {
        let device = Device::new(Ok(OptionInfo::empty()));
        let mut registry = OptionRegistry::default();

        let options = registry.options(&device);
        let names: Vec<_> = options
            .iter()
            .map(|o| (o.name.to_string(), o.group.to_string()))
            .collect();

        assert_eq!(
            names,
            [
                ("mode".to_owned(), "Standard".to_owned()),
                ("gamma".to_owned(), "Standard".to_owned()),
                ("brightness".to_owned(), "Enhancement".to_owned()),
                ("x".to_owned(), "Enhancement".to_owned()),
            ]
        );
        assert_eq!(options[0].number, 2);
        assert_eq!(options[1].length, 3);
    }

    #[test]
    fn constraints_are_decoded() {
        let device = Device::new(Ok(OptionInfo::empty()));
        let mut registry = OptionRegistry::default();
        let options = registry.options(&device);

        assert_eq!(
            options.find("mode").unwrap().constraint,
            Constraint::List(vec![Value::String("Gray".into()), Value::String("Color".into())])
        );
        // Trailing word past the announced count is ignored.
        assert_eq!(
            options.find("gamma").unwrap().constraint,
            Constraint::List(vec![Value::Int(1), Value::Int(2), Value::Int(4)])
        );
        assert_eq!(
            options.find("x").unwrap().constraint,
            Constraint::Range {
                min: Value::Fixed(0.0),
                max: Value::Fixed(10.0),
                quant: Value::Fixed(0.5),
            }
        );
    }

    #[test]
    fn truncated_word_list_is_dropped() {
        let constraint = Constraint::new(RawConstraint::WordList(vec![5, 1, 2]), Type::Int);
        assert!(matches!(constraint, Err(SaneError::ProtocolViolation(_))));
    }

    #[test]
    fn options_are_cached_until_invalidated() {
        let device = Device::new(Ok(OptionInfo::empty()));
        let mut registry = OptionRegistry::default();

        registry.options(&device);
        let queries = device.queries.load(Ordering::SeqCst);
        registry.options(&device);
        assert_eq!(device.queries.load(Ordering::SeqCst), queries);

        registry.invalidate();
        registry.options(&device);
        assert_eq!(device.queries.load(Ordering::SeqCst), 2 * queries);
    }

    #[test]
    fn reload_flag_invalidates_cache() {
        let device = Device::new(Ok(OptionInfo::ReloadOptions | OptionInfo::Inexact));
        let mut registry = OptionRegistry::default();

        let info = registry
            .set(&device, "mode".into(), &Value::String("Color".into()))
            .unwrap();
        assert!(info.reload_options());
        assert!(info.inexact());
        assert!(!info.reload_params());

        let queries = device.queries.load(Ordering::SeqCst);
        registry.options(&device);
        assert!(device.queries.load(Ordering::SeqCst) > queries);
    }

    #[test]
    fn set_encodes_value_into_option_buffer() {
        let device = Device::new(Ok(OptionInfo::empty()));
        let mut registry = OptionRegistry::default();

        registry
            .set(&device, "mode".into(), &Value::String("Color".into()))
            .unwrap();

        assert_eq!(device.controls(), [(2, Action::SetValue, b"Color\0\0\0".to_vec())]);
    }

    #[test]
    fn local_failures_never_reach_device() {
        let device = Device::new(Ok(OptionInfo::empty()));
        let mut registry = OptionRegistry::default();

        assert_eq!(
            registry.set(&device, "nope".into(), &Value::Int(1)),
            Err(SaneError::NotFound("nope".into()))
        );
        assert_eq!(
            registry.set(&device, "gamma".into(), &Value::IntList(vec![1, 2])),
            Err(SaneError::Inval)
        );
        assert_eq!(
            registry.set(&device, "gamma".into(), &Value::Bool(true)),
            Err(SaneError::Inval)
        );
        assert_eq!(
            registry.set(&device, "mode".into(), &Value::Auto),
            Err(SaneError::Inval)
        );
        assert_eq!(registry.get(&device, "nope".into()), Err(SaneError::NotFound("nope".into())));

        assert!(device.controls().is_empty());
    }

    #[test]
    fn auto_uses_set_auto_action() {
        let device = Device::new(Ok(OptionInfo::empty()));
        let mut registry = OptionRegistry::default();

        registry.set(&device, "brightness".into(), &Value::Auto).unwrap();

        assert_eq!(device.controls(), [(5, Action::SetAuto, vec![])]);
    }

    #[test]
    fn device_status_is_surfaced_unchanged() {
        let device = Device::new(Err(SaneError::Inval));
        let mut registry = OptionRegistry::default();

        assert_eq!(
            registry.set(&device, "gamma".into(), &Value::IntList(vec![1, 2, 3])),
            Err(SaneError::Inval)
        );
        assert_eq!(device.controls().len(), 1);
    }

    #[test]
    fn get_decodes_current_value() {
        let device = Device::new(Ok(OptionInfo::empty()));
        let mut registry = OptionRegistry::default();

        assert_eq!(
            registry.get(&device, "gamma".into()),
            Ok(Value::IntList(vec![7, 0, 0]))
        );
        assert_eq!(
            registry.get(&device, "brightness".into()),
            Ok(Value::Fixed(7.0 / 65536.0))
        );
    }
}
