// Renderer creation hints
//
// Hints are advisory. A hint that matches nothing is ignored and the
// default choice is used instead.

/// Known hint names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintName {
    /// Pick a physical device by `system_index` (number) or name (string).
    UseDevice,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HintValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Text(String),
}

impl From<bool> for HintValue {
    fn from(value: bool) -> Self {
        HintValue::Bool(value)
    }
}

impl From<i32> for HintValue {
    fn from(value: i32) -> Self {
        HintValue::Int(value)
    }
}

impl From<f32> for HintValue {
    fn from(value: f32) -> Self {
        HintValue::Float(value)
    }
}

impl From<&str> for HintValue {
    fn from(value: &str) -> Self {
        HintValue::Text(value.to_string())
    }
}

impl From<String> for HintValue {
    fn from(value: String) -> Self {
        HintValue::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hint {
    pub name: HintName,
    pub value: HintValue,
}

impl Hint {
    pub fn new(name: HintName, value: impl Into<HintValue>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }

    pub fn use_device(value: impl Into<HintValue>) -> Self {
        Self::new(HintName::UseDevice, value)
    }
}

/// Device selection derived from the first `UseDevice` hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionHint {
    DeviceIndex(u32),
    DeviceName(String),
}

impl SelectionHint {
    pub fn from_hints(hints: &[Hint]) -> Option<Self> {
        let hint = hints.iter().find(|hint| hint.name == HintName::UseDevice)?;

        match &hint.value {
            HintValue::Int(index) => u32::try_from(*index).ok().map(SelectionHint::DeviceIndex),
            HintValue::Float(index) if index.is_finite() && *index >= 0.0 => {
                Some(SelectionHint::DeviceIndex(*index as u32))
            }
            HintValue::Text(name) => Some(SelectionHint::DeviceName(name.clone())),
            other => {
                log::debug!("Ignoring UseDevice hint with value {:?}", other);
                None
            }
        }
    }
}
