//! Parameter definitions for DSP modules.
//!
//! Parameters are the controllable values on modules (knobs, switches, buttons).

/// How a parameter value should be displayed and interpreted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParameterDisplay {
    /// Linear scaling with a unit suffix (e.g., "%", "V").
    Linear { unit: &'static str },
    /// Displayed as `base^value - 1` in the given unit.
    Exponential { base: f32, unit: &'static str },
    /// Discrete steps with named values.
    Discrete { labels: &'static [&'static str] },
    /// On/off toggle switch.
    Toggle {
        off_label: &'static str,
        on_label: &'static str,
    },
    /// Momentary push button, high only while held.
    Momentary,
}

impl ParameterDisplay {
    /// Creates a linear display with the given unit.
    pub fn linear(unit: &'static str) -> Self {
        Self::Linear { unit }
    }

    /// Creates an exponential display with the given base and unit.
    pub fn exponential(base: f32, unit: &'static str) -> Self {
        Self::Exponential { base, unit }
    }

    /// Creates a discrete display with named steps.
    pub fn discrete(labels: &'static [&'static str]) -> Self {
        Self::Discrete { labels }
    }

    /// Creates an on/off toggle.
    pub fn on_off() -> Self {
        Self::Toggle {
            off_label: "Off",
            on_label: "On",
        }
    }

    /// Returns the unit string, if applicable.
    pub fn unit(&self) -> Option<&'static str> {
        match self {
            Self::Linear { unit } | Self::Exponential { unit, .. } => Some(unit),
            _ => None,
        }
    }

    /// Formats a raw parameter value the way a panel would show it.
    pub fn format(&self, value: f32) -> String {
        match self {
            Self::Linear { unit } => format!("{:.2}{}", value, unit),
            Self::Exponential { base, unit } => {
                format!("{:.3}{}", base.powf(value) - 1.0, unit)
            }
            Self::Discrete { labels } => labels
                .get(value.round().max(0.0) as usize)
                .copied()
                .unwrap_or("?")
                .to_string(),
            Self::Toggle {
                off_label,
                on_label,
            } => {
                if value > 0.5 {
                    on_label.to_string()
                } else {
                    off_label.to_string()
                }
            }
            Self::Momentary => String::new(),
        }
    }
}

/// Definition of a parameter on a DSP module.
///
/// Each parameter has a unique ID, display name, valid range, and default value.
#[derive(Clone, Debug)]
pub struct ParameterDefinition {
    /// Unique identifier for this parameter within the module.
    pub id: &'static str,
    /// Human-readable name displayed in the UI.
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    /// Default value when the module is created.
    pub default: f32,
    pub display: ParameterDisplay,
}

impl ParameterDefinition {
    /// Creates a new parameter definition.
    pub fn new(
        id: &'static str,
        name: &'static str,
        min: f32,
        max: f32,
        default: f32,
        display: ParameterDisplay,
    ) -> Self {
        Self {
            id,
            name,
            min,
            max,
            default,
            display,
        }
    }

    /// Creates a normalized parameter (0.0 to 1.0) with linear display.
    pub fn normalized(id: &'static str, name: &'static str, default: f32) -> Self {
        Self::new(id, name, 0.0, 1.0, default, ParameterDisplay::linear(""))
    }

    /// Creates a toggle (boolean) parameter.
    pub fn toggle(id: &'static str, name: &'static str, default: bool) -> Self {
        Self::new(
            id,
            name,
            0.0,
            1.0,
            if default { 1.0 } else { 0.0 },
            ParameterDisplay::on_off(),
        )
    }

    /// Creates a momentary button parameter.
    pub fn button(id: &'static str, name: &'static str) -> Self {
        Self::new(id, name, 0.0, 1.0, 0.0, ParameterDisplay::Momentary)
    }

    /// Creates a discrete choice parameter.
    pub fn choice(
        id: &'static str,
        name: &'static str,
        labels: &'static [&'static str],
        default_index: usize,
    ) -> Self {
        Self::new(
            id,
            name,
            0.0,
            (labels.len().saturating_sub(1)) as f32,
            default_index as f32,
            ParameterDisplay::discrete(labels),
        )
    }

    /// Clamps a value to this parameter's valid range.
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}
