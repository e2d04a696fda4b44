use owo_colors::{OwoColorize, Style as OwoStyle};

use crate::hw::PowerState;

/// Applies colour and style to terminal text.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Painter {
    use_colour: bool,
}

impl Painter {
    pub(crate) fn new(use_colour: bool) -> Self {
        Self { use_colour }
    }

    pub(crate) fn heading<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().cyan())
    }

    pub(crate) fn success<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().green())
    }

    pub(crate) fn failure<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold().red())
    }

    pub(crate) fn muted<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().dimmed())
    }

    pub(crate) fn value<T: AsRef<str>>(&self, text: T) -> String {
        self.paint(text.as_ref(), OwoStyle::new().bold())
    }

    /// Green for on, dimmed for off.
    pub(crate) fn power(&self, power: PowerState) -> String {
        match power {
            PowerState::On => self.success(power.to_string()),
            PowerState::Off => self.muted(power.to_string()),
        }
    }

    /// Green for a normal status, red when any fault is reported.
    pub(crate) fn status(&self, status: &str, normal: bool) -> String {
        if normal {
            self.success(status)
        } else {
            self.failure(status)
        }
    }

    fn paint(&self, text: &str, style: OwoStyle) -> String {
        if self.use_colour {
            format!("{}", text.style(style))
        } else {
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::on(PowerState::On, "on")]
    #[case::off(PowerState::Off, "off")]
    fn plain_power_is_unstyled(#[case] power: PowerState, #[case] expected: &str) {
        assert_eq!(expected, Painter::new(false).power(power));
    }

    #[rstest]
    #[case::normal(true)]
    #[case::fault(false)]
    fn coloured_status_wraps_text(#[case] normal: bool) {
        let styled = Painter::new(true).status("M1 motor fault", normal);
        assert_ne!("M1 motor fault", styled);
        assert!(styled.contains("M1 motor fault"));
    }
}
