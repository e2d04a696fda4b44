//! Name/code tables for speeds and preset modes.
//!
//! Decoding is lenient: a code or name outside the known set maps to the
//! "off" entry instead of failing, so these lookups are not round-trip safe
//! for unknown input.

use std::collections::HashMap;
use std::sync::LazyLock;

use strum::IntoEnumIterator;

use crate::protocol::{Mode, SpeedLevel, WireCode};

const OFF_NAME: &str = "off";
const OFF_CODE: &str = "00";

struct Table {
    code_by_name: HashMap<&'static str, String>,
    name_by_code: HashMap<String, &'static str>,
}

impl Table {
    fn from_pairs(pairs: impl Iterator<Item = (&'static str, WireCode)>) -> Self {
        let mut code_by_name = HashMap::new();
        let mut name_by_code = HashMap::new();
        for (name, code) in pairs {
            code_by_name.insert(name, code.to_string());
            name_by_code.insert(code.to_string(), name);
        }
        Self {
            code_by_name,
            name_by_code,
        }
    }

    fn code_for(&'static self, name: &str) -> &'static str {
        self.code_by_name.get(name).map_or(OFF_CODE, String::as_str)
    }

    fn name_for(&'static self, code: &str) -> &'static str {
        self.name_by_code
            .get(&code.to_ascii_lowercase())
            .copied()
            .unwrap_or(OFF_NAME)
    }
}

static SPEEDS: LazyLock<Table> = LazyLock::new(|| {
    Table::from_pairs(SpeedLevel::iter().map(|speed| (speed.name(), speed.code())))
});

static PRESETS: LazyLock<Table> =
    LazyLock::new(|| Table::from_pairs(Mode::iter().map(|mode| (mode.name(), mode.code()))));

/// Returns the wire code for a speed name, or `"00"` for unknown names.
///
/// ```
/// assert_eq!("02", broan::speed_code_for_name("medium"));
/// assert_eq!("00", broan::speed_code_for_name("turbo"));
/// ```
#[must_use]
pub fn speed_code_for_name(name: &str) -> &'static str {
    SPEEDS.code_for(name)
}

/// Returns the speed name for a wire code, or `"off"` for unknown codes.
#[must_use]
pub fn speed_name_for_code(code: &str) -> &'static str {
    SPEEDS.name_for(code)
}

/// Returns the mode code for a preset name, or `"00"` for unknown names.
#[must_use]
pub fn preset_code_for_name(name: &str) -> &'static str {
    PRESETS.code_for(name)
}

/// Returns the preset name for a mode code, or `"off"` for unknown codes.
#[must_use]
pub fn preset_name_for_code(code: &str) -> &'static str {
    PRESETS.name_for(code)
}

/// Maps a speed onto the displayed percentage by its position in
/// [`SpeedLevel::ORDERED`].
///
/// ```
/// use broan::{SpeedLevel, percentage_for_speed};
///
/// assert_eq!(0, percentage_for_speed(SpeedLevel::Off));
/// assert_eq!(33, percentage_for_speed(SpeedLevel::Low));
/// assert_eq!(100, percentage_for_speed(SpeedLevel::High));
/// ```
#[must_use]
pub fn percentage_for_speed(speed: SpeedLevel) -> u8 {
    let Some(index) = SpeedLevel::ORDERED.iter().position(|level| *level == speed) else {
        return 0;
    };
    ordinal_upper_bound(index)
}

/// Maps a percentage onto the first speed whose ordinal range contains it.
///
/// ```
/// use broan::{SpeedLevel, speed_for_percentage};
///
/// assert_eq!(SpeedLevel::Off, speed_for_percentage(0));
/// assert_eq!(SpeedLevel::Low, speed_for_percentage(20));
/// assert_eq!(SpeedLevel::Medium, speed_for_percentage(50));
/// assert_eq!(SpeedLevel::High, speed_for_percentage(67));
/// ```
#[must_use]
pub fn speed_for_percentage(percentage: u8) -> SpeedLevel {
    if percentage == 0 {
        return SpeedLevel::Off;
    }
    SpeedLevel::ORDERED
        .iter()
        .enumerate()
        .find(|(index, _level)| percentage <= ordinal_upper_bound(*index))
        .map_or(SpeedLevel::High, |(_index, level)| *level)
}

fn ordinal_upper_bound(index: usize) -> u8 {
    let len = SpeedLevel::ORDERED.len();
    u8::try_from((index + 1) * 100 / len).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("off")]
    #[case("low")]
    #[case("medium")]
    #[case("high")]
    fn speed_name_round_trips(#[case] name: &str) {
        assert_eq!(name, speed_name_for_code(speed_code_for_name(name)));
    }

    #[rstest]
    #[case("00")]
    #[case("01")]
    #[case("02")]
    #[case("03")]
    fn speed_code_round_trips(#[case] code: &str) {
        assert_eq!(code, speed_code_for_name(speed_name_for_code(code)));
    }

    #[rstest]
    #[case("low", "01")]
    #[case("medium", "02")]
    #[case("high", "03")]
    #[case("off", "00")]
    fn speed_codes_match_wire_table(#[case] name: &str, #[case] code: &str) {
        assert_eq!(code, speed_code_for_name(name));
    }

    #[test]
    fn preset_names_and_codes_round_trip() {
        for mode in Mode::iter() {
            let code = mode.code().to_string();
            assert_eq!(code, preset_code_for_name(preset_name_for_code(&code)));
            assert_eq!(mode.name(), preset_name_for_code(preset_code_for_name(mode.name())));
        }
    }

    #[test]
    fn unknown_speed_code_falls_back_to_off_and_is_lossy() {
        assert_eq!("off", speed_name_for_code("09"));
        assert_eq!("00", speed_code_for_name(speed_name_for_code("09")));
    }

    #[test]
    fn unknown_preset_falls_back_to_off() {
        assert_eq!("off", preset_name_for_code("7e"));
        assert_eq!("00", preset_code_for_name("turbo"));
    }

    #[rstest]
    #[case(SpeedLevel::Off, 0)]
    #[case(SpeedLevel::Low, 33)]
    #[case(SpeedLevel::Medium, 66)]
    #[case(SpeedLevel::High, 100)]
    fn percentage_follows_ordinal_position(#[case] speed: SpeedLevel, #[case] expected: u8) {
        assert_eq!(expected, percentage_for_speed(speed));
        assert_eq!(speed, speed_for_percentage(expected));
    }

    #[rstest]
    #[case(1, SpeedLevel::Low)]
    #[case(33, SpeedLevel::Low)]
    #[case(34, SpeedLevel::Medium)]
    #[case(66, SpeedLevel::Medium)]
    #[case(67, SpeedLevel::High)]
    #[case(100, SpeedLevel::High)]
    fn percentage_boundaries_select_speed(#[case] percentage: u8, #[case] expected: SpeedLevel) {
        assert_eq!(expected, speed_for_percentage(percentage));
    }
}
