mod fan;
mod frame_codec;
mod lookup;
mod percentage;

pub use self::fan::{FanError, FanHandler, FanSnapshot};
pub use self::frame_codec::{
    ChecksumPadding, CommandFields, CommandFrame, FaultFlags, FrameCodec, FrameCodecError,
    ResponseFields,
};
pub use self::lookup::{
    percentage_for_speed, preset_code_for_name, preset_name_for_code, speed_code_for_name,
    speed_for_percentage, speed_name_for_code,
};
pub use self::percentage::{Percentage, PercentageError};
