mod app;
mod cli;
mod error;
mod handlers;
mod hw;
mod protocol;
mod telemetry;
mod terminal;
mod utils;

pub use app::{SessionHandler, run, run_with_clients_and_log_level, run_with_log_level};
pub use cli::{
    Args, Command, ConnectionArgs, ControlAction, ControlArgs, DecodeArgs, FakeArgs, LogLevel,
    OnArgs, OutputFormat, PercentageArgs, PresetArgs, RawArgs, WatchArgs,
};
pub use error::{ConfigError, DeviceError, ExchangeStage, FixtureError, TransportError};
pub use handlers::{
    ChecksumPadding, CommandFields, CommandFrame, FanError, FanHandler, FanSnapshot, FaultFlags,
    FrameCodec, FrameCodecError, Percentage, PercentageError, ResponseFields,
    percentage_for_speed, preset_code_for_name, preset_name_for_code, speed_code_for_name,
    speed_for_percentage, speed_name_for_code,
};
pub use hw::{
    DeviceAddress, DeviceConfig, DeviceSession, DeviceState, FakeTransport, FakeTransportConfig,
    FrameLog, HexPayload, PowerState, SimulatedUnit, TcpTransport, TcpTransportConfig, Transport,
};
pub use protocol::{
    COMMAND_FRAME_LEN, DEFAULT_ADDRESS, END_FLAG, HOST_ID, Mode, OPTION_NEW, OPTION_QUERY,
    RESPONSE_FRAME_LEN, START_FLAG, SpeedLevel, WireCode,
};
pub use terminal::TerminalClient;
