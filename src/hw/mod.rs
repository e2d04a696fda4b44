mod config;
mod fake_backend;
mod hardware;
mod model;
mod session;

pub use self::config::DeviceConfig;
pub use self::fake_backend::{
    FakeTransport, FakeTransportConfig, FrameLog, HexPayload, SimulatedUnit,
};
pub use self::hardware::{TcpTransport, TcpTransportConfig, Transport};
pub use self::model::{DeviceAddress, DeviceState, PowerState};
pub use self::session::DeviceSession;
