pub mod console;
pub mod packets;
pub mod socket;

pub use console::ConsoleBuffer;
pub use packets::PacketRecorder;
pub use socket::{ServerSocket, SocketCounters, SocketState, TcpConnection};
