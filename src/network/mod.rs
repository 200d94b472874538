//! Сетевой уровень ретранслятора.
//!
//! ## Подмодули
//!
//! - `endpoint`: адреса вида `tcp://host:port` и `ipc://path`.
//! - `frame`: кодек многочастных сообщений поверх байтового потока.
//! - `transport`: слушающие сокеты и соединения (TCP и Unix domain).
//! - `binder`: подбор пары портов данных/управления с повторными попытками.
//! - `queue`: ограниченная очередь кадров с вытеснением старых.

pub mod binder;
pub mod endpoint;
pub mod frame;
pub mod queue;
pub mod transport;

pub use binder::{bind_pair, BoundPair, PortBinder, SocketRole, TcpBinder};
pub use endpoint::{Endpoint, EndpointParseError};
pub use frame::{encode_message, read_message, write_message, MAX_FRAME_LEN, MAX_PARTS};
pub use queue::{FrameQueue, TryPopError};
pub use transport::{connect, BoxedReader, BoxedWriter, TransportListener, TransportStream};
