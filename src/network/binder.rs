//! Подбор пары портов для брокера.
//!
//! Для каждого смещения `k` привязываются оба сокета: данные на
//! `base + k` и управление на `base + k + comm_offset`. Смещение либо
//! занимается целиком, либо не занимается вовсе: если управляющий порт
//! занят, уже привязанный сокет данных освобождается до следующей попытки.

use std::io;

use async_trait::async_trait;
use tracing::{info, warn};

use super::{endpoint::ANY_HOST, Endpoint, TransportListener};

/// Назначение привязываемого сокета.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketRole {
    Data,
    Control,
}

/// Источник привязанных сокетов. Порт освобождается при `Drop` сокета.
#[async_trait]
pub trait PortBinder: Send {
    type Socket: Send;

    async fn bind(
        &mut self,
        role: SocketRole,
        port: u16,
    ) -> io::Result<Self::Socket>;
}

/// Привязка TCP-сокетов на всех интерфейсах.
#[derive(Debug, Clone)]
pub struct TcpBinder {
    host: String,
}

impl TcpBinder {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

impl Default for TcpBinder {
    fn default() -> Self {
        Self::new(ANY_HOST)
    }
}

#[async_trait]
impl PortBinder for TcpBinder {
    type Socket = TransportListener;

    async fn bind(
        &mut self,
        _role: SocketRole,
        port: u16,
    ) -> io::Result<Self::Socket> {
        TransportListener::bind(&Endpoint::tcp(self.host.clone(), port)).await
    }
}

/// Успешно занятая пара портов.
#[derive(Debug)]
pub struct BoundPair<S> {
    /// Фактический базовый порт (порт данных).
    pub port: u16,
    pub data: S,
    pub control: S,
}

/// Перебирает базовые порты `base_port + k`, `k = 0..attempts`.
///
/// Возвращает `None`, если ни одна пара не привязалась.
pub async fn bind_pair<B: PortBinder>(
    binder: &mut B,
    base_port: u16,
    attempts: u16,
    comm_offset: u16,
) -> Option<BoundPair<B::Socket>> {
    for k in 0..attempts {
        let Some(port) = base_port.checked_add(k) else {
            break;
        };
        let Some(control_port) = port.checked_add(comm_offset) else {
            break;
        };

        let data = match binder.bind(SocketRole::Data, port).await {
            Ok(socket) => socket,
            Err(e) => {
                warn!(port, error = %e, "Unable to bind publisher to data port");
                continue;
            }
        };

        match binder.bind(SocketRole::Control, control_port).await {
            Ok(control) => {
                if k == 0 {
                    info!(
                        data_port = port,
                        comm_port = control_port,
                        "Initialized publisher"
                    );
                } else {
                    warn!(
                        data_port = port,
                        comm_port = control_port,
                        "Initialized publisher (alternate ports)"
                    );
                }
                return Some(BoundPair {
                    port,
                    data,
                    control,
                });
            }
            Err(e) => {
                drop(data);
                warn!(
                    port = control_port,
                    error = %e,
                    "Unable to bind publisher to communication port"
                );
            }
        }
    }

    warn!(
        attempts,
        base_port, "Unable to initialize publisher after all attempts - disabling!"
    );
    None
}
