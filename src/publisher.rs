//! Служба публикации.
//!
//! [`Publisher`] объединяет брокер и управляющий канал за одним явно
//! создаваемым объектом, который вызывающий код держит сам. Первая
//! публикация инициализирует брокер с настройками из [`Settings`], если
//! [`Publisher::init`] не был вызван раньше.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error};

use crate::{
    config::{ClientInfo, Settings},
    control::{Mailbox, MessageKind},
    error::{ControlError, PublishError},
    pubsub::{broker::check_topic, Broker, Endpoints},
};

#[derive(Debug)]
pub struct Publisher {
    settings: RwLock<Settings>,
    broker: Broker,
    auto_init: AtomicBool,
}

impl Publisher {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
            broker: Broker::new(),
            auto_init: AtomicBool::new(true),
        }
    }

    /// Инициализирует брокер, переопределяя порт, глубину буфера и режим.
    ///
    /// После вызова автоматическая инициализация в [`Publisher::send`]
    /// отключается, даже если привязка не удалась.
    pub async fn init(
        &self,
        port: Option<u16>,
        buffer: Option<usize>,
        local: Option<bool>,
    ) -> Result<Endpoints, PublishError> {
        let (port, buffer, local) = {
            let mut settings = self.settings.write();
            if let Some(port) = port {
                settings.port = port;
            }
            if let Some(buffer) = buffer {
                settings.buffer = buffer;
            }
            if let Some(local) = local {
                settings.local = local;
            }
            (settings.port, settings.buffer, settings.local)
        };

        self.auto_init.store(false, Ordering::Release);
        let endpoints = self.broker.initialize(port, buffer, local).await?;
        if let Some(actual) = endpoints.port {
            self.settings.write().port = actual;
        }
        Ok(endpoints)
    }

    /// Публикует значение всем подписчикам темы.
    ///
    /// Ошибка инициализации при первой публикации только логируется: без
    /// брокера публикация молча пропускается.
    pub async fn send<T: Serialize + ?Sized>(
        &self,
        topic: &str,
        payload: &T,
    ) -> Result<(), PublishError> {
        check_topic(topic)?;
        if !self.broker.is_initialized() && self.auto_init.swap(false, Ordering::AcqRel) {
            debug!("Auto-initializing publisher on first send");
            if let Err(e) = self.init(None, None, None).await {
                error!(error = %e, "Failed to initialize publisher");
            }
        }
        self.broker.send(topic, payload).await
    }

    pub fn register_handler(
        &self,
        name: &str,
        capacity: usize,
        kind: MessageKind,
    ) -> Result<Arc<Mailbox>, ControlError> {
        self.broker.control().register_handler(name, capacity, kind)
    }

    pub fn get_handler(
        &self,
        name: &str,
    ) -> Option<Arc<Mailbox>> {
        self.broker.control().get_handler(name)
    }

    /// Был ли получен сигнал сброса от какого-либо клиента.
    pub fn reset_flag(&self) -> bool {
        self.broker.control().reset_flag()
    }

    pub fn clear_reset_flag(&self) {
        self.broker.control().clear_reset_flag()
    }

    /// Конфигурация потребителя, указывающая на фактические адреса брокера.
    pub fn client_info(
        &self,
        topic: &str,
    ) -> Option<ClientInfo> {
        let endpoints = self.broker.endpoints()?;
        let settings = self.settings.read();
        let mut info = ClientInfo::new(endpoints.data, endpoints.control, topic)
            .with_buffer(settings.buffer)
            .with_rate(settings.rate)
            .with_recv_limit(settings.recv_limit)
            .with_daemon(settings.daemon);
        info.renderer = settings.renderer.clone();
        Some(info)
    }

    pub fn is_initialized(&self) -> bool {
        self.broker.is_initialized()
    }

    pub fn port(&self) -> Option<u16> {
        self.broker.port()
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn close(&self) {
        self.broker.close();
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
