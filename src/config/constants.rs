use std::time::Duration;

/// Префикс тем, зарезервированных под внутренние нужды ретранслятора.
pub const RESERVED_TOPIC: &str = "psmon-internal";
/// Системная тема со списком всех когда-либо опубликованных тем.
pub const TOPIC_LIST: &str = "psmon-internal-topics";

/// Однобайтовый разделитель темы и подтемы во фрейме темы.
pub const TOPIC_DELIM: u8 = 0x00;
/// Маркер фрейма подписки.
pub const SUBSCRIBE_MARKER: u8 = 0x01;
/// Маркер фрейма отписки.
pub const UNSUBSCRIBE_MARKER: u8 = 0x00;

/// Заголовок запроса на сброс.
pub const RESET_HEADER: &str = "reset";
/// Префикс тела запроса на сброс, за ним следует идентификатор клиента.
pub const RESET_REQUEST_PREFIX: &str = "reset signal - ";
/// Префикс ответа на корректный запрос сброса.
pub const RESET_REPLY_PREFIX: &str = "reset signal received from ";
/// Ответ на некорректный запрос.
pub const INVALID_REQUEST_REPLY: &str = "invalid request from client";
/// Сообщение принято почтовым ящиком.
pub const HANDLER_PROCESSED_REPLY: &str = "Message for handler processed";
/// Почтовый ящик переполнен, сообщение потеряно.
pub const HANDLER_FULL_REPLY: &str = "Message handler full - request dropped";
/// Для заголовка не зарегистрирован обработчик.
pub const UNKNOWN_HANDLER_REPLY: &str = "No handler registered for request - dropped";

pub const DEFAULT_SERVER: &str = "localhost";
pub const DEFAULT_PORT: u16 = 12323;
/// Смещение порта управляющего сокета относительно порта данных.
pub const COMM_OFFSET: u16 = 1;
/// Сколько базовых портов перебирается при привязке.
pub const BIND_ATTEMPTS: u16 = 32;
pub const DEFAULT_BUFFER: usize = 5;
pub const DEFAULT_RATE: f64 = 5.0;
pub const DEFAULT_RECV_LIMIT: usize = 25;
pub const DEFAULT_RENDERER: &str = "pyqt";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Формирует тело запроса на сброс для клиента `client_id`.
pub fn reset_request(client_id: &str) -> String {
    format!("{RESET_REQUEST_PREFIX}{client_id}")
}

/// Формирует ответ на запрос сброса от клиента `client_id`.
pub fn reset_reply(client_id: &str) -> String {
    format!("{RESET_REPLY_PREFIX}{client_id}")
}

/// Проверяет, что тема не попадает в зарезервированное пространство имён.
pub fn is_reserved_topic(topic: &str) -> bool {
    topic.starts_with(RESERVED_TOPIC)
}

/// Тема непуста и не содержит разделителя [`TOPIC_DELIM`].
///
/// Разделитель внутри темы сломал бы точное совпадение фильтров:
/// фрейм `a\0x\0` совпадает с фильтром `a\0` как префикс.
pub fn is_valid_topic(topic: &str) -> bool {
    !topic.is_empty() && !topic.as_bytes().contains(&TOPIC_DELIM)
}
