use bytes::{BufMut, Bytes, BytesMut};

use crate::config::{SUBSCRIBE_MARKER, TOPIC_DELIM, UNSUBSCRIBE_MARKER};

/// Опубликованное значение: тема и сериализованная полезная нагрузка.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: String,
    pub payload: Bytes,
}

impl Message {
    pub fn new(
        topic: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Части сообщения на проводе: `topic + DELIM`, затем нагрузка.
    pub fn to_parts(&self) -> [Bytes; 2] {
        [topic_frame(&self.topic), self.payload.clone()]
    }
}

/// Фрейм темы: имя темы и завершающий разделитель.
///
/// Он же служит фильтром точной подписки: префикс `topic + DELIM`
/// совпадает только с этой темой.
pub fn topic_frame(topic: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(topic.len() + 1);
    buf.extend_from_slice(topic.as_bytes());
    buf.put_u8(TOPIC_DELIM);
    buf.freeze()
}

/// Подпадает ли фрейм темы под фильтр подписки.
pub fn filter_matches(
    filter: &[u8],
    topic_frame: &[u8],
) -> bool {
    topic_frame.starts_with(filter)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionKind {
    Subscribe,
    Unsubscribe,
}

/// Уведомление о подписке: байт-маркер и фильтр.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionFrame {
    pub kind: SubscriptionKind,
    pub filter: Bytes,
}

impl SubscriptionFrame {
    pub fn subscribe(filter: Bytes) -> Self {
        Self {
            kind: SubscriptionKind::Subscribe,
            filter,
        }
    }

    pub fn unsubscribe(filter: Bytes) -> Self {
        Self {
            kind: SubscriptionKind::Unsubscribe,
            filter,
        }
    }

    /// Разбирает фрейм; `None` для пустого фрейма или неизвестного маркера.
    pub fn parse(frame: &Bytes) -> Option<Self> {
        let kind = match frame.first()? {
            &SUBSCRIBE_MARKER => SubscriptionKind::Subscribe,
            &UNSUBSCRIBE_MARKER => SubscriptionKind::Unsubscribe,
            _ => return None,
        };
        Some(Self {
            kind,
            filter: frame.slice(1..),
        })
    }

    pub fn encode(&self) -> Bytes {
        let marker = match self.kind {
            SubscriptionKind::Subscribe => SUBSCRIBE_MARKER,
            SubscriptionKind::Unsubscribe => UNSUBSCRIBE_MARKER,
        };
        let mut buf = BytesMut::with_capacity(self.filter.len() + 1);
        buf.put_u8(marker);
        buf.extend_from_slice(&self.filter);
        buf.freeze()
    }

    /// Имя темы, если фильтр завершается разделителем и является UTF-8.
    pub fn topic(&self) -> Option<&str> {
        let (&last, name) = self.filter.split_last()?;
        if last != TOPIC_DELIM {
            return None;
        }
        std::str::from_utf8(name).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_frame_has_delimiter() {
        assert_eq!(&topic_frame("det")[..], b"det\0");
    }

    #[test]
    fn test_exact_filter_does_not_match_longer_topic() {
        let filter = topic_frame("det");
        assert!(filter_matches(&filter, &topic_frame("det")));
        assert!(!filter_matches(&filter, &topic_frame("detector")));
        assert!(filter_matches(b"", &topic_frame("anything")));
    }

    #[test]
    fn test_parse_subscribe_frame() {
        let frame = SubscriptionFrame::subscribe(topic_frame("det")).encode();
        assert_eq!(&frame[..], b"\x01det\0");
        let parsed = SubscriptionFrame::parse(&frame).unwrap();
        assert_eq!(parsed.kind, SubscriptionKind::Subscribe);
        assert_eq!(parsed.topic(), Some("det"));
    }

    #[test]
    fn test_parse_unsubscribe_frame() {
        let parsed = SubscriptionFrame::parse(&Bytes::from_static(b"\x00det\0")).unwrap();
        assert_eq!(parsed.kind, SubscriptionKind::Unsubscribe);
        assert_eq!(parsed.topic(), Some("det"));
    }

    #[test]
    fn test_missing_terminator_has_no_topic() {
        let parsed = SubscriptionFrame::parse(&Bytes::from_static(b"\x01det")).unwrap();
        assert_eq!(parsed.topic(), None);
        let empty = SubscriptionFrame::parse(&Bytes::from_static(b"\x01")).unwrap();
        assert_eq!(empty.topic(), None);
    }

    #[test]
    fn test_unknown_marker_and_empty_frame() {
        assert!(SubscriptionFrame::parse(&Bytes::from_static(b"\x07det\0")).is_none());
        assert!(SubscriptionFrame::parse(&Bytes::new()).is_none());
    }

    #[test]
    fn test_message_parts() {
        let msg = Message::new("t", Bytes::from_static(b"v"));
        let [topic, payload] = msg.to_parts();
        assert_eq!(&topic[..], b"t\0");
        assert_eq!(&payload[..], b"v");
    }
}
