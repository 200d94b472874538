use std::collections::HashMap;

use bytes::Bytes;
use tracing::error;

use crate::config::TOPIC_LIST;

/// Кэш последних значений.
///
/// Для каждой темы хранится ровно одно, самое свежее значение; записи не
/// устаревают. Отдельно ведётся список тем в порядке первой публикации,
/// доступный под зарезервированной темой [`TOPIC_LIST`].
#[derive(Debug, Clone)]
pub struct LastValueCache {
    entries: HashMap<String, Bytes>,
    topics: Vec<String>,
    topic_list: Bytes,
}

impl LastValueCache {
    pub fn new() -> Self {
        let topics = Vec::new();
        let topic_list = encode_topics(&topics).unwrap_or_default();
        Self {
            entries: HashMap::new(),
            topics,
            topic_list,
        }
    }

    /// Запоминает значение темы.
    ///
    /// Если тема встречается впервые, она дописывается в список тем и
    /// возвращается обновлённый сериализованный список для переотправки.
    pub fn update(
        &mut self,
        topic: &str,
        payload: Bytes,
    ) -> Option<Bytes> {
        let is_new = !self.entries.contains_key(topic);
        self.entries.insert(topic.to_string(), payload);
        if !is_new {
            return None;
        }

        self.topics.push(topic.to_string());
        match encode_topics(&self.topics) {
            Some(list) => {
                self.topic_list = list.clone();
                Some(list)
            }
            None => None,
        }
    }

    /// Последнее значение темы; для [`TOPIC_LIST`] это список тем.
    pub fn get(
        &self,
        topic: &str,
    ) -> Option<&Bytes> {
        if topic == TOPIC_LIST {
            Some(&self.topic_list)
        } else {
            self.entries.get(topic)
        }
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LastValueCache {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_topics(topics: &[String]) -> Option<Bytes> {
    match bincode::serialize(topics) {
        Ok(buf) => Some(Bytes::from(buf)),
        Err(e) => {
            error!(error = %e, "Failed to serialize topic list");
            None
        }
    }
}
