use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use bytes::Bytes;
use psmon_relay::{
    config::{
        reset_reply, reset_request, HANDLER_FULL_REPLY, HANDLER_PROCESSED_REPLY, INVALID_REQUEST_REPLY,
        RESET_HEADER, UNKNOWN_HANDLER_REPLY,
    },
    network::{read_message, write_message, Endpoint, TransportListener},
    Broker, ClientInfo, ControlError, ControlRequester, MailboxMessage, MessageKind, Publisher, Settings,
    Subscriber,
};

const WAIT: Duration = Duration::from_secs(5);

async fn broker_with_requester() -> anyhow::Result<(Broker, Arc<ControlRequester>)> {
    let broker = Broker::new();
    let endpoints = broker.initialize(0, 5, true).await?;
    let requester = ControlRequester::connect_as(&endpoints.control, "tester").await?;
    Ok((broker, Arc::new(requester)))
}

async fn wait_reset_done(requester: &ControlRequester) -> anyhow::Result<()> {
    tokio::time::timeout(WAIT, async {
        while requester.is_reset_pending() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    Ok(())
}

/// Тест проверяет переполнение почтового ящика ёмкостью 2: третий запрос
/// получает ответ о потере, размер ящика остаётся 2.
#[tokio::test]
async fn test_mailbox_overflow() -> anyhow::Result<()> {
    let (broker, requester) = broker_with_requester().await?;
    let mailbox = broker.control().register_handler("cmd", 2, MessageKind::Text)?;

    assert_eq!(requester.request_text("cmd", "one").await?, HANDLER_PROCESSED_REPLY);
    assert_eq!(requester.request_text("cmd", "two").await?, HANDLER_PROCESSED_REPLY);
    assert_eq!(requester.request_text("cmd", "three").await?, HANDLER_FULL_REPLY);
    assert_eq!(mailbox.size(), 2);

    assert_eq!(mailbox.get(), Some(MailboxMessage::Text("one".into())));
    assert_eq!(mailbox.get(), Some(MailboxMessage::Text("two".into())));
    assert!(mailbox.is_empty());
    Ok(())
}

/// Тест проверяет, что корректный запрос сброса выставляет флаг, а флаг
/// остаётся выставленным до явной очистки.
#[tokio::test]
async fn test_reset_flag_set_and_clear() -> anyhow::Result<()> {
    let (broker, requester) = broker_with_requester().await?;
    assert!(!broker.control().reset_flag());

    let reply = requester.request_text(RESET_HEADER, &reset_request("tester")).await?;
    assert_eq!(reply, reset_reply("tester"));
    assert!(broker.control().reset_flag());

    requester.request_text(RESET_HEADER, &reset_request("tester")).await?;
    assert!(broker.control().reset_flag());

    broker.control().clear_reset_flag();
    assert!(!broker.control().reset_flag());
    Ok(())
}

/// Тест проверяет ответ на некорректное тело запроса сброса.
#[tokio::test]
async fn test_invalid_reset_request() -> anyhow::Result<()> {
    let (broker, requester) = broker_with_requester().await?;
    let reply = requester.request_text(RESET_HEADER, "reset please").await?;
    assert_eq!(reply, INVALID_REQUEST_REPLY);
    assert!(!broker.control().reset_flag());
    Ok(())
}

/// Тест проверяет, что запрос с неизвестным заголовком получает ответ и не
/// блокирует последующие запросы.
#[tokio::test]
async fn test_unknown_header_is_answered() -> anyhow::Result<()> {
    let (broker, requester) = broker_with_requester().await?;
    let reply = tokio::time::timeout(WAIT, requester.request_text("nobody", "hello")).await??;
    assert_eq!(reply, UNKNOWN_HANDLER_REPLY);

    broker.control().register_handler("nobody", 0, MessageKind::Text)?;
    assert_eq!(requester.request_text("nobody", "hello").await?, HANDLER_PROCESSED_REPLY);
    Ok(())
}

/// Тест проверяет доставку сериализованных объектов в объектный ящик.
#[tokio::test]
async fn test_object_mailbox() -> anyhow::Result<()> {
    let (broker, requester) = broker_with_requester().await?;
    let mailbox = broker.control().register_handler("roi", 0, MessageKind::Object)?;

    let reply = requester.send_object("roi", &(10u32, 20u32, "detector".to_string())).await?;
    assert_eq!(reply, HANDLER_PROCESSED_REPLY);

    let roi: (u32, u32, String) = mailbox.get_object().expect("queued message")?;
    assert_eq!(roi, (10, 20, "detector".to_string()));
    Ok(())
}

/// Тест проверяет, что конкурентные запросы одного клиента выстраиваются
/// в очередь и каждый получает свой ответ.
#[tokio::test]
async fn test_concurrent_requests_are_serialized() -> anyhow::Result<()> {
    let (broker, requester) = broker_with_requester().await?;
    let mailbox = broker.control().register_handler("cmd", 0, MessageKind::Text)?;

    let tasks: Vec<_> = (0..10)
        .map(|i| {
            let requester = requester.clone();
            tokio::spawn(async move { requester.request_text("cmd", &format!("m{i}")).await })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await??, HANDLER_PROCESSED_REPLY);
    }
    assert_eq!(mailbox.size(), 10);
    Ok(())
}

/// Тест проверяет, что повторная регистрация имени возвращает ошибку.
#[tokio::test]
async fn test_duplicate_handler() -> anyhow::Result<()> {
    let publisher = Publisher::new(Settings::default());
    publisher.register_handler("cmd", 1, MessageKind::Text)?;
    let err = publisher.register_handler("cmd", 1, MessageKind::Text).unwrap_err();
    assert!(matches!(err, ControlError::DuplicateHandler(ref name) if name == "cmd"));
    Ok(())
}

/// Сервер, который считает запросы сброса и отвечает с задержкой.
async fn spawn_slow_reset_server(delay: Duration) -> anyhow::Result<(Endpoint, Arc<AtomicUsize>)> {
    let listener = TransportListener::bind(&Endpoint::tcp("127.0.0.1", 0)).await?;
    let endpoint = listener.local_endpoint()?;
    let count = Arc::new(AtomicUsize::new(0));
    let seen = count.clone();

    tokio::spawn(async move {
        let Ok(mut stream) = listener.accept().await else {
            return;
        };
        while let Ok(Some(parts)) = read_message(&mut stream.reader).await {
            seen.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            let body = String::from_utf8_lossy(&parts[1]).into_owned();
            let client = body.trim_start_matches("reset signal - ");
            let reply = [parts[0].clone(), Bytes::from(reset_reply(client))];
            if write_message(&mut stream.writer, &reply).await.is_err() {
                break;
            }
        }
    });
    Ok((endpoint, count))
}

/// Тест проверяет объединение сигналов сброса: пять конкурентных вызовов
/// при запросе в полёте дают ровно один запрос на сервере.
#[tokio::test]
async fn test_reset_signals_are_coalesced() -> anyhow::Result<()> {
    let (endpoint, count) = spawn_slow_reset_server(Duration::from_millis(300)).await?;
    let requester = Arc::new(ControlRequester::connect_as(&endpoint, "tester").await?);

    let calls: Vec<_> = (0..5)
        .map(|_| {
            let requester = requester.clone();
            tokio::spawn(async move { requester.send_reset_signal() })
        })
        .collect();
    let mut accepted = 0;
    for call in calls {
        if call.await? {
            accepted += 1;
        }
    }
    assert_eq!(accepted, 1);
    assert!(requester.is_reset_pending());

    wait_reset_done(&requester).await?;
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // окно подавления закончилось вместе с ответом
    assert!(requester.send_reset_signal());
    wait_reset_done(&requester).await?;
    assert_eq!(count.load(Ordering::SeqCst), 2);
    Ok(())
}

/// Сервер-эхо, который задерживает только первый ответ.
async fn spawn_echo_server(first_delay: Duration) -> anyhow::Result<Endpoint> {
    let listener = TransportListener::bind(&Endpoint::tcp("127.0.0.1", 0)).await?;
    let endpoint = listener.local_endpoint()?;

    tokio::spawn(async move {
        let Ok(mut stream) = listener.accept().await else {
            return;
        };
        let mut first = true;
        while let Ok(Some(parts)) = read_message(&mut stream.reader).await {
            if first {
                tokio::time::sleep(first_delay).await;
                first = false;
            }
            let body = format!("reply-to:{}", String::from_utf8_lossy(&parts[1]));
            let reply = [parts[0].clone(), Bytes::from(body)];
            if write_message(&mut stream.writer, &reply).await.is_err() {
                break;
            }
        }
    });
    Ok(endpoint)
}

/// Тест проверяет, что брошенный по таймауту запрос не сдвигает пары
/// запрос/ответ: следующий запрос получает ответ на себя.
#[tokio::test]
async fn test_abandoned_request_keeps_reply_pairing() -> anyhow::Result<()> {
    let endpoint = spawn_echo_server(Duration::from_millis(200)).await?;
    let requester = ControlRequester::connect_as(&endpoint, "tester").await?;

    let first = tokio::time::timeout(Duration::from_millis(50), requester.request_text("cmd", "first")).await;
    assert!(first.is_err());

    let second = tokio::time::timeout(WAIT, requester.request_text("cmd", "second")).await??;
    assert_eq!(second, "reply-to:second");

    let third = tokio::time::timeout(WAIT, requester.request_text("cmd", "third")).await??;
    assert_eq!(third, "reply-to:third");
    Ok(())
}

/// Тест проверяет путь потребитель → издатель: сигнал сброса через
/// управляющий канал подписчика выставляет флаг у службы публикации.
#[tokio::test]
async fn test_subscriber_reset_reaches_publisher() -> anyhow::Result<()> {
    let publisher = Publisher::new(Settings {
        local: true,
        ..Settings::default()
    });
    publisher.init(None, None, None).await?;
    let info: ClientInfo = publisher.client_info("t").expect("initialized publisher");

    let subscriber = Subscriber::<u32>::connected(info).await?;
    let requester = subscriber.requester().expect("connected subscriber").clone();
    assert!(requester.send_reset_signal());
    wait_reset_done(&requester).await?;

    assert!(publisher.reset_flag());
    publisher.clear_reset_flag();
    assert!(!publisher.reset_flag());
    Ok(())
}
