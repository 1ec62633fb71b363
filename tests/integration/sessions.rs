use crate::*;

/// First connection into an empty server is admin, the rest are read-only.
#[tokio::test]
async fn test_roles_assigned_by_connection_order() -> Result<()> {
    let server = start_server(|_| {}).await?;

    let (_a, greeting_a) = server.join().await?;
    assert_eq!(greeting_a, "Connected. Your role: admin");

    for _ in 0..3 {
        let (_c, greeting) = server.join().await?;
        assert_eq!(greeting, "Connected. Your role: read-only");
    }
    Ok(())
}

/// Connections past the cap are told so and closed; admitted ones carry on.
#[tokio::test]
async fn test_server_full_rejects_and_closes() -> Result<()> {
    let server = start_server(|c| c.limits.max_sessions = 2).await?;

    let (mut a, _) = server.join().await?;
    let (mut b, _) = server.join().await?;

    let mut c = Client::connect(server.addr()).await?;
    assert_eq!(c.recv().await?, protocol::SERVER_FULL);
    assert!(c.closed_within(RECV_TIMEOUT).await, "rejected peer left open");

    assert_eq!(a.ask("/name").await?, "Server Name: Integration Hub");
    assert_eq!(b.ask("/name").await?, "Server Name: Integration Hub");
    server.wait_for_sessions(2).await?;
    Ok(())
}

/// Peers that talk before reading the rejection still see an orderly close.
#[tokio::test]
async fn test_rejected_chatty_peers_closed_cleanly() -> Result<()> {
    let server = start_server(|c| c.limits.max_sessions = 1).await?;
    let (mut a, _) = server.join().await?;

    for i in 0..10 {
        let mut extra = Client::connect(server.addr()).await?;
        extra.send("/help").await?;
        assert_eq!(extra.recv().await?, protocol::SERVER_FULL, "peer {i}");
        assert!(extra.clean_eof_within(RECV_TIMEOUT).await, "peer {i} was reset");
    }

    assert_eq!(a.ask("/name").await?, "Server Name: Integration Hub");
    server.wait_for_sessions(1).await?;
    Ok(())
}

/// A slot freed by a disconnect can be reused.
#[tokio::test]
async fn test_slot_reused_after_exit() -> Result<()> {
    let server = start_server(|c| c.limits.max_sessions = 1).await?;

    let (mut a, _) = server.join().await?;
    assert_eq!(a.ask("/exit").await?, protocol::GOODBYE);
    assert!(a.closed_within(RECV_TIMEOUT).await);
    server.wait_for_sessions(0).await?;

    let (_b, greeting) = server.join().await?;
    assert_eq!(greeting, "Connected. Your role: admin");
    Ok(())
}

/// Admin is not handed over while other sessions remain connected.
#[tokio::test]
async fn test_admin_not_reassigned_until_empty() -> Result<()> {
    let server = start_server(|_| {}).await?;

    let (a, _) = server.join().await?;
    let (b, _) = server.join().await?;
    drop(a);
    server.wait_for_sessions(1).await?;

    let (c, greeting) = server.join().await?;
    assert_eq!(greeting, "Connected. Your role: read-only");

    drop(b);
    drop(c);
    server.wait_for_sessions(0).await?;

    let (_d, greeting) = server.join().await?;
    assert_eq!(greeting, "Connected. Your role: admin");
    Ok(())
}

/// An idle session is disconnected with a notice.
#[tokio::test]
async fn test_idle_session_disconnected() -> Result<()> {
    let server = start_server(|c| {
        c.limits.idle_timeout_secs = 1;
        c.limits.idle_check_interval_secs = 1;
    })
    .await?;

    let (mut a, _) = server.join().await?;
    assert_eq!(a.recv().await?, protocol::IDLE_DISCONNECT);
    assert!(a.closed_within(RECV_TIMEOUT).await);
    server.wait_for_sessions(0).await?;
    Ok(())
}

/// A session that keeps talking is never closed by the watchdog.
#[tokio::test]
async fn test_active_session_survives_watchdog() -> Result<()> {
    let server = start_server(|c| {
        c.limits.idle_timeout_secs = 1;
        c.limits.idle_check_interval_secs = 1;
    })
    .await?;

    let (mut a, _) = server.join().await?;
    for _ in 0..8 {
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(a.ask("/name").await?, "Server Name: Integration Hub");
    }
    server.wait_for_sessions(1).await?;
    Ok(())
}

/// Operator STATS snapshot reflects live sessions and traffic.
#[tokio::test]
async fn test_stats_report_written() -> Result<()> {
    let server = start_server(|_| {}).await?;

    let (mut a, _) = server.join().await?;
    let (mut b, _) = server.join().await?;
    a.ask("/name").await?;
    b.ask("/list").await?;
    b.ask("/list").await?;

    let path = server.config().storage.stats_report.clone();
    lanhubd::control::write_stats(&server.handle.hub.registry, &path).await?;

    let report = std::fs::read_to_string(&path)?;
    assert!(report.contains("Active connections: 2"), "{report}");
    assert!(report.contains(&a.local_addr.to_string()), "{report}");
    assert!(report.contains(&format!("\"{}\":2", b.local_addr)), "{report}");
    // "/name\n" + "/list\n" + "/list\n"
    assert!(report.contains("Total bytes: 18 bytes"), "{report}");
    Ok(())
}

/// Every received line lands in the message log tagged with its sender.
#[tokio::test]
async fn test_message_log_records_lines() -> Result<()> {
    let server = start_server(|_| {}).await?;

    let (mut a, _) = server.join().await?;
    a.ask("/list").await?;
    a.ask("/bogus thing").await?;

    let log = std::fs::read_to_string(&server.config().storage.message_log)?;
    let tag = format!("[{}]", a.local_addr);
    assert!(log.contains(&format!("{tag} /list\n")), "{log}");
    assert!(log.contains(&format!("{tag} /bogus thing\n")), "{log}");
    Ok(())
}

#[tokio::test]
async fn test_listclients_shows_every_session() -> Result<()> {
    let server = start_server(|_| {}).await?;

    let (mut a, _) = server.join().await?;
    let (b, _) = server.join().await?;

    let lines = a.request("/listclients", 3).await?;
    assert_eq!(lines[0], "Connected clients:");
    assert_eq!(lines[1], format!("- {}", a.local_addr));
    assert_eq!(lines[2], format!("- {}", b.local_addr));
    Ok(())
}
