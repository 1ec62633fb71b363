use crate::*;

/// Admin uploads, read-only peer reads it back.
#[tokio::test]
async fn test_upload_then_read_from_other_session() -> Result<()> {
    let server = start_server(|_| {}).await?;
    let (mut a, _) = server.join().await?;
    let (mut b, _) = server.join().await?;

    assert_eq!(
        a.ask(&protocol::upload_line("f.txt", b"hi")).await?,
        "File uploaded to server: f.txt"
    );
    assert_eq!(b.request("/read f.txt", 2).await?, vec!["--- f.txt ---", "hi"]);
    Ok(())
}

/// Bytes survive upload → download unchanged, whatever the base64 padding.
///
/// An empty payload is answered with the usage hint, so the protocol cannot
/// carry empty uploads.
#[tokio::test]
async fn test_binary_download_roundtrip() -> Result<()> {
    let server = start_server(|_| {}).await?;
    let (mut a, _) = server.join().await?;
    let (mut b, _) = server.join().await?;

    let samples: [&[u8]; 4] = [b"\x00", b"\x00\xff", b"\x00\xff\n", b"line1\r\nline2\n\x7f"];
    assert_eq!(
        a.ask("/upload empty.bin ").await?,
        "Usage: /upload <filename> <base64-data>"
    );

    for (i, data) in samples.iter().enumerate() {
        let name = format!("blob{i}.bin");
        a.ask(&protocol::upload_line(&name, data)).await?;

        let reply = b.ask(&format!("/download {name}")).await?;
        let (got_name, got) =
            protocol::parse_download_line(&reply).context("not a download line")?;
        assert_eq!(got_name, name);
        assert_eq!(got, *data, "sample {i}");
    }
    Ok(())
}

/// Read-only peers can neither delete nor upload.
#[tokio::test]
async fn test_read_only_cannot_mutate_store() -> Result<()> {
    let server = start_server(|_| {}).await?;
    let (mut a, _) = server.join().await?;
    let (mut b, _) = server.join().await?;

    a.ask(&protocol::upload_line("f.txt", b"hi")).await?;

    assert_eq!(b.ask("/delete f.txt").await?, protocol::PERMISSION_DENIED);
    assert_eq!(
        b.ask(&protocol::upload_line("f.txt", b"clobbered")).await?,
        protocol::PERMISSION_DENIED
    );
    assert_eq!(
        b.ask(&protocol::upload_line("new.txt", b"x")).await?,
        protocol::PERMISSION_DENIED
    );

    assert_eq!(a.ask("/list").await?, "Files on server: f.txt");
    assert_eq!(a.request("/read f.txt", 2).await?[1], "hi");
    Ok(())
}

#[tokio::test]
async fn test_list_is_idempotent() -> Result<()> {
    let server = start_server(|_| {}).await?;
    let (mut a, _) = server.join().await?;

    assert_eq!(a.ask("/list").await?, "Files on server: None");
    a.ask(&protocol::upload_line("b.txt", b"2")).await?;
    a.ask(&protocol::upload_line("a.txt", b"1")).await?;

    let first = a.ask("/list").await?;
    assert_eq!(first, "Files on server: a.txt, b.txt");
    assert_eq!(a.ask("/list").await?, first);
    Ok(())
}

#[tokio::test]
async fn test_missing_file_replies() -> Result<()> {
    let server = start_server(|_| {}).await?;
    let (mut a, _) = server.join().await?;

    for cmd in ["/read", "/delete", "/download", "/info"] {
        assert_eq!(
            a.ask(&format!("{cmd} missing.txt")).await?,
            protocol::FILE_NOT_FOUND,
            "{cmd}"
        );
    }
    assert_eq!(a.ask("/read").await?, "Usage: /read <filename>");
    Ok(())
}

#[tokio::test]
async fn test_delete_info_and_search() -> Result<()> {
    let server = start_server(|_| {}).await?;
    let (mut a, _) = server.join().await?;

    a.ask(&protocol::upload_line("report-1.txt", b"12345")).await?;
    a.ask(&protocol::upload_line("notes.md", b"n")).await?;

    let info = a.request("/info report-1.txt", 4).await?;
    assert_eq!(info[0], "File: report-1.txt");
    assert_eq!(info[1], "Size: 5 bytes");

    assert_eq!(
        a.ask("/search report").await?,
        "Matching files on server: report-1.txt"
    );
    assert_eq!(
        a.ask("/delete report-1.txt").await?,
        "File report-1.txt deleted from server."
    );
    assert_eq!(a.ask("/search report").await?, "Matching files on server: None");
    assert!(!server.config().storage.files_dir.join("report-1.txt").exists());
    Ok(())
}

/// Names that would escape the store directory are refused.
#[tokio::test]
async fn test_path_traversal_refused() -> Result<()> {
    let server = start_server(|_| {}).await?;
    let (mut a, _) = server.join().await?;

    assert_eq!(
        a.ask(&protocol::upload_line("../escaped.txt", b"x")).await?,
        protocol::INVALID_FILENAME
    );
    assert!(!server.dir.path().join("escaped.txt").exists());
    assert_eq!(a.ask("/read ../messages_log.txt").await?, protocol::INVALID_FILENAME);
    Ok(())
}

/// A corrupt upload payload ends only the offending session.
#[tokio::test]
async fn test_malformed_upload_tears_down_session() -> Result<()> {
    let server = start_server(|_| {}).await?;
    let (mut a, _) = server.join().await?;
    let (mut b, _) = server.join().await?;

    assert_eq!(a.ask("/upload f.txt %%%garbage%%%").await?, protocol::INVALID_PAYLOAD);
    assert!(a.closed_within(RECV_TIMEOUT).await);
    server.wait_for_sessions(1).await?;

    assert_eq!(b.ask("/list").await?, "Files on server: None");
    Ok(())
}

/// An over-long line is a transport error for that session only.
#[tokio::test]
async fn test_oversized_line_closes_session() -> Result<()> {
    let server = start_server(|c| c.limits.max_line_bytes = 64).await?;
    let (mut a, _) = server.join().await?;
    let (mut b, _) = server.join().await?;

    a.send(&format!("/broadcast {}", "x".repeat(200))).await?;
    assert!(a.closed_within(RECV_TIMEOUT).await);
    server.wait_for_sessions(1).await?;

    assert_eq!(b.ask("/name").await?, "Server Name: Integration Hub");
    Ok(())
}

/// Store I/O failures get a generic reply and leave the session usable.
#[tokio::test]
async fn test_store_failure_keeps_session_open() -> Result<()> {
    let server = start_server(|_| {}).await?;
    let (mut a, _) = server.join().await?;

    // a regular file where the store directory should be
    let files_dir = server.config().storage.files_dir.clone();
    std::fs::remove_dir_all(&files_dir)?;
    std::fs::write(&files_dir, b"not a directory")?;

    assert_eq!(a.ask("/list").await?, protocol::LIST_ERROR);
    assert_eq!(a.ask("/search x").await?, protocol::SEARCH_ERROR);
    assert_eq!(
        a.ask(&protocol::upload_line("f.txt", b"hi")).await?,
        protocol::FILE_ERROR
    );

    assert_eq!(a.ask("/name").await?, "Server Name: Integration Hub");
    server.wait_for_sessions(1).await?;
    Ok(())
}
