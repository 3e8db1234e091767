//! Chunked AGNSS upload against a fake tracker.

mod common;

use common::*;
use tracker_link::protocol::*;
use tracker_link::{AgnssUploadState, LinkConfig, LinkError};

#[tokio::test]
async fn test_upload_commits_blob() {
    let blob = pattern(50);
    let h = start(FakeTracker::new(), config_with_chunk(20));

    h.conn.upload_agnss(&blob).await.unwrap();
    assert_eq!(h.conn.agnss_upload_state(), AgnssUploadState::Ended);

    let device = h.device.lock();
    assert_eq!(device.agnss_committed.as_deref(), Some(&blob[..]));
    assert_eq!(
        device.opcodes(),
        vec![
            CMD_START_AGNSS_WRITE,
            CMD_WRITE_AGNSS_CHUNK,
            CMD_WRITE_AGNSS_CHUNK,
            CMD_WRITE_AGNSS_CHUNK,
            CMD_END_AGNSS_WRITE
        ]
    );

    let starts = device.requests_with(CMD_START_AGNSS_WRITE);
    assert_eq!(starts[0].payload, 50u32.to_le_bytes().to_vec());

    let chunks: Vec<_> = device
        .requests_with(CMD_WRITE_AGNSS_CHUNK)
        .iter()
        .map(|r| {
            let (offset, data) = r.agnss_chunk();
            (offset, data.len())
        })
        .collect();
    assert_eq!(chunks, vec![(0, 20), (20, 20), (40, 10)]);

    let ends = device.requests_with(CMD_END_AGNSS_WRITE);
    assert_eq!(ends[0].payload, vec![AGNSS_END_COMMIT]);
}

#[tokio::test]
async fn test_chunk_lengths_sum_to_declared_total() {
    let blob = pattern(1234);
    let h = start_with_notify_size(FakeTracker::new(), config_with_chunk(100), 5);

    let mut acked = Vec::new();
    h.conn
        .upload_agnss_with_progress(&blob, |done, total| acked.push((done, total)))
        .await
        .unwrap();

    let device = h.device.lock();
    let sent: usize = device
        .requests_with(CMD_WRITE_AGNSS_CHUNK)
        .iter()
        .map(|r| r.agnss_chunk().1.len())
        .sum();
    assert_eq!(sent, 1234);
    assert_eq!(device.agnss_committed.as_deref(), Some(&blob[..]));
    assert_eq!(acked.len(), 13);
    assert_eq!(acked.last(), Some(&(1234, 1234)));
}

#[tokio::test]
async fn test_failed_chunk_retried_once() {
    let blob = pattern(50);
    let h = start(
        FakeTracker::new().fault(CMD_WRITE_AGNSS_CHUNK, 2, Fault::Status(STATUS_DEVICE_BUSY)),
        config_with_chunk(20),
    );

    h.conn.upload_agnss(&blob).await.unwrap();
    assert_eq!(h.conn.agnss_upload_state(), AgnssUploadState::Ended);

    let device = h.device.lock();
    let offsets: Vec<_> = device
        .requests_with(CMD_WRITE_AGNSS_CHUNK)
        .iter()
        .map(|r| r.agnss_chunk().0)
        .collect();
    assert_eq!(offsets, vec![0, 20, 20, 40]);
    assert_eq!(device.agnss_committed.as_deref(), Some(&blob[..]));
}

#[tokio::test]
async fn test_second_chunk_failure_aborts() {
    let h = start(
        FakeTracker::new()
            .fault(CMD_WRITE_AGNSS_CHUNK, 2, Fault::Status(STATUS_DEVICE_BUSY))
            .fault(CMD_WRITE_AGNSS_CHUNK, 3, Fault::Status(STATUS_DEVICE_BUSY)),
        config_with_chunk(20),
    );

    let err = h.conn.upload_agnss(&pattern(50)).await.unwrap_err();
    assert!(matches!(err, LinkError::Device(DeviceStatus::DeviceBusy)));
    assert_eq!(h.conn.agnss_upload_state(), AgnssUploadState::Aborted);

    let device = h.device.lock();
    let end = device.requests_with(CMD_END_AGNSS_WRITE);
    assert_eq!(end.len(), 1);
    assert_eq!(end[0].payload, vec![AGNSS_END_ABORT]);
    assert_eq!(device.agnss_aborts, 1);
    assert!(device.agnss_committed.is_none());
}

#[tokio::test]
async fn test_no_retry_when_configured_off() {
    let config = LinkConfig {
        chunk_retries: 0,
        ..config_with_chunk(20)
    };
    let h = start(
        FakeTracker::new().fault(CMD_WRITE_AGNSS_CHUNK, 1, Fault::Status(STATUS_DEVICE_BUSY)),
        config,
    );

    assert!(h.conn.upload_agnss(&pattern(50)).await.is_err());
    assert_eq!(
        h.device.lock().requests_with(CMD_WRITE_AGNSS_CHUNK).len(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_chunk_timeout_retried() {
    let blob = pattern(30);
    let h = start(
        FakeTracker::new().fault(CMD_WRITE_AGNSS_CHUNK, 1, Fault::Silence),
        config_with_chunk(20),
    );

    h.conn.upload_agnss(&blob).await.unwrap();
    assert_eq!(h.device.lock().agnss_committed.as_deref(), Some(&blob[..]));
}

#[tokio::test]
async fn test_length_mismatch_on_commit() {
    let h = start(
        FakeTracker::new().fault(
            CMD_END_AGNSS_WRITE,
            1,
            Fault::Status(STATUS_LENGTH_MISMATCH),
        ),
        config_with_chunk(20),
    );

    let err = h.conn.upload_agnss(&pattern(25)).await.unwrap_err();
    assert!(matches!(err, LinkError::Device(DeviceStatus::LengthMismatch)));
    assert_eq!(h.conn.agnss_upload_state(), AgnssUploadState::Aborted);

    let ends: Vec<_> = h
        .device
        .lock()
        .requests_with(CMD_END_AGNSS_WRITE)
        .into_iter()
        .map(|r| r.payload)
        .collect();
    assert_eq!(ends, vec![vec![AGNSS_END_COMMIT], vec![AGNSS_END_ABORT]]);
}

#[tokio::test]
async fn test_start_rejected() {
    let h = start(
        FakeTracker::new().fault(CMD_START_AGNSS_WRITE, 1, Fault::Status(STATUS_DEVICE_BUSY)),
        LinkConfig::default(),
    );

    let err = h.conn.upload_agnss(&pattern(10)).await.unwrap_err();
    assert_eq!(err.device_status(), Some(DeviceStatus::DeviceBusy));
    assert_eq!(h.conn.agnss_upload_state(), AgnssUploadState::Aborted);
    assert_eq!(h.device.lock().opcodes(), vec![CMD_START_AGNSS_WRITE]);
}

#[tokio::test]
async fn test_empty_blob_rejected_locally() {
    let h = start(FakeTracker::new(), LinkConfig::default());

    assert!(matches!(
        h.conn.upload_agnss(&[]).await,
        Err(LinkError::EmptyPayload)
    ));
    assert!(h.device.lock().requests.is_empty());
    assert_eq!(h.conn.agnss_upload_state(), AgnssUploadState::Idle);
}

#[tokio::test]
async fn test_disconnect_during_upload() {
    let h = start(
        FakeTracker::new().fault(CMD_WRITE_AGNSS_CHUNK, 2, Fault::Disconnect),
        config_with_chunk(20),
    );

    let err = h.conn.upload_agnss(&pattern(60)).await.unwrap_err();
    assert!(err.is_disconnect());
    assert_eq!(h.conn.agnss_upload_state(), AgnssUploadState::Aborted);

    // no retry and no abort frame on a dead link
    let device = h.device.lock();
    assert_eq!(device.requests_with(CMD_WRITE_AGNSS_CHUNK).len(), 2);
    assert!(device.requests_with(CMD_END_AGNSS_WRITE).is_empty());
}

#[tokio::test]
async fn test_upload_follows_mtu_change() {
    let blob = pattern(100);
    let h = start(
        FakeTracker::new().fault(CMD_START_AGNSS_WRITE, 1, Fault::MtuThenAnswer(63)),
        config_with_chunk(20),
    );

    h.conn.upload_agnss(&blob).await.unwrap();

    let lengths: Vec<_> = h
        .device
        .lock()
        .requests_with(CMD_WRITE_AGNSS_CHUNK)
        .iter()
        .map(|r| r.agnss_chunk().1.len())
        .collect();
    assert_eq!(lengths, vec![60, 40]);
}
