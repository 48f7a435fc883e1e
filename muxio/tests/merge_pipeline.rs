//! End-to-end pipeline tests with a scripted stand-in for the merge tool.
//!
//! These exercise the real spawn/capture path, so they are Unix-only.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use muxio::config::Settings;
use muxio::muxer::{MuxOutcome, MuxRequest, Muxer};
use muxio::records::{DownloadRecord, InMemoryRecordStore};
use muxio::tool::{FfmpegMerger, ToolLocation};
use muxio::units::{self, SizeContext};
use muxio::worker;
use tempfile::TempDir;

/// Write an executable shell script standing in for the merge tool.
fn fake_tool(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// A tool that touches its last argument, like a successful remux would.
fn succeeding_tool(dir: &Path) -> PathBuf {
    fake_tool(dir, "for arg; do out=\"$arg\"; done\n: > \"$out\"\nexit 0")
}

fn failing_tool(dir: &Path) -> PathBuf {
    fake_tool(dir, "echo boom >&2\nexit 1")
}

async fn store_for(dir: &Path) -> (Arc<InMemoryRecordStore>, u64) {
    let video = dir.join("clip.webm");
    let audio = dir.join("clip.m4a");
    std::fs::write(&video, vec![0u8; 600]).unwrap();
    std::fs::write(&audio, vec![0u8; 300]).unwrap();

    let store = Arc::new(InMemoryRecordStore::new());
    store
        .insert(DownloadRecord {
            gid: "vid".to_string(),
            path: video,
            size: units::format_size(600, SizeContext::Size),
        })
        .await;
    store
        .insert(DownloadRecord {
            gid: "aud".to_string(),
            path: audio,
            size: units::format_size(300, SizeContext::Size),
        })
        .await;
    (store, 900)
}

fn request_for(dir: &Path) -> MuxRequest {
    MuxRequest {
        video_gid: "vid".to_string(),
        audio_gid: "aud".to_string(),
        target_dir: dir.to_path_buf(),
    }
}

#[tokio::test]
async fn merge_completes_through_a_real_process() {
    let temp = TempDir::new().unwrap();
    let (store, total) = store_for(temp.path()).await;

    let tool = FfmpegMerger::with_location(ToolLocation::Explicit(succeeding_tool(temp.path())));
    let muxer = Arc::new(Muxer::new(store, Settings::new(temp.path())).with_tool(Arc::new(tool)));

    let outcome = worker::spawn_merge(muxer, request_for(temp.path()))
        .await
        .unwrap();

    let expected = temp.path().join("clip.mkv");
    assert_eq!(
        outcome,
        MuxOutcome::Completed {
            final_path: expected.clone(),
            final_size: units::format_size(total, SizeContext::Size),
        }
    );
    assert!(expected.is_file());
}

#[tokio::test]
async fn failing_tool_reports_its_error_stream() {
    let temp = TempDir::new().unwrap();
    let (store, _) = store_for(temp.path()).await;

    let tool = FfmpegMerger::with_location(ToolLocation::Explicit(failing_tool(temp.path())));
    let muxer = Muxer::new(store, Settings::new(temp.path())).with_tool(Arc::new(tool));

    let outcome = muxer.run(&request_for(temp.path())).await;
    match outcome {
        MuxOutcome::ToolError { exit_code, stderr } => {
            assert_eq!(exit_code, Some(1));
            assert_eq!(stderr.trim(), "boom");
        }
        other => panic!("expected a tool error, got {other:?}"),
    }
    assert!(!temp.path().join("clip.mkv").exists());
}

#[tokio::test]
async fn missing_tool_reports_tool_not_found_without_output() {
    let temp = TempDir::new().unwrap();
    let (store, _) = store_for(temp.path()).await;

    let tool = FfmpegMerger::with_location(ToolLocation::Explicit(
        temp.path().join("no-such-tool"),
    ));
    let muxer = Muxer::new(store, Settings::new(temp.path())).with_tool(Arc::new(tool));

    let outcome = muxer.run(&request_for(temp.path())).await;
    assert!(
        matches!(outcome, MuxOutcome::ToolNotFound { .. }),
        "got {outcome:?}"
    );
    assert!(!temp.path().join("clip.mkv").exists());
}

#[tokio::test]
async fn repeated_merges_into_one_directory_never_collide() {
    let temp = TempDir::new().unwrap();
    let (store, _) = store_for(temp.path()).await;

    let tool = FfmpegMerger::with_location(ToolLocation::Explicit(succeeding_tool(temp.path())));
    let muxer = Muxer::new(store, Settings::new(temp.path())).with_tool(Arc::new(tool));

    let first = muxer.run(&request_for(temp.path())).await;
    let second = muxer.run(&request_for(temp.path())).await;

    assert_eq!(first.final_path(), Some(temp.path().join("clip.mkv").as_path()));
    assert_eq!(
        second.final_path(),
        Some(temp.path().join("clip_1.mkv").as_path())
    );
}
