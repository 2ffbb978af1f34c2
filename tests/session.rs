mod common;

use common::*;
use hue_vision::{DetectionSession, DetectorSettings, FrameConfig, FrameResponse};

#[tokio::test]
async fn session_tracks_across_frames_and_resets() {
    let (handle, task) = DetectionSession::spawn(DetectorSettings::default());

    let first = handle
        .process(png_request(&red_disc_frame(300, 240), FrameConfig::default()))
        .await
        .unwrap();
    let second = handle
        .process(png_request(&red_disc_frame(305, 240), FrameConfig::default()))
        .await
        .unwrap();
    let first_id = first.as_report().unwrap().detections[0].id;
    assert_eq!(first_id, second.as_report().unwrap().detections[0].id);

    handle.reset().await.unwrap();
    let far = handle
        .process(png_request(&red_disc_frame(100, 100), FrameConfig::default()))
        .await
        .unwrap();
    let detection = &far.as_report().unwrap().detections[0];
    assert_eq!(detection.id, 1);
    assert!(detection.should_speak);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn sessions_do_not_share_identities() {
    let (a, task_a) = DetectionSession::spawn(DetectorSettings::default());
    let (b, task_b) = DetectionSession::spawn(DetectorSettings::default());

    let mut image = red_disc_frame(160, 240);
    disc(&mut image, 480, 240, 60, BLUE);
    a.process(png_request(&image, FrameConfig::default())).await.unwrap();

    let response = b
        .process(png_request(&red_disc_frame(320, 240), FrameConfig::default()))
        .await
        .unwrap();
    assert!(matches!(&response, FrameResponse::Report(r) if r.detections[0].id == 1));

    a.shutdown().await.unwrap();
    b.shutdown().await.unwrap();
    task_a.await.unwrap();
    task_b.await.unwrap();
}
