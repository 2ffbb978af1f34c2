mod common;

use common::*;
use hue_vision::{DetectionReport, DetectorSettings, FrameConfig, FrameResponse, SimilarityWeights, VisionPipeline};
use image::ImageFormat;

fn report(response: FrameResponse) -> DetectionReport {
    match response {
        FrameResponse::Report(report) => report,
        other => panic!("expected a report, got {other:?}"),
    }
}

#[test]
fn red_disc_is_a_medium_red_circle() {
    let mut pipeline = VisionPipeline::new(DetectorSettings::default());
    let report = report(pipeline.process(&png_request(&red_disc_frame(320, 240), FrameConfig::default())));

    assert_eq!((report.frame_w, report.frame_h), (640, 480));
    assert_eq!(report.detections.len(), 1, "{:?}", report.detections);
    let detection = &report.detections[0];
    assert_eq!(detection.id, 1);
    assert_eq!(detection.color, "red");
    assert_eq!(detection.shape, "circle");
    assert_eq!(detection.size, "medium");
    assert_eq!(detection.label, "Red Circle (Medium)");
    assert!((90.0..=100.0).contains(&detection.similarity), "similarity {}", detection.similarity);
    assert!(detection.should_speak);
    assert!(detection.spoken_text.starts_with("red circle, medium, ninety"));
    assert!((detection.centroid[0] - 320.0).abs() < 1.0);
    assert!((detection.centroid[1] - 240.0).abs() < 1.0);
}

#[test]
fn small_shift_keeps_the_same_id() {
    let mut pipeline = VisionPipeline::new(DetectorSettings::default());
    let first = report(pipeline.process(&png_request(&red_disc_frame(300, 240), FrameConfig::default())));
    let second = report(pipeline.process(&png_request(&red_disc_frame(308, 244), FrameConfig::default())));

    assert_eq!(first.detections.len(), 1);
    assert_eq!(second.detections.len(), 1);
    assert_eq!(first.detections[0].id, second.detections[0].id);
}

#[test]
fn distinct_objects_get_distinct_ids() {
    let mut image = red_disc_frame(160, 240);
    rect(&mut image, 400, 180, 120, 100, BLUE);
    let mut pipeline = VisionPipeline::new(DetectorSettings::default());
    let report = report(pipeline.process(&png_request(&image, FrameConfig::default())));

    assert_eq!(report.detections.len(), 2, "{:?}", report.detections);
    let blue = report.detections.iter().find(|d| d.color == "blue").unwrap();
    let red = report.detections.iter().find(|d| d.color == "red").unwrap();
    assert_ne!(blue.id, red.id);
    assert_eq!(blue.shape, "rectangle");
}

#[test]
fn triangles_are_recognised() {
    let mut image = canvas(640, 480);
    triangle(&mut image, (100, 380), (400, 380), (250, 100), BLUE);
    let mut pipeline = VisionPipeline::new(DetectorSettings::default());
    let report = report(pipeline.process(&png_request(&image, FrameConfig::default())));

    assert_eq!(report.detections.len(), 1, "{:?}", report.detections);
    assert_eq!(report.detections[0].shape, "triangle");
    assert_eq!(report.detections[0].color, "blue");
}

#[test]
fn frames_with_only_small_blobs_return_no_detections() {
    let mut image = canvas(640, 480);
    for i in 0..5 {
        rect(&mut image, 40 + i * 100, 60, 6, 6, RED);
    }
    let mut pipeline = VisionPipeline::new(DetectorSettings::default());
    let report = report(pipeline.process(&png_request(&image, FrameConfig::default())));
    assert!(report.detections.is_empty());
}

#[test]
fn every_detection_meets_the_minimum_area() {
    let mut image = red_disc_frame(160, 240);
    rect(&mut image, 450, 300, 20, 20, BLUE);
    let config = FrameConfig {
        min_area_px: 1000,
        ..FrameConfig::default()
    };
    let mut pipeline = VisionPipeline::new(DetectorSettings::default());
    let report = report(pipeline.process(&png_request(&image, config)));

    assert_eq!(report.detections.len(), 1);
    let bbox = report.detections[0].bbox;
    assert!(bbox[2] * bbox[3] >= 1000);
}

#[test]
fn identical_frame_within_cooldown_is_not_spoken_twice() {
    let mut pipeline = VisionPipeline::new(DetectorSettings::default());
    let request = png_request(&red_disc_frame(320, 240), FrameConfig::default());

    let first = report(pipeline.process(&request));
    let second = report(pipeline.process(&request));

    assert!(first.detections[0].should_speak);
    assert_eq!(first.detections[0].id, second.detections[0].id);
    assert!(!second.detections[0].should_speak);
    assert!(!second.detections[0].spoken_text.is_empty());
}

#[test]
fn large_frames_are_downscaled_to_the_working_width() {
    let mut image = canvas(1280, 960);
    disc(&mut image, 640, 480, 120, RED);
    let mut pipeline = VisionPipeline::new(DetectorSettings::default());
    let report = report(pipeline.process(&png_request(&image, FrameConfig::default())));

    assert_eq!((report.frame_w, report.frame_h), (640, 480));
    assert_eq!(report.detections.len(), 1);
    assert_eq!(report.detections[0].shape, "circle");
}

#[test]
fn jpeg_data_urls_are_accepted() {
    let payload = format!("data:image/jpeg;base64,{}", encode(&red_disc_frame(320, 240), ImageFormat::Jpeg));
    let mut pipeline = VisionPipeline::new(DetectorSettings::default());
    let report = report(pipeline.process(&hue_vision::FrameRequest::new(payload, FrameConfig::default())));
    assert!(report.detections.iter().any(|d| d.color == "red"));
}

#[test]
fn bad_input_yields_error_responses() {
    let mut pipeline = VisionPipeline::new(DetectorSettings::default());

    let garbage = hue_vision::FrameRequest::new("bm90IGFuIGltYWdl", FrameConfig::default());
    assert!(matches!(pipeline.process(&garbage), FrameResponse::Error { .. }));

    let zero = FrameConfig {
        weights: SimilarityWeights {
            color: 0.0,
            shape: 0.0,
            size: 0.0,
        },
        ..FrameConfig::default()
    };
    match pipeline.process(&png_request(&red_disc_frame(320, 240), zero)) {
        FrameResponse::Error { error } => assert!(error.contains("weights")),
        other => panic!("expected an error, got {other:?}"),
    }

    // The stream carries on normally afterwards.
    let ok = report(pipeline.process(&png_request(&red_disc_frame(320, 240), FrameConfig::default())));
    assert_eq!(ok.detections[0].id, 1);
}

#[test]
fn target_color_scores_adjacent_colors_lower() {
    let mut pipeline = VisionPipeline::new(DetectorSettings::default());
    let frame = red_disc_frame(320, 240);

    let exact = FrameConfig {
        target_color: Some("red".to_string()),
        ..FrameConfig::default()
    };
    let adjacent = FrameConfig {
        target_color: Some("orange".to_string()),
        ..FrameConfig::default()
    };
    let a = report(pipeline.process(&png_request(&frame, exact)));
    let b = report(pipeline.process(&png_request(&frame, adjacent)));
    assert!(a.detections[0].similarity > b.detections[0].similarity);
}
