//! The models each command-line tool offers.

use crate::error::{MediaError, Result};
use crate::jimeng::VideoParams;
use crate::models::{Model, Param, Registry};

const VIDEO_RATIOS: &[&str] = &["16:9", "9:16", "1:1", "4:3", "3:4", "21:9"];
const IMAGE_SIZES: &[&str] = &["1K", "2K", "4K"];

/// Which API serves an `ark-cli` model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArkBackend {
    Ark,
    Jimeng,
}

pub fn ark_backend(model: &str) -> Option<ArkBackend> {
    match model {
        crate::ark::DEFAULT_MODEL => Some(ArkBackend::Ark),
        "jimeng-t2v-3-pro" | "jimeng-i2v-3-pro" | "jimeng-i2v-startend-3-pro" => {
            Some(ArkBackend::Jimeng)
        }
        _ => None,
    }
}

/// Rejects frames that do not fit a Jimeng video model, so the model name and
/// the product the request is routed to always agree.
pub fn check_jimeng_frames(model: &str, params: &VideoParams) -> Result<()> {
    let first = !params.first_frame.is_empty();
    let end = !params.end_frame.is_empty();
    let problem = match model {
        "jimeng-t2v-3-pro" if first || end => "takes no frame images; use jimeng-i2v-3-pro",
        "jimeng-i2v-3-pro" if !first => "requires --image or --image-file",
        "jimeng-i2v-3-pro" if end => "takes no end frame; use jimeng-i2v-startend-3-pro",
        "jimeng-i2v-startend-3-pro" if !first || !end => {
            "requires both a first frame and an end frame"
        }
        "jimeng-t2v-3-pro" | "jimeng-i2v-3-pro" | "jimeng-i2v-startend-3-pro" => return Ok(()),
        _ => return Err(MediaError::UnknownModel(model.to_string())),
    };
    Err(MediaError::InvalidInput(format!("{} {}", model, problem)))
}

fn jimeng_video_params() -> Vec<(&'static str, Param)> {
    vec![
        (
            "ratio",
            Param::string("Aspect ratio of the generated video")
                .options(VIDEO_RATIOS)
                .default_value("16:9"),
        ),
        (
            "frames",
            Param::string("Total frames: 121 for 5 seconds, 241 for 10 seconds")
                .options(&["121", "241"])
                .default_value("121"),
        ),
        (
            "seed",
            Param::typed("integer", "Random seed (-1 for random)").default_value("-1"),
        ),
    ]
}

fn first_frame_params() -> [(&'static str, Param); 2] {
    [
        ("image", Param::string("First frame image URL")),
        (
            "image-file",
            Param::string("First frame image from local file (auto base64-encoded)"),
        ),
    ]
}

pub fn ark_registry() -> Registry {
    let mut i2v = jimeng_video_params();
    i2v.extend(first_frame_params());

    let mut startend = i2v.clone();
    startend.extend([
        ("end-image", Param::string("Last frame image URL")),
        (
            "end-image-file",
            Param::string("Last frame image from local file (auto base64-encoded)"),
        ),
    ]);

    Registry {
        tool: "ark-cli",
        models: vec![
            Model::new(
                crate::ark::DEFAULT_MODEL,
                "Video generation from text or image prompts using Seedance 1.5 Pro",
                &["text-to-video", "image-to-video"],
                [
                    (
                        "duration",
                        Param::string("Video duration in seconds")
                            .options(&["5", "10"])
                            .default_value("5"),
                    ),
                    (
                        "resolution",
                        Param::string("Video resolution")
                            .options(&["720p", "1080p"])
                            .default_value("720p"),
                    ),
                    (
                        "ratio",
                        Param::string("Aspect ratio of the generated video")
                            .options(VIDEO_RATIOS)
                            .default_value("16:9"),
                    ),
                    (
                        "audio",
                        Param::string("Whether to generate audio")
                            .options(&["true", "false"])
                            .default_value("true"),
                    ),
                ],
            ),
            Model::new(
                "jimeng-t2v-3-pro",
                "Jimeng video generation 3.0 Pro, text-to-video",
                &["text-to-video"],
                jimeng_video_params(),
            ),
            Model::new(
                "jimeng-i2v-3-pro",
                "Jimeng video generation 3.0 Pro, image-to-video from a first frame",
                &["image-to-video"],
                i2v,
            ),
            Model::new(
                "jimeng-i2v-startend-3-pro",
                "Jimeng video generation 3.0 Pro, image-to-video from first and last frames",
                &["image-to-video"],
                startend,
            ),
        ],
    }
}

pub const JIMENG_DEFAULT_MODEL: &str = "jimeng-action-imitation-v2";

pub fn jimeng_registry() -> Registry {
    Registry {
        tool: "jimeng-cli",
        models: vec![
            Model::new(
                JIMENG_DEFAULT_MODEL,
                "Jimeng Action Imitation 2.0, imitates the actions of a template video with a person image",
                &["image+video-to-video"],
                [
                    ("image", Param::string("Person image URL")),
                    (
                        "image-file",
                        Param::string("Person image from local file (auto base64-encoded)"),
                    ),
                    (
                        "video",
                        Param::string("Template video URL with actions to imitate (required)")
                            .required(),
                    ),
                    (
                        "cut-first-second",
                        Param::typed("boolean", "Whether to cut the first second of result video")
                            .default_value("true"),
                    ),
                ],
            ),
            Model::new(
                "jimeng-omnihuman",
                "Jimeng OmniHuman 1.5, talking-head video from a portrait image and audio",
                &["image+audio-to-video"],
                [
                    ("image", Param::string("Portrait image URL")),
                    (
                        "image-file",
                        Param::string("Portrait image from local file (auto base64-encoded)"),
                    ),
                    (
                        "audio",
                        Param::string("Audio URL, must be under 60 seconds (required)").required(),
                    ),
                    (
                        "resolution",
                        Param::string("Output video resolution")
                            .options(&["720", "1080"])
                            .default_value("1080"),
                    ),
                    (
                        "fast-mode",
                        Param::typed("boolean", "Enable fast mode (trades quality for speed)")
                            .default_value("false"),
                    ),
                    (
                        "seed",
                        Param::typed("integer", "Random seed (-1 for random)").default_value("-1"),
                    ),
                ],
            ),
        ],
    }
}

pub const TOPVIEW_MODEL: &str = "topview-video-avatar";

pub fn topview_registry() -> Registry {
    Registry {
        tool: "topview-cli",
        models: vec![Model::new(
            TOPVIEW_MODEL,
            "Talking avatar video from an uploaded portrait image and audio track",
            &["image-audio-to-video", "video-avatar"],
            [
                (
                    "image",
                    Param::string("Path to portrait image file (jpg, png, webp)").required(),
                ),
                (
                    "audio",
                    Param::string("Path to audio file (mp3, wav, m4a, aac)").required(),
                ),
            ],
        )],
    }
}

pub fn gemini_registry() -> Registry {
    let size = || {
        Param::string("Image resolution")
            .options(IMAGE_SIZES)
            .default_value("2K")
    };
    Registry {
        tool: "gemini-cli",
        models: vec![
            Model::new(
                crate::gemini::DEFAULT_MODEL,
                "Image generation and editing from text prompts, returns both text and image",
                &["text-to-image", "text"],
                [
                    (
                        "ratio",
                        Param::string("Aspect ratio of the generated image")
                            .options(&["1:1", "16:9", "9:16", "4:3", "3:4"])
                            .default_value("1:1"),
                    ),
                    ("size", size()),
                ],
            ),
            Model::new(
                "gemini-3.1-flash-image-preview",
                "Fast and cost-efficient image generation with more aspect ratios",
                &["text-to-image", "text"],
                [
                    (
                        "ratio",
                        Param::string("Aspect ratio of the generated image")
                            .options(&[
                                "1:1", "16:9", "9:16", "4:3", "3:4", "2:3", "3:2", "4:5", "5:4",
                                "1:4", "4:1", "1:8", "8:1", "21:9",
                            ])
                            .default_value("1:1"),
                    ),
                    ("size", size()),
                ],
            ),
        ],
    }
}
