mod common;

use common::{quick_poll, test_keys, Sequence};
use mediagen::jimeng::{
    self, ActionImitationParams, JimengClient, JimengRequest, OmniHumanParams, VideoParams,
};
use mediagen::{MediaError, MediaSlot, TaskState};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn query_response(status: &str, video_url: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": 10000,
        "message": "Success",
        "request_id": "req-1",
        "data": { "status": status, "video_url": video_url }
    }))
}

#[tokio::test]
async fn test_submit_text_to_video_is_signed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(query_param("Action", "CVSync2AsyncSubmitTask"))
        .and(query_param("Version", "2022-08-31"))
        .and(header("content-type", "application/json"))
        .and(header_exists("x-date"))
        .and(header_exists("x-content-sha256"))
        .and(header_exists("authorization"))
        .and(body_partial_json(json!({
            "req_key": "jimeng_t2v_v30_pro",
            "prompt": "a paper boat on a river",
            "frames": 121,
            "aspect_ratio": "16:9"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 10000,
            "message": "Success",
            "data": { "task_id": "7418" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = JimengClient::new_with_url(test_keys(), &server.uri()).unwrap();
    let request = JimengRequest::Video(VideoParams {
        prompt: "a paper boat on a river".into(),
        aspect_ratio: "16:9".into(),
        ..Default::default()
    });
    let task = client.submit(&request).await.unwrap();

    assert_eq!(task.id, "7418");
    assert_eq!(task.status, TaskState::Pending);

    let requests = server.received_requests().await.unwrap();
    let authorization = requests[0].headers.get("authorization").unwrap().to_str().unwrap();
    assert!(authorization.starts_with("HMAC-SHA256 Credential=AKTEST/"));
    assert!(authorization.contains("/cn-north-1/cv/request"));
    let host = requests[0].headers.get("host").unwrap().to_str().unwrap();
    assert_eq!(host, server.uri().trim_start_matches("http://"));
}

#[tokio::test]
async fn test_submit_rejected_code_is_an_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(query_param("Action", "CVSync2AsyncSubmitTask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 50411,
            "message": "Pre Img Risk Not Pass"
        })))
        .mount(&server)
        .await;

    let client = JimengClient::new_with_url(test_keys(), &server.uri()).unwrap();
    let request = JimengRequest::ActionImitation(ActionImitationParams {
        image: MediaSlot::from_url("https://example.com/person.png"),
        video_url: "https://example.com/dance.mp4".into(),
        cut_first_second: None,
    });
    let err = client.submit(&request).await.unwrap_err();

    match err {
        MediaError::ApiError { code, message } => {
            assert_eq!(code, "50411");
            assert_eq!(message, "Pre Img Risk Not Pass");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_omnihuman_uses_task_actions() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(query_param("Action", "CVSubmitTask"))
        .and(body_partial_json(json!({
            "req_key": "jimeng_realman_avatar_picture_omni_v15",
            "image_url": "https://example.com/face.png",
            "audio_url": "https://example.com/speech.mp3",
            "output_resolution": 1080
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 10000,
            "data": { "task_id": "omni-1" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = JimengClient::new_with_url(test_keys(), &server.uri()).unwrap();
    let request = JimengRequest::OmniHuman(OmniHumanParams {
        image: MediaSlot::from_url("https://example.com/face.png"),
        audio_url: "https://example.com/speech.mp3".into(),
        output_resolution: Some(1080),
        ..Default::default()
    });
    let task = client.submit(&request).await.unwrap();

    assert_eq!(task.id, "omni-1");
}

#[tokio::test]
async fn test_get_task_maps_statuses() {
    let cases = [
        ("in_queue", TaskState::Pending),
        ("generating", TaskState::Running),
        ("done", TaskState::Done),
        ("not_found", TaskState::Failed),
        ("expired", TaskState::Failed),
    ];

    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("Action", "CVSync2AsyncGetResult"))
            .and(body_partial_json(json!({
                "req_key": "jimeng_t2v_v30_pro",
                "task_id": "7418"
            })))
            .respond_with(query_response(status, "https://cdn.example.com/7418.mp4"))
            .mount(&server)
            .await;

        let client = JimengClient::new_with_url(test_keys(), &server.uri()).unwrap();
        let task = client.get_task(&jimeng::TEXT_TO_VIDEO, "7418").await.unwrap();

        assert_eq!(task.status, expected, "status {status}");
        assert_eq!(task.vendor_status, status);
        assert_eq!(task.result.is_some(), expected == TaskState::Done);
    }
}

#[tokio::test]
async fn test_get_task_failure_code_on_http_200_is_a_failed_task() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(query_param("Action", "CVSync2AsyncGetResult"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 50412,
            "message": "Post Video Risk Not Pass",
            "data": null
        })))
        .mount(&server)
        .await;

    let client = JimengClient::new_with_url(test_keys(), &server.uri()).unwrap();
    let task = client
        .get_task(&jimeng::IMAGE_TO_VIDEO, "7418")
        .await
        .unwrap();

    assert_eq!(task.status, TaskState::Failed);
    assert_eq!(task.vendor_status, "50412");
    assert_eq!(task.error.as_deref(), Some("Post Video Risk Not Pass"));
}

#[tokio::test]
async fn test_action_imitation_query_sends_req_json() {
    let server = MockServer::start().await;
    let req_json = jimeng::ACTION_IMITATION.query_req_json.unwrap();

    Mock::given(method("POST"))
        .and(query_param("Action", "CVSync2AsyncGetResult"))
        .and(body_partial_json(json!({
            "req_key": "jimeng_dreamactor_m20_gen_video",
            "task_id": "act-1",
            "req_json": req_json
        })))
        .respond_with(query_response("generating", ""))
        .expect(1)
        .mount(&server)
        .await;

    let client = JimengClient::new_with_url(test_keys(), &server.uri()).unwrap();
    let task = client
        .get_task(&jimeng::ACTION_IMITATION, "act-1")
        .await
        .unwrap();

    assert_eq!(task.status, TaskState::Running);
}

#[tokio::test]
async fn test_wait_for_task_until_done() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(query_param("Action", "CVSync2AsyncGetResult"))
        .respond_with(Sequence::new(vec![
            query_response("in_queue", ""),
            query_response("generating", ""),
            query_response("done", "https://cdn.example.com/7418.mp4"),
        ]))
        .expect(3)
        .mount(&server)
        .await;

    let client = JimengClient::new_with_url(test_keys(), &server.uri())
        .unwrap()
        .with_poll_policy(quick_poll());
    let task = client
        .wait_for_task(&jimeng::TEXT_TO_VIDEO, "7418")
        .await
        .unwrap();

    assert_eq!(task.status, TaskState::Done);
    assert_eq!(task.result.as_deref(), Some("https://cdn.example.com/7418.mp4"));
}

#[tokio::test]
async fn test_wait_for_task_stops_on_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(query_param("Action", "CVSync2AsyncGetResult"))
        .respond_with(Sequence::new(vec![
            query_response("generating", ""),
            ResponseTemplate::new(200).set_body_json(json!({
                "code": 50500,
                "message": "Internal Error"
            })),
        ]))
        .expect(2)
        .mount(&server)
        .await;

    let client = JimengClient::new_with_url(test_keys(), &server.uri())
        .unwrap()
        .with_poll_policy(quick_poll());
    let err = client
        .wait_for_task(&jimeng::TEXT_TO_VIDEO, "7418")
        .await
        .unwrap_err();

    assert!(matches!(err, MediaError::TaskFailed { ref message, .. } if message == "Internal Error"));
}
