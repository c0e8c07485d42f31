use media_generation_server::config::{FaceAnimationConfig, TtsConfig, VoiceCloneConfig};
use media_generation_server::errors::AppError;
use media_generation_server::providers::face_animation::AnimationRequest;
use media_generation_server::providers::{FaceAnimationClient, TtsClient, VoiceCloneClient};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tts_config(base_url: String) -> TtsConfig {
    TtsConfig {
        base_url,
        api_key: "test-key".to_string(),
        user_id: "user-1".to_string(),
        default_voice: "larry".to_string(),
        timeout_secs: 5,
    }
}

fn voice_clone_config(base_url: String) -> VoiceCloneConfig {
    VoiceCloneConfig {
        base_url,
        api_key: "clone-key".to_string(),
        timeout_secs: 5,
    }
}

fn face_animation_config(space_url: String) -> FaceAnimationConfig {
    FaceAnimationConfig {
        space_url,
        hf_token: Some("hf_test".to_string()),
        timeout_secs: 5,
    }
}

#[tokio::test]
async fn tts_synthesize_follows_the_stream_to_audio_bytes() {
    let server = MockServer::start().await;

    let stream_body = format!(
        "event: generating\ndata: {{\"stage\": \"queued\"}}\n\nevent: completed\ndata: {{\"url\": \"{}/audio/out.mp3\"}}\n",
        server.uri()
    );

    Mock::given(method("POST"))
        .and(path("/tts"))
        .and(header("X-USER-ID", "user-1"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "text": "Hello world",
            "output_format": "mp3"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(stream_body))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/audio/out.mp3"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3 fake mp3".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let client = TtsClient::new(&tts_config(server.uri())).unwrap();
    let audio = client.synthesize("Hello world", None, 15.0).await.unwrap();

    assert_eq!(audio, b"ID3 fake mp3");
}

#[tokio::test]
async fn tts_upstream_failure_surfaces_as_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tts"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let client = TtsClient::new(&tts_config(server.uri())).unwrap();
    let err = client.synthesize("Hello", None, 15.0).await.unwrap_err();

    match err {
        AppError::Provider {
            provider, status, ..
        } => {
            assert_eq!(provider, "tts");
            assert_eq!(status, Some(429));
        }
        other => panic!("expected provider error, got {:?}", other),
    }
}

#[tokio::test]
async fn tts_stream_without_url_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/tts"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("data: {\"stage\": \"queued\"}\n"),
        )
        .mount(&server)
        .await;

    let client = TtsClient::new(&tts_config(server.uri())).unwrap();
    assert!(client.synthesize("Hello", None, 15.0).await.is_err());
}

#[tokio::test]
async fn tts_health_check_reports_unreachable_upstream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/voices"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = TtsClient::new(&tts_config(server.uri())).unwrap();
    let health = client.health_check().await;

    assert!(!health.healthy);
    assert_eq!(health.provider, "tts");
}

#[tokio::test]
async fn voice_clone_posts_base64_sample_and_returns_audio() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/text-to-speech"))
        .and(header("X-API-Key", "clone-key"))
        .and(body_partial_json(serde_json::json!({
            "text": "Say this",
            "mime_type": "audio/wav",
            // base64 of the sample bytes below
            "speaker_audio": "UklGRg=="
        })))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"cloned audio".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let client = VoiceCloneClient::new(&voice_clone_config(server.uri())).unwrap();
    let audio = client
        .speak_with_voice("Say this", b"RIFF", "audio/wav", 15.0)
        .await
        .unwrap();

    assert_eq!(audio, b"cloned audio");
}

#[tokio::test]
async fn voice_clone_rejected_credentials_carry_upstream_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/text-to-speech"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad api key"))
        .mount(&server)
        .await;

    let client = VoiceCloneClient::new(&voice_clone_config(server.uri())).unwrap();
    let err = client
        .speak_with_voice("Say this", b"RIFF", "audio/wav", 15.0)
        .await
        .unwrap_err();

    match err {
        AppError::Provider {
            provider,
            status,
            message,
        } => {
            assert_eq!(provider, "voice_clone");
            assert_eq!(status, Some(401));
            assert!(message.contains("bad api key"));
        }
        other => panic!("expected provider error, got {:?}", other),
    }
}

#[tokio::test]
async fn voice_clone_empty_audio_body_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/audio/text-to-speech"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(Vec::new()))
        .mount(&server)
        .await;

    let client = VoiceCloneClient::new(&voice_clone_config(server.uri())).unwrap();
    assert!(client
        .speak_with_voice("Say this", b"RIFF", "audio/wav", 15.0)
        .await
        .is_err());
}

#[tokio::test]
async fn face_animation_runs_upload_call_poll_download() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/gradio_api/upload"))
        .and(header("Authorization", "Bearer hf_test"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("[\"/tmp/gradio/staged/input.bin\"]"),
        )
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/gradio_api/call/generate"))
        .and(body_partial_json(serde_json::json!({
            "data": [
                { "path": "/tmp/gradio/staged/input.bin" },
                { "path": "/tmp/gradio/staged/input.bin" },
                0.8, 0.8, 0.8, 0.8
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "event_id": "ev123" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let stream_body = format!(
        "event: generating\ndata: null\n\nevent: complete\ndata: [{{\"video\": {{\"url\": \"{}/file=result.mp4\"}}}}]\n",
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path("/gradio_api/call/generate/ev123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(stream_body))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/file=result.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fake mp4".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let client = FaceAnimationClient::new(&face_animation_config(server.uri())).unwrap();
    let video = client
        .animate(AnimationRequest {
            portrait: b"png bytes",
            portrait_filename: "hants.png",
            audio: b"wav bytes",
            audio_filename: "voice.wav",
            smoothed_pitch: 0.8,
            smoothed_yaw: 0.8,
            smoothed_roll: 0.8,
            smoothed_translation: 0.8,
        })
        .await
        .unwrap();

    assert_eq!(video, b"fake mp4");
}

#[tokio::test]
async fn face_animation_error_stream_fails_the_call() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/gradio_api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[\"/tmp/gradio/x\"]"))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/gradio_api/call/generate"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "event_id": "ev9" })),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/gradio_api/call/generate/ev9"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("event: error\ndata: {\"message\": \"GPU quota exceeded\"}\n"),
        )
        .mount(&server)
        .await;

    let client = FaceAnimationClient::new(&face_animation_config(server.uri())).unwrap();
    let err = client
        .animate(AnimationRequest {
            portrait: b"png",
            portrait_filename: "p.png",
            audio: b"wav",
            audio_filename: "a.wav",
            smoothed_pitch: 0.8,
            smoothed_yaw: 0.8,
            smoothed_roll: 0.8,
            smoothed_translation: 0.8,
        })
        .await
        .unwrap_err();

    match err {
        AppError::Provider { provider, .. } => assert_eq!(provider, "face_animation"),
        other => panic!("expected provider error, got {:?}", other),
    }
}

#[tokio::test]
async fn face_animation_health_check_uses_space_info() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/gradio_api/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;

    let client = FaceAnimationClient::new(&face_animation_config(server.uri())).unwrap();
    let health = client.health_check().await;

    assert!(health.healthy);
    assert_eq!(health.provider, "face_animation");
}
