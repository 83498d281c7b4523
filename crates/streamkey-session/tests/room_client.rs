//! Room client behaviour against a mock platform.

use std::io::Write;
use std::time::Duration;

use serde_json::{json, Value};
use streamkey_session::{
    CookieJar, FinishOutcome, RoomClient, RoomOutcome, SessionConfig, SessionError, Signer,
    SigningContext, MOBILE_USER_AGENT, SENTINEL_HOST,
};
use streamkey_types::{DeviceIdentity, Platform, RoomRequest};
use tokio::runtime::Runtime;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    server: MockServer,
    rt: Runtime,
}

impl Harness {
    fn new() -> Self {
        let rt = Runtime::new().unwrap();
        let server = rt.block_on(MockServer::start());
        Self { server, rt }
    }

    fn mount(&self, mock: Mock) {
        self.rt.block_on(mock.mount(&self.server));
    }

    fn config(&self) -> SessionConfig {
        SessionConfig::local(&self.server.uri())
    }

    fn client(&self) -> RoomClient {
        let jar = CookieJar::from_pairs([("sessionid", "abc"), ("tt_csrf", "xyz")]);
        RoomClient::new(jar, self.config()).unwrap()
    }

    /// Domain lookup mapping the sentinel to an intermediate host, and the
    /// intermediate host to this server.
    fn mount_domains(&self) {
        let host = self.server.address().to_string();
        self.mount(
            Mock::given(method("GET"))
                .and(path("/get_domains/v4/"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "data": {
                        "ttnet_dispatch_actions": [
                            { "act_priority": 10 },
                            { "param": { "strategy_info": { SENTINEL_HOST: "webcast-edge.example" } } },
                            { "param": { "strategy_info": { "webcast-edge.example": host } } },
                        ]
                    }
                }))),
        );
    }

    fn mount_version(&self, version: &str) {
        self.mount(
            Mock::given(method("GET"))
                .and(path("/api/sdk/check_update"))
                .and(query_param("branch", "studio/release/stable"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "data": { "manifest": { "win32": { "version": version } } }
                }))),
        );
    }

    fn requests_to(&self, wanted: &str) -> usize {
        self.rt
            .block_on(self.server.received_requests())
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == wanted)
            .count()
    }
}

fn created(push_url: &str) -> Value {
    json!({
        "data": {
            "stream_url": { "rtmp_push_url": push_url },
            "share_url": "https://www.example.com/@me/live"
        }
    })
}

fn device() -> DeviceIdentity {
    DeviceIdentity {
        openudid: "udid-1".into(),
        device_id: "dev-2".into(),
        iid: "iid-3".into(),
    }
}

#[test]
fn test_resolve_endpoint_follows_two_hops() {
    let h = Harness::new();
    h.mount_domains();

    let base = h.client().resolve_endpoint().unwrap();
    assert_eq!(base, format!("http://{}/", h.server.address()));
}

#[test]
fn test_resolve_endpoint_without_sentinel_fails() {
    let h = Harness::new();
    h.mount(
        Mock::given(method("GET"))
            .and(path("/get_domains/v4/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "ttnet_dispatch_actions": [
                    { "param": { "strategy_info": { "other.example": "x" } } }
                ] }
            }))),
    );

    let client = h.client();
    assert!(matches!(
        client.resolve_endpoint(),
        Err(SessionError::EndpointResolution(_))
    ));
    assert!(matches!(
        client.create_room(&RoomRequest::new("title", "6")),
        Err(SessionError::EndpointResolution(_))
    ));
    assert_eq!(h.requests_to("/webcast/room/create/"), 0);
}

#[test]
fn test_create_room_studio_profile() {
    let h = Harness::new();
    h.mount_domains();
    h.mount_version("0.86.0");
    h.mount(
        Mock::given(method("POST"))
            .and(path("/webcast/room/create/"))
            .and(query_param("aid", "8311"))
            .and(query_param("version_code", "0.86.0"))
            .and(query_param("webcast_sdk_version", "86"))
            .and(query_param("priority_region", "US"))
            .and(header("cookie", "sessionid=abc; tt_csrf=xyz"))
            .and(body_string_contains("title=Late+night+chat"))
            .and(body_string_contains("hashtag_id=42"))
            .and(body_string_contains("gen_replay=true"))
            .and(body_string_contains("close_room_when_close_stream=true"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(created("rtmp://push.example/stage/KEY123")),
            )
            .expect(1),
    );

    let request = RoomRequest {
        title: "Late night chat".into(),
        topic_id: "42".into(),
        gen_replay: true,
        priority_region: "US".into(),
        ..Default::default()
    };

    let outcome = h.client().create_room(&request).unwrap();
    let room = outcome.room().expect("room should be created");
    assert_eq!(room.base_stream_url(), "rtmp://push.example/stage");
    assert_eq!(room.stream_key(), "KEY123");
    assert_eq!(room.share_url, "https://www.example.com/@me/live");
}

#[test]
fn test_create_room_mobile_profile_skips_version_check() {
    let h = Harness::new();
    h.mount_domains();
    h.mount(
        Mock::given(method("GET"))
            .and(path("/api/sdk/check_update"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0),
    );
    h.mount(
        Mock::given(method("POST"))
            .and(path("/webcast/room/create/"))
            .and(query_param("aid", "1233"))
            .and(query_param("iid", "iid-3"))
            .and(query_param("device_id", "dev-2"))
            .and(query_param("openudid", "udid-1"))
            .and(header("user-agent", MOBILE_USER_AGENT))
            .and(body_string_contains("hashtag_id=6"))
            .respond_with(ResponseTemplate::new(200).set_body_json(created("rtmp://h/app/K"))),
    );

    let request = RoomRequest {
        title: "Camera".into(),
        topic_id: "6".into(),
        platform: Platform::MobileCamera,
        device: Some(device()),
        ..Default::default()
    };

    assert!(h.client().create_room(&request).unwrap().is_created());
}

#[test]
fn test_create_room_rejection_is_not_an_error() {
    let h = Harness::new();
    h.mount_domains();
    h.mount_version("0.86.0");
    h.mount(
        Mock::given(method("POST"))
            .and(path("/webcast/room/create/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "prompts": "Your account is not eligible to go LIVE" }
            }))),
    );

    match h.client().create_room(&RoomRequest::new("t", "6")).unwrap() {
        RoomOutcome::Rejected(rejection) => {
            assert_eq!(rejection.to_string(), "Your account is not eligible to go LIVE");
        }
        RoomOutcome::Created(room) => panic!("unexpected room: {room:?}"),
    }
}

#[test]
fn test_invalid_request_sends_nothing() {
    let h = Harness::new();
    h.mount_domains();

    let request = RoomRequest {
        title: "t".into(),
        topic_id: "6".into(),
        platform: Platform::MobileScreenshare,
        device: None,
        ..Default::default()
    };

    assert!(matches!(
        h.client().create_room(&request),
        Err(SessionError::InvalidRequest(_))
    ));
    assert_eq!(h.requests_to("/get_domains/v4/"), 0);
}

#[test]
fn test_cover_upload_feeds_create() {
    let h = Harness::new();
    h.mount_domains();
    h.mount_version("0.86.0");
    h.mount(
        Mock::given(method("POST"))
            .and(path("/webcast/room/upload/image/"))
            .and(query_param("aid", "8311"))
            .and(body_string_contains("filename=\"crop_"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "uri": "tos/cover/123" }
            })))
            .expect(1),
    );
    h.mount(
        Mock::given(method("POST"))
            .and(path("/webcast/room/create/"))
            .and(body_string_contains("cover_uri=tos%2Fcover%2F123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(created("rtmp://h/app/K")))
            .expect(1),
    );

    let mut cover = tempfile::NamedTempFile::new().unwrap();
    cover.write_all(b"PNG fake image").unwrap();

    let request = RoomRequest {
        cover_path: Some(cover.path().to_path_buf()),
        ..RoomRequest::new("With cover", "6")
    };

    assert!(h.client().create_room(&request).unwrap().is_created());
}

#[test]
fn test_end_room_success_ignores_other_content() {
    let h = Harness::new();
    h.mount_domains();
    h.mount(
        Mock::given(method("POST"))
            .and(path("/webcast/room/finish_abnormal/"))
            .and(query_param("aid", "8311"))
            .and(query_param("live_mode", "6"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status_code": 30003,
                "data": { "message": "room already closed" }
            }))),
    );

    assert_eq!(h.client().end_room().unwrap(), FinishOutcome::Finished);
}

#[test]
fn test_end_room_rejection() {
    let h = Harness::new();
    h.mount_domains();
    h.mount(
        Mock::given(method("POST"))
            .and(path("/webcast/room/finish_abnormal/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "prompts": "No live room" }
            }))),
    );

    let outcome = h.client().end_room().unwrap();
    assert!(!outcome.is_finished());
}

#[test]
fn test_credential_file_missing_value_fails_before_network() {
    let h = Harness::new();
    h.mount_domains();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(br#"[{"name":"sessionid","value":"abc"},{"name":"sid_tt"}]"#)
        .unwrap();

    let result = RoomClient::from_cookie_file(file.path(), h.config());
    assert!(matches!(result, Err(SessionError::Credential(_))));
    assert_eq!(h.requests_to("/get_domains/v4/"), 0);
}

#[test]
fn test_version_check_falls_back() {
    let h = Harness::new();
    h.mount(
        Mock::given(method("GET"))
            .and(path("/api/sdk/check_update"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down")),
    );

    assert_eq!(h.client().latest_studio_version(), "0.99.0");
}

#[test]
fn test_game_tags() {
    let h = Harness::new();
    h.mount(
        Mock::given(method("GET"))
            .and(path("/webcast/room/hashtag/list/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "game_tag_list": [
                    { "id": 77, "show_name": "Chess" },
                    { "id": 78, "show_name": "Minecraft" }
                ] }
            }))),
    );

    let tags = h.client().game_tags();
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].id, "77");
    assert_eq!(tags[1].show_name, "Minecraft");
}

#[test]
fn test_lookup_without_cookies_sends_no_cookie_header() {
    let h = Harness::new();
    h.mount(
        Mock::given(method("GET"))
            .and(path("/webcast/room/hashtag/list/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "game_tag_list": [{ "id": 77, "show_name": "Chess" }] }
            }))),
    );

    let client = RoomClient::new(CookieJar::default(), h.config()).unwrap();
    assert_eq!(client.game_tags().len(), 1);

    let requests = h.rt.block_on(h.server.received_requests()).unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("cookie"));
}

#[test]
fn test_unusable_cookie_value_is_invalid_request() {
    let h = Harness::new();
    h.mount_domains();

    let jar = CookieJar::from_pairs([("sessionid", "abc\ndef")]);
    let client = RoomClient::new(jar, h.config()).unwrap();
    assert!(matches!(
        client.resolve_endpoint(),
        Err(SessionError::InvalidRequest(_))
    ));
    assert_eq!(h.requests_to("/get_domains/v4/"), 0);
}

#[test]
fn test_request_timeout_is_transport_error() {
    let h = Harness::new();
    h.mount(
        Mock::given(method("GET"))
            .and(path("/get_domains/v4/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": { "ttnet_dispatch_actions": [] } }))
                    .set_delay(Duration::from_secs(3)),
            ),
    );

    let config = h.config().with_timeout(Duration::from_millis(200));
    let client = RoomClient::new(CookieJar::default(), config).unwrap();
    assert!(matches!(
        client.resolve_endpoint(),
        Err(SessionError::Transport(_))
    ));
}

struct FixedSigner;

impl Signer for FixedSigner {
    fn sign(&self, ctx: &SigningContext<'_>) -> Result<Vec<(String, String)>, SessionError> {
        Ok(vec![
            ("x-gorgon".to_string(), format!("signed-{}", ctx.app_id)),
            ("x-khronos".to_string(), ctx.epoch.to_string()),
        ])
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

#[test]
fn test_signer_headers_attached_to_platform_calls() {
    let h = Harness::new();
    h.mount_domains();
    h.mount(
        Mock::given(method("POST"))
            .and(path("/webcast/room/finish_abnormal/"))
            .and(header("x-gorgon", "signed-8311"))
            .and(header("x-khronos", "1611921764"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .expect(1),
    );

    let client = h.client().with_signer(FixedSigner);
    assert!(client.end_room().unwrap().is_finished());
}
