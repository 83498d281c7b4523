//! Client profiles.
//!
//! A profile is the fixed set of query parameters, body fields and user
//! agent that one pretend client application sends. The three profiles are
//! described as tables of [`Slot`]s; building a profile fills the dynamic
//! slots, and [`Profile::apply`] merges the caller's overrides on top. Field
//! order follows the tables, since a signer sees the encoded strings.

use indexmap::IndexMap;
use streamkey_types::{DeviceIdentity, Platform, RoomRequest};

use crate::{MOBILE_APP_ID, STUDIO_APP_ID};

/// Ordered request parameters.
pub type Params = IndexMap<String, String>;

/// User agent of the mobile app profiles.
pub const MOBILE_USER_AGENT: &str = "com.zhiliaoapp.musically/2023508030 (Linux; U; Android 14; en_US_#u-mu-celsius; M2102J20SG; Build/AP2A.240905.003; Cronet/TTNetVersion:f58efab5 2024-06-13 QuicVersion:5d23606e 2024-05-23)";

/// Age restriction value sent when the caller asks for it.
const AGE_RESTRICTED: &str = "4";

/// Where a template field gets its value.
#[derive(Debug, Clone, Copy)]
enum Slot {
    Fixed(&'static str),
    Iid,
    DeviceId,
    OpenUdid,
    StudioVersion,
    SdkVersion,
}

type Template = &'static [(&'static str, Slot)];

use Slot::Fixed;

const STUDIO_QUERY: Template = &[
    ("aid", Fixed("8311")),
    ("app_name", Fixed("tiktok_live_studio")),
    ("channel", Fixed("studio")),
    ("device_platform", Fixed("windows")),
    ("priority_region", Fixed("")),
    ("live_mode", Fixed("6")),
    ("version_code", Slot::StudioVersion),
    ("webcast_sdk_version", Slot::SdkVersion),
    ("webcast_language", Fixed("en")),
    ("app_language", Fixed("en")),
    ("language", Fixed("en")),
    ("browser_version", Fixed("5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) TikTokLIVEStudio/0.69.2 Chrome/108.0.5359.215 Electron/22.3.18-tt.8.release.main.44 TTElectron/22.3.18-tt.8.release.main.44 Safari/537.36")),
    ("browser_name", Fixed("Mozilla")),
    ("browser_platform", Fixed("Win32")),
    ("browser_language", Fixed("en-US")),
    ("screen_height", Fixed("1080")),
    ("screen_width", Fixed("1920")),
    ("timezone_name", Fixed("Africa/Lagos")),
    ("device_id", Fixed("7378193331631310352")),
    ("install_id", Fixed("7378196538524927745")),
];

const STUDIO_BODY: Template = &[
    ("title", Fixed("")),
    ("live_studio", Fixed("1")),
    ("gen_replay", Fixed("false")),
    ("chat_auth", Fixed("1")),
    ("cover_uri", Fixed("")),
    ("close_room_when_close_stream", Fixed("true")),
    ("hashtag_id", Fixed("")),
    ("game_tag_id", Fixed("0")),
    ("screenshot_cover_status", Fixed("1")),
    ("live_sub_only", Fixed("0")),
    ("chat_sub_only_auth", Fixed("2")),
    ("multi_stream_scene", Fixed("0")),
    ("gift_auth", Fixed("1")),
    ("chat_l2", Fixed("1")),
    ("star_comment_switch", Fixed("true")),
    ("multi_stream_source", Fixed("1")),
];

const CAMERA_QUERY: Template = &[
    ("aid", Fixed("1233")),
    ("app_name", Fixed("musical_ly")),
    ("channel", Fixed("googleplay")),
    ("device_platform", Fixed("android")),
    ("iid", Slot::Iid),
    ("device_id", Slot::DeviceId),
    ("openudid", Slot::OpenUdid),
    ("os", Fixed("android")),
    ("ssmix", Fixed("a")),
    ("_rticket", Fixed("1730304478660")),
    ("cdid", Fixed("1fb4eb4c-99f5-4534-a637-e3ac7d52fddb")),
    ("version_code", Fixed("370104")),
    ("version_name", Fixed("37.1.4")),
    ("manifest_version_code", Fixed("2024701040")),
    ("update_version_code", Fixed("2024701040")),
    ("ab_version", Fixed("37.1.4")),
    ("resolution", Fixed("1080*2309")),
    ("dpi", Fixed("410")),
    ("device_type", Fixed("M2102J20SG")),
    ("device_brand", Fixed("POCO")),
    ("language", Fixed("en")),
    ("os_api", Fixed("34")),
    ("os_version", Fixed("14")),
    ("ac", Fixed("wifi")),
    ("is_pad", Fixed("0")),
    ("current_region", Fixed("TN")),
    ("app_type", Fixed("normal")),
    ("sys_region", Fixed("US")),
    ("last_install_time", Fixed("1717207722")),
    ("mcc_mnc", Fixed("60501")),
    ("timezone_name", Fixed("Africa/Tunis")),
    ("carrier_region_v2", Fixed("605")),
    ("residence", Fixed("TN")),
    ("app_language", Fixed("en")),
    ("carrier_region", Fixed("TN")),
    ("ac2", Fixed("wifi5g")),
    ("uoo", Fixed("0")),
    ("op_region", Fixed("TN")),
    ("timezone_offset", Fixed("3600")),
    ("build_number", Fixed("37.1.4")),
    ("host_abi", Fixed("arm64-v8a")),
    ("locale", Fixed("en")),
    ("region", Fixed("US")),
    ("ts", Fixed("1730304477")),
    ("webcast_sdk_version", Fixed("3590")),
    ("webcast_language", Fixed("en")),
    ("webcast_locale", Fixed("en_US_#u-mu-celsius")),
    ("es_version", Fixed("2")),
    ("effect_sdk_version", Fixed("17.0.0")),
    ("current_network_quality_info", Fixed(r#"{"tcp_rtt":64,"quic_rtt":64,"http_rtt":198,"downstream_throughput_kbps":31920,"quic_send_loss_rate":-1,"quic_receive_loss_rate":-1,"net_effective_connection_type":4,"video_download_speed":787}"#)),
];

const CAMERA_BODY: Template = &[
    ("hashtag_id", Fixed("")),
    ("hold_living_room", Fixed("1")),
    ("chat_sub_only_auth", Fixed("2")),
    ("community_flagged_chat_auth", Fixed("2")),
    ("ecom_bc_toggle", Fixed("3")),
    ("live_sub_only", Fixed("0")),
    ("overwrite_push_base_parameter", Fixed("false")),
    ("chat_l_2", Fixed("1")),
    ("caption", Fixed("0")),
    ("overwrite_push_base_min_bit_rate", Fixed("-1")),
    ("title", Fixed("")),
    ("live_sub_only_use_music", Fixed("0")),
    ("mobile_binded", Fixed("0")),
    ("create_source", Fixed("0")),
    ("spam_comments", Fixed("1")),
    ("commercial_content_promote_third_party", Fixed("false")),
    ("grant_level", Fixed("0")),
    ("screenshot_cover_status", Fixed("0")),
    ("overwrite_push_base_max_bit_rate", Fixed("-1")),
    ("enable_http_dns", Fixed("0")),
    ("mobile_validated", Fixed("0")),
    ("live_agreement", Fixed("0")),
    ("commercial_content_promote_myself", Fixed("false")),
    ("allow_preview_duration_exp", Fixed("0")),
    ("is_user_select", Fixed("0")),
    ("transaction_history", Fixed("1")),
    ("probe_recommend_resolution", Fixed("1")),
    ("chat_auth", Fixed("1")),
    ("disable_preview_sub_only", Fixed("0")),
    ("comment_tray_switch", Fixed("1")),
    ("overwrite_push_base_default_bit_rate", Fixed("-1")),
    ("overwrite_push_base_resolution", Fixed("1")),
    ("grant_group", Fixed("1")),
    ("gift_auth", Fixed("1")),
    ("star_comment_switch", Fixed("true")),
    ("has_commerce_goods", Fixed("false")),
    ("open_commercial_content_toggle", Fixed("false")),
    ("event_id", Fixed("-1")),
    ("star_comment_qualification", Fixed("false")),
    ("game_tag_id", Fixed("0")),
    ("community_flagged_chat_review_auth", Fixed("2")),
    ("age_restricted", Fixed("0")),
    ("group_chat_id", Fixed("0")),
    ("optout_gift_gallery", Fixed("false")),
    ("gen_replay", Fixed("false")),
    ("shopping_ranking", Fixed("0")),
];

const SCREENSHARE_QUERY: Template = &[
    ("aid", Fixed("1233")),
    ("app_name", Fixed("musical_ly")),
    ("channel", Fixed("googleplay")),
    ("device_platform", Fixed("android")),
    ("iid", Slot::Iid),
    ("device_id", Slot::DeviceId),
    ("openudid", Slot::OpenUdid),
    ("screen_shot", Fixed("1")),
    ("ac", Fixed("wifi")),
    ("version_code", Fixed("370104")),
    ("version_name", Fixed("37.1.4")),
    ("os", Fixed("android")),
    ("ab_version", Fixed("37.1.4")),
    ("ssmix", Fixed("a")),
    ("device_type", Fixed("M2102J20SG")),
    ("device_brand", Fixed("POCO")),
    ("language", Fixed("en")),
    ("os_api", Fixed("34")),
    ("os_version", Fixed("14")),
    ("manifest_version_code", Fixed("2023701040")),
    ("resolution", Fixed("1080*2309")),
    ("dpi", Fixed("410")),
    ("update_version_code", Fixed("2023701040")),
    ("_rticket", Fixed("1730306440278")),
    ("is_pad", Fixed("0")),
    ("current_region", Fixed("TN")),
    ("app_type", Fixed("normal")),
    ("sys_region", Fixed("US")),
    ("last_install_time", Fixed("1730305998")),
    ("mcc_mnc", Fixed("60501")),
    ("timezone_name", Fixed("Africa/Tunis")),
    ("carrier_region_v2", Fixed("605")),
    ("residence", Fixed("TN")),
    ("app_language", Fixed("en")),
    ("carrier_region", Fixed("TN")),
    ("ac2", Fixed("wifi5g")),
    ("uoo", Fixed("0")),
    ("op_region", Fixed("TN")),
    ("timezone_offset", Fixed("3600")),
    ("build_number", Fixed("37.1.4")),
    ("host_abi", Fixed("arm64-v8a")),
    ("locale", Fixed("en")),
    ("region", Fixed("US")),
    ("ts", Fixed("1730306440")),
    ("cdid", Fixed("bfe31618-558b-4e0d-a4e5-c4221be305a1")),
    ("webcast_sdk_version", Fixed("3490")),
    ("webcast_language", Fixed("en")),
    ("webcast_locale", Fixed("en_US_#u-mu-celsius")),
    ("es_version", Fixed("2")),
    ("effect_sdk_version", Fixed("17.0.0")),
    ("current_network_quality_info", Fixed(r#"{"tcp_rtt":99,"quic_rtt":99,"http_rtt":203,"downstream_throughput_kbps":2734,"quic_send_loss_rate":-1,"quic_receive_loss_rate":-1,"net_effective_connection_type":4,"video_download_speed":7}"#)),
];

const SCREENSHARE_BODY: Template = &[
    ("hashtag_id", Fixed("")),
    ("hold_living_room", Fixed("1")),
    ("chat_sub_only_auth", Fixed("2")),
    ("screen_shot", Fixed("1")),
    ("mute_duration", Fixed("1")),
    ("community_flagged_chat_auth", Fixed("2")),
    ("ecom_bc_toggle", Fixed("3")),
    ("live_sub_only", Fixed("0")),
    ("chat_l_2", Fixed("1")),
    ("caption", Fixed("0")),
    ("live_sub_only_use_music", Fixed("0")),
    ("mobile_binded", Fixed("0")),
    ("create_source", Fixed("0")),
    ("spam_comments", Fixed("1")),
    ("commercial_content_promote_third_party", Fixed("false")),
    ("grant_level", Fixed("0")),
    ("screenshot_cover_status", Fixed("1")),
    ("enable_http_dns", Fixed("0")),
    ("mobile_validated", Fixed("0")),
    ("live_agreement", Fixed("0")),
    ("orientation", Fixed("2")),
    ("commercial_content_promote_myself", Fixed("false")),
    ("allow_preview_duration_exp", Fixed("0")),
    ("transaction_history", Fixed("1")),
    ("chat_auth", Fixed("1")),
    ("disable_preview_sub_only", Fixed("0")),
    ("comment_tray_switch", Fixed("1")),
    ("grant_group", Fixed("1")),
    ("gift_auth", Fixed("1")),
    ("star_comment_switch", Fixed("true")),
    ("has_commerce_goods", Fixed("false")),
    ("open_commercial_content_toggle", Fixed("false")),
    ("event_id", Fixed("-1")),
    ("star_comment_qualification", Fixed("true")),
    ("game_tag_id", Fixed("0")),
    ("community_flagged_chat_review_auth", Fixed("2")),
    ("age_restricted", Fixed("0")),
    ("sdk_key", Fixed("hd")),
    ("live_room_mode", Fixed("4")),
    ("gen_replay", Fixed("false")),
    ("shopping_ranking", Fixed("0")),
];

/// Query sent with the finish request, whatever profile created the room.
const FINISH_QUERY: Template = &[
    ("aid", Fixed("8311")),
    ("app_name", Fixed("tiktok_live_studio")),
    ("channel", Fixed("studio")),
    ("device_platform", Fixed("windows")),
    ("live_mode", Fixed("6")),
];

/// Dynamic values a template may ask for.
struct SlotValues<'a> {
    device: &'a DeviceIdentity,
    studio_version: &'a str,
}

impl SlotValues<'_> {
    fn resolve(&self, slot: Slot) -> String {
        match slot {
            Slot::Fixed(value) => value.to_string(),
            Slot::Iid => self.device.iid.clone(),
            Slot::DeviceId => self.device.device_id.clone(),
            Slot::OpenUdid => self.device.openudid.clone(),
            Slot::StudioVersion => self.studio_version.to_string(),
            Slot::SdkVersion => sdk_version(self.studio_version),
        }
    }

    fn fill(&self, template: Template) -> Params {
        template
            .iter()
            .map(|(key, slot)| (key.to_string(), self.resolve(*slot)))
            .collect()
    }
}

/// The studio's `webcast_sdk_version`: its version with dots and zeros removed.
pub fn sdk_version(studio_version: &str) -> String {
    studio_version.replace('.', "").replace('0', "")
}

/// User agent of the studio profile for a given studio version.
pub fn studio_user_agent(studio_version: &str) -> String {
    format!(
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) TikTokLIVEStudio/{studio_version} Chrome/108.0.5359.215 Electron/22.3.18-tt.8.release.main.44 TTElectron/22.3.18-tt.8.release.main.44 Safari/537.36"
    )
}

/// Query parameters of the finish request.
pub fn finish_query() -> Params {
    let values = SlotValues {
        device: &DeviceIdentity::default(),
        studio_version: "",
    };
    values.fill(FINISH_QUERY)
}

/// A filled-in client profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    platform: Platform,
    user_agent: String,
    query: Params,
    body: Params,
}

impl Profile {
    /// Build the fixed field set for a platform.
    ///
    /// `studio_version` only matters for [`Platform::Studio`]; `device`
    /// only for the mobile profiles.
    pub fn new(platform: Platform, studio_version: &str, device: &DeviceIdentity) -> Self {
        let values = SlotValues {
            device,
            studio_version,
        };
        let (query, body, user_agent) = match platform {
            Platform::Studio => (
                STUDIO_QUERY,
                STUDIO_BODY,
                studio_user_agent(studio_version),
            ),
            Platform::MobileCamera => (CAMERA_QUERY, CAMERA_BODY, MOBILE_USER_AGENT.to_string()),
            Platform::MobileScreenshare => (
                SCREENSHARE_QUERY,
                SCREENSHARE_BODY,
                MOBILE_USER_AGENT.to_string(),
            ),
        };

        Self {
            platform,
            user_agent,
            query: values.fill(query),
            body: values.fill(body),
        }
    }

    /// Build a profile for a request and merge the request's overrides.
    pub fn for_request(request: &RoomRequest, studio_version: &str) -> Self {
        let mut profile = Self::new(request.platform, studio_version, &request.device_or_default());
        profile.apply(request);
        profile
    }

    /// Merge caller overrides into the field set. Overrides win over
    /// template defaults; fields already present keep their position.
    pub fn apply(&mut self, request: &RoomRequest) {
        self.set_body("title", &request.title);
        self.set_body("hashtag_id", &request.topic_id);
        self.set_body("game_tag_id", &request.game_tag_id);
        self.set_body("gen_replay", bool_str(request.gen_replay));

        if self.platform == Platform::Studio {
            self.set_body(
                "close_room_when_close_stream",
                bool_str(request.close_room_when_close_stream),
            );
            self.query
                .insert("priority_region".into(), request.priority_region.clone());
        }

        if request.age_restricted {
            self.set_body("age_restricted", AGE_RESTRICTED);
        }
    }

    /// Set the uploaded cover image's uri.
    pub fn set_cover_uri(&mut self, uri: &str) {
        self.set_body("cover_uri", uri);
    }

    fn set_body(&mut self, key: &str, value: &str) {
        self.body.insert(key.to_string(), value.to_string());
    }

    /// User agent header value.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Numeric application id.
    pub fn app_id(&self) -> u32 {
        match self.platform {
            Platform::Studio => STUDIO_APP_ID,
            Platform::MobileCamera | Platform::MobileScreenshare => MOBILE_APP_ID,
        }
    }

    /// Query parameters, in send order.
    pub fn query(&self) -> &Params {
        &self.query
    }

    /// Body fields, in send order.
    pub fn body(&self) -> &Params {
        &self.body
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
