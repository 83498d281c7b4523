//! Authenticated room client.

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, COOKIE, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::Value;
use streamkey_types::{Platform, RoomRequest};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, instrument, warn};

use crate::config::SessionConfig;
use crate::credentials::CookieJar;
use crate::endpoint::EndpointMap;
use crate::error::SessionError;
use crate::profile::{finish_query, studio_user_agent, Params, Profile};
use crate::response::{
    parse_create_response, parse_finish_response, parse_game_tags, parse_studio_version,
    parse_upload_response, FinishOutcome, GameTag, RoomOutcome,
};
use crate::signer::{NoopSigner, Signer, SigningContext, SIGNING_EPOCH};
use crate::{
    SessionResult, ROOM_CREATE_PATH, ROOM_FINISH_PATH, STUDIO_APP_ID, UPLOAD_IMAGE_PATH,
};

/// Identity a request is sent under.
struct Caller<'a> {
    user_agent: Option<&'a str>,
    app_id: u32,
}

/// Body of a POST request.
enum Payload<'a> {
    None,
    Form(&'a Params),
    Multipart(Form),
}

/// Client for one authenticated session.
///
/// The API is blocking. Like the RTMP client, it owns a private runtime and
/// drives an async HTTP client on it, so it must not be called from inside
/// another async runtime.
///
/// Headers are built per request from the cookie jar, the active profile
/// and the signer; nothing set for one call carries over to the next.
pub struct RoomClient {
    http: Client,
    runtime: Runtime,
    config: SessionConfig,
    cookies: CookieJar,
    signer: Arc<dyn Signer>,
}

impl RoomClient {
    /// Create a client from an already loaded cookie jar.
    pub fn new(cookies: CookieJar, config: SessionConfig) -> SessionResult<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| SessionError::Runtime(e.to_string()))?;

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            runtime,
            config,
            cookies,
            signer: Arc::new(NoopSigner),
        })
    }

    /// Load and validate a credential file, then create a client.
    ///
    /// Nothing is sent if the file is invalid.
    pub fn from_cookie_file(path: impl AsRef<Path>, config: SessionConfig) -> SessionResult<Self> {
        let cookies = CookieJar::load(path)?;
        Self::new(cookies, config)
    }

    /// Replace the request signer.
    pub fn with_signer(mut self, signer: impl Signer + 'static) -> Self {
        self.signer = Arc::new(signer);
        self
    }

    /// The session's cookies.
    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Resolve the API base URL through the domain lookup.
    #[instrument(name = "resolve_endpoint", skip(self))]
    pub fn resolve_endpoint(&self) -> SessionResult<String> {
        self.runtime.block_on(self.resolve_endpoint_async())
    }

    /// Latest studio version, or the configured fallback on any failure.
    #[instrument(name = "studio_version", skip(self))]
    pub fn latest_studio_version(&self) -> String {
        self.runtime.block_on(self.latest_studio_version_async())
    }

    /// Create a room.
    ///
    /// A refusal by the platform is `Ok(RoomOutcome::Rejected(_))`; errors
    /// are reserved for invalid requests, transport failures and responses
    /// of unknown shape.
    #[instrument(name = "create_room", skip(self, request), fields(platform = %request.platform))]
    pub fn create_room(&self, request: &RoomRequest) -> SessionResult<RoomOutcome> {
        self.runtime.block_on(self.create_room_async(request))
    }

    /// End the session's active room.
    ///
    /// No room id is sent; the platform picks the room from the cookies.
    #[instrument(name = "end_room", skip(self))]
    pub fn end_room(&self) -> SessionResult<FinishOutcome> {
        self.runtime.block_on(self.end_room_async())
    }

    /// Upload a cover image and return the uri the platform assigns.
    ///
    /// Returns an empty string if the response has no uri.
    #[instrument(name = "upload_cover", skip(self, profile), fields(path = %path.display()))]
    pub fn upload_cover(&self, path: &Path, profile: &Profile) -> SessionResult<String> {
        self.runtime.block_on(async {
            let base_url = self.resolve_endpoint_async().await?;
            self.upload_cover_async(&base_url, path, profile).await
        })
    }

    /// Game tags offered by the platform; empty on any failure.
    #[instrument(name = "game_tags", skip(self))]
    pub fn game_tags(&self) -> Vec<GameTag> {
        self.runtime.block_on(async {
            match self.get_json(&self.config.game_tags_url, &[]).await {
                Ok(body) => parse_game_tags(&body),
                Err(e) => {
                    warn!("Failed to fetch game tags: {}", e);
                    Vec::new()
                }
            }
        })
    }

    async fn resolve_endpoint_async(&self) -> SessionResult<String> {
        let body = self.get_json(&self.config.domains_url, &[]).await?;
        let map = EndpointMap::from_response(&body)?;
        let base_url = map.resolve_base_url(&self.config.sentinel_host, &self.config.api_scheme)?;
        debug!(%base_url, actions = map.len(), "Resolved API endpoint");
        Ok(base_url)
    }

    async fn latest_studio_version_async(&self) -> String {
        let result = self
            .get_json(&self.config.version_check_url, &self.config.version_check_query)
            .await;

        match result.map(|body| parse_studio_version(&body)) {
            Ok(Some(version)) => version,
            Ok(None) => {
                warn!("Update manifest has no win32 version, using fallback");
                self.config.fallback_studio_version.clone()
            }
            Err(e) => {
                warn!("Failed to fetch latest version: {}", e);
                self.config.fallback_studio_version.clone()
            }
        }
    }

    async fn create_room_async(&self, request: &RoomRequest) -> SessionResult<RoomOutcome> {
        request.validate()?;

        let base_url = self.resolve_endpoint_async().await?;
        let studio_version = match request.platform {
            Platform::Studio => self.latest_studio_version_async().await,
            Platform::MobileCamera | Platform::MobileScreenshare => String::new(),
        };

        let mut profile = Profile::for_request(request, &studio_version);

        if let Some(path) = &request.cover_path {
            let uri = self.upload_cover_async(&base_url, path, &profile).await?;
            profile.set_cover_uri(&uri);
        }

        info!(title = %request.title, topic = %request.topic_id, "Creating room");

        let body = self
            .post_json(
                &format!("{base_url}{ROOM_CREATE_PATH}"),
                profile.query(),
                Payload::Form(profile.body()),
                &Caller {
                    user_agent: Some(profile.user_agent()),
                    app_id: profile.app_id(),
                },
            )
            .await?;

        let outcome = parse_create_response(&body)?;
        match &outcome {
            RoomOutcome::Created(room) => {
                info!(server = %room.base_stream_url(), share_url = %room.share_url, "Room created");
            }
            RoomOutcome::Rejected(rejection) => {
                warn!(prompts = %rejection, "Room creation rejected");
            }
        }
        Ok(outcome)
    }

    async fn end_room_async(&self) -> SessionResult<FinishOutcome> {
        let base_url = self.resolve_endpoint_async().await?;
        let user_agent = studio_user_agent(&self.config.fallback_studio_version);

        let body = self
            .post_json(
                &format!("{base_url}{ROOM_FINISH_PATH}"),
                &finish_query(),
                Payload::None,
                &Caller {
                    user_agent: Some(&user_agent),
                    app_id: STUDIO_APP_ID,
                },
            )
            .await?;

        let outcome = parse_finish_response(&body);
        match &outcome {
            FinishOutcome::Finished => info!("Room finished"),
            FinishOutcome::Rejected(rejection) => {
                warn!(prompts = %rejection, "Room finish rejected");
            }
        }
        Ok(outcome)
    }

    async fn upload_cover_async(
        &self,
        base_url: &str,
        path: &Path,
        profile: &Profile,
    ) -> SessionResult<String> {
        let data = tokio::fs::read(path).await?;
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        let part = Part::bytes(data)
            .file_name(format!("crop_{millis}.png"))
            .mime_str("image/png")
            .map_err(|e| SessionError::InvalidRequest(e.to_string()))?;
        let form = Form::new().part("file", part);

        let body = self
            .post_json(
                &format!("{base_url}{UPLOAD_IMAGE_PATH}"),
                profile.query(),
                Payload::Multipart(form),
                &Caller {
                    user_agent: Some(profile.user_agent()),
                    app_id: profile.app_id(),
                },
            )
            .await?;

        let uri = parse_upload_response(&body);
        if uri.is_empty() {
            warn!("Cover upload response has no uri");
        } else {
            debug!(%uri, "Cover uploaded");
        }
        Ok(uri)
    }

    async fn get_json(&self, url: &str, query: &[(String, String)]) -> SessionResult<Value> {
        debug!(%url, "GET");
        let mut req = self.http.get(url);
        let cookies = self.cookies.header_value();
        if !cookies.is_empty() {
            req = req.header(COOKIE, header_value(&cookies)?);
        }
        if !query.is_empty() {
            req = req.query(query);
        }

        let resp = req.send().await?;
        debug!(status = %resp.status(), "Response received");
        Ok(resp.json::<Value>().await?)
    }

    async fn post_json(
        &self,
        url: &str,
        query: &Params,
        payload: Payload<'_>,
        caller: &Caller<'_>,
    ) -> SessionResult<Value> {
        let query_string = encode(query)?;
        let body_string = match &payload {
            Payload::Form(fields) => encode(fields)?,
            Payload::None | Payload::Multipart(_) => String::new(),
        };
        let cookie_header = self.cookies.header_value();

        let headers = self.build_headers(&query_string, &body_string, &cookie_header, caller)?;

        let separator = if url.contains('?') { '&' } else { '?' };
        let full_url = format!("{url}{separator}{query_string}");
        debug!(%url, fields = query.len(), "POST");

        let req = self.http.post(full_url).headers(headers);
        let req = match payload {
            Payload::None => req,
            Payload::Form(_) => req
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body_string),
            Payload::Multipart(form) => req.multipart(form),
        };

        let resp = req.send().await?;
        debug!(status = %resp.status(), "Response received");
        Ok(resp.json::<Value>().await?)
    }

    /// Per-request headers: user agent, cookies, then the signer's output.
    fn build_headers(
        &self,
        query: &str,
        body: &str,
        cookies: &str,
        caller: &Caller<'_>,
    ) -> SessionResult<HeaderMap> {
        let mut headers = HeaderMap::new();

        if let Some(user_agent) = caller.user_agent {
            headers.insert(USER_AGENT, header_value(user_agent)?);
        }
        if !cookies.is_empty() {
            headers.insert(COOKIE, header_value(cookies)?);
        }

        let ctx = SigningContext {
            query,
            body,
            cookies,
            app_id: caller.app_id,
            epoch: SIGNING_EPOCH,
        };
        let signed = self.signer.sign(&ctx)?;
        if !signed.is_empty() {
            debug!(signer = self.signer.name(), headers = signed.len(), "Request signed");
        }
        for (name, value) in signed {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SessionError::InvalidRequest(format!("bad signature header: {e}")))?;
            headers.insert(name, header_value(&value)?);
        }

        Ok(headers)
    }
}

fn encode(params: &Params) -> SessionResult<String> {
    serde_urlencoded::to_string(params).map_err(|e| SessionError::InvalidRequest(e.to_string()))
}

fn header_value(value: &str) -> SessionResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| SessionError::InvalidRequest(format!("bad header value: {e}")))
}
