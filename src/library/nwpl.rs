//! New Westminster Public Library adapter (`BiblioCommons` site).
//!
//! Login is a browser emulation: fetch the login page for its CSRF token and
//! cookies, post the card credentials as a form, then keep only the session
//! cookies from the response. Checkouts come from the `BiblioCommons`
//! gateway JSON API, which is undocumented and may change without notice.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, COOKIE, ORIGIN, REFERER, SET_COOKIE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::html::extract_meta_content;
use super::http_client::build_library_http_client;
use super::{CatalogClient, CheckoutRecord, LibraryError, LibrarySession, SessionAcquirer, SessionCookies};

const SYSTEM: &str = "nwpl";
const DEFAULT_LOGIN_BASE_URL: &str = "https://newwestminster.bibliocommons.com";
const DEFAULT_GATEWAY_BASE_URL: &str = "https://gateway.bibliocommons.com";
const DEFAULT_LIBRARY_SLUG: &str = "newwestminster";

const CSRF_META_NAME: &str = "csrf-token";
const SESSION_ID_COOKIE: &str = "session_id";
const ACCESS_TOKEN_COOKIE: &str = "bc_access_token";
const CHECKOUT_PAGE_SIZE: &str = "100";

/// Cookies kept from the login response. Everything else is discarded.
pub const NWPL_SESSION_COOKIES: [&str; 5] = [
    "_live_bcui_session_id",
    "NERF_SRV",
    "branch",
    SESSION_ID_COOKIE,
    ACCESS_TOKEN_COOKIE,
];

/// Maps a session id to the account id used by the checkouts API.
pub type AccountIdDerivation = fn(&str) -> Result<String, LibraryError>;

/// Derives the checkouts account id from a `BiblioCommons` session id.
///
/// Takes the trailing dash-delimited numeric suffix and adds one
/// (`"abcd-1234-77"` gives `"78"`). Fragile: this offset was observed
/// against the live site, not documented by it. Adapters for other systems
/// must not reuse it.
///
/// # Errors
///
/// Returns [`LibraryError::Protocol`] when the suffix is not a number.
pub fn derive_account_id(session_id: &str) -> Result<String, LibraryError> {
    let suffix = session_id.rsplit('-').next().unwrap_or_default().trim();
    suffix
        .parse::<u64>()
        .ok()
        .and_then(|value| value.checked_add(1))
        .map(|value| value.to_string())
        .ok_or_else(|| {
            LibraryError::protocol(SYSTEM, "session id does not end in a numeric account suffix")
        })
}

/// Base URLs of the NWPL site and gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NwplEndpoints {
    /// Origin serving the HTML login page.
    pub login_base_url: String,
    /// Origin serving the JSON gateway API.
    pub gateway_base_url: String,
    /// Library path segment in gateway URLs.
    pub library_slug: String,
}

impl Default for NwplEndpoints {
    fn default() -> Self {
        Self {
            login_base_url: DEFAULT_LOGIN_BASE_URL.to_string(),
            gateway_base_url: DEFAULT_GATEWAY_BASE_URL.to_string(),
            library_slug: DEFAULT_LIBRARY_SLUG.to_string(),
        }
    }
}

impl NwplEndpoints {
    /// Endpoints with custom base URLs (used by integration tests).
    #[must_use]
    pub fn with_base_urls(login_base_url: impl Into<String>, gateway_base_url: impl Into<String>) -> Self {
        Self {
            login_base_url: login_base_url.into(),
            gateway_base_url: gateway_base_url.into(),
            library_slug: DEFAULT_LIBRARY_SLUG.to_string(),
        }
    }

    fn login_base(&self) -> &str {
        self.login_base_url.trim_end_matches('/')
    }

    fn login_page_url(&self) -> String {
        format!("{}/user/login", self.login_base())
    }

    fn checkouts_url(&self) -> String {
        format!(
            "{}/v2/libraries/{}/checkouts",
            self.gateway_base_url.trim_end_matches('/'),
            self.library_slug
        )
    }
}

/// Logs in to the NWPL site with a card number and PIN.
pub struct NwplSessionAcquirer {
    client: Client,
    endpoints: NwplEndpoints,
    derive_account_id: AccountIdDerivation,
}

impl NwplSessionAcquirer {
    /// Creates an acquirer against the live NWPL site.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self, LibraryError> {
        Self::with_endpoints(NwplEndpoints::default())
    }

    /// Creates an acquirer against custom endpoints.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the HTTP client cannot be constructed.
    pub fn with_endpoints(endpoints: NwplEndpoints) -> Result<Self, LibraryError> {
        Ok(Self {
            client: build_library_http_client(SYSTEM)?,
            endpoints,
            derive_account_id,
        })
    }

    /// Replaces the session-id to account-id derivation.
    #[must_use]
    pub fn with_account_id_derivation(mut self, derivation: AccountIdDerivation) -> Self {
        self.derive_account_id = derivation;
        self
    }

    async fn fetch_login_page(&self) -> Result<(String, SessionCookies), LibraryError> {
        let login_url = self.endpoints.login_page_url();
        debug!(url = %login_url, "Fetching login page");

        let response = self
            .client
            .get(&login_url)
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .header(REFERER, format!("{}/", self.endpoints.login_base()))
            .send()
            .await
            .map_err(|error| LibraryError::network(SYSTEM, &error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LibraryError::upstream(SYSTEM, "login page", status.as_u16()));
        }

        let cookies = set_cookies(&response);
        let html = response
            .text()
            .await
            .map_err(|error| LibraryError::network(SYSTEM, &error))?;

        let csrf_token = extract_meta_content(&html, CSRF_META_NAME)
            .ok_or_else(|| LibraryError::protocol(SYSTEM, "CSRF token not found on login page"))?;

        Ok((csrf_token, cookies))
    }

    async fn submit_login(
        &self,
        csrf_token: &str,
        page_cookies: &SessionCookies,
        card_number: &str,
        pin: &str,
    ) -> Result<SessionCookies, LibraryError> {
        let login_url = self.endpoints.login_page_url();
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("utf8", "\u{2713}")
            .append_pair("authenticity_token", csrf_token)
            .append_pair("name", card_number)
            .append_pair("user_pin", pin)
            .append_pair("local", "false")
            .finish();

        let mut request = self
            .client
            .post(format!("{login_url}?destination=user_dashboard"))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("X-CSRF-Token", csrf_token)
            .header("X-Requested-With", "XMLHttpRequest")
            .header(REFERER, login_url.as_str())
            .header(ACCEPT, "application/json, text/javascript, */*; q=0.01");
        if !page_cookies.is_empty() {
            request = request.header(COOKIE, page_cookies.to_header());
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|error| LibraryError::network(SYSTEM, &error))?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(LibraryError::authentication(
                SYSTEM,
                &format!("login rejected with HTTP {}", status.as_u16()),
            ));
        }
        if !status.is_success() && !status.is_redirection() {
            return Err(LibraryError::upstream(SYSTEM, "login", status.as_u16()));
        }

        Ok(set_cookies(&response))
    }
}

#[async_trait]
impl SessionAcquirer for NwplSessionAcquirer {
    #[instrument(skip(self, card_number, pin), fields(system = SYSTEM))]
    async fn acquire(&self, card_number: &str, pin: &str) -> Result<LibrarySession, LibraryError> {
        let (csrf_token, page_cookies) = self.fetch_login_page().await?;
        debug!(cookie_count = page_cookies.len(), "Login page loaded");

        let login_cookies = self
            .submit_login(&csrf_token, &page_cookies, card_number, pin)
            .await?;
        let cookies = login_cookies.retain_allowed(&NWPL_SESSION_COOKIES);
        debug!(
            received = login_cookies.len(),
            kept = cookies.len(),
            "Filtered login cookies"
        );

        let session_id = non_empty_cookie(&cookies, SESSION_ID_COOKIE);
        let access_token = non_empty_cookie(&cookies, ACCESS_TOKEN_COOKIE);
        let (Some(session_id), Some(access_token)) = (session_id, access_token) else {
            return Err(LibraryError::authentication(
                SYSTEM,
                "login response did not set session_id and bc_access_token cookies",
            ));
        };

        let account_id = (self.derive_account_id)(&session_id)?;
        info!(account_id = %account_id, "Logged in to library account");

        Ok(LibrarySession {
            cookies,
            session_id,
            access_token,
            account_id,
        })
    }
}

impl std::fmt::Debug for NwplSessionAcquirer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NwplSessionAcquirer")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

/// Lists NWPL checkouts through the gateway API.
pub struct NwplCatalogClient {
    client: Client,
    endpoints: NwplEndpoints,
}

impl NwplCatalogClient {
    /// Creates a client against the live NWPL gateway.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the HTTP client cannot be constructed.
    pub fn new() -> Result<Self, LibraryError> {
        Self::with_endpoints(NwplEndpoints::default())
    }

    /// Creates a client against custom endpoints.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the HTTP client cannot be constructed.
    pub fn with_endpoints(endpoints: NwplEndpoints) -> Result<Self, LibraryError> {
        Ok(Self {
            client: build_library_http_client(SYSTEM)?,
            endpoints,
        })
    }

    fn checkouts_request_url(&self, account_id: &str) -> Result<Url, LibraryError> {
        let mut url = Url::parse(&self.endpoints.checkouts_url()).map_err(|error| {
            LibraryError::protocol(SYSTEM, &format!("invalid gateway URL: {error}"))
        })?;
        url.query_pairs_mut()
            .append_pair("accountId", account_id)
            .append_pair("size", CHECKOUT_PAGE_SIZE)
            .append_pair("status", "OUT")
            .append_pair("page", "1")
            .append_pair("sort", "status")
            .append_pair("materialType", "")
            .append_pair("locale", "en-CA");
        Ok(url)
    }
}

#[async_trait]
impl CatalogClient for NwplCatalogClient {
    #[instrument(skip(self, session), fields(system = SYSTEM, account_id = %session.account_id))]
    async fn list_checkouts(
        &self,
        session: &LibrarySession,
    ) -> Result<Vec<CheckoutRecord>, LibraryError> {
        let url = self.checkouts_request_url(&session.account_id)?;
        let login_base = self.endpoints.login_base();

        let response = self
            .client
            .get(url)
            .header(COOKIE, session.cookies.to_header())
            .header("X-Session-Id", session.session_id.as_str())
            .header("X-Access-Token", session.access_token.as_str())
            .header(ACCEPT, "application/json")
            .header(REFERER, format!("{login_base}/"))
            .header(ORIGIN, login_base)
            .send()
            .await
            .map_err(|error| LibraryError::network(SYSTEM, &error))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Checkouts request failed");
            return Err(LibraryError::upstream(SYSTEM, "checkouts", status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|error| LibraryError::network(SYSTEM, &error))?;
        let records = parse_checkouts_payload(&body)?;
        info!(count = records.len(), "Fetched checkouts");
        Ok(records)
    }
}

impl std::fmt::Debug for NwplCatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NwplCatalogClient")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct CheckoutsPayload {
    entities: Option<Entities>,
}

#[derive(Debug, Deserialize)]
struct Entities {
    checkouts: Option<BTreeMap<String, serde_json::Value>>,
    bibs: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCheckout {
    metadata_id: Option<String>,
    due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBib {
    brief_info: Option<BriefInfo>,
}

#[derive(Debug, Deserialize)]
struct BriefInfo {
    title: Option<String>,
    subtitle: Option<String>,
    isbns: Option<Vec<String>>,
    jacket: Option<Jacket>,
}

#[derive(Debug, Deserialize)]
struct Jacket {
    small: Option<String>,
    medium: Option<String>,
    large: Option<String>,
}

/// Joins gateway `checkouts` to `bibs` and normalizes each pair.
///
/// Entries are decoded one at a time, so a malformed checkout or bib only
/// drops itself. Checkouts without a matching bib, title or readable due
/// date are skipped.
fn parse_checkouts_payload(body: &str) -> Result<Vec<CheckoutRecord>, LibraryError> {
    let payload: CheckoutsPayload = serde_json::from_str(body).map_err(|error| {
        LibraryError::protocol(SYSTEM, &format!("checkouts payload is not valid JSON: {error}"))
    })?;

    let Some(entities) = payload.entities else {
        return Ok(Vec::new());
    };
    let (Some(checkouts), Some(bibs)) = (entities.checkouts, entities.bibs) else {
        return Ok(Vec::new());
    };

    let mut records = Vec::with_capacity(checkouts.len());
    for (checkout_id, raw) in checkouts {
        let checkout = match RawCheckout::deserialize(&raw) {
            Ok(checkout) => checkout,
            Err(error) => {
                warn!(
                    checkout_id = %checkout_id,
                    error = %error,
                    "Malformed checkout entry; skipping"
                );
                continue;
            }
        };
        let bib = checkout.metadata_id.as_deref().and_then(|id| {
            let raw_bib = bibs.get(id)?;
            RawBib::deserialize(raw_bib)
                .map_err(|error| {
                    warn!(
                        checkout_id = %checkout_id,
                        metadata_id = %id,
                        error = %error,
                        "Malformed bib entry; skipping checkout"
                    );
                })
                .ok()
        });
        let Some(info) = bib.as_ref().and_then(|bib| bib.brief_info.as_ref()) else {
            debug!(checkout_id = %checkout_id, "No bibliographic match; skipping checkout");
            continue;
        };

        let Some(title) = non_empty(info.title.as_deref()) else {
            debug!(checkout_id = %checkout_id, "Bib has no title; skipping checkout");
            continue;
        };

        let Some(due_date) = checkout.due_date.as_deref().and_then(parse_due_date) else {
            warn!(checkout_id = %checkout_id, "Checkout has no readable due date; skipping");
            continue;
        };

        let title = match non_empty(info.subtitle.as_deref()) {
            Some(subtitle) => format!("{title}: {subtitle}"),
            None => title.to_string(),
        };
        let isbn = info
            .isbns
            .iter()
            .flatten()
            .find_map(|isbn| non_empty(Some(isbn)))
            .map(str::to_string);
        let cover_image_url = info.jacket.as_ref().and_then(|jacket| {
            non_empty(jacket.medium.as_deref())
                .or_else(|| non_empty(jacket.large.as_deref()))
                .or_else(|| non_empty(jacket.small.as_deref()))
                .map(str::to_string)
        });

        records.push(CheckoutRecord {
            title,
            isbn,
            due_date,
            cover_image_url,
        });
    }

    Ok(records)
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (date taken in UTC).
fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc).date_naive())
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn non_empty_cookie(cookies: &SessionCookies, name: &str) -> Option<String> {
    cookies
        .get(name)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn set_cookies(response: &Response) -> SessionCookies {
    SessionCookies::from_set_cookie_headers(
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok()),
    )
}
