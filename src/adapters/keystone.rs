//! Keystone Identity Adapter
//!
//! Implements the `IdentityService` port against the Keystone HTTP API.
//!
//! Keystone deployments expose two API families side by side. Tenant and
//! per-tenant membership listing go through the legacy v2.0 family; users,
//! services and endpoints through v3. Each operation is pinned to one
//! [`ApiProfile`].

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::config::{ClientOptions, DomainScope, KeystoneConfig};
use crate::domain::ports::{
    CatalogEntry, Endpoint, IdentityService, Service, Session, Tenant, User,
};
use crate::error::{Error, Result};

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

// =============================================================================
// API Profiles
// =============================================================================

/// Identity API family an operation is issued against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiProfile {
    /// Identity v2.0 (tenants, tenant membership, legacy tokens)
    Legacy,
    /// Identity v3 (users, services, endpoints, domain-scoped tokens)
    Current,
}

impl ApiProfile {
    fn version_segment(self) -> &'static str {
        match self {
            ApiProfile::Legacy => "v2.0",
            ApiProfile::Current => "v3",
        }
    }

    /// Build a URL for `path` under this family.
    pub fn url(self, identity_root: &str, path: &str) -> String {
        format!("{}/{}/{}", identity_root, self.version_segment(), path)
    }

    /// Extract the next page link from a collection page.
    ///
    /// v3 carries `links.next`; v2.0 carries `<collection>_links` entries
    /// with `rel: next`.
    fn next_link(self, page: &Value, collection: &str) -> Option<String> {
        match self {
            ApiProfile::Current => page
                .get("links")
                .and_then(|links| links.get("next"))
                .and_then(Value::as_str)
                .map(str::to_string),
            ApiProfile::Legacy => page
                .get(format!("{}_links", collection))
                .and_then(Value::as_array)?
                .iter()
                .find(|link| link.get("rel").and_then(Value::as_str) == Some("next"))
                .and_then(|link| link.get("href"))
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

/// Normalize a configured admin endpoint to the identity service root.
///
/// Accepts the bare root as well as URLs ending in a version segment.
pub fn identity_root(endpoint: &str) -> String {
    let trimmed = endpoint.trim_end_matches('/');
    for segment in ["/v2.0", "/v3"] {
        if let Some(root) = trimmed.strip_suffix(segment) {
            return root.trim_end_matches('/').to_string();
        }
    }
    trimmed.to_string()
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct LegacyTokenResponse {
    access: LegacyAccess,
}

#[derive(Debug, Deserialize)]
struct LegacyAccess {
    token: LegacyToken,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<CatalogRecord>,
}

#[derive(Debug, Deserialize)]
struct LegacyToken {
    id: String,
    #[serde(default)]
    expires: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(default)]
    expires_at: Option<String>,
    #[serde(default)]
    catalog: Vec<CatalogRecord>,
}

#[derive(Debug, Deserialize)]
struct CatalogRecord {
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    service_type: String,
}

impl From<CatalogRecord> for CatalogEntry {
    fn from(r: CatalogRecord) -> Self {
        Self {
            name: r.name,
            service_type: r.service_type,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TenantRecord {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct UserRecord {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceRecord {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    service_type: String,
}

#[derive(Debug, Deserialize)]
struct EndpointRecord {
    id: String,
    #[serde(default)]
    service_id: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    region_id: Option<String>,
    #[serde(default)]
    name: String,
}

impl From<TenantRecord> for Tenant {
    fn from(r: TenantRecord) -> Self {
        Tenant::new(r.id, r.name)
    }
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        let username = r.username.unwrap_or_else(|| r.name.clone());
        User {
            id: r.id,
            name: r.name,
            username,
        }
    }
}

impl From<ServiceRecord> for Service {
    fn from(r: ServiceRecord) -> Self {
        Service::new(r.id, r.name, r.service_type)
    }
}

impl From<EndpointRecord> for Endpoint {
    fn from(r: EndpointRecord) -> Self {
        Endpoint {
            id: r.id,
            service_id: r.service_id,
            url: r.url,
            region: r.region.or(r.region_id).unwrap_or_default(),
            name: r.name,
        }
    }
}

// =============================================================================
// Keystone Adapter
// =============================================================================

/// Keystone-backed identity service.
#[derive(Debug, Clone)]
pub struct KeystoneAdapter {
    client: Client,
}

impl KeystoneAdapter {
    /// Create a new adapter with its own HTTP client.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let mut builder = Client::builder().user_agent(options.user_agent);
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Create an adapter around an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn authenticate_legacy(&self, root: &str, config: &KeystoneConfig) -> Result<Session> {
        let url = ApiProfile::Legacy.url(root, "tokens");
        let body = json!({
            "auth": {
                "passwordCredentials": {
                    "username": config.user,
                    "password": config.password,
                },
                "tenantName": config.tenant,
            }
        });

        debug!("Requesting tenant-scoped token from {}", url);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Error::AuthConnection)?;

        check_auth_status(response.status())?;

        let parsed: LegacyTokenResponse = response
            .json()
            .await
            .map_err(|e| Error::AuthRejected(format!("Malformed token response: {}", e)))?;

        Ok(Session::new(root, parsed.access.token.id)
            .with_catalog(
                parsed
                    .access
                    .service_catalog
                    .into_iter()
                    .map(CatalogEntry::from)
                    .collect(),
            )
            .with_expiry(parsed.access.token.expires))
    }

    async fn authenticate_domain(
        &self,
        root: &str,
        config: &KeystoneConfig,
        scope: DomainScope,
    ) -> Result<Session> {
        let url = ApiProfile::Current.url(root, "auth/tokens");
        let domain = match scope {
            DomainScope::Id(id) => json!({ "id": id }),
            DomainScope::Name(name) => json!({ "name": name }),
        };
        let body = json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": config.user,
                            "password": config.password,
                            "domain": domain,
                        }
                    }
                },
                "scope": {
                    "project": {
                        "name": config.tenant,
                        "domain": domain,
                    }
                }
            }
        });

        debug!("Requesting domain-scoped token from {}", url);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Error::AuthConnection)?;

        check_auth_status(response.status())?;

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::AuthRejected(format!("Token response lacks {} header", SUBJECT_TOKEN_HEADER))
            })?;

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::AuthRejected(format!("Malformed token response: {}", e)))?;

        Ok(Session::new(root, token)
            .with_catalog(
                parsed
                    .token
                    .catalog
                    .into_iter()
                    .map(CatalogEntry::from)
                    .collect(),
            )
            .with_expiry(parsed.token.expires_at))
    }

    /// Fetch a collection, following pagination links to the end.
    async fn list_all<T: DeserializeOwned>(
        &self,
        session: &Session,
        profile: ApiProfile,
        path: &str,
        resource: &'static str,
        collection: &str,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(profile.url(session.identity_url(), path));

        while let Some(url) = next.take() {
            if !visited.insert(url.clone()) {
                return Err(Error::PaginationLoop { resource, url });
            }

            let page = self.get_page(session, &url, resource).await?;

            let entries = page
                .get(collection)
                .cloned()
                .ok_or_else(|| Error::ResponseParse {
                    resource,
                    reason: format!("missing `{}` collection", collection),
                })?;
            let mut batch: Vec<T> =
                serde_json::from_value(entries).map_err(|e| Error::ResponseParse {
                    resource,
                    reason: e.to_string(),
                })?;

            debug!("Fetched {} {} from {}", batch.len(), resource, url);
            items.append(&mut batch);

            next = profile.next_link(&page, collection);
        }

        Ok(items)
    }

    async fn get_page(&self, session: &Session, url: &str, resource: &'static str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .header(AUTH_TOKEN_HEADER, session.token())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|source| Error::FetchConnection { resource, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::FetchStatus { resource, status });
        }

        response.json().await.map_err(|e| Error::ResponseParse {
            resource,
            reason: e.to_string(),
        })
    }
}

fn check_auth_status(status: StatusCode) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::AuthRejected(format!(
            "Keystone rejected credentials: {}",
            status
        ))),
        _ => Err(Error::AuthRejected(format!(
            "Token request failed with status: {}",
            status
        ))),
    }
}

#[async_trait]
impl IdentityService for KeystoneAdapter {
    #[instrument(skip(self, config), fields(endpoint = %config.endpoint, user = %config.user))]
    async fn authenticate(&self, config: &KeystoneConfig) -> Result<Session> {
        let root = identity_root(&config.endpoint);
        match config.domain_scope() {
            Some(scope) => self.authenticate_domain(&root, config, scope).await,
            None => self.authenticate_legacy(&root, config).await,
        }
    }

    #[instrument(skip(self, session))]
    async fn list_tenants(&self, session: &Session) -> Result<Vec<Tenant>> {
        let records: Vec<TenantRecord> = self
            .list_all(session, ApiProfile::Legacy, "tenants", "tenants", "tenants")
            .await?;
        Ok(records.into_iter().map(Tenant::from).collect())
    }

    #[instrument(skip(self, session))]
    async fn list_users(&self, session: &Session) -> Result<Vec<User>> {
        let records: Vec<UserRecord> = self
            .list_all(session, ApiProfile::Current, "users", "users", "users")
            .await?;
        Ok(records.into_iter().map(User::from).collect())
    }

    #[instrument(skip(self, session))]
    async fn list_services(&self, session: &Session) -> Result<Vec<Service>> {
        let records: Vec<ServiceRecord> = self
            .list_all(session, ApiProfile::Current, "services", "services", "services")
            .await?;
        Ok(records.into_iter().map(Service::from).collect())
    }

    #[instrument(skip(self, session))]
    async fn list_endpoints(&self, session: &Session) -> Result<Vec<Endpoint>> {
        let records: Vec<EndpointRecord> = self
            .list_all(session, ApiProfile::Current, "endpoints", "endpoints", "endpoints")
            .await?;
        Ok(records.into_iter().map(Endpoint::from).collect())
    }

    #[instrument(skip(self, session, tenants), fields(tenants = tenants.len()))]
    async fn users_per_tenant(
        &self,
        session: &Session,
        tenants: &[Tenant],
    ) -> Result<HashMap<String, usize>> {
        let mut counts = HashMap::with_capacity(tenants.len());

        for tenant in tenants {
            let path = format!("tenants/{}/users", urlencoding::encode(&tenant.id));
            let members: Vec<UserRecord> = self
                .list_all(session, ApiProfile::Legacy, &path, "tenant users", "users")
                .await?;
            counts.insert(tenant.name.clone(), members.len());
        }

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use mockito::Matcher;

    const TOKEN: &str = "2ed210f132564f21b178afb197ee99e3";

    fn config(endpoint: &str) -> KeystoneConfig {
        KeystoneConfig {
            endpoint: endpoint.to_string(),
            user: "me".into(),
            password: "secret".into(),
            tenant: "admin".into(),
            domain_name: None,
            domain_id: None,
        }
    }

    fn adapter() -> KeystoneAdapter {
        KeystoneAdapter::new(ClientOptions::default()).unwrap()
    }

    // =========================================================================
    // Endpoint Normalization Tests
    // =========================================================================

    #[test]
    fn test_identity_root_strips_version() {
        assert_eq!(identity_root("http://ks:5000"), "http://ks:5000");
        assert_eq!(identity_root("http://ks:5000/"), "http://ks:5000");
        assert_eq!(identity_root("http://ks:5000/v2.0"), "http://ks:5000");
        assert_eq!(identity_root("http://ks:5000/v2.0/"), "http://ks:5000");
        assert_eq!(identity_root("http://ks:5000/v3"), "http://ks:5000");
        assert_eq!(identity_root("http://ks/identity/v3/"), "http://ks/identity");
    }

    #[test]
    fn test_profile_urls() {
        assert_eq!(
            ApiProfile::Legacy.url("http://ks:5000", "tenants"),
            "http://ks:5000/v2.0/tenants"
        );
        assert_eq!(
            ApiProfile::Current.url("http://ks:5000", "auth/tokens"),
            "http://ks:5000/v3/auth/tokens"
        );
    }

    #[test]
    fn test_next_link_extraction() {
        let current = json!({ "links": { "next": "http://ks/v3/users?marker=x", "self": "s" } });
        assert_eq!(
            ApiProfile::Current.next_link(&current, "users").as_deref(),
            Some("http://ks/v3/users?marker=x")
        );

        let last = json!({ "links": { "next": null } });
        assert!(ApiProfile::Current.next_link(&last, "users").is_none());

        let legacy = json!({
            "tenants_links": [
                { "rel": "previous", "href": "http://ks/v2.0/tenants?marker=a" },
                { "rel": "next", "href": "http://ks/v2.0/tenants?marker=b" }
            ]
        });
        assert_eq!(
            ApiProfile::Legacy.next_link(&legacy, "tenants").as_deref(),
            Some("http://ks/v2.0/tenants?marker=b")
        );
        assert!(ApiProfile::Legacy
            .next_link(&json!({ "tenants_links": [] }), "tenants")
            .is_none());
    }

    #[test]
    fn test_endpoint_record_region_fallback() {
        let record: EndpointRecord = serde_json::from_value(json!({
            "id": "e1",
            "service_id": "s1",
            "url": "http://nova:8774",
            "region_id": "RegionTwo"
        }))
        .unwrap();

        let endpoint = Endpoint::from(record);
        assert_eq!(endpoint.region, "RegionTwo");
        assert!(endpoint.name.is_empty());
    }

    // =========================================================================
    // Authentication Tests
    // =========================================================================

    #[tokio::test]
    async fn test_legacy_authentication() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v2.0/tokens")
            .match_body(Matcher::PartialJson(json!({
                "auth": {
                    "passwordCredentials": { "username": "me", "password": "secret" },
                    "tenantName": "admin"
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"access": {{
                    "serviceCatalog": [{{"name": "nova", "type": "compute", "endpoints": []}}],
                    "token": {{"id": "{}", "expires": "2016-02-21T14:28:30Z"}}
                }}}}"#,
                TOKEN
            ))
            .create_async()
            .await;

        let session = adapter().authenticate(&config(&server.url())).await.unwrap();

        assert_eq!(session.token(), TOKEN);
        assert_eq!(session.identity_url(), server.url());
        assert_eq!(session.catalog().len(), 1);
        assert_eq!(session.catalog()[0].service_type, "compute");
        assert_eq!(session.expires_at(), Some("2016-02-21T14:28:30Z"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_domain_scoped_authentication() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v3/auth/tokens")
            .match_body(Matcher::PartialJson(json!({
                "auth": {
                    "identity": {
                        "methods": ["password"],
                        "password": { "user": { "name": "me", "domain": { "name": "Default" } } }
                    },
                    "scope": { "project": { "name": "admin", "domain": { "name": "Default" } } }
                }
            })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_header("x-subject-token", "v3-token")
            .with_body(r#"{"token": {"expires_at": "2016-02-21T14:28:30.000000Z", "catalog": []}}"#)
            .create_async()
            .await;

        let mut cfg = config(&format!("{}/v3", server.url()));
        cfg.domain_name = Some("Default".into());

        let session = adapter().authenticate(&cfg).await.unwrap();

        assert_eq!(session.token(), "v3-token");
        assert_eq!(session.identity_url(), server.url());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_domain_authentication_requires_subject_token() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v3/auth/tokens")
            .with_status(201)
            .with_body(r#"{"token": {}}"#)
            .create_async()
            .await;

        let mut cfg = config(&server.url());
        cfg.domain_id = Some("default".into());

        let result = adapter().authenticate(&cfg).await;
        assert_matches!(result, Err(Error::AuthRejected(_)));
    }

    #[tokio::test]
    async fn test_authentication_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v2.0/tokens")
            .with_status(401)
            .with_body(r#"{"error": {"code": 401, "title": "Unauthorized"}}"#)
            .create_async()
            .await;

        let err = adapter()
            .authenticate(&config(&server.url()))
            .await
            .unwrap_err();

        assert!(err.is_auth());
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn test_authentication_unreachable() {
        let result = adapter().authenticate(&config("http://127.0.0.1:1")).await;
        assert_matches!(result, Err(Error::AuthConnection(_)));
    }

    // =========================================================================
    // Listing Tests
    // =========================================================================

    #[tokio::test]
    async fn test_list_tenants_sends_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v2.0/tenants")
            .match_header("x-auth-token", TOKEN)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"tenants": [
                    {"id": "11111", "name": "demo", "enabled": true},
                    {"id": "22222", "name": "admin", "enabled": true}
                ], "tenants_links": []}"#,
            )
            .create_async()
            .await;

        let session = Session::new(server.url(), TOKEN);
        let tenants = adapter().list_tenants(&session).await.unwrap();

        assert_eq!(
            tenants,
            vec![Tenant::new("11111", "demo"), Tenant::new("22222", "admin")]
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_list_users_follows_pagination() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/v3/users")
            .match_query(Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"users": [{{"id": "u1", "name": "heat"}}, {{"id": "u2", "name": "cinder"}}],
                    "links": {{"next": "{}/v3/users?marker=u2", "previous": null}}}}"#,
                server.url()
            ))
            .create_async()
            .await;
        let second = server
            .mock("GET", "/v3/users")
            .match_query(Matcher::UrlEncoded("marker".into(), "u2".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"users": [{"id": "u3", "name": "nova", "username": "nova-svc"}],
                           "links": {"next": null}}"#)
            .create_async()
            .await;

        let session = Session::new(server.url(), TOKEN);
        let users = adapter().list_users(&session).await.unwrap();

        assert_eq!(users.len(), 3);
        assert_eq!(users[0].username, "heat");
        assert_eq!(users[2].username, "nova-svc");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_pagination_loop_detected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v3/services")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"services": [], "links": {{"next": "{}/v3/services"}}}}"#,
                server.url()
            ))
            .create_async()
            .await;

        let session = Session::new(server.url(), TOKEN);
        let result = adapter().list_services(&session).await;

        assert_matches!(result, Err(Error::PaginationLoop { resource: "services", .. }));
    }

    #[tokio::test]
    async fn test_list_endpoints() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v3/endpoints")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"endpoints": [
                    {"id": "e1", "interface": "public", "region": "RegionOne",
                     "service_id": "s1", "url": "https://public.local:8777"}
                ], "links": {"next": null}}"#,
            )
            .create_async()
            .await;

        let session = Session::new(server.url(), TOKEN);
        let endpoints = adapter().list_endpoints(&session).await.unwrap();

        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].region, "RegionOne");
        assert_eq!(endpoints[0].service_id, "s1");
    }

    #[tokio::test]
    async fn test_listing_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v3/endpoints")
            .with_status(503)
            .create_async()
            .await;

        let session = Session::new(server.url(), TOKEN);
        let result = adapter().list_endpoints(&session).await;

        assert_matches!(
            result,
            Err(Error::FetchStatus { resource: "endpoints", status })
                if status == StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_listing_missing_collection() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v2.0/tenants")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"projects": []}"#)
            .create_async()
            .await;

        let session = Session::new(server.url(), TOKEN);
        let result = adapter().list_tenants(&session).await;

        assert_matches!(result, Err(Error::ResponseParse { resource: "tenants", .. }));
    }

    #[tokio::test]
    async fn test_listing_unreachable() {
        let session = Session::new("http://127.0.0.1:1", TOKEN);
        let err = adapter().list_users(&session).await.unwrap_err();

        assert!(err.is_fetch());
        assert_matches!(err, Error::FetchConnection { resource: "users", .. });
    }

    // =========================================================================
    // Users Per Tenant Tests
    // =========================================================================

    #[tokio::test]
    async fn test_users_per_tenant() {
        let mut server = mockito::Server::new_async().await;
        let _demo = server
            .mock("GET", "/v2.0/tenants/11111/users")
            .match_header("x-auth-token", TOKEN)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"users": [{"id": "a"}, {"id": "b"}, {"id": "c"}]}"#)
            .create_async()
            .await;
        let _admin = server
            .mock("GET", "/v2.0/tenants/22222/users")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"users": [{"id": "d"}]}"#)
            .create_async()
            .await;

        let session = Session::new(server.url(), TOKEN);
        let tenants = vec![Tenant::new("11111", "demo"), Tenant::new("22222", "admin")];
        let counts = adapter().users_per_tenant(&session, &tenants).await.unwrap();

        assert_eq!(counts.len(), 2);
        assert_eq!(counts["demo"], 3);
        assert_eq!(counts["admin"], 1);
    }

    #[tokio::test]
    async fn test_users_per_tenant_aborts_on_first_failure() {
        let mut server = mockito::Server::new_async().await;
        let _first = server
            .mock("GET", "/v2.0/tenants/11111/users")
            .with_status(404)
            .create_async()
            .await;
        let never = server
            .mock("GET", "/v2.0/tenants/22222/users")
            .with_status(200)
            .with_body(r#"{"users": []}"#)
            .expect(0)
            .create_async()
            .await;

        let session = Session::new(server.url(), TOKEN);
        let tenants = vec![Tenant::new("11111", "demo"), Tenant::new("22222", "admin")];
        let result = adapter().users_per_tenant(&session, &tenants).await;

        assert_matches!(result, Err(Error::FetchStatus { resource: "tenant users", .. }));
        never.assert_async().await;
    }
}
