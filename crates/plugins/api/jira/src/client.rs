//! Jira API client implementation.
//!
//! Supports both Jira Cloud (API v3) and Jira Self-Hosted/Data Center (API v2).
//! Flavor is auto-detected from the URL: `*.atlassian.net` → Cloud, otherwise → SelfHosted.
//! Agile endpoints (boards, sprints) live in [`crate::agile`].

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use tracing::{debug, warn};
use tracklens_core::matching::{match_within, MatchThreshold};
use tracklens_core::{
    parse_sprint_id, AllowedValue, Board, BoardQuery, Error, FieldDescriptor, FieldKind,
    FieldUpdate, FieldValue, Result, SearchCriteria, Sprint, SprintRef, SprintState, Ticket,
    TicketProvider, TtlCache, User,
};

use crate::adf::{read_rich_text, text_to_adf};
use crate::fields::{
    allowed_values, editable_field, find_story_points_field, map_field, resolve_field,
    select_allowed_value,
};
use crate::jql::{build_jql, is_fuzzy_project};
use crate::types::{
    JiraCloudSearchResponse, JiraEditMeta, JiraField, JiraIssue, JiraProject, JiraSearchResponse,
    JiraUser,
};

/// Default page size for paginated endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page requested from the search endpoints.
const MAX_SEARCH_PAGE: u32 = 100;

/// How long the project list stays cached.
const PROJECT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Jira deployment flavor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum JiraFlavor {
    /// Jira Cloud: API v3, ADF rich text, accountId-based users
    Cloud,
    /// Jira Self-Hosted / Data Center: API v2, plain text, username-based users
    SelfHosted,
}

/// Jira API client.
///
/// Owns the field-catalog cache (kept for the client lifetime) and the
/// project-list cache (24h TTL).
pub struct JiraClient {
    base_url: String,
    instance_url: String,
    email: String,
    token: String,
    flavor: JiraFlavor,
    default_project: Option<String>,
    pub(crate) page_size: u32,
    client: reqwest::Client,
    fields: TtlCache<Vec<FieldDescriptor>>,
    projects: TtlCache<Vec<JiraProject>>,
}

impl JiraClient {
    /// Create a new Jira client. Flavor is auto-detected from the URL.
    pub fn new(url: impl Into<String>, email: impl Into<String>, token: impl Into<String>) -> Self {
        let url = url.into();
        let flavor = detect_flavor(&url);
        Self::build(build_api_base(&url, flavor), email.into(), token.into(), flavor)
    }

    /// Create a new Jira client with explicit base URL (for testing with httpmock).
    /// The base URL is used as-is (no `/rest/api/N` suffix appended); agile
    /// endpoints resolve to `{base_url}/rest/agile/1.0`.
    pub fn with_base_url(
        base_url: impl Into<String>,
        email: impl Into<String>,
        token: impl Into<String>,
        cloud: bool,
    ) -> Self {
        let flavor = if cloud {
            JiraFlavor::Cloud
        } else {
            JiraFlavor::SelfHosted
        };
        Self::build(
            base_url.into().trim_end_matches('/').to_string(),
            email.into(),
            token.into(),
            flavor,
        )
    }

    fn build(base_url: String, email: String, token: String, flavor: JiraFlavor) -> Self {
        Self {
            instance_url: instance_url_from_base(&base_url),
            base_url,
            email,
            token,
            flavor,
            default_project: None,
            page_size: DEFAULT_PAGE_SIZE,
            client: reqwest::Client::builder()
                .user_agent("tracklens")
                .build()
                .unwrap_or_default(),
            fields: TtlCache::unbounded("jira_fields"),
            projects: TtlCache::with_ttl("jira_projects", PROJECT_CACHE_TTL),
        }
    }

    /// Project searched when the criteria name none.
    pub fn with_default_project(mut self, project_key: Option<String>) -> Self {
        self.default_project = project_key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Page size for paginated agile endpoints.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn agile_url(&self, path: &str) -> String {
        format!("{}/rest/agile/1.0{}", self.instance_url, path)
    }

    /// Build request with auth header.
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json");

        match self.flavor {
            JiraFlavor::Cloud => {
                let credentials = basic_credentials(&format!("{}:{}", self.email, self.token));
                builder.header("Authorization", format!("Basic {}", credentials))
            }
            JiraFlavor::SelfHosted if self.token.contains(':') => {
                // user:password
                let credentials = basic_credentials(&self.token);
                builder.header("Authorization", format!("Basic {}", credentials))
            }
            JiraFlavor::SelfHosted => {
                builder.header("Authorization", format!("Bearer {}", self.token))
            }
        }
    }

    /// Make an authenticated GET request.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.get_with_query(url, &[]).await
    }

    /// Make an authenticated GET request with query parameters.
    pub(crate) async fn get_with_query<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        debug!(url = url, params = ?params, "Jira GET request");

        let response = self
            .request(reqwest::Method::GET, url)
            .query(params)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Make an authenticated request whose success response has no body
    /// (PUT /issue, POST /sprint/{id}/issue answer 204).
    pub(crate) async fn send_no_content<B: serde::Serialize>(
        &self,
        method: reqwest::Method,
        url: &str,
        body: &B,
    ) -> Result<()> {
        debug!(url = url, method = %method, "Jira request");

        let response = self
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        check_status(response).await.map(|_| ())
    }

    /// Handle response and map errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("Failed to parse response: {}", e)))
    }

    // =========================================================================
    // Cached catalogs
    // =========================================================================

    /// Field catalog, fetched once per client.
    pub async fn field_catalog(&self) -> Result<Vec<FieldDescriptor>> {
        self.fields
            .get_or_fetch(|| async {
                let raw: Vec<JiraField> = self.get(&self.api_url("/field")).await?;
                debug!(count = raw.len(), "Fetched Jira field catalog");
                Ok(raw.into_iter().map(map_field).collect())
            })
            .await
    }

    /// Visible projects, cached for 24 hours.
    pub async fn projects(&self) -> Result<Vec<JiraProject>> {
        self.projects
            .get_or_fetch(|| async { self.get(&self.api_url("/project")).await })
            .await
    }

    /// Turn a fuzzy project token into a key using the project list.
    ///
    /// Returns `None` when nothing is close enough or the list is unavailable;
    /// the raw token is then used in the query.
    async fn resolve_project_key(&self, token: &str) -> Option<String> {
        let projects = match self.projects().await {
            Ok(projects) => projects,
            Err(e) => {
                warn!(error = %e, "Project lookup failed, using raw project token");
                return None;
            }
        };

        let token = token.trim();
        if let Some(project) = projects
            .iter()
            .find(|p| p.key.eq_ignore_ascii_case(token) || p.name.eq_ignore_ascii_case(token))
        {
            return Some(project.key.clone());
        }

        match_within(
            token,
            projects.iter().map(|p| (p.name.as_str(), p)),
            MatchThreshold::StrictOption,
        )
        .map(|m| {
            debug!(token = token, project = m.payload.key, "Resolved fuzzy project");
            m.payload.key.clone()
        })
    }

    // =========================================================================
    // Fields
    // =========================================================================

    async fn edit_meta(&self, key: &str) -> Result<JiraEditMeta> {
        self.get(&self.api_url(&format!("/issue/{}/editmeta", key)))
            .await
    }

    /// Resolve `input` to one of the allowed values of `field_id` on `key`.
    pub async fn resolve_allowed_value(
        &self,
        key: &str,
        field_id: &str,
        input: &str,
    ) -> Result<AllowedValue> {
        let meta = self.edit_meta(key).await?;
        let field = editable_field(&meta, key, field_id)?;
        select_allowed_value(field_id, input, &allowed_values(field))
    }

    async fn write_field(&self, key: &str, field_id: &str, value: serde_json::Value) -> Result<()> {
        let body = json!({ "fields": { field_id: value } });
        self.send_no_content(
            reqwest::Method::PUT,
            &self.api_url(&format!("/issue/{}", key)),
            &body,
        )
        .await
    }

    // =========================================================================
    // Search
    // =========================================================================

    async fn search_cloud(&self, jql: &str, limit: u32) -> Result<Vec<JiraIssue>> {
        let url = self.api_url("/search/jql");
        let mut issues: Vec<JiraIssue> = Vec::new();
        let mut next_page_token: Option<String> = None;

        loop {
            let remaining = limit - issues.len() as u32;
            let mut params = vec![
                ("jql", jql.to_string()),
                ("maxResults", remaining.min(MAX_SEARCH_PAGE).to_string()),
                ("fields", "*all".to_string()),
            ];
            if let Some(token) = &next_page_token {
                params.push(("nextPageToken", token.clone()));
            }

            let page: JiraCloudSearchResponse = self.get_with_query(&url, &params).await?;
            let page_len = page.issues.len();
            issues.extend(page.issues.into_iter().take(remaining as usize));

            if issues.len() as u32 >= limit || page_len == 0 {
                break;
            }
            match page.next_page_token {
                Some(token) => next_page_token = Some(token),
                None => break,
            }
        }

        Ok(issues)
    }

    async fn search_self_hosted(&self, jql: &str, limit: u32) -> Result<Vec<JiraIssue>> {
        let url = self.api_url("/search");
        let mut issues: Vec<JiraIssue> = Vec::new();

        loop {
            let remaining = limit - issues.len() as u32;
            let params = vec![
                ("jql", jql.to_string()),
                ("startAt", issues.len().to_string()),
                ("maxResults", remaining.min(MAX_SEARCH_PAGE).to_string()),
                ("fields", "*all".to_string()),
            ];

            let page: JiraSearchResponse = self.get_with_query(&url, &params).await?;
            let page_len = page.issues.len();
            issues.extend(page.issues.into_iter().take(remaining as usize));

            let exhausted = page
                .total
                .is_some_and(|total| issues.len() as u32 >= total);
            if issues.len() as u32 >= limit || page_len == 0 || exhausted {
                break;
            }
        }

        Ok(issues)
    }
}

/// Fail on non-2xx, logging the body.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let status_code = status.as_u16();
    let message = response.text().await.unwrap_or_default();
    warn!(
        status = status_code,
        message = message,
        "Jira API error response"
    );
    Err(Error::from_status(status_code, message))
}

// =============================================================================
// Flavor detection and URL building
// =============================================================================

/// Detect Jira flavor from the instance URL.
fn detect_flavor(url: &str) -> JiraFlavor {
    if url.contains(".atlassian.net") {
        JiraFlavor::Cloud
    } else {
        JiraFlavor::SelfHosted
    }
}

/// Build the API base URL from the instance URL and flavor.
fn build_api_base(url: &str, flavor: JiraFlavor) -> String {
    let base = url.trim_end_matches('/');
    match flavor {
        JiraFlavor::Cloud => format!("{}/rest/api/3", base),
        JiraFlavor::SelfHosted => format!("{}/rest/api/2", base),
    }
}

/// Get the Jira instance URL from the API base URL.
fn instance_url_from_base(base_url: &str) -> String {
    base_url
        .trim_end_matches("/rest/api/3")
        .trim_end_matches("/rest/api/2")
        .to_string()
}

fn basic_credentials(raw: &str) -> String {
    general_purpose::STANDARD.encode(raw)
}

// =============================================================================
// Field value encoding
// =============================================================================

/// Rich-text fields need ADF on Cloud.
fn is_rich_text(field: &FieldDescriptor) -> bool {
    field.id == "description"
        || field.id == "environment"
        || field
            .schema
            .custom
            .as_deref()
            .is_some_and(|c| c.ends_with(":textarea"))
}

/// Encode a free value for a field without allowed values.
///
/// Option fields only accept one of their allowed values, so an option field
/// whose edit metadata lists none cannot be written.
fn encode_value(
    field: &FieldDescriptor,
    raw: &str,
    flavor: JiraFlavor,
) -> Result<serde_json::Value> {
    let value = match field.schema.kind {
        FieldKind::Number => {
            let number: f64 = raw.trim().parse().map_err(|_| {
                Error::InvalidData(format!(
                    "Field '{}' expects a number, got '{}'",
                    field.name, raw
                ))
            })?;
            json!(number)
        }
        FieldKind::Sprint => json!(parse_sprint_id(raw)?),
        FieldKind::Option => return Err(Error::NotAnOptionField(field.id.clone())),
        FieldKind::User => match flavor {
            JiraFlavor::Cloud => json!({ "accountId": raw.trim() }),
            JiraFlavor::SelfHosted => json!({ "name": raw.trim() }),
        },
        FieldKind::Array => {
            let items: Vec<&str> = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect();
            json!(items)
        }
        _ if flavor == JiraFlavor::Cloud && is_rich_text(field) => text_to_adf(raw),
        _ => json!(raw),
    };
    Ok(value)
}

/// Encode a resolved allowed value; multi-value fields take a list.
fn encode_allowed_value(field: &FieldDescriptor, value: &AllowedValue) -> serde_json::Value {
    let reference = match &value.id {
        Some(id) => json!({ "id": id }),
        None => json!({ "value": value.value }),
    };
    if field.schema.kind == FieldKind::Array {
        json!([reference])
    } else {
        reference
    }
}

// =============================================================================
// Mapping functions: Jira types -> Unified types
// =============================================================================

fn map_user(jira_user: &JiraUser) -> User {
    let id = jira_user
        .account_id
        .clone()
        .or_else(|| jira_user.name.clone())
        .unwrap_or_default();
    let username = jira_user
        .name
        .clone()
        .or_else(|| jira_user.account_id.clone())
        .unwrap_or_default();
    User {
        id,
        username,
        name: jira_user.display_name.clone(),
        email: jira_user.email_address.clone(),
        avatar_url: None,
    }
}

fn map_ticket(issue: JiraIssue, instance_url: &str) -> Ticket {
    let fields = issue.fields;
    let status_category = fields
        .status
        .as_ref()
        .and_then(|s| s.status_category.as_ref())
        .map(|c| c.name.clone().unwrap_or_else(|| c.key.clone()));

    Ticket {
        url: Some(format!("{}/browse/{}", instance_url, issue.key)),
        key: issue.key,
        summary: fields.summary.unwrap_or_default(),
        description: read_rich_text(fields.description.as_ref()),
        status: fields.status.map(|s| s.name),
        status_category,
        priority: fields.priority.map(|p| p.name),
        issue_type: fields.issuetype.map(|t| t.name),
        project_key: fields.project.map(|p| p.key),
        assignee: fields.assignee.as_ref().map(map_user),
        reporter: fields.reporter.as_ref().map(map_user),
        labels: fields.labels,
        created: fields.created,
        updated: fields.updated,
        custom_fields: fields
            .extra
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
            .collect(),
    }
}

// =============================================================================
// Trait implementation
// =============================================================================

#[async_trait]
impl TicketProvider for JiraClient {
    fn provider_name(&self) -> &'static str {
        "jira"
    }

    async fn search_tickets(&self, criteria: &SearchCriteria) -> Result<Vec<Ticket>> {
        let limit = criteria.effective_limit();
        if limit == 0 {
            return Ok(vec![]);
        }

        let mut criteria = criteria.clone();
        if criteria.project.is_none() {
            criteria.project = self.default_project.clone();
        }
        if let Some(project) = criteria.project.clone() {
            if is_fuzzy_project(&project) {
                if let Some(key) = self.resolve_project_key(&project).await {
                    criteria.project = Some(key);
                }
            }
        }

        let jql = build_jql(&criteria);
        debug!(jql = jql, limit = limit, "Jira search");

        let issues = match self.flavor {
            JiraFlavor::Cloud => self.search_cloud(&jql, limit).await?,
            JiraFlavor::SelfHosted => self.search_self_hosted(&jql, limit).await?,
        };

        Ok(issues
            .into_iter()
            .map(|i| map_ticket(i, &self.instance_url))
            .collect())
    }

    async fn get_ticket(&self, key: &str) -> Result<Ticket> {
        let issue: JiraIssue = self.get(&self.api_url(&format!("/issue/{}", key))).await?;
        Ok(map_ticket(issue, &self.instance_url))
    }

    async fn update_field(&self, key: &str, field: &str, value: &str) -> Result<FieldUpdate> {
        let catalog = self.field_catalog().await?;
        let descriptor = resolve_field(field, &catalog)?;
        debug!(
            issue = key,
            input = field,
            field_id = descriptor.id,
            "Resolved field"
        );

        let meta = self.edit_meta(key).await?;
        let editable = editable_field(&meta, key, &descriptor.id)?;
        let options = allowed_values(editable);

        let (payload, written) = if options.is_empty() {
            (
                encode_value(descriptor, value, self.flavor)?,
                value.to_string(),
            )
        } else {
            let chosen = select_allowed_value(&descriptor.id, value, &options)?;
            (encode_allowed_value(descriptor, &chosen), chosen.value)
        };

        self.write_field(key, &descriptor.id, payload).await?;

        Ok(FieldUpdate {
            issue_key: key.to_string(),
            field_id: descriptor.id.clone(),
            field_name: descriptor.name.clone(),
            value: written,
        })
    }

    async fn set_story_points(&self, key: &str, points: f64) -> Result<FieldUpdate> {
        let catalog = self.field_catalog().await?;
        let field = find_story_points_field(&catalog)?;

        self.write_field(key, &field.id, json!(points)).await?;

        Ok(FieldUpdate {
            issue_key: key.to_string(),
            field_id: field.id.clone(),
            field_name: field.name.clone(),
            value: FieldValue::Number(points).to_string(),
        })
    }

    async fn find_boards(&self, query: &BoardQuery) -> Result<Vec<Board>> {
        self.search_boards(query).await
    }

    async fn list_sprints(
        &self,
        board_id: u64,
        state: Option<SprintState>,
    ) -> Result<Vec<Sprint>> {
        self.list_sprints_for_board(board_id, state).await
    }

    async fn sprints_for_ticket(&self, key: &str) -> Result<Vec<Sprint>> {
        self.resolve_sprints_for_ticket(key).await
    }

    async fn move_to_sprint(&self, key: &str, sprint: &SprintRef) -> Result<Sprint> {
        self.move_issue_to_sprint(key, sprint).await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tracklens_core::FieldSchema;

    fn descriptor(id: &str, kind: FieldKind, custom: Option<&str>) -> FieldDescriptor {
        FieldDescriptor {
            id: id.to_string(),
            name: id.to_string(),
            custom: custom.is_some(),
            schema: FieldSchema {
                kind,
                custom: custom.map(String::from),
            },
        }
    }

    // =========================================================================
    // Flavor detection and URLs
    // =========================================================================

    #[test]
    fn test_flavor_detection() {
        assert_eq!(detect_flavor("https://company.atlassian.net/"), JiraFlavor::Cloud);
        assert_eq!(detect_flavor("https://jira.corp.internal"), JiraFlavor::SelfHosted);
        assert_eq!(detect_flavor("http://localhost:8080"), JiraFlavor::SelfHosted);
    }

    #[test]
    fn test_api_and_agile_urls() {
        let client = JiraClient::new("https://company.atlassian.net/", "a@b.c", "t");
        assert_eq!(
            client.api_url("/field"),
            "https://company.atlassian.net/rest/api/3/field"
        );
        assert_eq!(
            client.agile_url("/board"),
            "https://company.atlassian.net/rest/agile/1.0/board"
        );

        let client = JiraClient::new("https://jira.company.com", "a@b.c", "t");
        assert_eq!(
            client.api_url("/field"),
            "https://jira.company.com/rest/api/2/field"
        );
        assert_eq!(
            client.agile_url("/sprint/3/issue"),
            "https://jira.company.com/rest/agile/1.0/sprint/3/issue"
        );
    }

    // =========================================================================
    // Auth header tests
    // =========================================================================

    fn auth_header(client: &JiraClient) -> String {
        let built = client
            .request(reqwest::Method::GET, "http://localhost/test")
            .build()
            .unwrap();
        built
            .headers()
            .get("Authorization")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_auth_header_cloud_basic() {
        let client =
            JiraClient::with_base_url("http://localhost", "user@example.com", "api-token", true);
        // "user@example.com:api-token"
        assert_eq!(
            auth_header(&client),
            "Basic dXNlckBleGFtcGxlLmNvbTphcGktdG9rZW4="
        );
    }

    #[test]
    fn test_auth_header_self_hosted() {
        let client = JiraClient::with_base_url("http://localhost", "u@e.com", "pat", false);
        assert_eq!(auth_header(&client), "Bearer pat");

        let client = JiraClient::with_base_url("http://localhost", "u@e.com", "user:pass", false);
        assert_eq!(auth_header(&client), "Basic dXNlcjpwYXNz");
    }

    // =========================================================================
    // Value encoding
    // =========================================================================

    #[test]
    fn test_encode_value_by_kind() {
        let number = descriptor("customfield_1", FieldKind::Number, None);
        assert_eq!(
            encode_value(&number, " 3.5 ", JiraFlavor::Cloud).unwrap(),
            json!(3.5)
        );
        assert!(matches!(
            encode_value(&number, "three", JiraFlavor::Cloud),
            Err(Error::InvalidData(_))
        ));

        let sprint = descriptor(
            "customfield_2",
            FieldKind::Sprint,
            Some("com.pyxis.greenhopper.jira:gh-sprint"),
        );
        assert_eq!(
            encode_value(&sprint, "42", JiraFlavor::SelfHosted).unwrap(),
            json!(42)
        );
        assert!(matches!(
            encode_value(&sprint, "Sprint 4", JiraFlavor::SelfHosted),
            Err(Error::InvalidSprintId(_))
        ));

        let labels = descriptor("labels", FieldKind::Array, None);
        assert_eq!(
            encode_value(&labels, "a, b,,c", JiraFlavor::Cloud).unwrap(),
            json!(["a", "b", "c"])
        );

        let user = descriptor("assignee", FieldKind::User, None);
        assert_eq!(
            encode_value(&user, "jdoe", JiraFlavor::SelfHosted).unwrap(),
            json!({"name": "jdoe"})
        );
    }

    #[test]
    fn test_encode_value_rejects_option_kind() {
        let severity = descriptor("customfield_3", FieldKind::Option, None);
        assert!(matches!(
            encode_value(&severity, "Major", JiraFlavor::Cloud),
            Err(Error::NotAnOptionField(id)) if id == "customfield_3"
        ));
    }

    #[test]
    fn test_encode_rich_text_only_on_cloud() {
        let description = descriptor("description", FieldKind::String, None);
        let cloud = encode_value(&description, "hello", JiraFlavor::Cloud).unwrap();
        assert_eq!(cloud["type"], "doc");
        let self_hosted = encode_value(&description, "hello", JiraFlavor::SelfHosted).unwrap();
        assert_eq!(self_hosted, json!("hello"));
    }

    #[test]
    fn test_encode_allowed_value() {
        let option = descriptor("priority", FieldKind::Other, None);
        let value = AllowedValue {
            id: Some("2".to_string()),
            value: "High".to_string(),
        };
        assert_eq!(encode_allowed_value(&option, &value), json!({"id": "2"}));

        let multi = descriptor("components", FieldKind::Array, None);
        assert_eq!(encode_allowed_value(&multi, &value), json!([{"id": "2"}]));
    }

    // =========================================================================
    // Mapping
    // =========================================================================

    #[test]
    fn test_map_ticket() {
        let issue: JiraIssue = serde_json::from_value(json!({
            "key": "PROJ-1",
            "fields": {
                "summary": "Fix login bug",
                "description": "Login fails on mobile",
                "status": {"name": "In Review", "statusCategory": {"key": "indeterminate", "name": "In Progress"}},
                "priority": {"name": "High"},
                "issuetype": {"name": "Bug"},
                "project": {"key": "PROJ", "name": "Project"},
                "assignee": {"name": "jdoe", "displayName": "John Doe"},
                "labels": ["mobile"],
                "customfield_10016": 5,
                "customfield_10020": [{"id": 7, "name": "Sprint 7", "state": "active"}],
                "customfield_10099": null
            }
        }))
        .unwrap();

        let ticket = map_ticket(issue, "https://jira.example.com");
        assert_eq!(ticket.key, "PROJ-1");
        assert_eq!(ticket.status.as_deref(), Some("In Review"));
        assert_eq!(ticket.status_category.as_deref(), Some("In Progress"));
        assert_eq!(ticket.issue_type.as_deref(), Some("Bug"));
        assert_eq!(ticket.project_key.as_deref(), Some("PROJ"));
        assert_eq!(ticket.assignee.unwrap().label(), "John Doe");
        assert_eq!(
            ticket.url.as_deref(),
            Some("https://jira.example.com/browse/PROJ-1")
        );
        assert_eq!(ticket.custom_fields.len(), 2);
        assert_eq!(
            ticket.custom_fields["customfield_10016"],
            FieldValue::Number(5.0)
        );
        assert_eq!(
            ticket.custom_fields["customfield_10020"],
            FieldValue::List(vec!["Sprint 7".to_string()])
        );
    }

    #[test]
    fn test_instance_url_from_base() {
        assert_eq!(
            instance_url_from_base("https://x.atlassian.net/rest/api/3"),
            "https://x.atlassian.net"
        );
        assert_eq!(
            instance_url_from_base("http://localhost:8080"),
            "http://localhost:8080"
        );
    }

    // =========================================================================
    // Integration tests with httpmock
    // =========================================================================

    mod integration {
        use super::*;
        use httpmock::prelude::*;

        fn self_hosted_client(server: &MockServer) -> JiraClient {
            JiraClient::with_base_url(server.base_url(), "user@example.com", "pat-token", false)
        }

        fn cloud_client(server: &MockServer) -> JiraClient {
            JiraClient::with_base_url(server.base_url(), "user@example.com", "api-token", true)
        }

        fn field_catalog_json() -> serde_json::Value {
            json!([
                {"id": "summary", "name": "Summary", "custom": false, "schema": {"type": "string", "system": "summary"}},
                {"id": "priority", "name": "Priority", "custom": false, "schema": {"type": "priority", "system": "priority"}},
                {"id": "customfield_10016", "name": "Story Points", "custom": true,
                 "schema": {"type": "number", "custom": "com.atlassian.jira.plugin.system.customfieldtypes:float"}},
                {"id": "customfield_10020", "name": "Sprint", "custom": true,
                 "schema": {"type": "array", "items": "json", "custom": "com.pyxis.greenhopper.jira:gh-sprint"}}
            ])
        }

        fn editmeta_json() -> serde_json::Value {
            json!({
                "fields": {
                    "summary": {"name": "Summary"},
                    "priority": {
                        "name": "Priority",
                        "allowedValues": [
                            {"id": "4", "name": "Low"},
                            {"id": "3", "name": "Medium"},
                            {"id": "2", "name": "High"},
                            {"id": "1", "name": "Critical"}
                        ]
                    },
                    "customfield_10016": {"name": "Story Points"}
                }
            })
        }

        fn sample_issue_json(key: &str) -> serde_json::Value {
            json!({
                "id": "10001",
                "key": key,
                "fields": {
                    "summary": "Fix login bug",
                    "status": {"name": "Open", "statusCategory": {"key": "new", "name": "To Do"}},
                    "priority": {"name": "High"},
                    "labels": ["bug"],
                    "updated": "2024-01-02T15:30:00.000+0000"
                }
            })
        }

        // =================================================================
        // Field updates
        // =================================================================

        #[tokio::test]
        async fn test_update_field_resolves_option_value() {
            let server = MockServer::start();
            let fields = server.mock(|when, then| {
                when.method(GET).path("/field");
                then.status(200).json_body(field_catalog_json());
            });
            server.mock(|when, then| {
                when.method(GET).path("/issue/PROJ-1/editmeta");
                then.status(200).json_body(editmeta_json());
            });
            let put = server.mock(|when, then| {
                when.method(PUT)
                    .path("/issue/PROJ-1")
                    .json_body(json!({"fields": {"priority": {"id": "2"}}}));
                then.status(204);
            });

            let client = self_hosted_client(&server);
            let update = client.update_field("PROJ-1", "priorty", "hi").await.unwrap();
            assert_eq!(update.field_id, "priority");
            assert_eq!(update.field_name, "Priority");
            assert_eq!(update.value, "High");

            // Catalog is cached for the client lifetime
            client.update_field("PROJ-1", "Priority", "High").await.unwrap();
            fields.assert_hits(1);
            put.assert_hits(2);
        }

        #[tokio::test]
        async fn test_update_field_rejects_far_value() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/field");
                then.status(200).json_body(field_catalog_json());
            });
            server.mock(|when, then| {
                when.method(GET).path("/issue/PROJ-1/editmeta");
                then.status(200).json_body(editmeta_json());
            });
            let put = server.mock(|when, then| {
                when.method(PUT).path("/issue/PROJ-1");
                then.status(204);
            });

            let client = self_hosted_client(&server);
            let err = client
                .update_field("PROJ-1", "priority", "xyz123")
                .await
                .unwrap_err();

            assert_eq!(
                err.to_string(),
                "No close match for 'xyz123'. Available: Low, Medium, High, Critical"
            );
            put.assert_hits(0);
        }

        #[tokio::test]
        async fn test_update_field_not_editable() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/field");
                then.status(200).json_body(field_catalog_json());
            });
            server.mock(|when, then| {
                when.method(GET).path("/issue/PROJ-1/editmeta");
                then.status(200).json_body(json!({"fields": {}}));
            });

            let client = self_hosted_client(&server);
            let err = client
                .update_field("PROJ-1", "Sprint", "12")
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                Error::FieldNotEditable { ref field, .. } if field == "customfield_10020"
            ));
        }

        #[tokio::test]
        async fn test_update_option_field_without_allowed_values() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/field");
                then.status(200).json_body(json!([
                    {"id": "customfield_10030", "name": "Severity", "custom": true,
                     "schema": {"type": "option", "custom": "com.atlassian.jira.plugin.system.customfieldtypes:select"}}
                ]));
            });
            server.mock(|when, then| {
                when.method(GET).path("/issue/PROJ-1/editmeta");
                then.status(200)
                    .json_body(json!({"fields": {"customfield_10030": {"name": "Severity"}}}));
            });
            let put = server.mock(|when, then| {
                when.method(PUT).path("/issue/PROJ-1");
                then.status(204);
            });

            let client = self_hosted_client(&server);
            let err = client
                .update_field("PROJ-1", "severity", "Major")
                .await
                .unwrap_err();

            assert!(matches!(err, Error::NotAnOptionField(ref id) if id == "customfield_10030"));
            put.assert_hits(0);
        }

        #[tokio::test]
        async fn test_resolve_allowed_value_not_option_field() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/issue/PROJ-1/editmeta");
                then.status(200).json_body(editmeta_json());
            });

            let client = self_hosted_client(&server);
            let err = client
                .resolve_allowed_value("PROJ-1", "summary", "anything")
                .await
                .unwrap_err();
            assert!(matches!(err, Error::NotAnOptionField(id) if id == "summary"));
        }

        #[tokio::test]
        async fn test_set_story_points() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/field");
                then.status(200).json_body(field_catalog_json());
            });
            let put = server.mock(|when, then| {
                when.method(PUT)
                    .path("/issue/PROJ-7")
                    .json_body(json!({"fields": {"customfield_10016": 5.0}}));
                then.status(204);
            });

            let client = cloud_client(&server);
            let update = client.set_story_points("PROJ-7", 5.0).await.unwrap();
            assert_eq!(update.field_id, "customfield_10016");
            assert_eq!(update.value, "5");
            put.assert();
        }

        #[tokio::test]
        async fn test_set_story_points_missing_field() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/field");
                then.status(200)
                    .json_body(json!([{"id": "summary", "name": "Summary"}]));
            });

            let client = cloud_client(&server);
            let err = client.set_story_points("PROJ-7", 3.0).await.unwrap_err();
            assert!(matches!(err, Error::FieldNotFound(_)));
        }

        // =================================================================
        // Search
        // =================================================================

        #[tokio::test]
        async fn test_search_self_hosted_sends_jql() {
            let server = MockServer::start();
            let search = server.mock(|when, then| {
                when.method(GET)
                    .path("/search")
                    .query_param(
                        "jql",
                        "project = \"PROJ\" AND (priority = \"High\" OR priority = \"Highest\") ORDER BY updated DESC",
                    )
                    .query_param("startAt", "0")
                    .query_param("maxResults", "10");
                then.status(200).json_body(json!({
                    "issues": [sample_issue_json("PROJ-1"), sample_issue_json("PROJ-2")],
                    "startAt": 0,
                    "maxResults": 10,
                    "total": 2
                }));
            });

            let client = self_hosted_client(&server);
            let tickets = client
                .search_tickets(&SearchCriteria {
                    project: Some("PROJ".to_string()),
                    priority: Some("high".to_string()),
                    limit: Some(10),
                    ..Default::default()
                })
                .await
                .unwrap();

            search.assert();
            assert_eq!(tickets.len(), 2);
            assert_eq!(tickets[0].key, "PROJ-1");
            assert_eq!(tickets[0].status_category.as_deref(), Some("To Do"));
        }

        #[tokio::test]
        async fn test_search_zero_limit_skips_request() {
            let server = MockServer::start();
            let search = server.mock(|when, then| {
                when.method(GET).path("/search");
                then.status(200).json_body(json!({"issues": []}));
            });

            let client = self_hosted_client(&server);
            let tickets = client
                .search_tickets(&SearchCriteria {
                    limit: Some(0),
                    ..Default::default()
                })
                .await
                .unwrap();
            assert!(tickets.is_empty());
            search.assert_hits(0);
        }

        #[tokio::test]
        async fn test_search_cloud_follows_page_token_until_limit() {
            let server = MockServer::start();
            let first = server.mock(|when, then| {
                when.method(GET)
                    .path("/search/jql")
                    .query_param("maxResults", "3");
                then.status(200).json_body(json!({
                    "issues": [sample_issue_json("PROJ-1"), sample_issue_json("PROJ-2")],
                    "nextPageToken": "page-2"
                }));
            });
            let second = server.mock(|when, then| {
                when.method(GET)
                    .path("/search/jql")
                    .query_param("nextPageToken", "page-2")
                    .query_param("maxResults", "1");
                then.status(200).json_body(json!({
                    "issues": [sample_issue_json("PROJ-3")],
                    "nextPageToken": "page-3"
                }));
            });

            let client = cloud_client(&server);
            let tickets = client
                .search_tickets(&SearchCriteria {
                    project: Some("PROJ".to_string()),
                    limit: Some(3),
                    ..Default::default()
                })
                .await
                .unwrap();

            first.assert();
            second.assert();
            assert_eq!(tickets.len(), 3);
            assert_eq!(tickets[2].key, "PROJ-3");
        }

        #[tokio::test]
        async fn test_search_resolves_fuzzy_project_through_cache() {
            let server = MockServer::start();
            let projects = server.mock(|when, then| {
                when.method(GET).path("/project");
                then.status(200).json_body(json!([
                    {"id": "1", "key": "MOB", "name": "Mobile App"},
                    {"id": "2", "key": "WEB", "name": "Website"}
                ]));
            });
            let search = server.mock(|when, then| {
                when.method(GET)
                    .path("/search")
                    .query_param("jql", "project = \"MOB\" ORDER BY updated DESC");
                then.status(200).json_body(json!({"issues": [], "total": 0}));
            });

            let client = self_hosted_client(&server);
            let criteria = SearchCriteria {
                project: Some("mobile app".to_string()),
                ..Default::default()
            };
            client.search_tickets(&criteria).await.unwrap();
            client.search_tickets(&criteria).await.unwrap();

            projects.assert_hits(1);
            search.assert_hits(2);
        }

        #[tokio::test]
        async fn test_search_keeps_raw_token_when_projects_unavailable() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/project");
                then.status(500).body("boom");
            });
            let search = server.mock(|when, then| {
                when.method(GET).path("/search").query_param(
                    "jql",
                    "(project = \"my team\" OR project = \"MY TEAM\") ORDER BY updated DESC",
                );
                then.status(200).json_body(json!({"issues": [], "total": 0}));
            });

            let client = self_hosted_client(&server);
            client
                .search_tickets(&SearchCriteria {
                    project: Some("my team".to_string()),
                    ..Default::default()
                })
                .await
                .unwrap();
            search.assert();
        }

        #[tokio::test]
        async fn test_search_uses_default_project() {
            let server = MockServer::start();
            let search = server.mock(|when, then| {
                when.method(GET)
                    .path("/search")
                    .query_param("jql", "project = \"OPS\" ORDER BY updated DESC");
                then.status(200).json_body(json!({"issues": [], "total": 0}));
            });

            let client = self_hosted_client(&server).with_default_project(Some("OPS".into()));
            client
                .search_tickets(&SearchCriteria::default())
                .await
                .unwrap();
            search.assert();
        }

        // =================================================================
        // Issues and errors
        // =================================================================

        #[tokio::test]
        async fn test_get_ticket() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/issue/PROJ-1");
                then.status(200).json_body(sample_issue_json("PROJ-1"));
            });

            let client = self_hosted_client(&server);
            let ticket = client.get_ticket("PROJ-1").await.unwrap();
            assert_eq!(ticket.summary, "Fix login bug");
            assert_eq!(ticket.labels, vec!["bug"]);
        }

        #[tokio::test]
        async fn test_upstream_error_carries_status_and_body() {
            let server = MockServer::start();
            server.mock(|when, then| {
                when.method(GET).path("/issue/PROJ-999");
                then.status(404).body("Issue does not exist");
            });

            let client = self_hosted_client(&server);
            match client.get_ticket("PROJ-999").await.unwrap_err() {
                Error::UpstreamRequestFailed { status, body } => {
                    assert_eq!(status, 404);
                    assert_eq!(body, "Issue does not exist");
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_provider_name() {
            let client = JiraClient::with_base_url("http://localhost", "u@e.com", "t", false);
            assert_eq!(TicketProvider::provider_name(&client), "jira");
        }
    }
}
