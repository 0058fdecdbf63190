use autoscale_core::{
    ApiFault, AutoscaleError, CreateGroupRequest, Group, GroupConfiguration, GroupState,
    LaunchConfiguration, Link, LinkRelation, Result, ScalingPolicy,
};
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use super::{ApiRequest, ApiResponse, AutoscaleRepository};

pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
struct StoredGroup {
    group: Group,
    paused: bool,
}

impl StoredGroup {
    fn state(&self) -> GroupState {
        let desired = self.group.group_configuration.min_entities;
        GroupState {
            id: None,
            links: Vec::new(),
            name: Some(self.group.group_configuration.name.clone()),
            active: Vec::new(),
            active_capacity: 0,
            pending_capacity: desired,
            desired_capacity: desired,
            paused: self.paused,
        }
    }
}

#[derive(Debug, Default)]
struct TenantStore {
    order: Vec<String>,
    groups: HashMap<String, StoredGroup>,
}

/// Serves the group endpoints from memory, keyed by tenant base URL
/// (`{scheme}://{host}/v1.0/{tenant}`), so one instance can back every zone.
#[derive(Clone)]
pub struct InMemoryAutoscaleRepository {
    stores: Arc<RwLock<HashMap<String, TenantStore>>>,
    page_size: usize,
}

impl InMemoryAutoscaleRepository {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            stores: Arc::new(RwLock::new(HashMap::new())),
            page_size: page_size.max(1),
        }
    }

    pub fn group_count(&self) -> usize {
        self.stores
            .read()
            .map(|stores| stores.values().map(|store| store.groups.len()).sum())
            .unwrap_or(0)
    }

    fn route(
        &self,
        request: &ApiRequest,
        base: &str,
        rest: &[&str],
        url: &Url,
    ) -> Result<ApiResponse> {
        match (&request.method, rest) {
            (&Method::GET, []) => self.list(base, url),
            (&Method::POST, []) => self.create(base, request.body.as_ref()),
            (&Method::GET, [id]) => {
                self.with_group(base, id, |stored| enveloped(200, "group", &stored.group))
            }
            (&Method::DELETE, [id]) => self.delete(base, id),
            (&Method::GET, [id, "state"]) => {
                self.with_group(base, id, |stored| enveloped(200, "group", &stored.state()))
            }
            (&Method::GET, [id, "config"]) => self.with_group(base, id, |stored| {
                enveloped(
                    200,
                    "groupConfiguration",
                    &stored.group.group_configuration,
                )
            }),
            (&Method::PUT, [id, "config"]) => {
                let config: GroupConfiguration = match decode_body(request.body.as_ref()) {
                    Ok(config) => config,
                    Err(response) => return Ok(response),
                };
                if let Some(response) = validate_bounds(&config) {
                    return Ok(response);
                }
                self.update_group(base, id, |stored| {
                    stored.group.group_configuration = config;
                })
            }
            (&Method::GET, [id, "launch"]) => self.with_group(base, id, |stored| {
                enveloped(
                    200,
                    "launchConfiguration",
                    &stored.group.launch_configuration,
                )
            }),
            (&Method::PUT, [id, "launch"]) => {
                let launch: LaunchConfiguration = match decode_body(request.body.as_ref()) {
                    Ok(launch) => launch,
                    Err(response) => return Ok(response),
                };
                self.update_group(base, id, |stored| {
                    stored.group.launch_configuration = launch;
                })
            }
            (&Method::POST, [id, "pause"]) => self.update_group(base, id, |stored| {
                stored.paused = true;
            }),
            (&Method::POST, [id, "resume"]) => self.update_group(base, id, |stored| {
                stored.paused = false;
            }),
            _ => fault_response(ApiFault::new(
                "NotFound",
                404,
                format!("no route for {} {}", request.method, url.path()),
            )),
        }
    }

    fn create(&self, base: &str, body: Option<&Value>) -> Result<ApiResponse> {
        let request: CreateGroupRequest = match decode_body(body) {
            Ok(request) => request,
            Err(response) => return Ok(response),
        };
        if let Some(response) = validate_bounds(&request.group_configuration) {
            return Ok(response);
        }

        let group_id = Uuid::new_v4().to_string();
        let group_href = format!("{base}/groups/{group_id}/");
        let scaling_policies = request
            .scaling_policies
            .into_iter()
            .map(|policy| {
                let policy_id = Uuid::new_v4().to_string();
                ScalingPolicy {
                    links: vec![Link::self_link(format!("{group_href}policies/{policy_id}/"))],
                    id: policy_id,
                    policy,
                }
            })
            .collect();
        let group = Group {
            id: group_id.clone(),
            links: vec![Link::self_link(group_href)],
            group_configuration: request.group_configuration,
            launch_configuration: request.launch_configuration,
            scaling_policies,
        };

        let mut stores = self.write_stores()?;
        let store = stores.entry(base.to_string()).or_default();
        store.order.push(group_id.clone());
        store.groups.insert(
            group_id,
            StoredGroup {
                group: group.clone(),
                paused: false,
            },
        );

        enveloped(201, "group", &group)
    }

    fn list(&self, base: &str, url: &Url) -> Result<ApiResponse> {
        let mut limit = self.page_size;
        let mut marker = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "limit" => match value.parse::<usize>() {
                    Ok(parsed) if parsed > 0 => limit = parsed,
                    _ => {
                        return fault_response(ApiFault::new(
                            "InvalidQueryArgument",
                            400,
                            format!("invalid limit '{value}'"),
                        ))
                    }
                },
                "marker" => marker = Some(value.into_owned()),
                _ => {}
            }
        }

        let stores = self.read_stores()?;
        let empty = TenantStore::default();
        let store = stores.get(base).unwrap_or(&empty);

        let start = marker
            .as_deref()
            .and_then(|marker| store.order.iter().position(|id| id == marker))
            .map(|index| index + 1)
            .unwrap_or(0);
        let end = start.saturating_add(limit).min(store.order.len());

        let groups = store.order[start..end]
            .iter()
            .filter_map(|id| store.groups.get(id))
            .map(|stored| ListedGroup {
                id: &stored.group.id,
                links: &stored.group.links,
                state: stored.state(),
            })
            .collect();

        let mut groups_links = Vec::new();
        if end < store.order.len() {
            if let Some(last) = store.order[..end].last() {
                groups_links.push(Link::new(
                    LinkRelation::Next,
                    format!("{base}/groups?limit={limit}&marker={last}"),
                ));
            }
        }

        json_response(
            200,
            &GroupPage {
                groups,
                groups_links,
            },
        )
    }

    fn delete(&self, base: &str, id: &str) -> Result<ApiResponse> {
        let mut stores = self.write_stores()?;
        let removed = match stores.get_mut(base) {
            Some(store) => {
                store.order.retain(|existing| existing != id);
                store.groups.remove(id).is_some()
            }
            None => false,
        };
        if removed {
            Ok(ApiResponse::new(204, ""))
        } else {
            no_such_group(id)
        }
    }

    fn with_group<F>(&self, base: &str, id: &str, respond: F) -> Result<ApiResponse>
    where
        F: FnOnce(&StoredGroup) -> Result<ApiResponse>,
    {
        let stores = self.read_stores()?;
        match stores.get(base).and_then(|store| store.groups.get(id)) {
            Some(stored) => respond(stored),
            None => no_such_group(id),
        }
    }

    fn update_group<F>(&self, base: &str, id: &str, update: F) -> Result<ApiResponse>
    where
        F: FnOnce(&mut StoredGroup),
    {
        let mut stores = self.write_stores()?;
        match stores
            .get_mut(base)
            .and_then(|store| store.groups.get_mut(id))
        {
            Some(stored) => {
                update(stored);
                Ok(ApiResponse::new(204, ""))
            }
            None => no_such_group(id),
        }
    }

    fn read_stores(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, TenantStore>>> {
        self.stores
            .read()
            .map_err(|_| AutoscaleError::Transport("in-memory store lock poisoned".to_string()))
    }

    fn write_stores(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, TenantStore>>> {
        self.stores
            .write()
            .map_err(|_| AutoscaleError::Transport("in-memory store lock poisoned".to_string()))
    }
}

impl Default for InMemoryAutoscaleRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl AutoscaleRepository for InMemoryAutoscaleRepository {
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = Url::parse(&request.url).map_err(|e| {
            AutoscaleError::Transport(format!("invalid request url '{}': {e}", request.url))
        })?;
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let Some(groups_at) = segments.iter().position(|segment| *segment == "groups") else {
            return fault_response(ApiFault::new(
                "NotFound",
                404,
                format!("no route for {} {}", request.method, url.path()),
            ));
        };
        let base = format!(
            "{}/{}",
            url.origin().ascii_serialization(),
            segments[..groups_at].join("/")
        );

        self.route(request, &base, &segments[groups_at + 1..], &url)
    }
}

#[derive(Serialize)]
struct ListedGroup<'a> {
    id: &'a str,
    links: &'a [Link],
    state: GroupState,
}

#[derive(Serialize)]
struct GroupPage<'a> {
    groups: Vec<ListedGroup<'a>>,
    groups_links: Vec<Link>,
}

fn enveloped<T: Serialize>(status: u16, key: &str, value: &T) -> Result<ApiResponse> {
    let mut body = serde_json::Map::new();
    body.insert(key.to_string(), serde_json::to_value(value)?);
    json_response(status, &body)
}

fn json_response<T: Serialize>(status: u16, body: &T) -> Result<ApiResponse> {
    Ok(ApiResponse::new(status, serde_json::to_string(body)?))
}

fn fault_response(fault: ApiFault) -> Result<ApiResponse> {
    json_response(fault.code, &fault)
}

fn no_such_group(id: &str) -> Result<ApiResponse> {
    fault_response(ApiFault::new(
        "NoSuchScalingGroupError",
        404,
        format!("The scaling group '{id}' was not found"),
    ))
}

/// Decodes a request body, or yields the 400 response the service would send.
fn decode_body<T: serde::de::DeserializeOwned>(
    body: Option<&Value>,
) -> std::result::Result<T, ApiResponse> {
    let invalid = |message: String| {
        let fault = ApiFault::new("ValidationError", 400, message);
        ApiResponse::new(400, serde_json::to_string(&fault).unwrap_or_default())
    };
    let body = body.ok_or_else(|| invalid("request body is required".to_string()))?;
    serde_json::from_value(body.clone()).map_err(|e| invalid(e.to_string()))
}

fn validate_bounds(config: &GroupConfiguration) -> Option<ApiResponse> {
    if config.min_entities > config.max_entities {
        let fault = ApiFault::new(
            "InvalidMinEntities",
            400,
            format!(
                "minEntities ({}) is greater than maxEntities ({})",
                config.min_entities, config.max_entities
            ),
        );
        return Some(ApiResponse::new(
            400,
            serde_json::to_string(&fault).unwrap_or_default(),
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://dfw.autoscale.api.rackspacecloud.com/v1.0/123456";

    fn create_body(min: u32, max: u32) -> Value {
        json!({
            "groupConfiguration": {
                "name": "workers",
                "cooldown": 60,
                "minEntities": min,
                "maxEntities": max,
                "metadata": {}
            },
            "launchConfiguration": {
                "type": "launch_server",
                "args": {
                    "server": {
                        "name": "web",
                        "imageRef": "img",
                        "flavorRef": "2"
                    }
                }
            },
            "scalingPolicies": [
                {"name": "up", "cooldown": 1, "type": "webhook", "change": 1}
            ]
        })
    }

    fn create(repo: &InMemoryAutoscaleRepository) -> Group {
        let response = repo
            .execute(&ApiRequest::post(
                format!("{BASE}/groups"),
                Some(create_body(0, 10)),
            ))
            .unwrap();
        assert_eq!(response.status, 201);
        let value: Value = serde_json::from_str(&response.body).unwrap();
        serde_json::from_value(value["group"].clone()).unwrap()
    }

    #[test]
    fn test_create_assigns_ids_and_self_links() {
        let repo = InMemoryAutoscaleRepository::new();
        let group = create(&repo);

        assert_eq!(
            group.links,
            vec![Link::self_link(format!("{BASE}/groups/{}/", group.id))]
        );
        let policy = &group.scaling_policies[0];
        assert_eq!(
            policy.links[0].href,
            format!("{BASE}/groups/{}/policies/{}/", group.id, policy.id)
        );
        assert_eq!(repo.group_count(), 1);
    }

    #[test]
    fn test_create_rejects_inverted_bounds() {
        let repo = InMemoryAutoscaleRepository::new();
        let response = repo
            .execute(&ApiRequest::post(
                format!("{BASE}/groups"),
                Some(create_body(5, 1)),
            ))
            .unwrap();
        assert_eq!(response.status, 400);
        assert!(response.body.contains("InvalidMinEntities"));
        assert_eq!(repo.group_count(), 0);
    }

    #[test]
    fn test_create_without_body_is_validation_error() {
        let repo = InMemoryAutoscaleRepository::new();
        let response = repo
            .execute(&ApiRequest::post(format!("{BASE}/groups"), None))
            .unwrap();
        assert_eq!(response.status, 400);
        assert!(response.body.contains("ValidationError"));
    }

    #[test]
    fn test_state_omits_group_id() {
        let repo = InMemoryAutoscaleRepository::new();
        let group = create(&repo);

        let response = repo
            .execute(&ApiRequest::get(format!("{BASE}/groups/{}/state", group.id)))
            .unwrap();
        assert_eq!(response.status, 200);
        let value: Value = serde_json::from_str(&response.body).unwrap();
        assert!(value["group"].get("id").is_none());
        assert_eq!(value["group"]["paused"], false);
    }

    #[test]
    fn test_groups_are_scoped_by_tenant_base_url() {
        let repo = InMemoryAutoscaleRepository::new();
        let group = create(&repo);

        let other_zone = "https://ord.autoscale.api.rackspacecloud.com/v1.0/123456";
        let response = repo
            .execute(&ApiRequest::get(format!("{other_zone}/groups/{}", group.id)))
            .unwrap();
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_delete_then_delete_again() {
        let repo = InMemoryAutoscaleRepository::new();
        let group = create(&repo);
        let url = format!("{BASE}/groups/{}", group.id);

        assert_eq!(repo.execute(&ApiRequest::delete(&url)).unwrap().status, 204);
        assert_eq!(repo.execute(&ApiRequest::delete(&url)).unwrap().status, 404);
        assert_eq!(repo.group_count(), 0);
    }

    #[test]
    fn test_list_pages_with_next_link() {
        let repo = InMemoryAutoscaleRepository::with_page_size(2);
        let ids: Vec<String> = (0..3).map(|_| create(&repo).id).collect();

        let response = repo
            .execute(&ApiRequest::get(format!("{BASE}/groups")))
            .unwrap();
        let value: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(value["groups"].as_array().unwrap().len(), 2);
        assert_eq!(value["groups"][0]["id"], ids[0].as_str());
        assert_eq!(
            value["groups_links"][0]["href"],
            format!("{BASE}/groups?limit=2&marker={}", ids[1])
        );

        let next = value["groups_links"][0]["href"].as_str().unwrap();
        let response = repo.execute(&ApiRequest::get(next)).unwrap();
        let value: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(value["groups"].as_array().unwrap().len(), 1);
        assert_eq!(value["groups"][0]["id"], ids[2].as_str());
        assert!(value["groups_links"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_list_with_huge_limit_after_marker() {
        let repo = InMemoryAutoscaleRepository::new();
        let first = create(&repo);
        let second = create(&repo);

        let response = repo
            .execute(&ApiRequest::get(format!(
                "{BASE}/groups?limit={}&marker={}",
                usize::MAX,
                first.id
            )))
            .unwrap();
        assert_eq!(response.status, 200);
        let page: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(page["groups"].as_array().map(Vec::len), Some(1));
        assert_eq!(page["groups"][0]["id"], second.id.as_str());
        assert_eq!(page["groups_links"], json!([]));
    }

    #[test]
    fn test_list_rejects_zero_limit() {
        let repo = InMemoryAutoscaleRepository::new();
        let response = repo
            .execute(&ApiRequest::get(format!("{BASE}/groups?limit=0")))
            .unwrap();
        assert_eq!(response.status, 400);
    }

    #[test]
    fn test_pause_and_resume_toggle_state() {
        let repo = InMemoryAutoscaleRepository::new();
        let group = create(&repo);
        let state_url = format!("{BASE}/groups/{}/state", group.id);

        let pause = repo
            .execute(&ApiRequest::post(format!("{BASE}/groups/{}/pause", group.id), None))
            .unwrap();
        assert_eq!(pause.status, 204);
        let state: Value =
            serde_json::from_str(&repo.execute(&ApiRequest::get(&state_url)).unwrap().body)
                .unwrap();
        assert_eq!(state["group"]["paused"], true);

        repo.execute(&ApiRequest::post(format!("{BASE}/groups/{}/resume", group.id), None))
            .unwrap();
        let state: Value =
            serde_json::from_str(&repo.execute(&ApiRequest::get(&state_url)).unwrap().body)
                .unwrap();
        assert_eq!(state["group"]["paused"], false);
    }

    #[test]
    fn test_unknown_route_is_not_found() {
        let repo = InMemoryAutoscaleRepository::new();
        let response = repo
            .execute(&ApiRequest::get(format!("{BASE}/webhooks")))
            .unwrap();
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_invalid_url_is_transport_error() {
        let repo = InMemoryAutoscaleRepository::new();
        let err = repo.execute(&ApiRequest::get("not a url")).unwrap_err();
        assert!(matches!(err, AutoscaleError::Transport(_)));
    }
}
