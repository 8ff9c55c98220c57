use std::fmt::Write as _;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{ApiResponse, OrderEntry, RemoteError, RemoteTasks};
use crate::models::{List, Note, Priority, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: Method,
    /// Path relative to the API root, including any query string.
    pub path: String,
    pub body: Option<Value>,
    pub bearer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

/// Moves a request over the wire. Implementations return `Err` only when no
/// HTTP response was received at all; error statuses come back as `Ok`.
pub trait Transport {
    fn send(&mut self, request: &RestRequest) -> Result<RawResponse, RemoteError>;
}

/// Filters accepted by `GET /tasks`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub list_id: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
}

impl TaskQuery {
    fn to_query_string(&self) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if let Some(list_id) = &self.list_id {
            pairs.push(("listId", list_id.clone()));
        }
        if let Some(completed) = self.completed {
            pairs.push(("completed", completed.to_string()));
        }
        if let Some(priority) = self.priority {
            pairs.push(("priority", priority.as_str().to_string()));
        }
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if pairs.is_empty() {
            return String::new();
        }
        let joined: Vec<String> = pairs
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, encode_component(&v)))
            .collect();
        format!("?{}", joined.join("&"))
    }
}

fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => {
                let _ = write!(out, "%{:02X}", byte);
            }
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

/// Decode the `{success, data, error, message}` envelope.
pub fn decode_response<R: DeserializeOwned>(response: &RawResponse) -> Result<Option<R>, RemoteError> {
    let status_ok = (200..300).contains(&response.status);
    let envelope: ApiResponse<R> = match serde_json::from_str(&response.body) {
        Ok(envelope) => envelope,
        Err(e) if status_ok => {
            return Err(RemoteError::Network(format!("malformed response: {}", e)));
        }
        Err(_) => {
            return Err(RemoteError::from_status(
                response.status,
                format!("request failed with status {}", response.status),
            ));
        }
    };

    if !status_ok || !envelope.success {
        let message = envelope
            .error
            .or(envelope.message)
            .unwrap_or_else(|| format!("request failed with status {}", response.status));
        // A 2xx carrying success=false is treated as a rejected request
        let status = if status_ok { 400 } else { response.status };
        return Err(RemoteError::from_status(status, message));
    }
    Ok(envelope.data)
}

/// Client for the REST API.
pub struct RestRemote<T> {
    transport: T,
    token: Option<String>,
}

impl<T: Transport> RestRemote<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn register(
        &mut self,
        email: &str,
        password: &str,
        username: Option<&str>,
    ) -> Result<Session, RemoteError> {
        validate_credentials(email, password)?;
        let body = json!({ "email": email.trim(), "password": password, "username": username });
        let session: Session = self.call_data(Method::Post, "/auth/register".to_string(), Some(body))?;
        self.token = Some(session.token.clone());
        tracing::info!(user = %session.user.id, "registered");
        Ok(session)
    }

    pub fn login(&mut self, email: &str, password: &str) -> Result<Session, RemoteError> {
        validate_credentials(email, password)?;
        let body = json!({ "email": email.trim(), "password": password });
        let session: Session = self.call_data(Method::Post, "/auth/login".to_string(), Some(body))?;
        self.token = Some(session.token.clone());
        tracing::info!(user = %session.user.id, "logged in");
        Ok(session)
    }

    /// Drops the token even when the server call fails.
    pub fn logout(&mut self) -> Result<(), RemoteError> {
        let result = self.call::<Value>(Method::Post, "/auth/logout".to_string(), None);
        self.token = None;
        result.map(|_| ())
    }

    pub fn me(&mut self) -> Result<UserProfile, RemoteError> {
        self.call_data(Method::Get, "/auth/me".to_string(), None)
    }

    pub fn fetch_tasks_matching(&mut self, query: &TaskQuery) -> Result<Vec<Task>, RemoteError> {
        let path = format!("/tasks{}", query.to_query_string());
        Ok(self.call(Method::Get, path, None)?.unwrap_or_default())
    }

    pub fn get_task(&mut self, id: &str) -> Result<Task, RemoteError> {
        self.call_data(Method::Get, format!("/tasks/{}", encode_component(id)), None)
    }

    pub fn toggle_task(&mut self, id: &str) -> Result<Task, RemoteError> {
        self.call_data(Method::Post, format!("/tasks/{}/toggle", encode_component(id)), None)
    }

    fn call<R: DeserializeOwned>(
        &mut self,
        method: Method,
        path: String,
        body: Option<Value>,
    ) -> Result<Option<R>, RemoteError> {
        let request = RestRequest {
            method,
            path,
            body,
            bearer: self.token.clone(),
        };
        tracing::debug!(method = method.as_str(), path = %request.path, "sending request");
        let response = self.transport.send(&request)?;
        let decoded = decode_response(&response);
        if let Err(ref e) = decoded {
            tracing::warn!(method = method.as_str(), path = %request.path, status = response.status, "request failed: {}", e);
        }
        decoded
    }

    fn call_data<R: DeserializeOwned>(
        &mut self,
        method: Method,
        path: String,
        body: Option<Value>,
    ) -> Result<R, RemoteError> {
        self.call(method, path, body)?
            .ok_or_else(|| RemoteError::Network("response carried no data".to_string()))
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), RemoteError> {
    if !email.trim().contains('@') {
        return Err(RemoteError::Validation("a valid email is required".to_string()));
    }
    if password.is_empty() {
        return Err(RemoteError::Validation("password is required".to_string()));
    }
    Ok(())
}

fn to_body<S: Serialize>(value: &S) -> Result<Value, RemoteError> {
    serde_json::to_value(value).map_err(|e| RemoteError::Validation(e.to_string()))
}

impl<T: Transport> RemoteTasks for RestRemote<T> {
    fn fetch_tasks(&mut self) -> Result<Vec<Task>, RemoteError> {
        self.fetch_tasks_matching(&TaskQuery::default())
    }

    fn create_task(&mut self, task: &Task) -> Result<Task, RemoteError> {
        self.call_data(Method::Post, "/tasks".to_string(), Some(to_body(task)?))
    }

    fn update_task(&mut self, task: &Task) -> Result<Task, RemoteError> {
        let path = format!("/tasks/{}", encode_component(&task.id));
        self.call_data(Method::Patch, path, Some(to_body(task)?))
    }

    fn delete_task(&mut self, id: &str) -> Result<(), RemoteError> {
        self.call::<Value>(Method::Delete, format!("/tasks/{}", encode_component(id)), None)
            .map(|_| ())
    }

    fn reorder_tasks(&mut self, entries: &[OrderEntry]) -> Result<(), RemoteError> {
        let body = json!({ "tasks": entries });
        self.call::<Value>(Method::Post, "/tasks/reorder".to_string(), Some(body))
            .map(|_| ())
    }

    fn fetch_lists(&mut self) -> Result<Vec<List>, RemoteError> {
        Ok(self.call(Method::Get, "/lists".to_string(), None)?.unwrap_or_default())
    }

    fn create_list(&mut self, list: &List) -> Result<List, RemoteError> {
        self.call_data(Method::Post, "/lists".to_string(), Some(to_body(list)?))
    }

    fn update_list(&mut self, list: &List) -> Result<List, RemoteError> {
        let path = format!("/lists/{}", encode_component(&list.id));
        self.call_data(Method::Patch, path, Some(to_body(list)?))
    }

    fn delete_list(&mut self, id: &str) -> Result<(), RemoteError> {
        self.call::<Value>(Method::Delete, format!("/lists/{}", encode_component(id)), None)
            .map(|_| ())
    }

    fn fetch_notes(&mut self) -> Result<Vec<Note>, RemoteError> {
        Ok(self.call(Method::Get, "/notes".to_string(), None)?.unwrap_or_default())
    }

    fn create_note(&mut self, note: &Note) -> Result<Note, RemoteError> {
        self.call_data(Method::Post, "/notes".to_string(), Some(to_body(note)?))
    }

    fn update_note(&mut self, note: &Note) -> Result<Note, RemoteError> {
        let path = format!("/notes/{}", encode_component(&note.id));
        self.call_data(Method::Patch, path, Some(to_body(note)?))
    }

    fn delete_note(&mut self, id: &str) -> Result<(), RemoteError> {
        self.call::<Value>(Method::Delete, format!("/notes/{}", encode_component(id)), None)
            .map(|_| ())
    }
}
