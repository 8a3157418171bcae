//! Line-delimited JSON protocol over stdio.
//!
//! One request per line: `{"id": ..., "method": "scaffoldInit", "params": {...}}`.
//! One response per line, carrying the same `id` and either `result` or `error`.
//! Operation failures are results (`success: false`); protocol errors are for
//! unparseable lines, unknown methods, malformed params, and responses the
//! server itself failed to build.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::manifest::PluginEntry;
use crate::service::PluginService;
use crate::validation::validate_entry;
use plugsmith_core::{PluginError, ScaffoldResult};

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    ParseError,
    MethodNotFound,
    InvalidParams,
    /// The request was fine but the server could not produce a response.
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolError {
    pub code: ErrorCode,
    pub message: String,
}

impl ProtocolError {
    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::InvalidParams,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ProtocolError>,
}

impl Response {
    fn from_outcome(id: Value, outcome: Result<Value, ProtocolError>) -> Self {
        match outcome {
            Ok(result) => Self {
                id,
                result: Some(result),
                error: None,
            },
            Err(error) => Self {
                id,
                result: None,
                error: Some(error),
            },
        }
    }
}

fn param<'a>(params: &'a Value, name: &str) -> Result<&'a Value, ProtocolError> {
    params
        .get(name)
        .filter(|v| !v.is_null())
        .ok_or_else(|| ProtocolError::invalid_params(format!("missing param '{name}'")))
}

fn str_param<'a>(params: &'a Value, name: &str) -> Result<&'a str, ProtocolError> {
    param(params, name)?
        .as_str()
        .ok_or_else(|| ProtocolError::invalid_params(format!("param '{name}' must be a string")))
}

/// Entry params are validated here; an invalid entry is a failed result,
/// not a protocol error.
fn entry_param(params: &Value) -> Result<Result<PluginEntry, ScaffoldResult>, ProtocolError> {
    let candidate = param(params, "entry")?;
    Ok(validate_entry(candidate)
        .map_err(|e| ScaffoldResult::failed(&PluginError::Validation(e.to_string()))))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, ProtocolError> {
    serde_json::to_value(value).map_err(|e| ProtocolError {
        code: ErrorCode::Internal,
        message: format!("unserializable result: {e}"),
    })
}

pub async fn dispatch(service: &PluginService, request: Request) -> Response {
    debug!(method = %request.method, "Dispatching request");
    let outcome = call(service, &request.method, &request.params).await;
    if let Err(e) = &outcome {
        warn!(method = %request.method, error = %e.message, "Request rejected");
    }
    Response::from_outcome(request.id, outcome)
}

async fn call(service: &PluginService, method: &str, params: &Value) -> Result<Value, ProtocolError> {
    match method {
        "validateEntry" => Ok(match service.validate_entry(param(params, "candidate")?) {
            Ok(entry) => json!({ "valid": true, "entry": entry }),
            Err(e) => json!({ "valid": false, "error": e.to_string(), "issues": e.issues }),
        }),
        "validateManifest" => Ok(match service.validate_manifest(param(params, "candidate")?) {
            Ok(manifest) => json!({ "valid": true, "manifest": manifest }),
            Err(e) => json!({ "valid": false, "error": e.to_string(), "issues": e.issues }),
        }),
        "scaffoldInit" => match entry_param(params)? {
            Ok(entry) => to_value(service.scaffold_init(&entry).await),
            Err(rejected) => to_value(rejected),
        },
        "scaffoldContent" => match entry_param(params)? {
            Ok(entry) => to_value(service.scaffold_content(&entry).await),
            Err(rejected) => to_value(rejected),
        },
        "registerPlugin" => match entry_param(params)? {
            Ok(entry) => to_value(service.register_plugin(&entry).await),
            Err(rejected) => to_value(rejected),
        },
        "scaffold" => match entry_param(params)? {
            Ok(entry) => to_value(service.scaffold(&entry).await),
            Err(rejected) => to_value(rejected),
        },
        "recoverRegistration" => match entry_param(params)? {
            Ok(entry) => to_value(service.recover_registration(&entry).await),
            Err(rejected) => to_value(rejected),
        },
        "getPlugins" => to_value(service.get_plugins().await),
        "getPlugin" => to_value(service.get_plugin(str_param(params, "slug")?).await),
        "installPlugin" => to_value(service.install_plugin(param(params, "candidate")?).await),
        "updatePlugin" => {
            let slug = str_param(params, "slug")?;
            to_value(service.update_plugin(slug, param(params, "fields")?).await)
        }
        "removePlugin" => to_value(service.remove_plugin(str_param(params, "slug")?).await),
        "enablePlugin" => to_value(service.enable_plugin(str_param(params, "slug")?).await),
        "disablePlugin" => to_value(service.disable_plugin(str_param(params, "slug")?).await),
        "loadManifest" => to_value(service.load_manifest(str_param(params, "raw")?).await),
        "syncFromDisk" => to_value(service.sync_from_disk().await),
        "persist" => to_value(service.persist().await),
        other => Err(ProtocolError {
            code: ErrorCode::MethodNotFound,
            message: format!("unknown method '{other}'"),
        }),
    }
}

/// Handle one raw line. `None` for blank lines.
pub async fn handle_line(service: &PluginService, line: &str) -> Option<Response> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let response = match serde_json::from_str::<Request>(line) {
        Ok(request) => dispatch(service, request).await,
        Err(e) => {
            // Salvage the id when the line is JSON but not a valid request.
            let id = serde_json::from_str::<Value>(line)
                .ok()
                .and_then(|v| v.get("id").cloned())
                .unwrap_or(Value::Null);
            Response::from_outcome(
                id,
                Err(ProtocolError {
                    code: ErrorCode::ParseError,
                    message: e.to_string(),
                }),
            )
        }
    };
    Some(response)
}

/// Serve requests from `reader` until EOF, one response line per request.
pub async fn serve<R, W>(service: &PluginService, reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!(root = %service.layout().root.display(), "Serving plugin protocol on stdio");
    let mut lines = reader.lines();
    let mut handled = 0usize;
    while let Some(line) = lines.next_line().await? {
        let Some(response) = handle_line(service, &line).await else {
            continue;
        };
        let mut out = serde_json::to_string(&response)?;
        out.push('\n');
        writer.write_all(out.as_bytes()).await?;
        writer.flush().await?;
        handled += 1;
    }
    info!(handled, "Input closed; stopping");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugsmith_config::{PlugsmithConfig, WorkspaceLayout};
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> PluginService {
        PluginService::new(WorkspaceLayout::at(dir.path(), &PlugsmithConfig::default()))
    }

    async fn call_line(svc: &PluginService, line: Value) -> Response {
        handle_line(svc, &line.to_string()).await.unwrap()
    }

    fn demo() -> Value {
        json!({ "slug": "demo", "name": "Demo", "location": "local", "path": "./demo" })
    }

    #[tokio::test]
    async fn every_method_dispatches() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let calls = [
            ("validateEntry", json!({ "candidate": demo() })),
            ("validateManifest", json!({ "candidate": { "plugins": [demo()] } })),
            ("scaffoldInit", json!({ "entry": demo() })),
            ("scaffoldContent", json!({ "entry": demo() })),
            ("registerPlugin", json!({ "entry": demo() })),
            ("scaffold", json!({ "entry": demo() })),
            ("recoverRegistration", json!({ "entry": demo() })),
            ("getPlugins", json!({})),
            ("getPlugin", json!({ "slug": "demo" })),
            ("updatePlugin", json!({ "slug": "demo", "fields": { "description": "d" } })),
            ("disablePlugin", json!({ "slug": "demo" })),
            ("enablePlugin", json!({ "slug": "demo" })),
            ("persist", json!({})),
            ("syncFromDisk", json!({})),
            ("removePlugin", json!({ "slug": "demo" })),
            ("installPlugin", json!({ "candidate": demo() })),
            ("loadManifest", json!({ "raw": json!({ "plugins": [demo()] }).to_string() })),
        ];
        for (i, (method, params)) in calls.into_iter().enumerate() {
            let resp = call_line(&svc, json!({ "id": i, "method": method, "params": params })).await;
            assert_eq!(resp.id, json!(i));
            assert!(resp.error.is_none(), "{method}: {:?}", resp.error);
            let result = resp.result.unwrap();
            let ok = result
                .get("success")
                .or_else(|| result.get("valid"))
                .and_then(Value::as_bool)
                .unwrap_or(true);
            assert!(ok, "{method} returned {result}");
        }
    }

    #[tokio::test]
    async fn invalid_entry_is_a_failed_result() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let bad = json!({ "slug": "demo", "name": "Demo", "location": "remote", "path": "./demo" });
        let resp = call_line(&svc, json!({ "id": 1, "method": "scaffoldInit", "params": { "entry": bad } })).await;
        let result = resp.result.unwrap();
        assert_eq!(result["success"], false);
        assert_eq!(result["errorKind"], "validation");
    }

    #[tokio::test]
    async fn protocol_errors() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);

        let resp = call_line(&svc, json!({ "id": "a", "method": "frobnicate" })).await;
        assert_eq!(resp.error.unwrap().code, ErrorCode::MethodNotFound);

        let resp = call_line(&svc, json!({ "id": "b", "method": "getPlugin", "params": {} })).await;
        assert_eq!(resp.error.unwrap().code, ErrorCode::InvalidParams);

        let resp = handle_line(&svc, "{not json").await.unwrap();
        assert_eq!(resp.id, Value::Null);
        assert_eq!(resp.error.unwrap().code, ErrorCode::ParseError);

        assert!(handle_line(&svc, "   ").await.is_none());
    }

    #[test]
    fn unserializable_result_is_internal() {
        let mut bad = std::collections::BTreeMap::new();
        bad.insert((1u8, 2u8), "tuple keys are not JSON object keys");
        let err = to_value(bad).unwrap_err();
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(serde_json::to_value(&err.code).unwrap(), "internal");
    }

    #[tokio::test]
    async fn serve_answers_each_line() {
        let dir = TempDir::new().unwrap();
        let svc = service(&dir);
        let input = format!(
            "{}\n\n{}\n",
            json!({ "id": 1, "method": "installPlugin", "params": { "candidate": demo() } }),
            json!({ "id": 2, "method": "getPlugins" })
        );
        let mut output = Vec::new();
        serve(&svc, input.as_bytes(), &mut output).await.unwrap();

        let lines: Vec<Response> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].result.as_ref().unwrap()[0]["slug"], "demo");
    }
}
