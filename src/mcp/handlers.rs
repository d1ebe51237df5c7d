use serde_json::{Value, json};

use super::format;
use super::jsonrpc::{JsonRpcErrorResponse, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse};
use super::session::{ClientInfo, Session};
use super::tools;
use crate::calendar::CalendarService;

const INSTRUCTIONS: &str = "This MCP server manages Google Calendar events. Use list_events to see \
what is scheduled (overlapping events are flagged), create_event / edit_event / delete_event to \
change events, search_attendees and get_attendee_freebusy to plan meetings, and \
get_calendar_colors for valid colorId values. edit_event only changes the fields you send.";

/// What the transport should do after a request.
#[derive(Debug)]
pub enum Dispatch {
    Reply(JsonRpcMessage),
    /// Notifications are never answered.
    Silent,
    /// `exit`: stop reading, no response.
    Exit,
}

impl From<JsonRpcResponse> for Dispatch {
    fn from(resp: JsonRpcResponse) -> Self {
        Dispatch::Reply(resp.into())
    }
}

impl From<JsonRpcErrorResponse> for Dispatch {
    fn from(resp: JsonRpcErrorResponse) -> Self {
        Dispatch::Reply(resp.into())
    }
}

/// Handle an MCP JSON-RPC request.
pub async fn handle_request(
    service: &CalendarService,
    session: &mut Session,
    request: &JsonRpcRequest,
) -> Dispatch {
    let id = request.reply_id();
    match request.method.as_str() {
        "initialize" => handle_initialize(session, request),
        "initialized" | "notifications/initialized" => {
            tracing::debug!("Client finished initialization");
            if request.is_notification() {
                Dispatch::Silent
            } else {
                JsonRpcResponse::success(id, json!({})).into()
            }
        }
        method if method.starts_with("notifications/") => {
            tracing::debug!(method, "Ignoring notification");
            Dispatch::Silent
        }
        "ping" => JsonRpcResponse::success(id, json!({})).into(),
        "tools/list" => handle_tools_list(id),
        "tools/call" => handle_tools_call(service, session, request).await,
        "shutdown" => {
            tracing::info!("Shutdown requested; waiting for exit");
            session.shutdown();
            JsonRpcResponse::success(id, json!({})).into()
        }
        "exit" => Dispatch::Exit,
        method => {
            tracing::debug!(method, "Unknown method");
            JsonRpcErrorResponse::method_not_found(id, method).into()
        }
    }
}

/// Handle the MCP initialize request.
fn handle_initialize(session: &mut Session, request: &JsonRpcRequest) -> Dispatch {
    let requested = request.params.get("protocolVersion").and_then(Value::as_str);
    let client = request
        .params
        .get("clientInfo")
        .cloned()
        .and_then(|v| serde_json::from_value::<ClientInfo>(v).ok());
    let version = session.initialize(requested, client);
    tracing::info!(
        protocol_version = version,
        client = session.client().map(|c| c.name.as_str()).unwrap_or("unknown"),
        "Session initialized"
    );

    let result = json!({
        "protocolVersion": version,
        "capabilities": {
            "tools": {
                "listChanged": false
            }
        },
        "serverInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        },
        "instructions": INSTRUCTIONS
    });
    JsonRpcResponse::success(request.reply_id(), result).into()
}

/// Every registered tool as a `tools/list` entry.
pub fn tools_json() -> Vec<Value> {
    tools::all_tools()
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "inputSchema": t.input_schema,
            })
        })
        .collect()
}

/// Handle tools/list.
fn handle_tools_list(id: Value) -> Dispatch {
    JsonRpcResponse::success(id, json!({ "tools": tools_json() })).into()
}

/// Handle tools/call. Envelope problems are protocol errors; everything the
/// calendar layer rejects comes back as a tool result with `isError: true`.
async fn handle_tools_call(
    service: &CalendarService,
    session: &Session,
    request: &JsonRpcRequest,
) -> Dispatch {
    let id = request.reply_id();
    let Some(params) = request.params.as_object() else {
        return JsonRpcErrorResponse::invalid_params(id, "tools/call params must be an object").into();
    };
    let Some(tool_name) = params.get("name").and_then(Value::as_str) else {
        return JsonRpcErrorResponse::invalid_params(id, "Missing 'name' in params").into();
    };
    let arguments = match params.get("arguments") {
        None | Some(Value::Null) => json!({}),
        Some(args @ Value::Object(_)) => args.clone(),
        Some(_) => {
            return JsonRpcErrorResponse::invalid_params(id, "'arguments' must be an object").into();
        }
    };
    if !tools::is_registered(tool_name) {
        return JsonRpcErrorResponse::invalid_params(id, format!("Unknown tool: {tool_name}")).into();
    }
    if !session.is_ready() {
        tracing::warn!(tool = %tool_name, state = ?session.state(), "tools/call outside an initialized session");
    }

    tracing::info!(
        tool = %tool_name,
        protocol = session.protocol_version().unwrap_or("none"),
        "Tool call"
    );
    let result = match tools::dispatch(service, tool_name, arguments).await {
        Ok(output) => output.into_result(),
        Err(err) => {
            err.log(tool_name);
            format::error_result(&err)
        }
    };
    JsonRpcResponse::success(id, result).into()
}
