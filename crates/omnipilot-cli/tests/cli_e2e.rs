use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tempfile::tempdir;

const TEXT_RESPONSE_BODY: &str = concat!(
    "data: {\"id\":\"chatcmpl-e2e-1\",\"object\":\"chat.completion.chunk\",",
    "\"choices\":[{\"index\":0,\"delta\":{\"content\":\"hello from \"},",
    "\"finish_reason\":null}]}\n\n",
    "data: {\"id\":\"chatcmpl-e2e-1\",\"object\":\"chat.completion.chunk\",",
    "\"choices\":[{\"index\":0,\"delta\":{\"content\":\"omnipilot\"},",
    "\"finish_reason\":null}]}\n\n",
    "data: {\"id\":\"chatcmpl-e2e-1\",\"object\":\"chat.completion.chunk\",",
    "\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}],",
    "\"usage\":{\"prompt_tokens\":12,\"completion_tokens\":4,\"total_tokens\":16}}\n\n",
    "data: [DONE]\n\n"
);

const MODELS_BODY: &str = r#"{"object":"list","data":[{"id":"zeta-model"},{"id":"alpha-model"}]}"#;
const UNAUTHORIZED_BODY: &str =
    r#"{"error":{"message":"Invalid API key","type":"invalid_request_error"}}"#;

#[test]
fn e2e_ask_streams_text_from_mock_openai() {
    let conf_dir = tempdir().expect("create temp conf dir");
    let server = MockOpenAiServer::start(200);
    write_omnipilot_toml(conf_dir.path(), &server.base_url, "test-key");

    let output = run_omnipilot(conf_dir.path(), &["ask", "say", "hello"]);
    assert_command_succeeded(&output);

    let stdout = text(&output.stdout);
    assert_eq!(stdout.trim_end(), "hello from omnipilot");
    let stderr = text(&output.stderr);
    assert!(
        stderr.contains("usage: prompt=12 completion=4 total=16"),
        "expected usage line on stderr, got:\n{stderr}"
    );

    let requests = server.requests();
    assert_eq!(requests.len(), 1, "expected exactly one LLM request");
    assert!(requests[0].starts_with("POST /v1/chat/completions"));
    assert!(requests[0].contains("\"stream\":true"));
    assert!(requests[0].contains("say hello"));
    assert!(requests[0].contains("\"role\":\"system\""));
}

#[test]
fn e2e_models_prints_sorted_ids() {
    let conf_dir = tempdir().expect("create temp conf dir");
    let server = MockOpenAiServer::start(200);
    write_omnipilot_toml(conf_dir.path(), &server.base_url, "test-key");

    let output = run_omnipilot(conf_dir.path(), &["models"]);
    assert_command_succeeded(&output);
    assert_eq!(text(&output.stdout), "alpha-model\nzeta-model\n");
}

#[test]
fn e2e_ask_prints_guidance_for_rejected_key() {
    let conf_dir = tempdir().expect("create temp conf dir");
    let server = MockOpenAiServer::start(401);
    write_omnipilot_toml(conf_dir.path(), &server.base_url, "bad-key");

    let output = run_omnipilot(conf_dir.path(), &["ask", "hi"]);
    assert!(!output.status.success(), "rejected key should fail");

    let stderr = text(&output.stderr);
    assert!(stderr.contains("### Invalid API key"), "got:\n{stderr}");
    assert!(
        stderr.contains("**Technical error:** [401] invalid_request_error: Invalid API key"),
        "got:\n{stderr}"
    );
}

#[test]
fn e2e_validate_rejects_missing_key() {
    let conf_dir = tempdir().expect("create temp conf dir");
    write_omnipilot_toml(conf_dir.path(), "http://127.0.0.1:9/v1", "");

    let output = run_omnipilot(conf_dir.path(), &["validate"]);
    assert!(!output.status.success());
    assert!(text(&output.stderr).contains("mock: API key is required"));
}

#[test]
fn e2e_unknown_provider_fails() {
    let conf_dir = tempdir().expect("create temp conf dir");
    write_omnipilot_toml(conf_dir.path(), "http://127.0.0.1:9/v1", "test-key");

    let output = run_omnipilot(conf_dir.path(), &["ask", "--provider", "nope", "hi"]);
    assert!(!output.status.success());
    assert!(text(&output.stderr).contains("no provider named \"nope\""));
}

fn run_omnipilot(conf_dir: &Path, args: &[&str]) -> Output {
    Command::new(PathBuf::from(env!("CARGO_BIN_EXE_omnipilot")))
        .arg("--conf-dir")
        .arg(conf_dir)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("execute omnipilot binary")
}

fn write_omnipilot_toml(conf_dir: &Path, base_url: &str, api_key: &str) {
    fs::create_dir_all(conf_dir).expect("create conf dir");
    let content = format!(
        r#"system_prompt = "You are a test assistant."
idle_timeout_ms = 5000

[log]
level = "error"
stdout = false

[[providers]]
name = "mock"
api_url = "{base_url}"
api_key = "{api_key}"
model = "gpt-4o-mini"
default = true
"#
    );
    fs::write(conf_dir.join("omnipilot.toml"), content).expect("write omnipilot.toml");
}

fn assert_command_succeeded(output: &Output) {
    if output.status.success() {
        return;
    }
    panic!(
        "omnipilot exited with status {}\nstdout:\n{}\nstderr:\n{}",
        output.status,
        text(&output.stdout),
        text(&output.stderr)
    );
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_string()
}

struct MockOpenAiServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockOpenAiServer {
    /// Serves chat completions and model listings; any status other than 200
    /// answers every request with an authentication error.
    fn start(status: u16) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
        let address = listener.local_addr().expect("resolve local address");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&requests);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else {
                    break;
                };
                let Ok(request) = read_http_request(&mut stream) else {
                    continue;
                };
                let request_line = request.lines().next().unwrap_or_default().to_string();
                if let Ok(mut captured) = captured.lock() {
                    captured.push(request);
                }

                let (content_type, body) = if status != 200 {
                    ("application/json", UNAUTHORIZED_BODY)
                } else if request_line.contains("/models") {
                    ("application/json", MODELS_BODY)
                } else {
                    ("text/event-stream", TEXT_RESPONSE_BODY)
                };
                let _ = write_http_response(&mut stream, status, content_type, body);
            }
        });

        Self {
            base_url: format!("http://{address}/v1"),
            requests,
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("lock requests").clone()
    }
}

fn read_http_request(stream: &mut TcpStream) -> Result<String, String> {
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .map_err(|error| format!("set read timeout failed: {error}"))?;

    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 4096];
    let header_end = loop {
        let read = stream
            .read(&mut chunk)
            .map_err(|error| format!("read request header failed: {error}"))?;
        if read == 0 {
            return Err("connection closed before headers were complete".to_string());
        }
        buffer.extend_from_slice(&chunk[..read]);
        if let Some(position) = buffer.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buffer.len() < header_end + content_length {
        let read = stream
            .read(&mut chunk)
            .map_err(|error| format!("read request body failed: {error}"))?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }

    Ok(String::from_utf8_lossy(&buffer).to_string())
}

fn write_http_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &str,
) -> std::io::Result<()> {
    let reason = if status == 200 { "OK" } else { "Unauthorized" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes())?;
    stream.flush()
}
