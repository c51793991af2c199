//! CLI subprocess integration tests.
//!
//! These tests invoke the `drydock` binary as a subprocess and verify
//! exit codes, stdout content, and JSON output stability.

use std::path::{Path, PathBuf};
use std::process::Command;

struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "").unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn drydock(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_drydock"));
        cmd.arg("--config")
            .arg(self.path().join("config.toml"))
            .arg("--prefs")
            .arg(self.path().join("prefs"))
            .arg("--user")
            .arg("alice")
            .env_remove("DRYDOCK_LOG");
        cmd
    }
}

const IMAGE_WORKSPACE: &str = r#"
[recipe]
type = "dockerimage"
location = "eclipse/ubuntu_jdk8"

[machines.dev-machine.servers.tomcat]
port = "8080"
protocol = "http"
path = "/api"
"#;

const COMPOSE_WORKSPACE: &str = r#"
[recipe]
type = "compose"
content_type = "application/x-yaml"
content = """
services:
  db:
    image: postgres:16
    healthcheck:
      test: ["CMD", "true"]
  app:
    build:
      context: ./app
"""
"#;

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout must be JSON ({e}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

#[test]
fn cli_version_exits_zero() {
    let output = Command::new(env!("CARGO_BIN_EXE_drydock"))
        .arg("--version")
        .output()
        .unwrap();
    assert!(output.status.success(), "drydock --version must exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("drydock"), "version output: {stdout}");
}

#[test]
fn cli_help_lists_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_drydock"))
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["parse", "convert", "up", "namespaces", "completions"] {
        assert!(stdout.contains(command), "help must list '{command}'");
    }
}

#[test]
fn cli_parse_json_shows_both_service_kinds() {
    let sb = Sandbox::new();
    let ws = sb.write("workspace.toml", COMPOSE_WORKSPACE);
    let output = sb.drydock().args(["--json", "parse"]).arg(&ws).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json = stdout_json(&output);
    assert_eq!(json["services"]["db"]["image"], "postgres:16");
    assert_eq!(json["services"]["app"]["build"]["context"], "./app");
    assert!(json["services"]["app"]["build"]["args"]
        .as_object()
        .unwrap()
        .is_empty());
    assert_eq!(json["warnings"][0]["code"], 4100);
}

#[test]
fn cli_parse_text_reports_warnings_on_stderr() {
    let sb = Sandbox::new();
    let ws = sb.write("workspace.toml", COMPOSE_WORKSPACE);
    let output = sb.drydock().arg("parse").arg(&ws).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stdout.contains("app"));
    assert!(stdout.contains("./app"));
    assert!(stderr.contains("healthcheck"));
}

#[test]
fn cli_unsupported_recipe_exits_with_recipe_code() {
    let sb = Sandbox::new();
    let ws = sb.write(
        "workspace.toml",
        "[recipe]\ntype = \"vagrant\"\ncontent = \"box\"\n",
    );
    let output = sb.drydock().arg("parse").arg(&ws).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("vagrant"));
    assert!(stderr.contains("compose, dockerfile, dockerimage"));
}

#[test]
fn cli_bad_config_exits_with_config_code() {
    let sb = Sandbox::new();
    sb.write("config.toml", "[proxy]\nftp_proxy = \"x\"\n");
    let ws = sb.write("workspace.toml", IMAGE_WORKSPACE);
    let output = sb.drydock().arg("parse").arg(&ws).output().unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn cli_convert_single_image_to_kubernetes_pod() {
    let sb = Sandbox::new();
    let ws = sb.write("workspace.toml", IMAGE_WORKSPACE);
    let output = sb
        .drydock()
        .args(["--json", "convert"])
        .arg(&ws)
        .args(["--backend", "kubernetes", "--workspace-id", "ws1"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json = stdout_json(&output);
    assert_eq!(json["backend"], "kubernetes");
    assert_eq!(json["object"]["kind"], "pod");
    assert_eq!(json["object"]["containers"][0]["image"], "eclipse/ubuntu_jdk8");
    assert_eq!(
        json["object"]["annotations"]["drydock.io/container.dev-machine.machine-name"],
        "dev-machine"
    );
}

#[test]
fn cli_convert_rejects_unknown_backend() {
    let sb = Sandbox::new();
    let ws = sb.write("workspace.toml", IMAGE_WORKSPACE);
    let output = sb
        .drydock()
        .arg("convert")
        .arg(&ws)
        .args(["--backend", "podman"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn cli_up_prints_resolved_servers() {
    let sb = Sandbox::new();
    sb.write(
        "config.toml",
        "[proxy]\nhttps_proxy = \"https://proxy:3128\"\n[servers]\nexternal_host = \"ws.local\"\n",
    );
    let ws = sb.write("workspace.toml", IMAGE_WORKSPACE);
    let output = sb
        .drydock()
        .args(["--json", "up"])
        .arg(&ws)
        .args(["--workspace-id", "ws1"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json = stdout_json(&output);
    let tomcat = &json["servers"]["dev-machine"]["tomcat"];
    assert_eq!(tomcat["url"], "http://ws.local:32768/api/");
    assert_eq!(tomcat["status"], "RUNNING");
}

#[test]
fn cli_up_with_unknown_runtime_fails() {
    let sb = Sandbox::new();
    let ws = sb.write("workspace.toml", IMAGE_WORKSPACE);
    let output = sb
        .drydock()
        .arg("up")
        .arg(&ws)
        .args(["--runtime", "kubelet"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("kubelet"));
}

#[test]
fn cli_credentials_are_attached_on_convert() {
    let sb = Sandbox::new();
    let output = sb
        .drydock()
        .args(["credentials", "quay.io", "--username", "alice", "--password", "s3cret"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(sb.path().join("prefs/alice.json").is_file());

    let ws = sb.write("workspace.toml", IMAGE_WORKSPACE);
    let output = sb
        .drydock()
        .args(["--json", "convert"])
        .arg(&ws)
        .args(["--backend", "openshift"])
        .output()
        .unwrap();
    let json = stdout_json(&output);
    assert_eq!(
        json["object"]["image_pull_credentials"]["quay.io"]["username"],
        "alice"
    );
}

#[test]
fn cli_credentials_keep_unreadable_entries_without_force() {
    let sb = Sandbox::new();
    std::fs::create_dir_all(sb.path().join("prefs")).unwrap();
    sb.write("prefs/alice.json", r#"{"dockerCredentials": "%%% not base64"}"#);

    let output = sb
        .drydock()
        .args(["credentials", "quay.io", "--username", "alice", "--password", "s3cret"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unreadable"), "{stderr}");
    assert!(stderr.contains("--force"), "{stderr}");
    let stored = std::fs::read_to_string(sb.path().join("prefs/alice.json")).unwrap();
    assert!(stored.contains("%%% not base64"));

    let output = sb
        .drydock()
        .args(["credentials", "quay.io", "--username", "alice", "--password", "s3cret", "--force"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stderr).contains("warning:"));
    let stored = std::fs::read_to_string(sb.path().join("prefs/alice.json")).unwrap();
    assert!(!stored.contains("%%% not base64"));
}

#[test]
fn cli_namespaces_json() {
    let sb = Sandbox::new();
    sb.write(
        "config.toml",
        "[namespaces]\ndefault_template = \"<username>-dev\"\navailable = [\"shared\"]\n",
    );
    let output = sb.drydock().args(["--json", "namespaces"]).output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json[0]["name"], "alice-dev");
    assert_eq!(json[0]["attributes"]["default"], "true");
    assert_eq!(json[1]["name"], "shared");
    assert_eq!(json[1]["attributes"]["phase"], "Active");
}

#[test]
fn cli_completions_bash() {
    let output = Command::new(env!("CARGO_BIN_EXE_drydock"))
        .args(["completions", "bash"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("drydock"));
}
