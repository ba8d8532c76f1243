use std::fs;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output};
use std::time::{Duration, Instant};

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .canonicalize()
        .expect("canonicalize repo root")
}

fn quoteform_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_quoteform"))
}

fn run(args: &[&str], ontology_dir: &Path) -> Output {
    Command::new(quoteform_bin())
        .args(args)
        .env("QUOTEFORM_ONTOLOGY_DIR", ontology_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("run quoteform")
}

fn write_kb(dir: &Path, drivers: &str) {
    fs::write(dir.join("drivers.ttl"), drivers).expect("write drivers.ttl");
    fs::write(
        dir.join("vehicles.ttl"),
        r#"ex:vin a owl:DatatypeProperty ; rdfs:domain ex:Vehicle ; rdfs:label "VIN" ;
    ex:validationPattern "[A-HJ-NPR-Z0-9]{17}" .
"#,
    )
    .expect("write vehicles.ttl");
}

const DRIVERS: &str = r#"ex:hasLicense a owl:DatatypeProperty ;
    rdfs:domain ex:Driver ;
    rdfs:range xsd:boolean ;
    rdfs:label "has driving license" .
ex:email a owl:DatatypeProperty ;
    rdfs:domain ex:Driver ;
    rdfs:label "Email" ;
    ex:isRequired true .
"#;

struct ChildGuard {
    child: Child,
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn http_request(addr: &str, method: &str, path: &str, body: Option<&serde_json::Value>) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream.set_read_timeout(Some(Duration::from_secs(5))).ok();
    stream.set_write_timeout(Some(Duration::from_secs(5))).ok();

    let body_bytes = body
        .map(|b| serde_json::to_vec(b).expect("serialize request"))
        .unwrap_or_default();
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body_bytes.len()
    );
    stream.write_all(request.as_bytes()).expect("write request");
    stream.write_all(&body_bytes).expect("write body");
    stream.flush().ok();

    let mut response_bytes = Vec::new();
    stream.read_to_end(&mut response_bytes).expect("read response");
    let response = String::from_utf8_lossy(&response_bytes).to_string();

    let status = response
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);
    let body_text = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_default();
    (status, body_text)
}

fn http_json(addr: &str, method: &str, path: &str, body: Option<&serde_json::Value>) -> (u16, serde_json::Value) {
    let (status, text) = http_request(addr, method, path, body);
    let json = serde_json::from_str(&text).expect("parse JSON response");
    (status, json)
}

fn kb_args() -> Vec<&'static str> {
    vec!["--document", "drivers.ttl", "--document", "vehicles.ttl"]
}

#[test]
fn compile_prints_schema_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_kb(dir.path(), DRIVERS);

    let mut args = vec!["compile", "--compact"];
    args.extend(kb_args());
    let out = run(&args, dir.path());
    assert!(
        out.status.success(),
        "compile failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let schema: serde_json::Value = serde_json::from_slice(&out.stdout).expect("schema JSON");
    let drivers = &schema["sections"]["drivers"];
    assert_eq!(drivers["title"], "Driver Details");
    assert_eq!(drivers["fields"][0]["id"], "hasLicense");
    assert_eq!(drivers["fields"][0]["type"], "radio");
    assert_eq!(drivers["fields"][1]["type"], "email");
    assert_eq!(drivers["fields"][1]["required"], true);
    assert_eq!(schema["sections"]["documents"]["fields"], serde_json::json!([]));
    assert!(schema["fingerprint"].as_str().unwrap().starts_with("fnv1a64:"));
}

#[test]
fn compile_strict_fails_on_diagnostics() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_kb(
        dir.path(),
        "ex:orphan a owl:DatatypeProperty ; rdfs:label \"Orphan\" .\n",
    );

    let mut args = vec!["compile", "--strict"];
    args.extend(kb_args());
    let out = run(&args, dir.path());
    assert!(!out.status.success());

    let mut args = vec!["compile"];
    args.extend(kb_args());
    assert!(run(&args, dir.path()).status.success());
}

#[test]
fn missing_document_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_kb(dir.path(), DRIVERS);

    let out = run(
        &["check", "--document", "drivers.ttl", "--document", "absent.ttl"],
        dir.path(),
    );
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("absent.ttl"), "stderr: {stderr}");
}

#[test]
fn check_reports_diagnostics_as_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_kb(
        dir.path(),
        &format!("{DRIVERS}ex:policyNo a owl:DatatypeProperty ; rdfs:domain ex:Policy ; rdfs:label \"Policy\" .\n"),
    );

    let mut args = vec!["check", "--json"];
    args.extend(kb_args());
    let out = run(&args, dir.path());
    assert!(out.status.success());
    let diags: serde_json::Value = serde_json::from_slice(&out.stdout).expect("diagnostics JSON");
    assert_eq!(diags[0]["kind"], "unknown_class");
    assert_eq!(diags[0]["class"], "Policy");
    assert_eq!(diags[0]["location"]["line"], 9);

    let mut args = vec!["check", "--deny-diagnostics"];
    args.extend(kb_args());
    assert!(!run(&args, dir.path()).status.success());
}

#[test]
fn validate_checks_a_submission_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_kb(dir.path(), DRIVERS);
    let good = dir.path().join("good.json");
    fs::write(&good, r#"{"hasLicense": "true", "email": "ada@example.org"}"#).unwrap();
    let bad = dir.path().join("bad.json");
    fs::write(&bad, r#"{"section": "drivers", "fields": {"hasLicense": "maybe"}}"#).unwrap();

    let good_path = good.to_string_lossy().to_string();
    let mut args = vec!["validate", good_path.as_str(), "--section", "drivers"];
    args.extend(kb_args());
    let out = run(&args, dir.path());
    assert!(
        out.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let bad_path = bad.to_string_lossy().to_string();
    let mut args = vec!["validate", bad_path.as_str()];
    args.extend(kb_args());
    let out = run(&args, dir.path());
    assert!(!out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).expect("report JSON");
    let codes: Vec<_> = report["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| (e["field"].as_str().unwrap().to_string(), e["code"].as_str().unwrap().to_string()))
        .collect();
    assert_eq!(
        codes,
        vec![
            ("hasLicense".to_string(), "invalid_type".to_string()),
            ("email".to_string(), "required".to_string()),
        ]
    );
}

#[test]
fn serve_answers_queries_and_reloads() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_kb(dir.path(), DRIVERS);
    let ready_file = dir.path().join("ready.json");

    let child = Command::new(quoteform_bin())
        .arg("serve")
        .args(kb_args())
        .arg("--listen")
        .arg("127.0.0.1:0")
        .arg("--ready-file")
        .arg(&ready_file)
        .env("QUOTEFORM_ONTOLOGY_DIR", dir.path())
        .spawn()
        .expect("spawn quoteform serve");
    let _guard = ChildGuard { child };

    let deadline = Instant::now() + Duration::from_secs(10);
    let addr = loop {
        let parsed = fs::read_to_string(&ready_file)
            .ok()
            .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok())
            .and_then(|v| v["addr"].as_str().map(str::to_string));
        if let Some(addr) = parsed {
            break addr;
        }
        assert!(Instant::now() < deadline, "server did not write ready file");
        std::thread::sleep(Duration::from_millis(50));
    };

    let (status, body) = http_request(&addr, "GET", "/healthz", None);
    assert_eq!(status, 200);
    assert_eq!(body.trim(), "ok");

    let (status, published) = http_json(&addr, "GET", "/api/ontology", None);
    assert_eq!(status, 200);
    assert_eq!(published["version"], 1);
    assert_eq!(
        published["schema"]["sections"]["drivers"]["fields"][0]["id"],
        "hasLicense"
    );

    let submission = serde_json::json!({"section": "vehicles", "fields": {"vin": "short"}});
    let (status, report) = http_json(&addr, "POST", "/api/validate", Some(&submission));
    assert_eq!(status, 422);
    assert_eq!(report["errors"][0]["code"], "pattern_mismatch");

    let (status, _) = http_json(&addr, "POST", "/api/validate", Some(&serde_json::json!({"nope": 1})));
    assert_eq!(status, 400);

    // Break the knowledge base: the reload fails and version 1 stays published.
    fs::remove_file(dir.path().join("vehicles.ttl")).unwrap();
    let (status, err) = http_json(&addr, "POST", "/admin/reload", None);
    assert_eq!(status, 500, "unexpected: {err}");
    let (_, published) = http_json(&addr, "GET", "/api/ontology", None);
    assert_eq!(published["version"], 1);

    write_kb(dir.path(), DRIVERS);
    let (status, reloaded) = http_json(&addr, "POST", "/admin/reload", None);
    assert_eq!(status, 200);
    assert_eq!(reloaded["version"], 2);
    assert_eq!(reloaded["fields"], 3);

    let (status, diags) = http_json(&addr, "GET", "/api/diagnostics", None);
    assert_eq!(status, 200);
    assert_eq!(diags["version"], 2);
    assert_eq!(diags["count"], 0);

    let (status, _) = http_json(&addr, "GET", "/nowhere", None);
    assert_eq!(status, 404);
}

#[test]
fn shipped_ontology_checks_clean() {
    let ontology = repo_root().join("ontology");
    let out = run(&["check", "--deny-diagnostics"], &ontology);
    assert!(
        out.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("5 documents, 32 fields, 0 diagnostics"), "stdout: {stdout}");
}
