use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

/// 4x3 grid over 0..4°E, 50..47°N; u = flat index, v = 1.
fn write_wind(path: &Path) {
    let u: Vec<String> = (0..12).map(|i| format!("{i}.0")).collect();
    let v = vec!["1.0"; 12];
    let grid = |name: &str, data: String| {
        format!(
            r#"{{"header": {{"parameterNumberName": "{name}", "nx": 4, "ny": 3,
                "lo1": 0.0, "la1": 50.0, "dx": 1.0, "dy": 1.0}}, "data": [{data}]}}"#
        )
    };
    let document = format!(
        "[{}, {}]",
        grid("U-component_of_wind", u.join(", ")),
        grid("V-component_of_wind", v.join(", "))
    );
    fs::write(path, document).unwrap();
}

#[test]
fn sample_wind_reports_components() {
    let dir = tempdir().unwrap();
    let wind = dir.path().join("wind.json");
    write_wind(&wind);

    Command::cargo_bin("sample_wind")
        .expect("sample_wind bin")
        .args(["--wind", wind.to_str().unwrap(), "--lat", "48.5", "--lng", "-358.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Grid           : 4 x 3"))
        .stdout(predicate::str::contains("u              : 5.000"))
        .stdout(predicate::str::contains("v              : 1.000"));
}

#[test]
fn sample_wind_outside_coverage_exits_one() {
    let dir = tempdir().unwrap();
    let wind = dir.path().join("wind.json");
    write_wind(&wind);

    Command::cargo_bin("sample_wind")
        .expect("sample_wind bin")
        .args(["--wind", wind.to_str().unwrap(), "--lat", "10", "--lng", "2"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("outside grid coverage"));
}

#[test]
fn sample_wind_without_document_exits_two() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("sample_wind")
        .expect("sample_wind bin")
        .args([
            "--wind",
            dir.path().join("missing.json").to_str().unwrap(),
            "--lat",
            "0",
            "--lng",
            "0",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("wind field unavailable"));
}

/// Serves every hour with two entities until the test process exits.
fn spawn_feed() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let text = String::from_utf8_lossy(&request);
            let hour: u8 = text
                .split_whitespace()
                .nth(1)
                .and_then(|p| p.strip_prefix("/treasure/"))
                .and_then(|p| p.strip_suffix(".json"))
                .and_then(|h| h.parse().ok())
                .unwrap_or(0);
            let body = format!("[[{hour}.0, 10.0, 100.0], [{hour}.5, 20.0, 200.0]]");
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{addr}")
}

#[test]
fn fetch_constellation_exports_scene_and_trajectory() {
    let base_url = spawn_feed();
    let dir = tempdir().unwrap();
    let scene = dir.path().join("scene.json");
    let trajectory = dir.path().join("trajectory.csv");

    Command::cargo_bin("fetch_constellation")
        .expect("fetch_constellation bin")
        .args([
            "--base-url",
            &base_url,
            "--wind",
            dir.path().join("no-wind.json").to_str().unwrap(),
            "--timeout",
            "10",
            "--focus",
            "1",
            "--scene",
            scene.to_str().unwrap(),
            "--trajectory",
            trajectory.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hours          : 24"))
        .stdout(predicate::str::contains("Wind field     : unavailable"));

    let document: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&scene).unwrap()).unwrap();
    assert_eq!(document["metadata"]["focused"], 1);
    assert_eq!(document["paths"][0]["points"].as_array().unwrap().len(), 24);
    assert_eq!(document["paths"][0]["points"][0]["hour"], 23);

    let csv = fs::read_to_string(&trajectory).unwrap();
    assert_eq!(csv.lines().count(), 25);
    assert!(csv.lines().nth(1).unwrap().starts_with("0,true,0.500000,20.000000"));
}

#[test]
fn trajectory_export_requires_focus() {
    Command::cargo_bin("fetch_constellation")
        .expect("fetch_constellation bin")
        .args(["--trajectory", "out.csv"])
        .assert()
        .failure();
}
