//! Shared harness for githarvest integration tests: a canned HTTP server,
//! index and loose-object builders, and a process runner.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::thread;

use flate2::write::ZlibEncoder;
use flate2::Compression;

/// Captured output from running the binary.
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Run `githarvest` in `dir` with `args`.
pub fn githarvest(dir: &Path, args: &[&str]) -> CommandResult {
    let output = Command::new(env!("CARGO_BIN_EXE_githarvest"))
        .args(args)
        .current_dir(dir)
        .env("RUST_LOG", "warn")
        .env_remove("HTTP_PROXY")
        .env_remove("http_proxy")
        .env_remove("ALL_PROXY")
        .env_remove("all_proxy")
        .output()
        .unwrap();
    CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code().unwrap_or(-1),
    }
}

/// Serve `body` for each path in `routes`, 404 for anything else.
/// Returns `host:port`.
pub fn serve(routes: HashMap<String, Vec<u8>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = Arc::new(routes);

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let routes = Arc::clone(&routes);
            thread::spawn(move || {
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    return;
                }
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) | Err(_) => break,
                        Ok(_) if line == "\r\n" => break,
                        Ok(_) => {}
                    }
                }

                let path = request_line.split_whitespace().nth(1).unwrap_or("/");
                let (status, body) = match routes.get(path) {
                    Some(body) => (200, body.clone()),
                    None => (404, b"not found".to_vec()),
                };
                let head = format!(
                    "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(&body);
            });
        }
    });

    addr.to_string()
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// A compressed loose blob.
pub fn blob(content: &[u8]) -> Vec<u8> {
    let mut raw = format!("blob {}\0", content.len()).into_bytes();
    raw.extend_from_slice(content);
    zlib(&raw)
}

/// A version-2 index listing `(path, oid, size, mode)` entries.
pub fn index(entries: &[(&str, [u8; 20], u32, u32)]) -> Vec<u8> {
    let mut buf = b"DIRC".to_vec();
    buf.extend_from_slice(&2u32.to_be_bytes());
    buf.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    for (path, oid, size, mode) in entries {
        let start = buf.len();
        for field in [0u32, 0, 0, 0, 0, 0, *mode, 0, 0, *size] {
            buf.extend_from_slice(&field.to_be_bytes());
        }
        buf.extend_from_slice(oid);
        buf.extend_from_slice(&(path.len() as u16).to_be_bytes());
        buf.extend_from_slice(path.as_bytes());
        let pad = 8 - (buf.len() - start) % 8;
        buf.extend(std::iter::repeat(0).take(pad));
    }
    buf
}

/// Route key for the loose object named by `oid` under `/<repo>/.git/`.
pub fn object_route(oid: &[u8; 20]) -> String {
    let hex: String = oid.iter().map(|b| format!("{b:02x}")).collect();
    format!("/repo/.git/objects/{}/{}", &hex[..2], &hex[2..])
}

pub const INDEX_ROUTE: &str = "/repo/.git/index";
