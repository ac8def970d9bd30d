#![allow(dead_code)]

use axum::{body::Body, extract::Request};

pub const BOUNDARY: &str = "------------------------intake7d1f2a";

pub enum Part<'a> {
    File {
        field: &'a str,
        file_name: &'a str,
        declared_type: &'a str,
        data: &'a [u8],
    },
    Text {
        field: &'a str,
        value: &'a str,
    },
}

pub fn file<'a>(file_name: &'a str, data: &'a [u8]) -> Part<'a> {
    Part::File {
        field: "files",
        file_name,
        declared_type: "application/octet-stream",
        data,
    }
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File {
                field,
                file_name,
                declared_type,
                data,
            } => {
                let disposition = format!(
                    "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\""
                );
                body.extend_from_slice(
                    format!("{disposition}\r\nContent-Type: {declared_type}\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text { field, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}")
                        .as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(uri: &str, body: Vec<u8>) -> Request {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header("content-length", body.len())
        .body(Body::from(body))
        .unwrap()
}

pub fn jpeg(len: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
    data.resize(len, 0x5A);
    data
}

pub fn png(len: usize) -> Vec<u8> {
    let mut data = b"\x89PNG\x0D\x0A\x1A\x0A".to_vec();
    data.resize(len, 0x11);
    data
}

pub fn files_in(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
