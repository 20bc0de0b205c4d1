//! HTTP detection service client.
//!
//! POSTs the submission body to the configured endpoint with the confidence
//! threshold as a query parameter, and expects a JSON `DetectionResult` back.

use std::io::Read;
use std::time::Duration;

use url::Url;

use crate::detect::backend::{DetectorBackend, Submission};
use crate::detect::result::DetectionResult;
use crate::error::{AnalysisError, AnalysisResult};

const MAX_RESPONSE_BYTES: usize = 256 * 1024;

pub struct HttpBackend {
    endpoint: Url,
    agent: ureq::Agent,
}

fn unavailable(context: &str, err: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::AnalysisServiceUnavailable(format!("{}: {}", context, err))
}

impl HttpBackend {
    pub fn new(endpoint: &str, timeout: Duration) -> AnalysisResult<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| unavailable("parse detect url", e))?;
        match endpoint.scheme() {
            "http" | "https" => {}
            other => {
                return Err(AnalysisError::AnalysisServiceUnavailable(format!(
                    "unsupported detect url scheme '{}'; expected http(s)",
                    other
                )))
            }
        }
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Ok(Self { endpoint, agent })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl DetectorBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    fn detect(&mut self, submission: &Submission) -> AnalysisResult<DetectionResult> {
        let response = self
            .agent
            .post(self.endpoint.as_str())
            .set("Content-Type", &submission.content_type)
            .query(
                "confidence_threshold",
                &submission.confidence_threshold.to_string(),
            )
            .send_bytes(&submission.bytes)
            .map_err(|e| unavailable("detect request", e))?;

        let mut body = String::new();
        response
            .into_reader()
            .take(MAX_RESPONSE_BYTES as u64)
            .read_to_string(&mut body)
            .map_err(|e| unavailable("read detect response", e))?;

        let result: DetectionResult =
            serde_json::from_str(&body).map_err(|e| unavailable("decode detect response", e))?;
        result.validate()?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::blue_magpie;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Accept one request, answer with `status` and `body`, and hand back
    /// the request head and body.
    fn serve_once(status: &str, body: String) -> (String, JoinHandle<(String, Vec<u8>)>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/detect", listener.local_addr().unwrap());
        let status = status.to_string();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            let head_end = loop {
                let n = stream.read(&mut buf).unwrap();
                assert!(n > 0, "client closed before headers");
                raw.extend_from_slice(&buf[..n]);
                if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
            let length = head
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().unwrap())
                })
                .unwrap_or(0);
            let mut request_body = raw[head_end..].to_vec();
            while request_body.len() < length {
                let n = stream.read(&mut buf).unwrap();
                assert!(n > 0, "client closed mid-body");
                request_body.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
            (head, request_body)
        });
        (url, handle)
    }

    #[test]
    fn rejects_non_http_endpoints() {
        assert!(HttpBackend::new("ftp://models.local/detect", Duration::from_secs(5)).is_err());
        assert!(HttpBackend::new("not a url", Duration::from_secs(5)).is_err());
        let backend = HttpBackend::new("http://127.0.0.1:8790/detect", Duration::from_secs(5))
            .unwrap();
        assert_eq!(backend.endpoint().path(), "/detect");
    }

    #[test]
    fn decodes_service_answer() {
        let (url, server) = serve_once("200 OK", serde_json::to_string(&blue_magpie()).unwrap());
        let mut backend = HttpBackend::new(&url, Duration::from_secs(5)).unwrap();

        let result = backend
            .detect(&Submission::image(vec![0xff, 0xd8, 0xff], "image/jpeg", 60))
            .unwrap();
        assert_eq!(result, blue_magpie());

        let (head, body) = server.join().unwrap();
        assert!(head.starts_with("POST /detect?confidence_threshold=60 "));
        assert!(head.to_ascii_lowercase().contains("content-type: image/jpeg"));
        assert_eq!(body, vec![0xff, 0xd8, 0xff]);
    }

    #[test]
    fn out_of_range_answer_is_rejected() {
        let mut record = blue_magpie();
        record.confidence_score = 140.0;
        let (url, server) = serve_once("200 OK", serde_json::to_string(&record).unwrap());
        let mut backend = HttpBackend::new(&url, Duration::from_secs(5)).unwrap();

        assert!(backend
            .detect(&Submission::image(vec![1], "image/png", 75))
            .is_err());
        server.join().unwrap();
    }

    #[test]
    fn server_error_is_unavailable() {
        let (url, server) = serve_once("503 Service Unavailable", "{}".to_string());
        let mut backend = HttpBackend::new(&url, Duration::from_secs(5)).unwrap();

        let err = backend
            .detect(&Submission::image(vec![1], "image/png", 75))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::AnalysisServiceUnavailable(_)));
        server.join().unwrap();
    }

    #[test]
    fn unreachable_service_is_unavailable() {
        // Bind then drop to get a loopback port nothing listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let url = format!("http://127.0.0.1:{}/detect", port);
        let mut backend = HttpBackend::new(&url, Duration::from_millis(500)).unwrap();
        let err = backend
            .detect(&Submission::image(vec![1, 2, 3], "image/jpeg", 75))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::AnalysisServiceUnavailable(_)));
    }
}
