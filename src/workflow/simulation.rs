//! Simulated dispatch and verification.
//!
//! Nothing in this module performs network I/O. The dispatch delay stands in
//! for submission latency and the [`VerificationProof`] is fabricated from
//! random values. Consumers may display it but must not base decisions on it.

use std::time::{Duration, Instant};

use chrono::Utc;
use rand::Rng;
use rand::seq::SliceRandom;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use crate::model::{DispatchTiming, Job, VerificationProof};

const STATUS_CODES: [u16; 3] = [200, 201, 202];

/// Bounds of the simulated dispatch delay, in milliseconds (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub fn pick<R: Rng>(&self, rng: &mut R) -> Duration {
        let min = self.min_ms.min(self.max_ms);
        Duration::from_millis(rng.gen_range(min..=self.max_ms))
    }
}

/// Waits out a random dispatch delay. A cancelled token cuts the wait short.
/// Returns the time actually spent.
pub async fn simulate_dispatch(range: DelayRange, cancel: Option<&CancellationToken>) -> u64 {
    let wait = range.pick(&mut rand::thread_rng());
    let started = Instant::now();
    match cancel {
        Some(token) => {
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = token.cancelled() => {
                    tracing::debug!("dispatch delay interrupted by cancellation");
                }
            }
        }
        None => tokio::time::sleep(wait).await,
    }
    started.elapsed().as_millis() as u64
}

/// Fabricates a receipt for a simulated dispatch of `job`.
pub fn synthesize_proof<R: Rng>(job: &Job, dispatch_ms: u64, rng: &mut R) -> VerificationProof {
    let host = job.apply_host().unwrap_or_else(|| "unknown-host".to_string());
    let nonce: u64 = rng.r#gen();

    let mut hasher = Sha256::new();
    hasher.update(job.id.as_bytes());
    hasher.update(Utc::now().to_rfc3339().as_bytes());
    hasher.update(nonce.to_le_bytes());
    let dispatch_hash = format!("0x{}", hex::encode(hasher.finalize()));

    let server_status = *STATUS_CODES.choose(rng).unwrap_or(&200);
    let handshake_ms: u64 = rng.gen_range(20..=180);
    let verify_ms: u64 = rng.gen_range(80..=400);
    let ip = format!(
        "104.{}.{}.{}",
        rng.gen_range(16..=31),
        rng.gen_range(0..=255),
        rng.gen_range(1..=254)
    );

    let network_log = vec![
        format!("[sim] DNS {host} -> {ip}"),
        format!("[sim] TLS handshake {host}:443 ok ({handshake_ms}ms)"),
        format!("[sim] POST https://{host}/apply ({dispatch_ms}ms)"),
        format!("[sim] HTTP {server_status} from {host}"),
        format!("[sim] receipt {}", &dispatch_hash[..18]),
    ];

    let receipt_svg = Some(render_receipt(job, &dispatch_hash, server_status));

    VerificationProof {
        dispatch_hash,
        network_log,
        server_status,
        timing: DispatchTiming {
            dispatch_ms,
            verify_ms,
        },
        receipt_svg,
        simulated: true,
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_receipt(job: &Job, hash: &str, status: u16) -> String {
    format!(
        concat!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="480" height="160">"##,
            r##"<rect width="480" height="160" fill="#0f172a"/>"##,
            r##"<text x="16" y="32" fill="#94a3b8" font-family="monospace" font-size="12">SIMULATED DISPATCH RECEIPT</text>"##,
            r##"<text x="16" y="64" fill="#f8fafc" font-family="monospace" font-size="14">{title} @ {company}</text>"##,
            r##"<text x="16" y="96" fill="#38bdf8" font-family="monospace" font-size="10">{hash}</text>"##,
            r##"<text x="16" y="128" fill="#4ade80" font-family="monospace" font-size="12">HTTP {status}</text>"##,
            "</svg>"
        ),
        title = escape_xml(&job.title),
        company = escape_xml(&job.company),
        hash = hash,
        status = status,
    )
}
