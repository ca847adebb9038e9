use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use std::time::Instant;

/// Fairing logging one line per HTTP request with status and latency.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(Instant::now);
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let started = request.local_cache(Instant::now);
        let duration = started.elapsed();
        let status = response.status();

        // Health probes are noise at info level.
        let line = format!(
            "{} {} -> {} ({:.2}ms)",
            request.method(),
            request.uri(),
            status.code,
            duration.as_secs_f64() * 1000.0
        );
        if request.uri().path().ends_with("/health") {
            log::debug!("{}", line);
        } else {
            log::info!("{}", line);
        }
    }
}
