use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use log::{error, info, warn};
use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Header, StatusClass},
    Data, Orbit, Request, Response, Rocket,
};

/// Response header carrying the number the request was logged under.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Per-request bookkeeping, cached on the request on first access.
struct Trace {
    id: u64,
    arrived: Instant,
}

impl Trace {
    fn begin() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            arrived: Instant::now(),
        }
    }

    fn of<'r>(req: &'r Request<'_>) -> &'r Self {
        req.local_cache(Self::begin)
    }
}

/// `name (uri)` for the matched route, or a placeholder when nothing matched.
fn route_label(req: &Request<'_>) -> String {
    req.route().map_or_else(
        || "no route".to_string(),
        |route| match &route.name {
            Some(name) => format!("{name} ({})", route.uri),
            None => route.uri.to_string(),
        },
    )
}

/// Logs one line per request and one per response, and stamps each response
/// with [`REQUEST_ID_HEADER`] so client reports can be matched to log lines.
#[derive(Debug, Copy, Clone)]
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let config = rocket.config();
        info!(
            "Accepting connections at {}:{}",
            config.address, config.port
        );
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let trace = Trace::of(req);
        info!("[{}] {} {}", trace.id, req.method(), req.uri());
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let trace = Trace::of(req);
        let status = res.status();
        res.set_header(Header::new(REQUEST_ID_HEADER, trace.id.to_string()));

        let line = format!(
            "[{}] {status} from {} after {}ms",
            trace.id,
            route_label(req),
            trace.arrived.elapsed().as_millis()
        );
        match status.class() {
            StatusClass::ServerError => error!("{line}"),
            StatusClass::ClientError => warn!("{line}"),
            _ => info!("{line}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Draining in-flight requests before exit");
    }
}
