#[macro_use]
extern crate rocket;

pub mod auth;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod jobs;
pub mod models;
pub mod pages;
pub mod provider;
pub mod request_logger;
pub mod routes;

use crate::auth::SessionStore;
use crate::config::{AuthConfig, JobConfig, ProviderConfig};
use crate::jobs::JobStore;
use crate::pages::SessionPages;
use crate::provider::{GmailProvider, MailProvider};
use crate::request_logger::RequestLogger;
use chrono::Utc;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use std::sync::{Arc, Once};

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

pub fn rocket() -> Rocket<Build> {
    init_logger();

    let provider_config = ProviderConfig::from_env();
    let provider: Arc<dyn MailProvider> = Arc::new(
        GmailProvider::new(&provider_config).expect("Error creating provider HTTP client"),
    );

    let auth_config = AuthConfig::from_env();
    let sessions = SessionStore::new();
    if let (Some(token), Some(access_token)) = (
        auth_config.bootstrap_token.as_deref(),
        auth_config.bootstrap_access_token.as_deref(),
    ) {
        sessions.insert(token, access_token, auth_config.session_ttl);
        log::info!("seeded bootstrap session from environment");
    }

    let job_config = JobConfig::from_env();
    let job_store = Arc::new(JobStore::new(&job_config));

    // Configure CORS
    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![Method::Get, Method::Post, Method::Delete]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("Error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(cors)
        .manage(provider)
        .manage(sessions)
        .manage(SessionPages::new())
        .manage(job_store)
        .manage(job_config)
        // Periodically evict finished jobs and expired sessions.
        .attach(AdHoc::on_liftoff("Spawn Reaper", |rocket| {
            Box::pin(async move {
                let job_store = rocket.state::<Arc<JobStore>>().cloned();
                let sessions = rocket.state::<SessionStore>().cloned();
                let pages = rocket.state::<SessionPages>().cloned();
                let config = rocket.state::<JobConfig>().cloned();
                match (job_store, sessions, pages, config) {
                    (Some(job_store), Some(sessions), Some(pages), Some(config)) => {
                        tokio::spawn(async move {
                            log::info!(
                                "starting reaper (interval {:?}, retention {:?})",
                                config.reap_interval,
                                config.retention
                            );
                            run_reaper(job_store, sessions, pages, config).await
                        });
                    }
                    _ => log::error!("failed to spawn reaper: managed state not found"),
                }
            })
        }))
        .mount(
            "/api/v1",
            openapi_get_routes![
                // Health routes
                routes::health::health_check,
                // Search routes
                routes::search::search,
                // Message routes
                routes::delete::delete_messages,
                // Job routes
                routes::jobs::submit_delete_job,
                routes::jobs::get_job,
                routes::jobs::cancel_job,
            ],
        )
        .register(
            "/",
            catchers![
                error::unauthorized,
                error::not_found,
                error::internal_error
            ],
        )
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../v1/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Mailsweep API", "../../v1/openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

async fn run_reaper(
    job_store: Arc<JobStore>,
    sessions: SessionStore,
    pages: SessionPages,
    config: JobConfig,
) {
    let retention = chrono::Duration::from_std(config.retention)
        .unwrap_or_else(|_| chrono::Duration::hours(1));
    let mut interval = tokio::time::interval(config.reap_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let evicted = job_store.evict_finished_before(Utc::now() - retention);
        let expired = sessions.purge_expired();
        let dropped = pages.purge_dead_sessions(&sessions);
        if evicted + expired + dropped > 0 {
            log::debug!(
                "reaper: evicted {} jobs, {} sessions, {} page caches",
                evicted,
                expired,
                dropped
            );
        }
    }
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use crate::auth::SessionStore;
    use crate::config::JobConfig;
    use crate::jobs::JobStore;
    use crate::models::{DeleteMode, ItemMetadata, MessageHeader};
    use crate::pages::SessionPages;
    use crate::provider::{ListPage, MailProvider, ProviderError};
    use parking_lot::Mutex;
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket};
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// One scripted message the mock provider can list and describe.
    #[derive(Debug, Clone)]
    pub struct ScriptedMessage {
        pub id: String,
        pub subject: String,
        pub sender: String,
    }

    impl ScriptedMessage {
        pub fn new(id: &str, subject: &str, sender: &str) -> Self {
            Self {
                id: id.to_string(),
                subject: subject.to_string(),
                sender: sender.to_string(),
            }
        }
    }

    /// Scripted in-memory provider with per-operation call counters, so
    /// tests can assert at-most-once fetching and zero-call dry runs.
    #[derive(Default)]
    pub struct MockProvider {
        pages: Mutex<VecDeque<(Vec<ScriptedMessage>, Option<String>)>>,
        metadata: Mutex<HashMap<String, ScriptedMessage>>,
        fail_mutate: HashSet<String>,
        list_calls: AtomicUsize,
        get_calls: AtomicUsize,
        mutate_calls: AtomicUsize,
        mutated: Mutex<Vec<String>>,
    }

    impl MockProvider {
        pub fn new() -> Self {
            Self::default()
        }

        /// Append one page the next `list` call will return.
        pub fn push_page(self, messages: Vec<ScriptedMessage>, next_token: Option<&str>) -> Self {
            {
                let mut metadata = self.metadata.lock();
                for message in &messages {
                    metadata.insert(message.id.clone(), message.clone());
                }
                self.pages
                    .lock()
                    .push_back((messages, next_token.map(String::from)));
            }
            self
        }

        /// Make `mutate` fail for the given ids.
        pub fn fail_mutating(mut self, ids: &[&str]) -> Self {
            self.fail_mutate = ids.iter().map(|id| id.to_string()).collect();
            self
        }

        pub fn list_calls(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }

        pub fn get_calls(&self) -> usize {
            self.get_calls.load(Ordering::SeqCst)
        }

        pub fn mutate_calls(&self) -> usize {
            self.mutate_calls.load(Ordering::SeqCst)
        }

        /// Ids successfully mutated, in dispatch order.
        pub fn mutated_ids(&self) -> Vec<String> {
            self.mutated.lock().clone()
        }
    }

    #[rocket::async_trait]
    impl MailProvider for MockProvider {
        async fn list(
            &self,
            _access_token: &str,
            _query: &str,
            _page_token: Option<&str>,
            _page_size: u32,
        ) -> Result<ListPage, ProviderError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let page = self.pages.lock().pop_front();
            match page {
                Some((messages, next_page_token)) => Ok(ListPage {
                    ids: messages.into_iter().map(|m| m.id).collect(),
                    next_page_token,
                }),
                None => Ok(ListPage {
                    ids: Vec::new(),
                    next_page_token: None,
                }),
            }
        }

        async fn get_metadata(
            &self,
            _access_token: &str,
            id: &str,
        ) -> Result<ItemMetadata, ProviderError> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            let message = self
                .metadata
                .lock()
                .get(id)
                .cloned()
                .ok_or_else(|| ProviderError::MessageNotFound(id.to_string()))?;
            Ok(ItemMetadata {
                id: message.id,
                thread_id: None,
                snippet: Some(format!("snippet of {id}")),
                headers: vec![
                    MessageHeader {
                        name: "Subject".to_string(),
                        value: message.subject,
                    },
                    MessageHeader {
                        name: "From".to_string(),
                        value: message.sender,
                    },
                ],
            })
        }

        async fn mutate(
            &self,
            _access_token: &str,
            id: &str,
            _mode: DeleteMode,
        ) -> Result<(), ProviderError> {
            self.mutate_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_mutate.contains(id) {
                return Err(ProviderError::MessageNotFound(id.to_string()));
            }
            self.mutated.lock().push(id.to_string());
            Ok(())
        }
    }

    /// Builder for constructing Rocket instances tailored for integration
    /// tests: random port, logging off, mock provider, pre-seeded sessions
    /// and a fast worker-pool policy.
    pub struct TestRocketBuilder {
        figment: Figment,
        provider: Arc<dyn MailProvider>,
        job_config: JobConfig,
        session_tokens: Vec<String>,
    }

    impl TestRocketBuilder {
        pub fn new(provider: Arc<dyn MailProvider>) -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                provider,
                job_config: JobConfig {
                    concurrency: 2,
                    inter_op_delay: Duration::from_millis(1),
                    retention: Duration::from_secs(3600),
                    reap_interval: Duration::from_secs(60),
                },
                session_tokens: Vec::new(),
            }
        }

        /// Seed a live session for the given bearer token.
        pub fn with_session(mut self, token: &str) -> Self {
            self.session_tokens.push(token.to_string());
            self
        }

        /// Override the worker-pool policy.
        pub fn with_job_config(mut self, config: JobConfig) -> Self {
            self.job_config = config;
            self
        }

        /// Finish building the Rocket instance with all API routes mounted.
        pub fn build(self) -> Rocket<Build> {
            let sessions = SessionStore::new();
            for token in &self.session_tokens {
                sessions.insert(token, format!("access-{token}"), Duration::from_secs(3600));
            }
            let job_store = Arc::new(JobStore::new(&self.job_config));

            rocket::custom(self.figment)
                .manage(self.provider)
                .manage(sessions)
                .manage(SessionPages::new())
                .manage(job_store)
                .manage(self.job_config)
                .register(
                    "/",
                    rocket::catchers![
                        crate::error::unauthorized,
                        crate::error::not_found,
                        crate::error::internal_error
                    ],
                )
                .mount(
                    "/api/v1",
                    rocket::routes![
                        crate::routes::health::health_check,
                        crate::routes::search::search,
                        crate::routes::delete::delete_messages,
                        crate::routes::jobs::submit_delete_job,
                        crate::routes::jobs::get_job,
                        crate::routes::jobs::cancel_job,
                    ],
                )
        }

        /// Convenience helper to produce a blocking local client.
        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        /// Convenience helper to produce an asynchronous local client.
        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
