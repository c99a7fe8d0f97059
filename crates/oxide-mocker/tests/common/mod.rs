#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use oxide_mocker::{controller, ActionResult, MockDispatcher, Request, Response};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once; `RUST_LOG` controls the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn dispatch(request: Request) -> Response {
    init_tracing();
    let dispatcher = MockDispatcher::<DemoController>::new()
        .unwrap_or_else(|e| panic!("Failed to build dispatcher: {e}"));
    dispatcher
        .handle(request)
        .await
        .unwrap_or_else(|e| panic!("Dispatch failed: {e}"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestBody {
    #[serde(rename = "HelloWorld")]
    pub hello_world: i32,
}

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TestResult {
    pub body: TestBody,
    pub route: String,
    pub query: String,
    pub header: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    Red,
    Green,
    Blue,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Page {
    pub limit: u32,
    pub offset: Option<u32>,
    pub color: Color,
}

pub struct DemoController;

#[controller]
impl DemoController {
    #[route("http://service-test/api/test/{id}")]
    #[post]
    pub async fn okay(
        id: String,
        #[from_query(name = "queryParam")] query: String,
        #[from_header(name = "x-header")] header: String,
        #[from_body] body: TestBody,
    ) -> ActionResult<TestResult> {
        tokio::task::yield_now().await;
        ActionResult::ok(TestResult {
            body,
            route: id,
            query,
            header,
        })
    }

    #[route("http://service-test/api/test")]
    #[get]
    pub fn no_params() {}

    #[route("/api/plain")]
    #[get]
    pub fn plain() -> TestBody {
        TestBody { hello_world: 42 }
    }

    #[route("/api/later/{n}")]
    #[get]
    pub fn later(n: i32) -> impl Future<Output = ActionResult<TestBody>> + Send {
        async move {
            tokio::task::yield_now().await;
            ActionResult::created(TestBody { hello_world: n * 2 })
        }
    }

    #[route("/api/items/{id}")]
    #[get]
    pub fn item(id: u32) -> ActionResult<u32> {
        if id == 0 {
            ActionResult::not_found()
        } else {
            ActionResult::ok(id)
        }
    }

    #[route("/api/items/*/raw")]
    #[get]
    pub fn raw() -> ActionResult {
        ActionResult::content_with_type("<p>raw</p>", "text/html")
    }

    #[route("/api/page")]
    #[get]
    pub fn page(
        #[from_query] #[default(20)] limit: u32,
        #[from_query] offset: Option<u32>,
        #[from_query] #[default(Color::Red)] color: Color,
    ) -> Page {
        Page {
            limit,
            offset,
            color,
        }
    }

    #[route("/api/echo")]
    #[put]
    pub fn echo(#[from_body] text: String) -> ActionResult {
        ActionResult::content(text)
    }

    #[route("/api/bytes")]
    #[put]
    pub fn bytes(#[from_body] data: Vec<u8>) -> usize {
        data.len()
    }

    #[route("/api/required")]
    #[get]
    pub fn required(#[from_header("x-token")] token: String) -> String {
        token
    }

    #[route("/api/fail/{code}")]
    #[delete]
    pub fn fail(code: u16) -> Result<ActionResult, io::Error> {
        if code == 0 {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "not allowed"))
        } else {
            Ok(ActionResult::status(code))
        }
    }

    #[route("/api/fail-later")]
    #[delete]
    pub async fn fail_later() -> anyhow::Result<String> {
        tokio::task::yield_now().await;
        anyhow::bail!("gone")
    }

    #[route("/api/items")]
    #[get]
    pub fn first_items() -> &'static str {
        "first"
    }

    #[route("/API/ITEMS")]
    #[get]
    pub fn second_items() -> &'static str {
        "second"
    }

    #[route("/api/hidden")]
    #[get]
    fn hidden() -> &'static str {
        "hidden"
    }

    #[route("/api/fallback")]
    #[post]
    pub fn fallback(
        #[from_body]
        #[default(TestBody { hello_world: 9 })]
        body: TestBody,
    ) -> TestBody {
        body
    }

    #[route("/api/pairs")]
    #[get]
    pub fn pairs(
        #[from_query]
        #[default(Some(HashMap::from([((1, 2), 3)])))]
        pairs: Option<HashMap<(u8, u8), u8>>,
    ) -> usize {
        pairs.map_or(0, |p| p.len())
    }

    pub fn helper() -> u8 {
        7
    }

    pub fn name_length(name: &str) -> usize {
        name.len()
    }
}

/// A controller with per-instance state.
pub struct CounterController {
    hits: AtomicU64,
    pub start: u64,
}

impl CounterController {
    pub fn new(start: u64) -> Self {
        Self {
            hits: AtomicU64::new(0),
            start,
        }
    }
}

#[controller]
impl CounterController {
    #[route("/counter/hit")]
    #[post]
    pub fn hit(&self) -> u64 {
        self.start + self.hits.fetch_add(1, Ordering::SeqCst) + 1
    }

    #[route("/counter/add/{n}")]
    #[get]
    pub async fn add(&self, n: u64) -> u64 {
        tokio::task::yield_now().await;
        self.start + n
    }

    #[route("/counter/version")]
    #[get]
    pub fn version() -> &'static str {
        "1"
    }
}
